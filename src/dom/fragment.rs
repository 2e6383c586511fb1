// ============================================================================
// piglet - Fragment Parser
// Turns compiled template markup into detached document nodes
// ============================================================================
//
// Deliberately forgiving: unmatched closing tags are ignored, unclosed
// elements are closed at the end of input, and a `<` that does not start
// a tag is kept as text.
// ============================================================================

use crate::core::types::NodeId;
use crate::dom::document::{Document, VOID_ELEMENTS};

/// Elements whose content is raw text up to the matching close tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Parse `html` into detached nodes owned by `doc`. Returns the top-level
/// nodes in document order.
pub fn parse_fragment(doc: &Document, html: &str) -> Vec<NodeId> {
    let mut parser = FragmentParser {
        doc,
        src: html,
        pos: 0,
        stack: Vec::new(),
        top: Vec::new(),
    };
    parser.run();
    parser.top
}

struct FragmentParser<'a> {
    doc: &'a Document,
    src: &'a str,
    pos: usize,
    stack: Vec<(String, NodeId)>,
    top: Vec<NodeId>,
}

impl FragmentParser<'_> {
    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn attach(&mut self, node: NodeId) {
        match self.stack.last() {
            // Both nodes are detached, so the append cannot fail
            Some(&(_, parent)) => {
                let _ = self.doc.append_child(parent, node);
            }
            None => self.top.push(node),
        }
    }

    fn run(&mut self) {
        while self.pos < self.src.len() {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                self.comment();
            } else if rest.starts_with("</") {
                self.close_tag();
            } else if rest.starts_with('<')
                && rest[1..].chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            {
                self.open_tag();
            } else {
                self.text();
            }
        }
    }

    fn comment(&mut self) {
        let body_start = self.pos + 4;
        let (body, next) = match self.src[body_start..].find("-->") {
            Some(end) => (&self.src[body_start..body_start + end], body_start + end + 3),
            None => (&self.src[body_start..], self.src.len()),
        };
        let node = self.doc.create_comment(body);
        self.attach(node);
        self.pos = next;
    }

    fn text(&mut self) {
        // Skip the leading '<' when it did not start a tag
        let skip = usize::from(self.rest().starts_with('<'));
        let end = self.rest()[skip..]
            .find('<')
            .map(|i| self.pos + skip + i)
            .unwrap_or(self.src.len());
        let raw = &self.src[self.pos..end];
        self.pos = end;
        if raw.trim().is_empty() {
            return;
        }
        let node = self.doc.create_text(&decode_entities(raw));
        self.attach(node);
    }

    fn close_tag(&mut self) {
        let rest = &self.src[self.pos + 2..];
        let end = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
        let name = rest[..end].trim_end_matches('>').trim().to_ascii_lowercase();
        self.pos += 2 + end;

        if let Some(depth) = self.stack.iter().rposition(|(tag, _)| *tag == name) {
            self.stack.truncate(depth);
        }
    }

    fn open_tag(&mut self) {
        let bytes = self.src.as_bytes();
        let mut i = self.pos + 1;
        while i < bytes.len() && is_name_byte(bytes[i]) {
            i += 1;
        }
        let tag = self.src[self.pos + 1..i].to_ascii_lowercase();
        let element = self.doc.create_element(&tag);

        let mut self_closing = false;
        loop {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= bytes.len() {
                break;
            }
            match bytes[i] {
                b'>' => {
                    i += 1;
                    break;
                }
                b'/' if bytes.get(i + 1) == Some(&b'>') => {
                    self_closing = true;
                    i += 2;
                    break;
                }
                b'/' => i += 1,
                _ => {
                    let (name, value, next) = read_attribute(self.src, i);
                    i = next;
                    if !name.is_empty() {
                        let _ = self.doc.set_attribute(element, &name, &value);
                    }
                }
            }
        }
        self.pos = i;
        self.attach(element);

        if self_closing || VOID_ELEMENTS.contains(&tag.as_str()) {
            return;
        }
        if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
            self.raw_text(element, &tag);
            return;
        }
        self.stack.push((tag, element));
    }

    fn raw_text(&mut self, element: NodeId, tag: &str) {
        let closing = format!("</{tag}");
        let lower = self.rest().to_ascii_lowercase();
        let end = lower.find(&closing).unwrap_or(lower.len());
        let body = &self.src[self.pos..self.pos + end];
        if !body.is_empty() {
            let text = self.doc.create_text(body);
            let _ = self.doc.append_child(element, text);
        }
        self.pos += end;
        if self.pos < self.src.len() {
            let after = self.rest().find('>').map(|i| i + 1).unwrap_or(self.rest().len());
            self.pos += after;
        }
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':')
}

/// Read one attribute starting at `start`. Returns (name, value, next index).
fn read_attribute(src: &str, start: usize) -> (String, String, usize) {
    let bytes = src.as_bytes();
    let mut i = start;
    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && !matches!(bytes[i], b'=' | b'>' | b'/') {
        i += 1;
    }
    let name = src[start..i].to_string();
    if i == start {
        // Stray character; consume it so the caller makes progress
        return (String::new(), String::new(), i + 1);
    }

    let mut j = i;
    while j < bytes.len() && bytes[j].is_ascii_whitespace() {
        j += 1;
    }
    if bytes.get(j) != Some(&b'=') {
        return (name, String::new(), i);
    }
    j += 1;
    while j < bytes.len() && bytes[j].is_ascii_whitespace() {
        j += 1;
    }

    match bytes.get(j) {
        Some(&quote @ (b'"' | b'\'')) => {
            let value_start = j + 1;
            let value_end = src[value_start..]
                .find(quote as char)
                .map(|e| value_start + e)
                .unwrap_or(src.len());
            let value = decode_entities(&src[value_start..value_end]);
            (name, value, (value_end + 1).min(src.len()))
        }
        _ => {
            let value_start = j;
            while j < bytes.len() && !bytes[j].is_ascii_whitespace() && bytes[j] != b'>' {
                j += 1;
            }
            (name, decode_entities(&src[value_start..j]), j)
        }
    }
}

/// Decode the handful of entities templates commonly carry.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

// =============================================================================
// TESTS
// =============================================================================
