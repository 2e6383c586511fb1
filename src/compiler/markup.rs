// ============================================================================
// piglet - Markup Scanner
// PascalCase component tags in template content
// ============================================================================
//
// Only tags whose name starts with an uppercase ASCII letter are touched.
// Attribute text is carried through byte for byte. A tag with no closing
// `>` is malformed and stays as written, and so does anything inside
// `<!-- -->`.
// ============================================================================

use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::constants::{CONDITIONAL_COMPONENT, HOST_ATTRIBUTE, UNSETTLED_SUFFIX};
use crate::naming::component_tag;

static TAG_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(/?)([A-Z][A-Za-z0-9]*)").expect("tag start pattern is valid")
});

static HOST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(^|\s){HOST_ATTRIBUTE}\s*(=|\s|/|$)")).expect("host marker pattern is valid")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagKind {
    Open,
    Close,
    SelfClosing,
}

/// One component tag in the content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentTag {
    pub kind: TagKind,
    pub name: String,
    /// Whole tag, `<` through `>`
    pub span: Range<usize>,
    /// Attribute text after the name, without the closing `/>` or `>`
    pub attrs: Range<usize>,
}

/// Every well-formed component tag in `content`, in source order.
pub fn scan_tags(content: &str) -> Vec<ComponentTag> {
    let comments = comment_spans(content);
    let bytes = content.as_bytes();
    let mut tags = Vec::new();

    for caps in TAG_START.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        if comments.iter().any(|c| c.contains(&whole.start())) {
            continue;
        }
        if tags
            .last()
            .is_some_and(|t: &ComponentTag| t.span.end > whole.start())
        {
            continue;
        }
        let name_end = whole.end();
        if !matches!(bytes.get(name_end), Some(b' ' | b'\t' | b'\n' | b'\r' | b'/' | b'>')) {
            continue;
        }
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let Some(gt) = find_tag_end(bytes, name_end) else {
            continue;
        };

        let self_closing = !closing && gt > name_end && bytes[gt - 1] == b'/';
        let attrs_end = if self_closing { gt - 1 } else { gt };
        let kind = match (closing, self_closing) {
            (true, _) => TagKind::Close,
            (false, true) => TagKind::SelfClosing,
            (false, false) => TagKind::Open,
        };
        tags.push(ComponentTag {
            kind,
            name: caps[2].to_string(),
            span: whole.start()..gt + 1,
            attrs: name_end..attrs_end,
        });
    }
    tags
}

/// Index of the `>` ending a tag, skipping quoted attribute values.
fn find_tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut quote = None;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return Some(i),
            (None, b'<') => return None,
            _ => {}
        }
    }
    None
}

fn comment_spans(content: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut from = 0;
    while let Some(start) = content[from..].find("<!--").map(|i| from + i) {
        let end = content[start + 4..]
            .find("-->")
            .map(|i| start + 4 + i + 3)
            .unwrap_or(content.len());
        spans.push(start..end);
        from = end;
    }
    spans
}

/// Distinct component names referenced by `content`.
pub fn collect_component_tags(content: &str) -> BTreeSet<String> {
    scan_tags(content).into_iter().map(|t| t.name).collect()
}

/// Rewrite every component tag of `content` to its custom-element name.
///
/// Self-closing tags become an empty open/close pair. Conditional tags
/// without a host marker get `host__element="<component>__unsettled"`.
pub fn rewrite_tags(content: &str, component: &str, root: &str) -> String {
    let mut out = String::with_capacity(content.len() + 32);
    let mut last = 0;
    for tag in scan_tags(content) {
        out.push_str(&content[last..tag.span.start]);
        let element = component_tag(&tag.name, root);
        let attrs = &content[tag.attrs.clone()];
        match tag.kind {
            TagKind::Close => {
                out.push_str("</");
                out.push_str(&element);
                out.push('>');
            }
            TagKind::Open | TagKind::SelfClosing => {
                let attrs = if tag.kind == TagKind::SelfClosing {
                    attrs.trim_end()
                } else {
                    attrs
                };
                out.push('<');
                out.push_str(&element);
                out.push_str(attrs);
                if tag.name == CONDITIONAL_COMPONENT && !HOST_MARKER.is_match(attrs) {
                    out.push_str(&format!(r#" {HOST_ATTRIBUTE}="{component}{UNSETTLED_SUFFIX}""#));
                }
                out.push('>');
                if tag.kind == TagKind::SelfClosing {
                    out.push_str("</");
                    out.push_str(&element);
                    out.push('>');
                }
            }
        }
        last = tag.span.end;
    }
    out.push_str(&content[last..]);
    out
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paired_and_self_closing_forms_rewrite_alike() {
        let src = r#"<MyWidget/><MyWidget label="a > b" data-x>text</MyWidget><MyWidget size=3 />"#;
        assert_eq!(
            rewrite_tags(src, "Page", "App"),
            r#"<my-widget></my-widget><my-widget label="a > b" data-x>text</my-widget><my-widget size=3></my-widget>"#
        );
    }

    #[test]
    fn plain_html_and_comments_are_untouched() {
        let src = "<div><!-- <Ghost/> --><span>Hi</span><Counter></Counter></div>";
        assert_eq!(
            rewrite_tags(src, "Page", "App"),
            "<div><!-- <Ghost/> --><span>Hi</span><counter-component></counter-component></div>"
        );
        assert_eq!(
            collect_component_tags(src).into_iter().collect::<Vec<_>>(),
            vec!["Counter"]
        );
    }

    #[test]
    fn malformed_tags_stay_as_written() {
        let src = "<Broken attr=\"x\" <Fine></Fine>";
        assert_eq!(
            rewrite_tags(src, "Page", "App"),
            "<Broken attr=\"x\" <fine-component></fine-component>"
        );
    }

    #[test]
    fn root_and_conditional_tags_use_reserved_names() {
        let src = r#"<App></App><RenderIf condition="open"><p>x</p></RenderIf>"#;
        assert_eq!(
            rewrite_tags(src, "Page", "App"),
            r#"<piglet-root></piglet-root><render-if condition="open" host__element="Page__unsettled"><p>x</p></render-if>"#
        );
    }

    #[test]
    fn existing_host_marker_is_kept() {
        let src = r#"<RenderIf condition="a" host__element="Other__unsettled"/>"#;
        assert_eq!(
            rewrite_tags(src, "Page", "App"),
            r#"<render-if condition="a" host__element="Other__unsettled"></render-if>"#
        );
    }

    #[test]
    fn names_must_end_at_a_boundary() {
        let tags = scan_tags("<Card-x></Card-x><Card>");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].kind, TagKind::Open);
        assert_eq!(tags[0].span, 17..23);
    }
}
