// ============================================================================
// piglet - Literal Scanner
// Locates string, template and comment regions in component scripts
// ============================================================================
//
// Regular-expression literals are not recognized; a `/` that does not
// start a comment is ordinary code.
// ============================================================================

use std::ops::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiteralKind {
    Single,
    Double,
    Template,
    LineComment,
    BlockComment,
}

/// One literal or comment region, delimiters included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiteralSpan {
    pub kind: LiteralKind,
    pub span: Range<usize>,
    /// `${ ... }` holes of a template literal, braces excluded
    pub holes: Vec<Range<usize>>,
}

impl LiteralSpan {
    pub fn contains(&self, offset: usize) -> bool {
        self.span.contains(&offset)
    }

    /// The hole containing `range`, if any.
    pub fn hole_around(&self, range: &Range<usize>) -> Option<&Range<usize>> {
        self.holes
            .iter()
            .find(|hole| hole.start <= range.start && range.end <= hole.end)
    }
}

/// Every literal and comment region of `src`, in source order.
pub fn scan_literals(src: &str) -> Vec<LiteralSpan> {
    let bytes = src.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => {
                let kind = if bytes[i] == b'"' {
                    LiteralKind::Double
                } else {
                    LiteralKind::Single
                };
                let end = skip_quoted(bytes, i);
                spans.push(LiteralSpan {
                    kind,
                    span: i..end,
                    holes: Vec::new(),
                });
                i = end;
            }
            b'`' => {
                let (end, holes) = skip_template(bytes, i);
                spans.push(LiteralSpan {
                    kind: LiteralKind::Template,
                    span: i..end,
                    holes,
                });
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let end = src[i..].find('\n').map(|n| i + n).unwrap_or(bytes.len());
                spans.push(LiteralSpan {
                    kind: LiteralKind::LineComment,
                    span: i..end,
                    holes: Vec::new(),
                });
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = src[i + 2..]
                    .find("*/")
                    .map(|n| i + 2 + n + 2)
                    .unwrap_or(bytes.len());
                spans.push(LiteralSpan {
                    kind: LiteralKind::BlockComment,
                    span: i..end,
                    holes: Vec::new(),
                });
                i = end;
            }
            _ => i += 1,
        }
    }
    spans
}

/// End (exclusive) of the quoted string starting at `start`.
pub(crate) fn skip_quoted(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// End (exclusive) of the template literal starting at `start`, plus its holes.
pub(crate) fn skip_template(bytes: &[u8], start: usize) -> (usize, Vec<Range<usize>>) {
    let mut holes = Vec::new();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return (i + 1, holes),
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                let hole_start = i + 2;
                let hole_end = skip_hole(bytes, hole_start);
                holes.push(hole_start..hole_end);
                i = hole_end + 1;
            }
            _ => i += 1,
        }
    }
    (bytes.len(), holes)
}

/// Index of the `}` closing a hole whose expression starts at `start`.
fn skip_hole(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' if depth == 0 => return i,
            b'}' => depth -= 1,
            b'\'' | b'"' => {
                i = skip_quoted(bytes, i);
                continue;
            }
            b'`' => {
                i = skip_template(bytes, i).0;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}
