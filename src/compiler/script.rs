// ============================================================================
// piglet - Script Transformer
// Import hoisting and reactive identifier rewriting for component scripts
// ============================================================================
//
// Passes, in order:
//
//   1. imports are lifted out of the body, rewritten and deduplicated
//   2. bare `$name` usages become `$name.value`
//   3. `let $name = expr` becomes `const $name = element.state("name", expr)`
//   4. `let $a, $b` becomes one `element.state("a")` registration per name
//
// Everything is a text rewrite. String and comment regions are left alone,
// except that a template hole holding exactly one reactive identifier
// (`${$count}`) is still qualified. Running the transform on its own
// output changes nothing: declarations are `const` by then and every usage
// already reads `.value`.
// ============================================================================

use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::compiler::config::CompilerConfig;
use crate::compiler::literals::{LiteralKind, LiteralSpan, scan_literals, skip_quoted, skip_template};
use crate::core::constants::{ELEMENT_PARAM, REF_MARKER, RESERVED_GLOBALS, SIGIL, SOURCE_EXTENSION};

static SIGIL_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$[A-Za-z_][A-Za-z0-9_]*").expect("identifier pattern is valid"));

static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:let|const|var)\s+(\$[A-Za-z_][A-Za-z0-9_]*(?:\s*,\s*\$[A-Za-z_][A-Za-z0-9_]*)*)")
        .expect("declaration pattern is valid")
});

static LET_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\blet\s+(\$[A-Za-z_][A-Za-z0-9_]*)\s*=([^=]|$)").expect("assignment pattern is valid")
});

static LET_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([ \t]*)let\s+(\$[A-Za-z_][A-Za-z0-9_]*(?:\s*,\s*\$[A-Za-z_][A-Za-z0-9_]*)*)[ \t]*;?[ \t]*$")
        .expect("declaration list pattern is valid")
});

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s+(?:([^;'"]*?)\s*from\s*)?(['"])([^'"\n]+)['"][ \t]*;?[ \t]*\r?\n?"#)
        .expect("import pattern is valid")
});

// =============================================================================
// OUTPUT
// =============================================================================

/// A transformed script: hoisted imports plus the rewritten body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransformedScript {
    pub imports: Vec<String>,
    pub body: String,
}

impl TransformedScript {
    /// Imports, a blank line, then the body.
    pub fn render(&self) -> String {
        if self.imports.is_empty() {
            return self.body.clone();
        }
        format!("{}\n\n{}", self.imports.join("\n"), self.body)
    }
}

// =============================================================================
// TRANSFORMER
// =============================================================================

pub struct ScriptTransformer<'a> {
    config: &'a CompilerConfig,
}

impl<'a> ScriptTransformer<'a> {
    pub fn new(config: &'a CompilerConfig) -> Self {
        Self { config }
    }

    pub fn transform(&self, script: &str) -> TransformedScript {
        let (imports, body) = hoist_imports(script, self.config);
        let body = qualify_usages(&body);
        let body = rewrite_assignments(&body);
        let body = expand_declaration_lists(&body);
        TransformedScript {
            imports,
            body: body.trim().to_string(),
        }
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn literal_at(literals: &[LiteralSpan], offset: usize) -> Option<&LiteralSpan> {
    literals.iter().find(|l| l.contains(offset))
}

fn bare_name(ident: &str) -> &str {
    ident.strip_prefix(SIGIL).unwrap_or(ident)
}

// =============================================================================
// IMPORTS
// =============================================================================

/// Public specifier for an import of a component script or aliased module.
pub fn rewrite_specifier(specifier: &str, config: &CompilerConfig) -> String {
    if let Some(stem) = specifier.strip_suffix(SOURCE_EXTENSION) {
        let name = stem.rsplit('/').next().unwrap_or(stem);
        return format!("/component/{name}");
    }
    config
        .resolve_alias(specifier)
        .unwrap_or_else(|| specifier.to_string())
}

/// Remove top-level import statements from `src`. Returns the rewritten,
/// deduplicated statements in first-seen order and the remaining text.
pub fn hoist_imports(src: &str, config: &CompilerConfig) -> (Vec<String>, String) {
    let literals = scan_literals(src);
    let mut imports: Vec<String> = Vec::new();
    let mut body = String::with_capacity(src.len());
    let mut last = 0;

    for caps in IMPORT.captures_iter(src) {
        let Some(whole) = caps.get(0) else { continue };
        let keyword = whole.start() + whole.as_str().len() - whole.as_str().trim_start().len();
        if literal_at(&literals, keyword).is_some() {
            continue;
        }
        let quote = &caps[2];
        let specifier = rewrite_specifier(&caps[3], config);
        let statement = match caps.get(1).map(|m| m.as_str().trim()) {
            Some(clause) if !clause.is_empty() => {
                format!("import {clause} from {quote}{specifier}{quote};")
            }
            _ => format!("import {quote}{specifier}{quote};"),
        };
        if !imports.contains(&statement) {
            imports.push(statement);
        }
        body.push_str(&src[last..whole.start()]);
        last = whole.end();
    }
    body.push_str(&src[last..]);
    (imports, body)
}

// =============================================================================
// AUTO-QUALIFICATION
// =============================================================================

/// Spans of every sigil name introduced by a `let`/`const`/`var`.
pub fn declaration_spans(src: &str, literals: &[LiteralSpan]) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    for caps in DECLARATION.captures_iter(src) {
        let Some(list) = caps.get(1) else { continue };
        if literal_at(literals, list.start()).is_some() {
            continue;
        }
        for name in SIGIL_IDENT.find_iter(list.as_str()) {
            spans.push(list.start() + name.start()..list.start() + name.end());
        }
    }
    spans
}

/// Rewrite every bare reactive usage to its `.value` form.
pub fn qualify_usages(src: &str) -> String {
    let literals = scan_literals(src);
    let declarations = declaration_spans(src, &literals);
    let mut out = String::with_capacity(src.len() + 32);
    let mut last = 0;

    for usage in SIGIL_IDENT.find_iter(src) {
        let range = usage.range();
        if !is_bare_usage(src, &range, &literals, &declarations) {
            continue;
        }
        out.push_str(&src[last..range.end]);
        out.push_str(".value");
        last = range.end;
    }
    out.push_str(&src[last..]);
    out
}

fn is_bare_usage(
    src: &str,
    range: &Range<usize>,
    literals: &[LiteralSpan],
    declarations: &[Range<usize>],
) -> bool {
    let bytes = src.as_bytes();
    let ident = &src[range.clone()];

    if range.start > 0 {
        let prev = bytes[range.start - 1];
        let member = prev == b'.' && !src[..range.start].ends_with("...");
        if is_ident_byte(prev) || prev == b'$' || member {
            return false;
        }
    }
    if RESERVED_GLOBALS.contains(&ident) {
        return false;
    }
    if declarations
        .iter()
        .any(|d| d.start < range.end && range.start < d.end)
    {
        return false;
    }
    if src[range.end..].starts_with(".value")
        && !bytes.get(range.end + ".value".len()).copied().is_some_and(is_ident_byte)
    {
        return false;
    }
    match literal_at(literals, range.start) {
        None => true,
        Some(literal) => {
            literal.kind == LiteralKind::Template
                && literal
                    .hole_around(range)
                    .is_some_and(|hole| src[hole.clone()].trim() == ident)
        }
    }
}

// =============================================================================
// DECLARATIONS
// =============================================================================

/// End of the initializer starting at `from`: the first `;` or newline
/// outside brackets and literals. Returns (expression end, consumed end).
fn initializer_end(bytes: &[u8], from: usize) -> (usize, usize) {
    let mut depth = 0usize;
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' if depth == 0 => return (i, i),
            b')' | b']' | b'}' => depth -= 1,
            b'\'' | b'"' => {
                i = skip_quoted(bytes, i);
                continue;
            }
            b'`' => {
                i = skip_template(bytes, i).0;
                continue;
            }
            b';' if depth == 0 => return (i, i + 1),
            b'\n' if depth == 0 => return (i, i),
            _ => {}
        }
        i += 1;
    }
    (bytes.len(), bytes.len())
}

/// Inner expression of `$$(inner)` when the marker wraps the whole initializer.
fn unwrap_ref_marker(expr: &str) -> Option<&str> {
    let inner = expr
        .strip_prefix(REF_MARKER)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')?;
    let mut depth = 0i32;
    for b in inner.bytes() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner.trim())
}

fn state_call(ident: &str, args: &str) -> String {
    let name = bare_name(ident);
    if args.is_empty() {
        format!("const {ident} = {ELEMENT_PARAM}.state(\"{name}\");")
    } else {
        format!("const {ident} = {ELEMENT_PARAM}.state(\"{name}\", {args});")
    }
}

/// `let $x = expr` -> `const $x = element.state("x", expr);`, with
/// `$$(expr)` passing `expr, true` for reference semantics.
pub fn rewrite_assignments(src: &str) -> String {
    let literals = scan_literals(src);
    let bytes = src.as_bytes();
    let mut out = String::with_capacity(src.len() + 64);
    let mut last = 0;

    for caps in LET_ASSIGNMENT.captures_iter(src) {
        let (Some(whole), Some(ident)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() < last || literal_at(&literals, whole.start()).is_some() {
            continue;
        }
        // the pattern consumed one byte past `=` to rule out `==`
        let init_start = whole.end() - caps.get(2).map_or(0, |m| m.len());
        let (expr_end, consumed) = initializer_end(bytes, init_start);
        let expr = src[init_start..expr_end].trim();
        let args = match unwrap_ref_marker(expr) {
            Some(inner) => format!("{inner}, true"),
            None => expr.to_string(),
        };

        out.push_str(&src[last..whole.start()]);
        out.push_str(&state_call(ident.as_str(), &args));
        last = consumed;
    }
    out.push_str(&src[last..]);
    out
}

/// `let $a, $b;` -> one registration per name, on its own line.
pub fn expand_declaration_lists(src: &str) -> String {
    let literals = scan_literals(src);
    LET_LIST
        .replace_all(src, |caps: &Captures<'_>| {
            let whole = &caps[0];
            let start = caps.get(0).map_or(0, |m| m.start());
            if literal_at(&literals, start).is_some() {
                return whole.to_string();
            }
            let indent = &caps[1];
            SIGIL_IDENT
                .find_iter(&caps[2])
                .map(|name| format!("{indent}{}", state_call(name.as_str(), "")))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .into_owned()
}

// =============================================================================
// TESTS
// =============================================================================
