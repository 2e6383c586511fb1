// ============================================================================
// piglet - Template Compiler
// Splits a single-file component and builds its template body
// ============================================================================

use std::collections::BTreeSet;

use serde_json::Value;

use crate::compiler::markup::{collect_component_tags, rewrite_tags};
use crate::core::constants::CONDITIONAL_COMPONENT;
use crate::error::{CompileError, CompileResult};

// =============================================================================
// SECTIONS
// =============================================================================

/// Raw sections of one source file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sections<'a> {
    pub content: &'a str,
    pub style: Option<&'a str>,
    pub script: Option<&'a str>,
    pub description: Option<&'a str>,
}

/// Inner text and outer span of the first `<name>...</name>` block.
fn find_section<'a>(src: &'a str, name: &str) -> Option<(&'a str, std::ops::Range<usize>)> {
    let open = format!("<{name}");
    let close = format!("</{name}>");
    let mut from = 0;
    while let Some(start) = src[from..].find(&open).map(|i| from + i) {
        let after = start + open.len();
        match src.as_bytes().get(after) {
            Some(b'>' | b' ' | b'\t' | b'\n' | b'\r') => {
                let inner_start = after + src[after..].find('>')? + 1;
                let inner_end = inner_start + src[inner_start..].find(&close)?;
                return Some((&src[inner_start..inner_end], start..inner_end + close.len()));
            }
            _ => from = after,
        }
    }
    None
}

/// Split a source file into its sections.
///
/// `<content>` is located first; the other sections are searched only
/// outside it, so markup inside the content never shadows them.
pub fn split_sections<'a>(component: &str, src: &'a str) -> CompileResult<Sections<'a>> {
    let (content, span) = find_section(src, "content").ok_or_else(|| CompileError::MissingContent {
        component: component.to_string(),
    })?;
    let outside = |name: &str| {
        find_section(&src[..span.start], name)
            .or_else(|| find_section(&src[span.end..], name))
            .map(|(inner, _)| inner)
    };
    Ok(Sections {
        content,
        style: outside("style"),
        script: outside("script"),
        description: outside("description"),
    })
}

/// Parse the optional description block.
pub fn parse_description(component: &str, text: Option<&str>) -> CompileResult<Option<Value>> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    serde_json::from_str(text)
        .map(Some)
        .map_err(|source| CompileError::MalformedDescription {
            component: component.to_string(),
            source,
        })
}

// =============================================================================
// TEMPLATE
// =============================================================================

/// Compiled template of one component.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledTemplate {
    /// Stylesheet plus rewritten body, unescaped
    pub html: String,
    /// Component names referenced by the content, root included
    pub tags: BTreeSet<String>,
    pub description: Option<Value>,
}

impl CompiledTemplate {
    /// The template as the body of a JS template literal.
    pub fn escaped(&self) -> String {
        escape_template_literal(&self.html)
    }
}

pub struct TemplateCompiler<'a> {
    root: &'a str,
    known: Option<&'a BTreeSet<String>>,
}

impl<'a> TemplateCompiler<'a> {
    pub fn new(root: &'a str) -> Self {
        Self { root, known: None }
    }

    /// Reject references to components outside `known`.
    pub fn resolving(mut self, known: &'a BTreeSet<String>) -> Self {
        self.known = Some(known);
        self
    }

    pub fn compile(
        &self,
        component: &str,
        sections: &Sections<'_>,
        external_css: Option<&str>,
    ) -> CompileResult<CompiledTemplate> {
        let description = parse_description(component, sections.description)?;

        let mut tags = collect_component_tags(sections.content);
        if let Some(known) = self.known {
            let unresolved = tags
                .iter()
                .find(|tag| !self.is_builtin(tag) && !known.contains(tag.as_str()));
            if let Some(tag) = unresolved {
                return Err(CompileError::UnresolvedComponent {
                    component: component.to_string(),
                    tag: tag.clone(),
                });
            }
        }
        tags.insert(self.root.to_string());

        let body = rewrite_tags(sections.content.trim(), component, self.root);
        let css = merge_css(external_css, sections.style);
        let html = if css.is_empty() {
            body
        } else {
            format!("<style>{css}</style>{body}")
        };

        Ok(CompiledTemplate {
            html,
            tags,
            description,
        })
    }

    fn is_builtin(&self, tag: &str) -> bool {
        tag == self.root || tag == CONDITIONAL_COMPONENT
    }
}

/// External stylesheet first, then the inline one.
pub fn merge_css(external: Option<&str>, inline: Option<&str>) -> String {
    [external, inline]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|css| !css.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escape text for embedding between backticks.
pub fn escape_template_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            _ => out.push(c),
        }
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================
