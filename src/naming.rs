// ============================================================================
// piglet - Naming
// PascalCase component names to custom-element tag names
// ============================================================================

use crate::core::constants::{
    CONDITIONAL_COMPONENT, CONDITIONAL_TAG, ROOT_TAG, SINGLE_WORD_SUFFIX, SOURCE_EXTENSION,
};

/// Whether `name` looks like a component reference: PascalCase, ASCII
/// alphanumerics only, not ending in a digit. Keys append the instance
/// index to the name, so `Item1` would make `Item12` ambiguous.
pub fn is_component_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_alphanumeric())
        && !name.ends_with(|c: char| c.is_ascii_digit())
}

/// Kebab-case custom-element name for a component.
///
/// Acronyms stay together (`HTMLViewer` -> `html-viewer`). Single-word
/// names get a suffix so the result always contains a hyphen
/// (`Counter` -> `counter-component`).
pub fn tag_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase() || prev.is_ascii_digit() || (prev.is_ascii_uppercase() && next_is_lower) {
                out.push('-');
            }
        }
        out.push(c.to_ascii_lowercase());
    }
    if !out.contains('-') {
        out.push_str(SINGLE_WORD_SUFFIX);
    }
    out
}

/// Tag for a component in a build whose root component is `root`.
pub fn component_tag(name: &str, root: &str) -> String {
    if name == root {
        ROOT_TAG.to_string()
    } else if name == CONDITIONAL_COMPONENT {
        CONDITIONAL_TAG.to_string()
    } else {
        tag_name(name)
    }
}

/// Component name of a source file (`Counter.pig.html` -> `Counter`).
pub fn component_name_from_file(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(SOURCE_EXTENSION)
        .filter(|name| is_component_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_names() {
        assert_eq!(tag_name("MyWidget"), "my-widget");
        assert_eq!(tag_name("TodoListItem"), "todo-list-item");
        assert_eq!(tag_name("HTMLViewer"), "html-viewer");
        assert_eq!(tag_name("Page2Header"), "page2-header");
        assert_eq!(tag_name("Counter"), "counter-component");
        assert_eq!(tag_name("UI"), "ui-component");
    }

    #[test]
    fn reserved_tags() {
        assert_eq!(component_tag("App", "App"), "piglet-root");
        assert_eq!(component_tag("RenderIf", "App"), "render-if");
        assert_eq!(component_tag("NavBar", "App"), "nav-bar");
    }

    #[test]
    fn component_names() {
        assert!(is_component_name("Counter"));
        assert!(!is_component_name("counter"));
        assert!(!is_component_name("My-Widget"));
        assert!(!is_component_name(""));
        assert!(!is_component_name("Item1"));
        assert!(is_component_name("H1Title"));
        assert_eq!(component_name_from_file("NavBar.pig.html"), Some("NavBar"));
        assert_eq!(component_name_from_file("navbar.pig.html"), None);
        assert_eq!(component_name_from_file("NavBar.html"), None);
    }
}
