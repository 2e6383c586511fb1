// ============================================================================
// piglet - Constants
// Wire conventions shared by the compiler and the runtime, plus lifecycle flags
// ============================================================================

// =============================================================================
// ATTRIBUTE CONVENTIONS
// =============================================================================

/// Prefix of reactive attributes (`piglet.count="count"`).
pub const ATTRIBUTE_PREFIX: &str = "piglet.";

/// Host-binding marker attribute injected on conditional components.
pub const HOST_ATTRIBUTE: &str = "host__element";

/// Suffix marking a host-binding value that still names a class, not a key.
pub const UNSETTLED_SUFFIX: &str = "__unsettled";

/// Attribute a conditional component toggles to hide its content.
pub const HIDDEN_ATTRIBUTE: &str = "hidden";

/// Attribute holding the state path a conditional component evaluates.
pub const CONDITION_ATTRIBUTE: &str = "condition";

// =============================================================================
// RESERVED NAMES
// =============================================================================

/// Custom-element name reserved for the document root component.
pub const ROOT_TAG: &str = "piglet-root";

/// Source-level name of the conditional component.
pub const CONDITIONAL_COMPONENT: &str = "RenderIf";

/// Custom-element name of the conditional component.
pub const CONDITIONAL_TAG: &str = "render-if";

/// Suffix appended to single-word component names so they stay valid
/// custom-element names.
pub const SINGLE_WORD_SUFFIX: &str = "-component";

/// Sigil prefixing reactive identifiers in component scripts.
pub const SIGIL: char = '$';

/// Marker call that requests reference semantics (`$$(value)`).
pub const REF_MARKER: &str = "$$";

/// Sigil-prefixed globals that are never reactive.
pub const RESERVED_GLOBALS: &[&str] = &["$attrs", "$element", "$reason", "$root"];

/// Name of the component instance parameter inside emitted script modules.
pub const ELEMENT_PARAM: &str = "element";

// =============================================================================
// BUILD OUTPUT LAYOUT
// =============================================================================

/// Source file extension of single-file components.
pub const SOURCE_EXTENSION: &str = ".pig.html";

/// Output directory for HTML fragments.
pub const BUILT_HTML_DIR: &str = "builtHTML";

/// Output directory for transformed script modules.
pub const BUILT_SCRIPT_DIR: &str = "builtScript";

/// Output directory for class modules.
pub const BUILT_COMPONENTS_DIR: &str = "builtComponents";

// =============================================================================
// LIFECYCLE FLAGS
// =============================================================================

/// Component has been constructed and holds a key
pub const CONSTRUCTED: u32 = 1 << 0;

/// Component is attached to the live tree
pub const CONNECTED: u32 = 1 << 1;

/// Template content has been injected into the component's shadow root
pub const CONTENT_INJECTED: u32 = 1 << 2;

/// Component is waiting for its parent to mount
pub const MOUNT_PENDING: u32 = 1 << 3;

/// Component is mounted
pub const MOUNTED: u32 = 1 << 4;

/// Component has been removed; its callbacks are cleared
pub const UNMOUNTED: u32 = 1 << 5;

/// A deferred flush is queued for this component
pub const FLUSH_SCHEDULED: u32 = 1 << 6;

/// Mask of the mutually exclusive phase bits
pub const PHASE_MASK: u32 = MOUNT_PENDING | MOUNTED | UNMOUNTED;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_flags_are_distinct() {
        let flags = [
            CONSTRUCTED,
            CONNECTED,
            CONTENT_INJECTED,
            MOUNT_PENDING,
            MOUNTED,
            UNMOUNTED,
            FLUSH_SCHEDULED,
        ];
        for (i, a) in flags.iter().enumerate() {
            for b in &flags[i + 1..] {
                assert_eq!(a & b, 0);
            }
        }
        assert_eq!(PHASE_MASK & CONNECTED, 0);
    }

    #[test]
    fn reserved_globals_carry_the_sigil() {
        assert!(RESERVED_GLOBALS.iter().all(|g| g.starts_with(SIGIL)));
        assert!(ROOT_TAG.contains('-'));
        assert!(CONDITIONAL_TAG.contains('-'));
    }
}
