// ============================================================================
// piglet - DOM Module
// In-process document model, fragment parsing and lifecycle-aware mutation
// ============================================================================

pub mod document;
pub mod fragment;
mod mutation;

pub use document::{Document, Node, NodeKind, DOCUMENT_NODE, VOID_ELEMENTS};
pub use fragment::{decode_entities, parse_fragment};
