// ============================================================================
// piglet - Errors
// Build-time and runtime error taxonomies
// ============================================================================
//
// Nothing here is fatal to the process. Build errors skip one file,
// runtime errors degrade to logging plus best-effort continuation.
// ============================================================================

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// BUILD-TIME
// =============================================================================

/// Per-file compile failure. The build logs it and moves on to the next file.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{component}: missing <content> section")]
    MissingContent { component: String },

    #[error("{component}: unresolvable component reference <{tag}>")]
    UnresolvedComponent { component: String, tag: String },

    #[error("{component}: malformed <description> block: {source}")]
    MalformedDescription {
        component: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid component name {0:?}")]
    InvalidComponentName(String),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid compiler config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CompileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CompileError::Io {
            path: path.into(),
            source,
        }
    }
}

// =============================================================================
// RUNTIME
// =============================================================================

/// Recoverable runtime failure.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("no component module registered for <{0}>")]
    UnknownComponent(String),

    #[error("node {0} is not an element")]
    NotAnElement(usize),

    #[error("node {0} does not exist")]
    UnknownNode(usize),

    #[error("malformed hot-reload message: {0}")]
    MalformedMessage(#[from] serde_json::Error),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type CompileResult<T> = Result<T, CompileError>;
pub type RuntimeResult<T> = Result<T, RuntimeError>;
