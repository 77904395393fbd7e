//! Error types for the graph storage engine.

use thiserror::Error;

/// Core error type for `codeeagle_graph` operations.
#[derive(Error, Debug)]
pub enum GraphError {
    /// `GetNode`/`GetEdge`/`UpdateNode`/`DeleteNode`/`DeleteEdge` targeted a missing id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Serializing a node/edge value failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserializing a stored node/edge value failed.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// The underlying key-value store returned an error (open, read, write, iterate).
    #[error("backend error: {0}")]
    Backend(String),

    /// Malformed glob pattern, unknown NDJSON record kind, empty branch name, etc.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Reserved for future use; overwrites of existing nodes/edges are silent by design.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The operation's cancellation token fired before completion.
    #[error("operation cancelled: {0}")]
    Cancelled(String),
}

impl GraphError {
    /// Returns a short, user-facing recovery suggestion for this error, if one exists.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotFound(_) => {
                Some("Check the id and branch; it may have been deleted or never written.")
            }
            Self::Cancelled(_) => Some("Retry the operation with a fresh cancellation token."),
            Self::Backend(_) => Some("The embedded store may be locked or corrupted on disk."),
            Self::InvalidInput(_) => {
                Some("Check the pattern, branch name, or record shape passed to this call.")
            }
            _ => None,
        }
    }
}

/// Convenience `Result` type for `codeeagle_graph` operations.
pub type Result<T> = std::result::Result<T, GraphError>;
