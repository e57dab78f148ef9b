//! Error types for rolemap

use thiserror::Error;

/// The main error type for rolemap operations
#[derive(Debug, Error)]
pub enum Error {
    /// The acting account lacks a required permission, or attempted a
    /// forbidden field assignment on the write path.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A target references a permission template that is not registered.
    #[error("unknown permission template '{0}'")]
    UnknownTemplate(String),

    /// A stored role or permission tag could not be decoded.
    #[error("invalid role or permission tag {0}")]
    InvalidRole(u8),

    /// Operation requested on an object in the wrong lifecycle state
    /// (not yet persisted, already deleted, or a reserved singleton).
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    /// A single target's mapping rebuild failed. Propagated from an
    /// individual save; caught and logged by bulk repair.
    #[error("mapping rebuild for {kind} {id} failed: {source}")]
    MappingRebuild {
        kind: &'static str,
        id: u64,
        #[source]
        source: Box<Error>,
    },

    #[error("bootstrap failed: {0}")]
    Bootstrap(String),

    #[error("storage: {0}")]
    Store(String),
}

/// Result type alias for rolemap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fold a storage-layer error into [`Error::Store`]
pub(crate) fn err<E: std::error::Error>(e: E) -> Error {
    Error::Store(e.to_string())
}
