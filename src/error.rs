//! Error types for the rowfs provider and the remote row service.

use thiserror::Error;

/// Failures reported by the remote row service.
///
/// These are propagated to callers unchanged; retry policy belongs to the
/// transport underneath the service, not to this crate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The service could not be reached or authenticated.
    #[error("failed to connect to row service: {0}")]
    Connect(String),

    /// A row query was rejected or failed mid-flight.
    #[error("row query failed: {0}")]
    Query(String),

    /// A row create or save was rejected.
    #[error("row mutation failed: {0}")]
    Mutation(String),

    /// The remote record set violates an invariant the tree builder relies on.
    #[error("corrupt remote data: {0}")]
    CorruptData(String),
}

/// Failure taxonomy of the file system provider.
///
/// `Clone` is required because the keyed async cache stores loader rejections
/// and replays them to later callers until the cache is cleared.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FsError {
    /// The path is absent from both maps, or the node at the path has the
    /// wrong kind for the requested operation.
    #[error("file not found: {0}")]
    NotFound(String),

    /// A create or copy targeted an occupied destination.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The operation is not supported by this provider.
    #[error("unimplemented: {0}")]
    Unimplemented(String),

    /// The underlying row service rejected a query or mutation.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl FsError {
    /// Convenience constructor used at lookup sites.
    pub fn not_found(path: impl Into<String>) -> Self {
        FsError::NotFound(path.into())
    }
}
