//! Error types for the core library.

use thiserror::Error;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
///
/// Stale or duplicate migration ranges are not errors; the locator ignores
/// them. An empty ring is not an error either, lookups return `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A node address could not be parsed.
    #[error("invalid node address: {0}")]
    InvalidNode(String),
    /// Locator configuration was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The client's view of the ring drifted from what the update assumed.
    ///
    /// This is not recoverable: the locator no longer matches the cluster.
    #[error("ring invariant violated: {0}")]
    Invariant(String),
}

impl Error {
    /// True for errors that mean the ring state can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Invariant(_))
    }
}
