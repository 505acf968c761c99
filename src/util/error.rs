//! Error types for the swarmgraph library.

use thiserror::Error;

/// Main error type for swarm subsystem operations.
///
/// Both variants are recoverable at the subsystem boundary: construction
/// reports failure, the scheduler leaves `instance_count == 0` and retries
/// on a later frame. Nothing here is fatal to the host process.
#[derive(Error, Debug)]
pub enum Error {
    /// Required name lookup failed: graph, node, template family, or shader.
    #[error("Resolution failed: {0}")]
    Resolution(String),

    /// GPU buffer/kernel allocation or compile failed.
    #[error("Resource creation failed: {0}")]
    ResourceCreation(String),
}

impl Error {
    /// Create a resolution error from a message.
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a resource creation error from a message.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::ResourceCreation(msg.into())
    }

    /// True if this error came from a name/shader lookup.
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolution(_))
    }
}

/// Result type alias for swarm subsystem operations.
pub type Result<T> = std::result::Result<T, Error>;
