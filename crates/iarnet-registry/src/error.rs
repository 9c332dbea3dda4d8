//! Error types for registry operations.

use thiserror::Error;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur while mutating or querying the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("domain not found: {0}")]
    DomainNotFound(String),

    #[error("domain already exists: {0}")]
    DomainAlreadyExists(String),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("node already exists: {0}")]
    NodeAlreadyExists(String),

    #[error("node {node} not in domain {domain}")]
    NodeNotInDomain { node: String, domain: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] iarnet_persist::PersistError),
}

impl RegistryError {
    /// Whether this error means the referenced entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::DomainNotFound(_) | RegistryError::NodeNotFound(_)
        )
    }
}
