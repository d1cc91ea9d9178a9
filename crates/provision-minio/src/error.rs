//! Error types for MinIO provisioning

use thiserror::Error;

/// Classified failure of a single admin call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdminError {
    #[error("resource already exists")]
    AlreadyExists,

    #[error("policy already attached")]
    AlreadyAttached,

    #[error("policy does not exist")]
    PolicyNotFound,

    /// Any other failure; the message is already redacted
    #[error("{message}")]
    Backend { message: String },
}

impl AdminError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Failure to bring one entity to its desired state.
///
/// Scoped to that entity: the run records it and carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningError {
    #[error("Failed to ensure bucket '{name}': {message}")]
    Bucket { name: String, message: String },

    #[error("Failed to upload policy '{name}': {message}")]
    Policy { name: String, message: String },

    #[error("Failed to ensure user '{name}': {message}")]
    User { name: String, message: String },

    #[error("Policy '{policy}' does not exist on the server (binding for user '{user}')")]
    PolicyNotFound { user: String, policy: String },

    #[error("Failed to attach policy '{policy}' to user '{user}': {message}")]
    Binding {
        user: String,
        policy: String,
        message: String,
    },
}
