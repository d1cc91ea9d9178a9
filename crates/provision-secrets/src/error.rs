//! Error types for the secret backend
//!
//! Messages carry names and paths only. Values read from the backend and
//! the AppRole secret id never appear in them.

use thiserror::Error;

/// Failure to obtain a session from the secret backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Address or AppRole identity pair not provided
    #[error("Vault not configured ({0} required)")]
    NotConfigured(&'static str),

    /// Server is sealed
    #[error("Vault at {address} is sealed")]
    Sealed { address: String },

    /// Server is not initialized
    #[error("Vault at {address} is not initialized")]
    Uninitialized { address: String },

    /// The identity pair was rejected
    #[error("AppRole login rejected by Vault (HTTP {code})")]
    Rejected { code: u16 },

    /// Network failure or timeout
    #[error("Vault unreachable: {message}")]
    Unreachable { message: String },

    /// Any other client failure
    #[error("Vault client error: {message}")]
    Client { message: String },
}

/// Failure to fetch a secret under a valid session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecretError {
    /// Nothing stored at the path
    #[error("No secret at path '{path}'")]
    NotFound { path: String },

    /// Secret exists but lacks the field
    #[error("Key '{key}' not found in secret at path '{path}'")]
    KeyMissing { path: String, key: String },

    /// Field is not a non-empty string
    #[error("Key '{key}' in secret at path '{path}' is empty or not a string")]
    InvalidValue { path: String, key: String },

    /// Session expired or not allowed to read the path
    #[error("Access denied to secret at path '{path}' (session expired or insufficient policy)")]
    Forbidden { path: String },

    /// Malformed path in configuration
    #[error("Invalid secret path '{path}'")]
    InvalidPath { path: String },

    /// Network failure or other backend error
    #[error("Vault request for '{path}' failed: {message}")]
    Backend { path: String, message: String },
}
