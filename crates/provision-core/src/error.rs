//! Error types for provision-core

use thiserror::Error;

/// Result type alias using provision-core's error type
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration errors. All of them are fatal and are raised before any
/// remote call is made.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: String },

    /// JSON parsing error
    #[error("Invalid JSON in configuration: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing required field
    #[error("Missing required field '{field}' in {context}")]
    MissingField { field: String, context: String },

    /// Invalid configuration content
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    /// A user has neither a secret-store path nor a literal password
    #[error("User '{user}' has neither a vault_path nor a password")]
    NoCredentialSource { user: String },

    /// A `${VAR}` placeholder could not be expanded
    #[error("Unresolved placeholder in user name '{value}': {message}")]
    Placeholder { value: String, message: String },

    /// A policy document file could not be read or parsed
    #[error("Policy document '{name}' ({path}): {message}")]
    PolicyDocument {
        name: String,
        path: String,
        message: String,
    },
}

impl ConfigError {
    /// Create a config not found error
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
            context: context.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a placeholder expansion error
    pub fn placeholder(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Placeholder {
            value: value.into(),
            message: message.into(),
        }
    }
}
