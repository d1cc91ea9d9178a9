//! Core types for credential resolution

use crate::error::SecretError;
use crate::security::SecureString;
use std::fmt;

/// Default KV v2 mount used when a path does not name one
pub const DEFAULT_KV_MOUNT: &str = "secret";

/// Where a resolved credential came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    /// Read from the secret backend
    SecretStore,
    /// Literal password embedded in the configuration
    Fallback,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::SecretStore => write!(f, "from-secret-store"),
            Provenance::Fallback => write!(f, "from-fallback"),
        }
    }
}

/// A user name paired with its resolved password.
///
/// Lives only for the duration of one run; the password is zeroed on drop
/// and redacted in `Debug`.
#[derive(Debug, Clone)]
pub struct ResolvedCredential {
    pub username: String,
    pub password: SecureString,
    pub provenance: Provenance,
}

/// Non-interactive AppRole identity pair
#[derive(Debug, Clone)]
pub struct AppRoleCredentials {
    pub role_id: String,
    pub secret_id: SecureString,
}

impl AppRoleCredentials {
    pub fn new(role_id: impl Into<String>, secret_id: impl Into<SecureString>) -> Self {
        Self {
            role_id: role_id.into(),
            secret_id: secret_id.into(),
        }
    }
}

/// Authenticated session with the secret backend.
///
/// Obtained once per run and passed explicitly to every fetch.
#[derive(Debug, Clone)]
pub struct SecretSession {
    token: SecureString,
    /// Lease duration reported at login, in seconds
    pub lease_duration: u64,
    pub renewable: bool,
}

impl SecretSession {
    pub fn new(token: impl Into<SecureString>, lease_duration: u64, renewable: bool) -> Self {
        Self {
            token: token.into(),
            lease_duration,
            renewable,
        }
    }

    pub fn token(&self) -> &SecureString {
        &self.token
    }
}

/// A KV v2 location split into mount and path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretPath {
    pub mount: String,
    pub path: String,
}

impl SecretPath {
    /// Parse a configured path.
    ///
    /// `secret/data/minio/users` (the KV v2 API form) reads `minio/users`
    /// under mount `secret`. A path without a `data` segment is read under
    /// `default_mount`.
    pub fn parse(raw: &str, default_mount: &str) -> Result<Self, SecretError> {
        let trimmed = raw.trim().trim_matches('/');
        let segments: Vec<&str> = trimmed.split('/').collect();

        if trimmed.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return Err(SecretError::InvalidPath {
                path: raw.to_string(),
            });
        }

        if segments.len() >= 3 && segments[1] == "data" {
            return Ok(Self {
                mount: segments[0].to_string(),
                path: segments[2..].join("/"),
            });
        }

        Ok(Self {
            mount: default_mount.to_string(),
            path: trimmed.to_string(),
        })
    }
}

impl fmt::Display for SecretPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/data/{}", self.mount, self.path)
    }
}
