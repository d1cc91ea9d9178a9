//! Secret backend trait

use crate::error::{AuthError, SecretError};
use crate::security::SecureString;
use crate::types::{AppRoleCredentials, SecretSession};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Client for a secret-management backend.
///
/// Implementations never retry: every failure is surfaced immediately and
/// the caller owns the fallback policy.
#[async_trait]
pub trait SecretBackend: Send + Sync {
    /// Exchange the AppRole identity pair for a session.
    ///
    /// A successful login may consume a one-time-use `secret_id`, so
    /// callers must not assume this is idempotent.
    async fn authenticate(
        &self,
        credentials: &AppRoleCredentials,
    ) -> Result<SecretSession, AuthError>;

    /// Read `key` from the secret stored at `path`
    async fn fetch_secret(
        &self,
        session: &SecretSession,
        path: &str,
        key: &str,
    ) -> Result<SecureString, SecretError>;

    /// Create or replace the secret at `path` with `values`, returning the
    /// new version. Read-only backends keep the default.
    async fn write_secret(
        &self,
        _session: &SecretSession,
        path: &str,
        _values: &BTreeMap<String, SecureString>,
    ) -> Result<u64, SecretError> {
        Err(SecretError::Backend {
            path: path.to_string(),
            message: format!("{} backend is read-only", self.name()),
        })
    }

    /// Revoke the session token. Best effort.
    async fn revoke(&self, session: &SecretSession) -> Result<(), SecretError>;

    /// Backend name for diagnostics
    fn name(&self) -> &'static str;
}
