//! Seed MinIO user passwords into Vault, so a later provisioning run can
//! read them

use anyhow::{bail, Context, Result};
use provision_secrets::{AppRoleCredentials, SecretBackend, SecretSession, SecureString};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Where provisioning looks for user passwords unless configured otherwise
pub const DEFAULT_USERS_PATH: &str = "secret/data/minio/users";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub path: String,
    pub version: u64,
    /// Users whose stored password was read back and matched
    pub verified: Vec<String>,
}

/// Log in, write every password to `path` in one secret, read each back,
/// then revoke the session.
///
/// The session is revoked even when the write or the read-back fails.
pub async fn seed_secrets(
    backend: &dyn SecretBackend,
    approle: &AppRoleCredentials,
    path: &str,
    passwords: &BTreeMap<String, SecureString>,
) -> Result<SeedReport> {
    if passwords.is_empty() {
        bail!("No users to seed");
    }
    for (user, password) in passwords {
        if user.trim().is_empty() {
            bail!("Empty user name");
        }
        if password.is_empty() {
            bail!("Empty password provided for {}", user);
        }
    }

    let session = backend
        .authenticate(approle)
        .await
        .with_context(|| format!("Failed to log in to {}", backend.name()))?;

    let result = write_and_verify(backend, &session, path, passwords).await;

    if let Err(e) = backend.revoke(&session).await {
        warn!(error = %e, "Failed to revoke session token");
    }
    result
}

async fn write_and_verify(
    backend: &dyn SecretBackend,
    session: &SecretSession,
    path: &str,
    passwords: &BTreeMap<String, SecureString>,
) -> Result<SeedReport> {
    let version = backend
        .write_secret(session, path, passwords)
        .await
        .with_context(|| format!("Failed to store passwords at {}", path))?;
    info!(path = %path, version, users = passwords.len(), "Passwords stored");

    let mut verified = Vec::with_capacity(passwords.len());
    for (user, expected) in passwords {
        let stored = backend
            .fetch_secret(session, path, user)
            .await
            .with_context(|| format!("Failed to read back the password for {}", user))?;
        if stored.as_str() != expected.as_str() {
            bail!("Stored password for {} does not match", user);
        }
        verified.push(user.clone());
    }

    Ok(SeedReport {
        path: path.to_string(),
        version,
        verified,
    })
}
