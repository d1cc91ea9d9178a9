//! Credential resolution for minio-provision
//!
//! This crate provides:
//! - **Vault client**: AppRole login, KV v2 reads, token revocation
//! - **Resolution workflow**: secret store first, configuration fallback,
//!   a single authentication attempt per run
//! - **Security**: zeroize-on-drop strings and redaction of known secrets

pub mod backend;
pub mod error;
pub mod resolver;
pub mod security;
pub mod types;
pub mod vault;

pub use backend::SecretBackend;
pub use error::{AuthError, SecretError};
pub use resolver::{
    consults_secret_store, decide, CredentialPrecedence, CredentialResolver, DegradedUser,
    Resolution, ResolutionOutcome, SecretAttempt, SkippedUser,
};
pub use security::{redact, sanitize_error, SecureString};
pub use types::{AppRoleCredentials, Provenance, ResolvedCredential, SecretPath, SecretSession};
pub use vault::{VaultBackend, VaultConfig};
