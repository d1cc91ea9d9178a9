//! Credential resolution workflow
//!
//! Resolves one password per configured user:
//! - Secret store first, configuration fallback second (or the reverse,
//!   see [`CredentialPrecedence`])
//! - At most one authentication attempt per run, shared by every user
//! - Users with no usable credential are skipped and reported, never fatal

use crate::backend::SecretBackend;
use crate::error::AuthError;
use crate::security::SecureString;
use crate::types::{AppRoleCredentials, Provenance, ResolvedCredential, SecretSession};
use provision_core::UserDescriptor;
use tracing::{debug, error, info, warn};

/// Which credential source wins when a user has both
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CredentialPrecedence {
    /// The secret store always wins when it can be read
    #[default]
    SecretStoreFirst,
    /// A literal configuration password wins and the secret store is not
    /// contacted for that user
    FallbackFirst,
}

/// Result of trying the secret store for one user
#[derive(Debug)]
pub enum SecretAttempt {
    /// The secret store was not consulted
    NotAttempted,
    Fetched(SecureString),
    /// Authentication or fetch failed; carries a value-free reason
    Failed(String),
}

/// Outcome of resolving one user
#[derive(Debug)]
pub enum ResolutionOutcome {
    Resolved {
        credential: ResolvedCredential,
        /// Why the fallback was used, when it replaced a failed secret read
        degraded: Option<String>,
    },
    Failed {
        username: String,
        reason: String,
    },
}

/// A user resolved from the fallback after a secret-store failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegradedUser {
    pub username: String,
    pub reason: String,
}

/// A user that could not be resolved and will not be provisioned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedUser {
    pub username: String,
    pub reason: String,
}

/// Aggregated outcome of resolving every user
#[derive(Debug, Default)]
pub struct Resolution {
    pub credentials: Vec<ResolvedCredential>,
    pub degraded: Vec<DegradedUser>,
    pub skipped: Vec<SkippedUser>,
}

impl Resolution {
    pub fn credential(&self, username: &str) -> Option<&ResolvedCredential> {
        self.credentials.iter().find(|c| c.username == username)
    }
}

/// Whether the secret store should be consulted for `user`
pub fn consults_secret_store(user: &UserDescriptor, precedence: CredentialPrecedence) -> bool {
    match precedence {
        CredentialPrecedence::SecretStoreFirst => user.vault_path.is_some(),
        CredentialPrecedence::FallbackFirst => {
            user.vault_path.is_some() && user.password.is_none()
        }
    }
}

/// Fallback policy: turn a secret-store attempt into an outcome.
///
/// A fetched secret always wins. Otherwise the literal password is used if
/// present, and the user fails if it is not.
pub fn decide(user: &UserDescriptor, attempt: SecretAttempt) -> ResolutionOutcome {
    let fallback = |degraded: Option<String>| match &user.password {
        Some(password) => ResolutionOutcome::Resolved {
            credential: ResolvedCredential {
                username: user.name.clone(),
                password: SecureString::new(password.clone()),
                provenance: Provenance::Fallback,
            },
            degraded,
        },
        None => ResolutionOutcome::Failed {
            username: user.name.clone(),
            reason: degraded.unwrap_or_else(|| "no vault_path or password configured".into()),
        },
    };

    match attempt {
        SecretAttempt::Fetched(password) => ResolutionOutcome::Resolved {
            credential: ResolvedCredential {
                username: user.name.clone(),
                password,
                provenance: Provenance::SecretStore,
            },
            degraded: None,
        },
        SecretAttempt::Failed(reason) => fallback(Some(reason)),
        SecretAttempt::NotAttempted => fallback(None),
    }
}

enum SessionState {
    NotAttempted,
    Active(SecretSession),
    Failed(AuthError),
}

/// Resolves user credentials against one secret backend.
///
/// Owns the backend session for the whole run; call [`finish`] to revoke it.
///
/// [`finish`]: CredentialResolver::finish
pub struct CredentialResolver<'a> {
    backend: &'a dyn SecretBackend,
    credentials: Option<AppRoleCredentials>,
    precedence: CredentialPrecedence,
    session: SessionState,
}

impl<'a> CredentialResolver<'a> {
    pub fn new(
        backend: &'a dyn SecretBackend,
        credentials: Option<AppRoleCredentials>,
        precedence: CredentialPrecedence,
    ) -> Self {
        Self {
            backend,
            credentials,
            precedence,
            session: SessionState::NotAttempted,
        }
    }

    /// The session, authenticating on first use only
    async fn session(&mut self) -> Result<&SecretSession, AuthError> {
        if matches!(self.session, SessionState::NotAttempted) {
            let result = match &self.credentials {
                Some(credentials) => self.backend.authenticate(credentials).await,
                None => Err(AuthError::NotConfigured("VAULT_ROLE_ID and VAULT_SECRET_ID")),
            };

            self.session = match result {
                Ok(session) => SessionState::Active(session),
                Err(e) => {
                    warn!(
                        backend = self.backend.name(),
                        error = %e,
                        "Secret backend authentication failed, falling back to configuration passwords"
                    );
                    SessionState::Failed(e)
                }
            };
        }

        match &self.session {
            SessionState::Active(session) => Ok(session),
            SessionState::Failed(e) => Err(e.clone()),
            SessionState::NotAttempted => Err(AuthError::Client {
                message: "authentication was not attempted".to_string(),
            }),
        }
    }

    async fn attempt(&mut self, user: &UserDescriptor) -> SecretAttempt {
        let Some(path) = user.vault_path.as_deref() else {
            return SecretAttempt::NotAttempted;
        };
        if !consults_secret_store(user, self.precedence) {
            debug!(user = %user.name, "Configuration password takes precedence");
            return SecretAttempt::NotAttempted;
        }

        let backend = self.backend;
        let session = match self.session().await {
            Ok(session) => session,
            Err(e) => return SecretAttempt::Failed(e.to_string()),
        };

        match backend.fetch_secret(session, path, user.secret_key()).await {
            Ok(password) => SecretAttempt::Fetched(password),
            Err(e) => SecretAttempt::Failed(e.to_string()),
        }
    }

    /// Resolve one user
    pub async fn resolve(&mut self, user: &UserDescriptor) -> ResolutionOutcome {
        let attempt = self.attempt(user).await;
        let outcome = decide(user, attempt);

        match &outcome {
            ResolutionOutcome::Resolved {
                credential,
                degraded: Some(reason),
            } => warn!(
                user = %credential.username,
                reason = %reason,
                "Secret store unavailable for user, using configuration fallback password"
            ),
            ResolutionOutcome::Resolved { credential, .. } => info!(
                user = %credential.username,
                provenance = %credential.provenance,
                "Resolved credential"
            ),
            ResolutionOutcome::Failed { username, reason } => error!(
                user = %username,
                reason = %reason,
                "No credential available, user will be skipped"
            ),
        }

        outcome
    }

    /// Resolve every user in order
    pub async fn resolve_all(&mut self, users: &[UserDescriptor]) -> Resolution {
        let mut resolution = Resolution::default();

        for user in users {
            match self.resolve(user).await {
                ResolutionOutcome::Resolved {
                    credential,
                    degraded,
                } => {
                    if let Some(reason) = degraded {
                        resolution.degraded.push(DegradedUser {
                            username: credential.username.clone(),
                            reason,
                        });
                    }
                    resolution.credentials.push(credential);
                }
                ResolutionOutcome::Failed { username, reason } => {
                    resolution.skipped.push(SkippedUser { username, reason });
                }
            }
        }

        resolution
    }

    /// Whether a session was obtained during this run
    pub fn is_authenticated(&self) -> bool {
        matches!(self.session, SessionState::Active(_))
    }

    /// Revoke the session, if any. Failures are logged, never returned.
    pub async fn finish(self) {
        if let SessionState::Active(session) = self.session {
            if let Err(e) = self.backend.revoke(&session).await {
                warn!(error = %e, "Error revoking secret backend token");
            }
        }
    }
}
