//! HashiCorp Vault secret backend (AppRole login, KV v2 reads)

use crate::backend::SecretBackend;
use crate::error::{AuthError, SecretError};
use crate::security::{redact, SecureString};
use crate::types::{AppRoleCredentials, SecretPath, SecretSession, DEFAULT_KV_MOUNT};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, info, warn};
use vaultrs::client::{Client, VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::{auth, kv2, token};

#[derive(Debug, Clone)]
pub struct VaultConfig {
    pub address: String,
    pub namespace: Option<String>,
    /// Mount of the AppRole auth method
    pub approle_mount: String,
    /// KV v2 mount for paths that do not name one
    pub kv_mount: String,
    pub timeout: Duration,
    pub insecure_skip_verify: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            namespace: None,
            approle_mount: "approle".to_string(),
            kv_mount: DEFAULT_KV_MOUNT.to_string(),
            timeout: Duration::from_secs(30),
            insecure_skip_verify: false,
        }
    }
}

impl VaultConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.address.trim().is_empty()
    }
}

/// Vault server state as reported by `/v1/sys/health`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HealthState {
    Ready,
    Sealed,
    Uninitialized,
}

pub struct VaultBackend {
    config: VaultConfig,
    http: reqwest::Client,
}

impl VaultBackend {
    /// Build the backend. Fails when the HTTP client cannot honour the
    /// timeout or TLS settings.
    pub fn with_config(config: VaultConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()
            .map_err(|e| AuthError::Client {
                message: e.to_string(),
            })?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Create a Vault client, optionally carrying a session token
    fn create_client(&self, token: Option<&SecureString>) -> Result<VaultClient, String> {
        let mut settings = VaultClientSettingsBuilder::default();
        settings.address(&self.config.address);
        settings.timeout(Some(self.config.timeout));

        if let Some(ns) = &self.config.namespace {
            settings.namespace(Some(ns.clone()));
        }

        if self.config.insecure_skip_verify {
            warn!("TLS verification disabled");
            settings.verify(false);
        }

        let settings = settings.build().map_err(|e| e.to_string())?;
        let mut client = VaultClient::new(settings).map_err(|e| e.to_string())?;
        if let Some(token) = token {
            client.set_token(token.as_str());
        }
        Ok(client)
    }

    async fn check_health(&self) -> Result<HealthState, AuthError> {
        let url = format!(
            "{}/v1/sys/health",
            self.config.address.trim_end_matches('/')
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AuthError::Unreachable {
                message: e.to_string(),
            })?;

        // 429 and 47x are standby variants, which still serve logins
        Ok(match response.status().as_u16() {
            501 => HealthState::Uninitialized,
            503 => HealthState::Sealed,
            _ => HealthState::Ready,
        })
    }
}

fn api_code(err: &ClientError) -> Option<u16> {
    match err {
        ClientError::APIError { code, .. } => Some(*code),
        _ => None,
    }
}

#[async_trait]
impl SecretBackend for VaultBackend {
    async fn authenticate(
        &self,
        credentials: &AppRoleCredentials,
    ) -> Result<SecretSession, AuthError> {
        if !self.config.is_configured() {
            return Err(AuthError::NotConfigured("VAULT_ADDR"));
        }
        if credentials.role_id.is_empty() || credentials.secret_id.is_empty() {
            return Err(AuthError::NotConfigured("VAULT_ROLE_ID and VAULT_SECRET_ID"));
        }

        match self.check_health().await? {
            HealthState::Sealed => {
                return Err(AuthError::Sealed {
                    address: self.config.address.clone(),
                })
            }
            HealthState::Uninitialized => {
                return Err(AuthError::Uninitialized {
                    address: self.config.address.clone(),
                })
            }
            HealthState::Ready => {}
        }

        let client = self
            .create_client(None)
            .map_err(|message| AuthError::Client { message })?;

        info!(address = %self.config.address, "Authenticating with Vault using AppRole");
        let auth_info = auth::approle::login(
            &client,
            &self.config.approle_mount,
            &credentials.role_id,
            credentials.secret_id.as_str(),
        )
        .await
        .map_err(|e| {
            let message = redact(&e.to_string(), &[credentials.secret_id.as_str()]);
            match api_code(&e) {
                Some(code) => AuthError::Rejected { code },
                None => AuthError::Unreachable { message },
            }
        })?;

        info!(
            lease_duration = auth_info.lease_duration,
            renewable = auth_info.renewable,
            "Authenticated with Vault"
        );
        Ok(SecretSession::new(
            auth_info.client_token,
            auth_info.lease_duration,
            auth_info.renewable,
        ))
    }

    async fn fetch_secret(
        &self,
        session: &SecretSession,
        path: &str,
        key: &str,
    ) -> Result<SecureString, SecretError> {
        let location = SecretPath::parse(path, &self.config.kv_mount)?;
        let client = self
            .create_client(Some(session.token()))
            .map_err(|message| SecretError::Backend {
                path: path.to_string(),
                message,
            })?;

        debug!("Reading secret from Vault: {}", location);
        let mut data: HashMap<String, serde_json::Value> =
            kv2::read(&client, &location.mount, &location.path)
                .await
                .map_err(|e| match api_code(&e) {
                    Some(404) => SecretError::NotFound {
                        path: path.to_string(),
                    },
                    Some(403) | Some(401) => SecretError::Forbidden {
                        path: path.to_string(),
                    },
                    _ => SecretError::Backend {
                        path: path.to_string(),
                        message: e.to_string(),
                    },
                })?;

        let value = data.remove(key).ok_or_else(|| SecretError::KeyMissing {
            path: path.to_string(),
            key: key.to_string(),
        })?;

        // Drop the rest of the secret before returning
        data.clear();

        match value {
            serde_json::Value::String(s) if !s.is_empty() => Ok(SecureString::new(s)),
            _ => Err(SecretError::InvalidValue {
                path: path.to_string(),
                key: key.to_string(),
            }),
        }
    }

    async fn write_secret(
        &self,
        session: &SecretSession,
        path: &str,
        values: &BTreeMap<String, SecureString>,
    ) -> Result<u64, SecretError> {
        let location = SecretPath::parse(path, &self.config.kv_mount)?;
        let client = self
            .create_client(Some(session.token()))
            .map_err(|message| SecretError::Backend {
                path: path.to_string(),
                message,
            })?;

        let data: BTreeMap<&str, &str> = values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();

        debug!(keys = data.len(), "Writing secret to Vault: {}", location);
        let metadata = kv2::set(&client, &location.mount, &location.path, &data)
            .await
            .map_err(|e| match api_code(&e) {
                Some(403) | Some(401) => SecretError::Forbidden {
                    path: path.to_string(),
                },
                _ => SecretError::Backend {
                    path: path.to_string(),
                    message: e.to_string(),
                },
            })?;

        info!(version = metadata.version, "Secret written to {}", location);
        Ok(metadata.version)
    }

    async fn revoke(&self, session: &SecretSession) -> Result<(), SecretError> {
        let client = self
            .create_client(Some(session.token()))
            .map_err(|message| SecretError::Backend {
                path: "auth/token/revoke-self".to_string(),
                message,
            })?;

        token::revoke_self(&client)
            .await
            .map_err(|e| SecretError::Backend {
                path: "auth/token/revoke-self".to_string(),
                message: e.to_string(),
            })?;

        info!("Vault token revoked");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "vault"
    }
}
