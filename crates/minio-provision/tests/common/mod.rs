//! Shared test utilities for minio-provision integration tests
//!
//! Recording fakes for both backends, configuration fixtures, and a log
//! capture for checking what reached the tracing output.

#![allow(dead_code)]

use async_trait::async_trait;
use camino::Utf8PathBuf;
use provision_core::PolicyDocument;
use provision_minio::{AdminError, ObjectStoreAdmin};
use provision_secrets::{
    AppRoleCredentials, AuthError, SecretBackend, SecretError, SecretSession, SecureString,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing_subscriber::fmt::MakeWriter;

pub const SESSION_TOKEN: &str = "hvs.fake-session-token";

/// Record of one secret backend call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VaultCall {
    Authenticate,
    Fetch { path: String, key: String },
    Write { path: String, keys: Vec<String> },
    Revoke,
}

/// In-memory secret backend
#[derive(Default)]
pub struct FakeVault {
    auth_error: Option<AuthError>,
    secrets: Mutex<HashMap<(String, String), String>>,
    /// Writes succeed but are not stored
    drops_writes: bool,
    calls: Arc<Mutex<Vec<VaultCall>>>,
}

impl FakeVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(self, path: &str, key: &str, value: &str) -> Self {
        self.secrets
            .lock()
            .unwrap()
            .insert((path.to_string(), key.to_string()), value.to_string());
        self
    }

    /// Accept writes without storing them, so read-back sees stale values
    pub fn dropping_writes(mut self) -> Self {
        self.drops_writes = true;
        self
    }

    pub fn stored(&self, path: &str, key: &str) -> Option<String> {
        self.secrets
            .lock()
            .unwrap()
            .get(&(path.to_string(), key.to_string()))
            .cloned()
    }

    /// Every login attempt fails with `error`
    pub fn failing_auth(mut self, error: AuthError) -> Self {
        self.auth_error = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<VaultCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn auth_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == VaultCall::Authenticate)
            .count()
    }
}

#[async_trait]
impl SecretBackend for FakeVault {
    async fn authenticate(
        &self,
        _credentials: &AppRoleCredentials,
    ) -> Result<SecretSession, AuthError> {
        self.calls.lock().unwrap().push(VaultCall::Authenticate);
        match &self.auth_error {
            Some(e) => Err(e.clone()),
            None => Ok(SecretSession::new(SESSION_TOKEN, 3600, true)),
        }
    }

    async fn fetch_secret(
        &self,
        session: &SecretSession,
        path: &str,
        key: &str,
    ) -> Result<SecureString, SecretError> {
        self.calls.lock().unwrap().push(VaultCall::Fetch {
            path: path.to_string(),
            key: key.to_string(),
        });
        if session.token().as_str() != SESSION_TOKEN {
            return Err(SecretError::Forbidden {
                path: path.to_string(),
            });
        }
        self.secrets
            .lock()
            .unwrap()
            .get(&(path.to_string(), key.to_string()))
            .map(|v| SecureString::from(v.as_str()))
            .ok_or_else(|| SecretError::KeyMissing {
                path: path.to_string(),
                key: key.to_string(),
            })
    }

    async fn write_secret(
        &self,
        session: &SecretSession,
        path: &str,
        values: &BTreeMap<String, SecureString>,
    ) -> Result<u64, SecretError> {
        self.calls.lock().unwrap().push(VaultCall::Write {
            path: path.to_string(),
            keys: values.keys().cloned().collect(),
        });
        if session.token().as_str() != SESSION_TOKEN {
            return Err(SecretError::Forbidden {
                path: path.to_string(),
            });
        }
        if !self.drops_writes {
            let mut secrets = self.secrets.lock().unwrap();
            for (key, value) in values {
                secrets.insert((path.to_string(), key.clone()), value.as_str().to_string());
            }
        }
        Ok(2)
    }

    async fn revoke(&self, _session: &SecretSession) -> Result<(), SecretError> {
        self.calls.lock().unwrap().push(VaultCall::Revoke);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake-vault"
    }
}

/// In-memory object store with a call log
#[derive(Default)]
pub struct FakeObjectStore {
    pub buckets: Mutex<BTreeSet<String>>,
    /// Policies present on the server
    pub policies: Mutex<BTreeSet<String>>,
    /// User name to password
    pub users: Mutex<BTreeMap<String, String>>,
    pub bindings: Mutex<BTreeSet<(String, String)>>,
    calls: Mutex<Vec<String>>,
    /// Buckets whose creation is denied
    denied_buckets: BTreeSet<String>,
}

impl FakeObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Server that already has `policy` (e.g. a built-in canned policy)
    pub fn with_policy(self, policy: &str) -> Self {
        self.policies.lock().unwrap().insert(policy.to_string());
        self
    }

    pub fn denying_bucket(mut self, name: &str) -> Self {
        self.denied_buckets.insert(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn password_of(&self, user: &str) -> Option<String> {
        self.users.lock().unwrap().get(user).cloned()
    }

    pub fn bucket_names(&self) -> Vec<String> {
        self.buckets.lock().unwrap().iter().cloned().collect()
    }

    pub fn has_binding(&self, user: &str, policy: &str) -> bool {
        self.bindings
            .lock()
            .unwrap()
            .contains(&(user.to_string(), policy.to_string()))
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ObjectStoreAdmin for FakeObjectStore {
    async fn bucket_exists(&self, name: &str) -> Result<bool, AdminError> {
        self.record(format!("bucket_exists {}", name));
        Ok(self.buckets.lock().unwrap().contains(name))
    }

    async fn make_bucket(&self, name: &str) -> Result<(), AdminError> {
        self.record(format!("make_bucket {}", name));
        if self.denied_buckets.contains(name) {
            return Err(AdminError::backend("Access Denied."));
        }
        if !self.buckets.lock().unwrap().insert(name.to_string()) {
            return Err(AdminError::AlreadyExists);
        }
        Ok(())
    }

    async fn add_policy(&self, policy: &PolicyDocument) -> Result<(), AdminError> {
        self.record(format!("add_policy {}", policy.name));
        self.policies.lock().unwrap().insert(policy.name.clone());
        Ok(())
    }

    async fn policy_exists(&self, name: &str) -> Result<bool, AdminError> {
        self.record(format!("policy_exists {}", name));
        Ok(self.policies.lock().unwrap().contains(name))
    }

    async fn add_user(&self, name: &str, password: &SecureString) -> Result<(), AdminError> {
        self.record(format!("add_user {}", name));
        self.users
            .lock()
            .unwrap()
            .insert(name.to_string(), password.as_str().to_string());
        Ok(())
    }

    async fn attach_policy(&self, user: &str, policy: &str) -> Result<(), AdminError> {
        self.record(format!("attach_policy {} {}", user, policy));
        if !self.policies.lock().unwrap().contains(policy) {
            return Err(AdminError::PolicyNotFound);
        }
        if !self
            .bindings
            .lock()
            .unwrap()
            .insert((user.to_string(), policy.to_string()))
        {
            return Err(AdminError::AlreadyAttached);
        }
        Ok(())
    }
}

pub fn approle() -> Option<AppRoleCredentials> {
    Some(AppRoleCredentials::new("provision-role", "approle-secret-id"))
}

/// Write `config.json` (and optional policy files) into a temp directory
pub fn write_config(json: &serde_json::Value, policy_files: &[(&str, &str)]) -> (TempDir, Utf8PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

    for (name, content) in policy_files {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    let path = root.join("config.json");
    std::fs::write(&path, serde_json::to_string_pretty(json).unwrap()).unwrap();
    (dir, path)
}

/// Log output shared with a tracing subscriber
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Capture every event at every level on this thread until the guard drops
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}
