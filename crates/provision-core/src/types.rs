//! Configuration types
//!
//! `Raw*` types mirror the JSON document as written on disk. The validated
//! types (`ServerConfig` and friends) are what the rest of the workspace
//! consumes; they are built by [`crate::config`] and never mutated after.

use camino::Utf8PathBuf;
use serde::Deserialize;
use std::fmt;

/// Validated server configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerConfig {
    /// Buckets to ensure, in file order
    pub buckets: Vec<String>,

    /// Users to ensure, in file order
    pub users: Vec<UserDescriptor>,

    /// Policy documents to upload before any binding
    pub policies: Vec<PolicyDocument>,
}

impl ServerConfig {
    /// Look up a user by name
    pub fn user(&self, name: &str) -> Option<&UserDescriptor> {
        self.users.iter().find(|u| u.name == name)
    }

    /// Total number of policy bindings across all users
    pub fn binding_count(&self) -> usize {
        self.users.iter().map(|u| u.policies.len()).sum()
    }
}

/// A user to provision
#[derive(Clone, PartialEq)]
pub struct UserDescriptor {
    /// MinIO access key
    pub name: String,

    /// Path of the secret holding this user's password
    pub vault_path: Option<String>,

    /// Field inside the secret; defaults to the user name
    pub vault_key: Option<String>,

    /// Literal fallback password
    pub password: Option<String>,

    /// Policies to attach, already merged with `policy_assignments`
    pub policies: Vec<String>,
}

impl UserDescriptor {
    /// Field name to read from the secret at `vault_path`
    pub fn secret_key(&self) -> &str {
        self.vault_key.as_deref().unwrap_or(&self.name)
    }

    pub fn has_fallback(&self) -> bool {
        self.password.is_some()
    }
}

impl fmt::Debug for UserDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserDescriptor")
            .field("name", &self.name)
            .field("vault_path", &self.vault_path)
            .field("vault_key", &self.vault_key)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("policies", &self.policies)
            .finish()
    }
}

/// A policy document loaded from disk
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDocument {
    pub name: String,

    /// Resolved path of the policy JSON file
    pub file: Utf8PathBuf,

    /// Parsed document, uploaded as is
    pub document: serde_json::Value,
}

/// Extra policies for a user declared outside the user entry
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyAssignment {
    pub user: String,
    pub policies: Vec<String>,
}

/// On-disk configuration document
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawServerConfig {
    #[serde(default)]
    pub buckets: Vec<String>,

    #[serde(default)]
    pub users: Vec<RawUser>,

    #[serde(default)]
    pub policies: Vec<RawPolicyDocument>,

    #[serde(default)]
    pub policy_assignments: Vec<RawPolicyAssignment>,
}

/// On-disk user entry
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawUser {
    #[serde(default, alias = "username")]
    pub name: Option<String>,

    #[serde(default)]
    pub vault_path: Option<String>,

    #[serde(default)]
    pub vault_key: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub policies: Vec<String>,

    /// Single policy file name, e.g. `readwrite-policy.json`
    #[serde(default)]
    pub policy: Option<String>,
}

/// On-disk policy document reference
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPolicyDocument {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub file: Option<String>,
}

/// On-disk policy assignment
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPolicyAssignment {
    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub policies: Vec<String>,
}
