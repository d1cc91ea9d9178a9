//! Idempotent provisioning on top of [`ObjectStoreAdmin`]
//!
//! Each `ensure_*` call brings one entity to its desired state and reports
//! whether anything changed. Failures are scoped to that entity.

use crate::error::{AdminError, ProvisioningError};
use crate::traits::ObjectStoreAdmin;
use provision_core::PolicyDocument;
use provision_secrets::SecureString;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

/// What an `ensure_*` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    AlreadyPresent,
    /// Written unconditionally (policy documents, user passwords)
    Applied,
}

impl fmt::Display for EnsureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnsureOutcome::Created => write!(f, "created"),
            EnsureOutcome::AlreadyPresent => write!(f, "already present"),
            EnsureOutcome::Applied => write!(f, "applied"),
        }
    }
}

pub struct ProvisioningDriver<'a> {
    admin: &'a dyn ObjectStoreAdmin,
    /// Policies known to exist on the server during this run
    known_policies: HashMap<String, bool>,
}

impl<'a> ProvisioningDriver<'a> {
    pub fn new(admin: &'a dyn ObjectStoreAdmin) -> Self {
        Self {
            admin,
            known_policies: HashMap::new(),
        }
    }

    pub async fn ensure_bucket(&self, name: &str) -> Result<EnsureOutcome, ProvisioningError> {
        let bucket_error = |e: AdminError| ProvisioningError::Bucket {
            name: name.to_string(),
            message: e.to_string(),
        };

        if self.admin.bucket_exists(name).await.map_err(bucket_error)? {
            debug!(bucket = %name, "Bucket already exists");
            return Ok(EnsureOutcome::AlreadyPresent);
        }

        match self.admin.make_bucket(name).await {
            Ok(()) => {
                info!(bucket = %name, "Created bucket");
                Ok(EnsureOutcome::Created)
            }
            // Lost a race with another creator
            Err(AdminError::AlreadyExists) => Ok(EnsureOutcome::AlreadyPresent),
            Err(e) => Err(bucket_error(e)),
        }
    }

    /// Upload a policy document. Each name is uploaded at most once per run.
    pub async fn ensure_policy(
        &mut self,
        policy: &PolicyDocument,
    ) -> Result<EnsureOutcome, ProvisioningError> {
        if self.known_policies.get(&policy.name) == Some(&true) {
            return Ok(EnsureOutcome::AlreadyPresent);
        }

        self.admin
            .add_policy(policy)
            .await
            .map_err(|e| ProvisioningError::Policy {
                name: policy.name.clone(),
                message: e.to_string(),
            })?;

        info!(policy = %policy.name, file = %policy.file, "Uploaded policy");
        self.known_policies.insert(policy.name.clone(), true);
        Ok(EnsureOutcome::Applied)
    }

    /// Create the user, or reset the password of an existing one
    pub async fn ensure_user(
        &self,
        name: &str,
        password: &SecureString,
    ) -> Result<EnsureOutcome, ProvisioningError> {
        match self.admin.add_user(name, password).await {
            Ok(()) | Err(AdminError::AlreadyExists) => {
                info!(user = %name, "User is provisioned");
                Ok(EnsureOutcome::Applied)
            }
            Err(e) => Err(ProvisioningError::User {
                name: name.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Attach `policy` to `user`. A policy missing on the server is an error.
    pub async fn ensure_policy_binding(
        &mut self,
        user: &str,
        policy: &str,
    ) -> Result<EnsureOutcome, ProvisioningError> {
        let binding_error = |e: AdminError| ProvisioningError::Binding {
            user: user.to_string(),
            policy: policy.to_string(),
            message: e.to_string(),
        };
        let not_found = || ProvisioningError::PolicyNotFound {
            user: user.to_string(),
            policy: policy.to_string(),
        };

        let exists = match self.known_policies.get(policy) {
            Some(exists) => *exists,
            None => {
                let exists = self
                    .admin
                    .policy_exists(policy)
                    .await
                    .map_err(binding_error)?;
                self.known_policies.insert(policy.to_string(), exists);
                exists
            }
        };
        if !exists {
            return Err(not_found());
        }

        match self.admin.attach_policy(user, policy).await {
            Ok(()) => {
                info!(user = %user, policy = %policy, "Attached policy");
                Ok(EnsureOutcome::Created)
            }
            Err(AdminError::AlreadyAttached) => {
                debug!(user = %user, policy = %policy, "Policy already attached");
                Ok(EnsureOutcome::AlreadyPresent)
            }
            Err(AdminError::PolicyNotFound) => Err(not_found()),
            Err(e) => Err(binding_error(e)),
        }
    }
}
