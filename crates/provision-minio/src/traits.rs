//! Object store admin trait

use crate::error::AdminError;
use async_trait::async_trait;
use provision_core::PolicyDocument;
use provision_secrets::SecureString;

/// Raw admin calls against an object-storage server.
///
/// Implementations classify "already exists" style answers into
/// [`AdminError`] variants; the idempotency policy lives in
/// [`crate::driver::ProvisioningDriver`].
#[async_trait]
pub trait ObjectStoreAdmin: Send + Sync {
    async fn bucket_exists(&self, name: &str) -> Result<bool, AdminError>;

    async fn make_bucket(&self, name: &str) -> Result<(), AdminError>;

    /// Create or replace a policy document
    async fn add_policy(&self, policy: &PolicyDocument) -> Result<(), AdminError>;

    async fn policy_exists(&self, name: &str) -> Result<bool, AdminError>;

    /// Create a user, or update the password of an existing one
    async fn add_user(&self, name: &str, password: &SecureString) -> Result<(), AdminError>;

    async fn attach_policy(&self, user: &str, policy: &str) -> Result<(), AdminError>;
}
