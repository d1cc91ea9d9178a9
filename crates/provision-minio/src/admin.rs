//! MinIO implementation of [`ObjectStoreAdmin`]

use crate::config::MinioConfig;
use crate::error::AdminError;
use crate::mc::McAdmin;
use crate::s3::BucketClient;
use crate::traits::ObjectStoreAdmin;
use async_trait::async_trait;
use provision_core::PolicyDocument;
use provision_secrets::SecureString;
use tracing::info;

/// Buckets over S3 with the bucket-creator identity, IAM over `mc admin`
/// with the admin identity
pub struct MinioAdmin {
    buckets: BucketClient,
    iam: McAdmin,
}

impl MinioAdmin {
    pub async fn connect(config: &MinioConfig) -> Result<Self, AdminError> {
        info!(
            server = %config.server,
            port = config.port,
            secure = config.secure,
            "Connecting to MinIO"
        );

        Ok(Self {
            buckets: BucketClient::connect(config).await,
            iam: McAdmin::new(config)?,
        })
    }
}

#[async_trait]
impl ObjectStoreAdmin for MinioAdmin {
    async fn bucket_exists(&self, name: &str) -> Result<bool, AdminError> {
        self.buckets.bucket_exists(name).await
    }

    async fn make_bucket(&self, name: &str) -> Result<(), AdminError> {
        self.buckets.make_bucket(name).await
    }

    async fn add_policy(&self, policy: &PolicyDocument) -> Result<(), AdminError> {
        self.iam.add_policy(&policy.name, &policy.document).await
    }

    async fn policy_exists(&self, name: &str) -> Result<bool, AdminError> {
        self.iam.policy_exists(name).await
    }

    async fn add_user(&self, name: &str, password: &SecureString) -> Result<(), AdminError> {
        self.iam.add_user(name, password).await
    }

    async fn attach_policy(&self, user: &str, policy: &str) -> Result<(), AdminError> {
        self.iam.attach_policy(user, policy).await
    }
}
