//! Bucket operations over the S3 API
//!
//! MinIO speaks S3, so buckets go through `aws-sdk-s3` with path-style
//! addressing and the bucket-creator identity.

use crate::config::MinioConfig;
use crate::error::AdminError;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use provision_secrets::redact;
use tracing::debug;

pub struct BucketClient {
    client: Client,
    /// Secrets to strip from SDK error text
    secrets: Vec<String>,
}

impl BucketClient {
    pub async fn connect(config: &MinioConfig) -> Self {
        let credentials = Credentials::new(
            config.bucket_creator.access_key.clone(),
            config.bucket_creator.secret_key.as_str().to_string(),
            None,
            None,
            "minio-provision",
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let endpoint = config.endpoint_url();
        debug!("Using S3 endpoint: {}", endpoint);

        // Path-style addressing is required for MinIO
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            secrets: config.secrets().into_iter().map(String::from).collect(),
        }
    }

    fn backend_error(&self, context: &str, err: impl std::error::Error) -> AdminError {
        let message = format!("{}: {}", context, DisplayErrorContext(&err));
        AdminError::backend(redact(&message, &self.secrets))
    }

    pub async fn bucket_exists(&self, name: &str) -> Result<bool, AdminError> {
        match self.client.head_bucket().bucket(name).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(self.backend_error("head bucket", service_error))
                }
            }
        }
    }

    pub async fn make_bucket(&self, name: &str) -> Result<(), AdminError> {
        match self.client.create_bucket().bucket(name).send().await {
            Ok(_) => Ok(()),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_bucket_already_owned_by_you()
                    || service_error.is_bucket_already_exists()
                {
                    Err(AdminError::AlreadyExists)
                } else {
                    Err(self.backend_error("create bucket", service_error))
                }
            }
        }
    }
}
