//! MinIO provisioning for minio-provision
//!
//! - [`ObjectStoreAdmin`]: raw admin calls, implemented for MinIO by
//!   [`MinioAdmin`] (S3 API for buckets, `mc admin` for IAM)
//! - [`ProvisioningDriver`]: idempotent `ensure_*` operations

pub mod admin;
pub mod config;
pub mod driver;
pub mod error;
pub mod mc;
pub mod s3;
pub mod traits;

pub use admin::MinioAdmin;
pub use config::{MinioConfig, StaticCredentials};
pub use driver::{EnsureOutcome, ProvisioningDriver};
pub use error::{AdminError, ProvisioningError};
pub use traits::ObjectStoreAdmin;
