//! MinIO connection settings

use provision_secrets::SecureString;

/// Static access key pair
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    pub access_key: String,
    pub secret_key: SecureString,
}

impl StaticCredentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<SecureString>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MinioConfig {
    pub server: String,
    pub port: u16,
    /// Use https
    pub secure: bool,
    /// Region sent with S3 requests; MinIO defaults to us-east-1
    pub region: String,
    /// Identity used for IAM (users, policies)
    pub admin: StaticCredentials,
    /// Least-privilege identity used for bucket creation
    pub bucket_creator: StaticCredentials,
    /// `mc` executable
    pub mc_bin: String,
    /// Alias name under which `mc` sees the server
    pub mc_alias: String,
}

impl MinioConfig {
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.server, self.port)
    }

    /// Secrets that must never appear in diagnostics
    pub fn secrets(&self) -> Vec<&str> {
        vec![
            self.admin.secret_key.as_str(),
            self.bucket_creator.secret_key.as_str(),
        ]
    }
}
