//! CLI argument parsing with clap
//!
//! Every setting can also come from the environment (or `.env`), which is
//! how the tool is driven from CI.

use crate::seed::DEFAULT_USERS_PATH;
use anyhow::{bail, Context, Result};
use camino::Utf8PathBuf;
use clap::builder::FalseyValueParser;
use clap::{Args, Parser, ValueEnum};
use provision_core::config::DEFAULT_CONFIG_PATH;
use provision_core::LoadedConfig;
use provision_minio::{MinioConfig, StaticCredentials};
use provision_secrets::{AppRoleCredentials, CredentialPrecedence, SecureString, VaultConfig};
use std::convert::Infallible;
use std::time::Duration;

/// Provision MinIO buckets, users, and policies
#[derive(Parser, Debug)]
#[command(name = "minio-provision")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "MINIO_PROVISION_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Path to the server configuration file
    #[arg(short, long, env = "MINIO_PROVISION_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: Utf8PathBuf,

    /// Let a literal `password` win over `vault_path` when a user has both
    #[arg(long, env = "MINIO_PREFER_CONFIG_PASSWORD", value_parser = FalseyValueParser::new())]
    pub prefer_config_password: bool,

    /// Validate the configuration and print the plan without contacting
    /// any server
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub minio: MinioArgs,

    #[command(flatten)]
    pub vault: VaultArgs,
}

/// Store MinIO user passwords in Vault for minio-provision to read
#[derive(Parser, Debug)]
#[command(name = "minio-provision-seed-vault")]
#[command(author, version, about, long_about = None)]
pub struct SeedCli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "MINIO_PROVISION_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// KV v2 path the passwords are stored under, one key per user
    #[arg(long, env = "MINIO_SEED_VAULT_PATH", default_value = DEFAULT_USERS_PATH)]
    pub path: String,

    /// MinIO user names; each is prompted for a password
    #[arg(required = true)]
    pub users: Vec<String>,

    #[command(flatten)]
    pub vault: VaultArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Args, Debug)]
#[command(next_help_heading = "MinIO")]
pub struct MinioArgs {
    #[arg(long = "minio-server", env = "MINIO_SERVER", default_value = "localhost")]
    pub server: String,

    #[arg(long = "minio-port", env = "MINIO_PORT", default_value_t = 9000)]
    pub port: u16,

    /// Connect over https
    #[arg(long = "minio-secure", env = "MINIO_SECURE", value_parser = FalseyValueParser::new())]
    pub secure: bool,

    #[arg(long = "minio-region", env = "MINIO_REGION", default_value = "us-east-1")]
    pub region: String,

    /// Access key used for users and policies
    #[arg(long, env = "MINIO_ADMIN_ACCESS_KEY")]
    pub admin_access_key: Option<String>,

    #[arg(long, env = "MINIO_ADMIN_SECRET_KEY", hide_env_values = true, value_parser = secure_string)]
    pub admin_secret_key: Option<SecureString>,

    /// Access key used for bucket creation; defaults to the admin identity
    #[arg(long, env = "BUCKET_CREATOR_ACCESS_KEY")]
    pub bucket_creator_access_key: Option<String>,

    #[arg(long, env = "BUCKET_CREATOR_SECRET_KEY", hide_env_values = true, value_parser = secure_string)]
    pub bucket_creator_secret_key: Option<SecureString>,

    /// MinIO client executable
    #[arg(long, env = "MC_BIN", default_value = "mc")]
    pub mc_bin: String,

    /// Alias under which `mc` addresses the server
    #[arg(long, env = "MC_ALIAS", default_value = "provision")]
    pub mc_alias: String,
}

#[derive(Args, Debug)]
#[command(next_help_heading = "Vault")]
pub struct VaultArgs {
    #[arg(long, env = "VAULT_ADDR")]
    pub vault_addr: Option<String>,

    #[arg(long, env = "VAULT_ROLE_ID")]
    pub vault_role_id: Option<String>,

    #[arg(long, env = "VAULT_SECRET_ID", hide_env_values = true, value_parser = secure_string)]
    pub vault_secret_id: Option<SecureString>,

    #[arg(long, env = "VAULT_NAMESPACE")]
    pub vault_namespace: Option<String>,

    #[arg(long, env = "VAULT_APPROLE_MOUNT", default_value = "approle")]
    pub vault_approle_mount: String,

    /// KV v2 mount for paths that do not name one
    #[arg(long, env = "VAULT_KV_MOUNT", default_value = "secret")]
    pub vault_kv_mount: String,

    /// Request timeout in seconds
    #[arg(long, env = "VAULT_TIMEOUT", default_value_t = 30)]
    pub vault_timeout: u64,

    #[arg(long, env = "VAULT_SKIP_VERIFY", value_parser = FalseyValueParser::new())]
    pub vault_skip_verify: bool,
}

fn secure_string(value: &str) -> Result<SecureString, Infallible> {
    Ok(SecureString::from(value))
}

impl Cli {
    /// Load and validate the configuration file
    pub fn load_config(&self) -> Result<LoadedConfig> {
        LoadedConfig::load(&self.config)
            .with_context(|| format!("Invalid configuration {}", self.config))
    }

    /// Everything a run needs before any client is built. The configuration
    /// file is checked before the MinIO settings.
    pub fn prepare(&self) -> Result<(LoadedConfig, MinioConfig)> {
        let loaded = self.load_config()?;
        let minio = self.minio.to_config()?;
        Ok((loaded, minio))
    }

    pub fn precedence(&self) -> CredentialPrecedence {
        if self.prefer_config_password {
            CredentialPrecedence::FallbackFirst
        } else {
            CredentialPrecedence::SecretStoreFirst
        }
    }
}

impl MinioArgs {
    pub fn to_config(&self) -> Result<MinioConfig> {
        let (Some(access_key), Some(secret_key)) = (
            non_empty(self.admin_access_key.as_deref()),
            self.admin_secret_key.as_ref().filter(|s| !s.is_empty()),
        ) else {
            bail!("MINIO_ADMIN_ACCESS_KEY and MINIO_ADMIN_SECRET_KEY must be set");
        };
        let admin = StaticCredentials::new(access_key, secret_key.clone());

        let bucket_creator = match (
            non_empty(self.bucket_creator_access_key.as_deref()),
            self.bucket_creator_secret_key
                .as_ref()
                .filter(|s| !s.is_empty()),
        ) {
            (Some(access_key), Some(secret_key)) => {
                StaticCredentials::new(access_key, secret_key.clone())
            }
            (None, None) => admin.clone(),
            _ => bail!("BUCKET_CREATOR_ACCESS_KEY and BUCKET_CREATOR_SECRET_KEY must be set together"),
        };

        Ok(MinioConfig {
            server: self.server.clone(),
            port: self.port,
            secure: self.secure,
            region: self.region.clone(),
            admin,
            bucket_creator,
            mc_bin: self.mc_bin.clone(),
            mc_alias: self.mc_alias.clone(),
        })
    }
}

impl VaultArgs {
    pub fn to_config(&self) -> VaultConfig {
        VaultConfig {
            address: self.vault_addr.clone().unwrap_or_default(),
            namespace: non_empty(self.vault_namespace.as_deref()).map(String::from),
            approle_mount: self.vault_approle_mount.clone(),
            kv_mount: self.vault_kv_mount.clone(),
            timeout: Duration::from_secs(self.vault_timeout),
            insecure_skip_verify: self.vault_skip_verify,
        }
    }

    /// The AppRole pair, when both halves are set
    pub fn approle(&self) -> Option<AppRoleCredentials> {
        let role_id = non_empty(self.vault_role_id.as_deref())?;
        let secret_id = self.vault_secret_id.as_ref().filter(|s| !s.is_empty())?;
        Some(AppRoleCredentials::new(role_id, secret_id.clone()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
