//! # provision-core
//!
//! Core library for the minio-provision CLI providing:
//! - Server configuration file parsing (minio_server_config.json)
//! - Validation of users, policy documents, and policy assignments
//! - User name placeholder expansion from the environment

pub mod config;
pub mod error;
pub mod types;

pub use config::LoadedConfig;
pub use error::{ConfigError, Result};
pub use types::{PolicyAssignment, PolicyDocument, ServerConfig, UserDescriptor};
