//! minio-provision: provision MinIO buckets, users, and policies
//!
//! User passwords come from Vault (AppRole login, KV v2) with the
//! configuration file as fallback. See [`run::execute`] for the run order
//! and [`seed::seed_secrets`] for storing those passwords in Vault.

pub mod cli;
pub mod logging;
pub mod output;
pub mod run;
pub mod seed;
pub mod summary;

pub use run::{execute, plan, run_from_path, RunOptions};
pub use summary::RunSummary;
