//! minio-provision CLI
//!
//! Loads the server configuration, resolves user passwords, and provisions
//! MinIO. Exits non-zero on configuration errors, provisioning failures, and
//! skipped users.

use anyhow::{Context, Result};
use clap::Parser;
use minio_provision::cli::Cli;
use minio_provision::logging::init_tracing;
use minio_provision::{execute, output, plan, RunOptions};
use provision_minio::MinioAdmin;
use provision_secrets::VaultBackend;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize rustls crypto provider (required for rustls 0.23+)
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    // Before parsing, so .env values act as environment fallbacks
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet, cli.log_format);

    if let Ok(path) = dotenv {
        debug!(path = %path.display(), "Loaded environment file");
    }

    let options = RunOptions {
        precedence: cli.precedence(),
    };

    if cli.dry_run {
        let loaded = cli.load_config()?;
        output::report(
            "Provisioning plan",
            &plan(&loaded.config, options.precedence),
        );
        return Ok(());
    }

    let (loaded, minio) = cli.prepare()?;
    let vault = VaultBackend::with_config(cli.vault.to_config())
        .context("Failed to set up Vault client")?;
    let admin = MinioAdmin::connect(&minio)
        .await
        .context("Failed to set up MinIO client")?;

    let summary = execute(&loaded.config, &vault, cli.vault.approle(), &admin, options).await;
    output::report("Provisioning summary", &summary.report());

    if !summary.is_success() {
        std::process::exit(summary.exit_code());
    }
    Ok(())
}
