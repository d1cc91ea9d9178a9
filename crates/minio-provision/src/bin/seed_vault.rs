//! minio-provision-seed-vault
//!
//! Prompts for a password per MinIO user and stores them all in one Vault
//! KV v2 secret, the layout `minio-provision` reads with `vault_path`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use dialoguer::Password;
use minio_provision::cli::SeedCli;
use minio_provision::logging::init_tracing;
use minio_provision::output;
use minio_provision::seed::seed_secrets;
use provision_secrets::{SecureString, VaultBackend};
use std::collections::BTreeMap;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize rustls crypto provider (required for rustls 0.23+)
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    let _ = dotenvy::dotenv();

    let cli = SeedCli::parse();
    init_tracing(cli.verbose, cli.quiet, cli.log_format);

    let vault_config = cli.vault.to_config();
    if !vault_config.is_configured() {
        bail!("VAULT_ADDR must be set");
    }
    let Some(approle) = cli.vault.approle() else {
        bail!("VAULT_ROLE_ID and VAULT_SECRET_ID must be set");
    };
    let vault = VaultBackend::with_config(vault_config).context("Failed to set up Vault client")?;

    output::header(&format!("Seeding MinIO user passwords at {}", cli.path));
    let passwords = prompt_passwords(&cli.users)?;

    let report = seed_secrets(&vault, &approle, &cli.path, &passwords).await?;
    for user in &report.verified {
        output::success(&format!("{}: password stored and verified", user));
    }
    output::info(&format!(
        "Secret {} is now at version {}",
        report.path, report.version
    ));
    Ok(())
}

fn prompt_passwords(users: &[String]) -> Result<BTreeMap<String, SecureString>> {
    let mut passwords = BTreeMap::new();
    for user in users {
        let password = Password::new()
            .with_prompt(format!("Password for {}", user))
            .with_confirmation("Repeat password", "Passwords do not match")
            .interact()
            .with_context(|| format!("Failed to read the password for {}", user))?;
        passwords.insert(user.clone(), SecureString::new(password));
    }
    Ok(passwords)
}
