//! One provisioning run: resolve credentials, then provision in dependency
//! order (buckets, policy documents, users, bindings)

use crate::summary::{
    BindingOutcome, EntityOutcome, LineKind, ProvisionedUser, ReportLine, RunSummary,
};
use camino::Utf8Path;
use provision_core::{ConfigError, LoadedConfig, ServerConfig};
use provision_minio::{ObjectStoreAdmin, ProvisioningDriver};
use provision_secrets::{
    consults_secret_store, AppRoleCredentials, CredentialPrecedence, CredentialResolver,
    SecretBackend,
};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub precedence: CredentialPrecedence,
}

/// Run against already-connected backends.
///
/// Never fails as a whole: every problem is recorded in the summary and the
/// run moves on to the next entity.
pub async fn execute(
    config: &ServerConfig,
    secrets: &dyn SecretBackend,
    approle: Option<AppRoleCredentials>,
    admin: &dyn ObjectStoreAdmin,
    options: RunOptions,
) -> RunSummary {
    let mut summary = RunSummary::default();

    let mut resolver = CredentialResolver::new(secrets, approle, options.precedence);
    let resolution = resolver.resolve_all(&config.users).await;
    // No more reads after this point
    resolver.finish().await;

    summary.degraded = resolution.degraded;
    summary.skipped = resolution.skipped;

    let mut driver = ProvisioningDriver::new(admin);

    for bucket in &config.buckets {
        match driver.ensure_bucket(bucket).await {
            Ok(outcome) => summary.buckets.push(EntityOutcome {
                name: bucket.clone(),
                outcome,
            }),
            Err(e) => {
                warn!(bucket = %bucket, error = %e, "Bucket not provisioned");
                summary.failures.push(e);
            }
        }
    }

    for policy in &config.policies {
        match driver.ensure_policy(policy).await {
            Ok(outcome) => summary.policies.push(EntityOutcome {
                name: policy.name.clone(),
                outcome,
            }),
            Err(e) => {
                warn!(policy = %policy.name, error = %e, "Policy not uploaded");
                summary.failures.push(e);
            }
        }
    }

    for credential in &resolution.credentials {
        match driver
            .ensure_user(&credential.username, &credential.password)
            .await
        {
            Ok(_) => summary.users.push(ProvisionedUser {
                name: credential.username.clone(),
                provenance: credential.provenance,
            }),
            Err(e) => {
                warn!(user = %credential.username, error = %e, "User not provisioned");
                summary.failures.push(e);
            }
        }
    }

    for user in &config.users {
        if !summary.is_user_provisioned(&user.name) {
            continue;
        }
        for policy in &user.policies {
            match driver.ensure_policy_binding(&user.name, policy).await {
                Ok(outcome) => summary.bindings.push(BindingOutcome {
                    user: user.name.clone(),
                    policy: policy.clone(),
                    outcome,
                }),
                Err(e) => {
                    warn!(user = %user.name, policy = %policy, error = %e, "Policy not attached");
                    summary.failures.push(e);
                }
            }
        }
    }

    info!(
        buckets = summary.buckets.len(),
        users = summary.users.len(),
        bindings = summary.bindings.len(),
        failures = summary.failures.len(),
        skipped = summary.skipped.len(),
        "Provisioning run finished"
    );

    summary
}

/// Load the configuration, then [`execute`].
///
/// A configuration error returns before either backend is called.
pub async fn run_from_path(
    path: &Utf8Path,
    secrets: &dyn SecretBackend,
    approle: Option<AppRoleCredentials>,
    admin: &dyn ObjectStoreAdmin,
    options: RunOptions,
) -> Result<RunSummary, ConfigError> {
    let loaded = LoadedConfig::load(path)?;
    Ok(execute(&loaded.config, secrets, approle, admin, options).await)
}

/// What a run would do, without contacting any server
pub fn plan(config: &ServerConfig, precedence: CredentialPrecedence) -> Vec<ReportLine> {
    let mut lines = Vec::new();
    let mut line = |text: String| {
        lines.push(ReportLine {
            kind: LineKind::Info,
            text,
        })
    };

    for bucket in &config.buckets {
        line(format!("Ensure bucket '{}'", bucket));
    }
    for policy in &config.policies {
        line(format!("Upload policy '{}' from {}", policy.name, policy.file));
    }
    for user in &config.users {
        let source = match (&user.vault_path, consults_secret_store(user, precedence)) {
            (Some(path), true) if user.has_fallback() => {
                format!("vault {} ({}), fallback to configuration", path, user.secret_key())
            }
            (Some(path), true) => format!("vault {} ({})", path, user.secret_key()),
            _ => "configuration password".to_string(),
        };
        line(format!("Ensure user '{}' with password from {}", user.name, source));
        for policy in &user.policies {
            line(format!("Attach policy '{}' to user '{}'", policy, user.name));
        }
    }

    lines
}
