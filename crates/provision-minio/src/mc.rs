//! IAM operations through the MinIO client (`mc admin`)
//!
//! The admin identity is handed to `mc` through an `MC_HOST_<alias>`
//! environment variable, so no alias is ever written to the user's `mc`
//! configuration. Every message coming back from `mc` is redacted of the
//! known secrets before it leaves this module.

use crate::config::MinioConfig;
use crate::error::AdminError;
use provision_secrets::{redact, sanitize_error, SecureString};
use std::io::Write;
use std::process::Stdio;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

/// Runner for `mc --json admin ...`
pub struct McAdmin {
    bin: String,
    alias: String,
    host_url: SecureString,
    secrets: Vec<String>,
}

impl McAdmin {
    pub fn new(config: &MinioConfig) -> Result<Self, AdminError> {
        let mut url = url::Url::parse(&config.endpoint_url())
            .map_err(|e| AdminError::backend(format!("invalid MinIO endpoint: {}", e)))?;
        let embedded = url.set_username(&config.admin.access_key).is_ok()
            && url
                .set_password(Some(config.admin.secret_key.as_str()))
                .is_ok();
        if !embedded {
            return Err(AdminError::backend(
                "cannot embed admin credentials in endpoint",
            ));
        }

        Ok(Self {
            bin: config.mc_bin.clone(),
            alias: config.mc_alias.clone(),
            host_url: SecureString::new(url.as_str().trim_end_matches('/').to_string()),
            secrets: config.secrets().into_iter().map(String::from).collect(),
        })
    }

    fn host_env(&self) -> String {
        format!("MC_HOST_{}", self.alias)
    }

    /// Run `mc --json admin <args>`, with extra values to redact from errors
    async fn admin(&self, args: &[&str], extra_secrets: &[&str]) -> Result<(), AdminError> {
        debug!(command = %args.first().copied().unwrap_or_default(), "Running mc admin");

        let output = Command::new(&self.bin)
            .arg("--json")
            .arg("admin")
            .args(args)
            .env(self.host_env(), self.host_url.as_str())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| AdminError::backend(format!("failed to run '{}': {}", self.bin, e)))?;

        let mut secrets: Vec<&str> = self.secrets.iter().map(String::as_str).collect();
        secrets.push(self.host_url.as_str());
        secrets.extend_from_slice(extra_secrets);

        parse_output(
            output.status.success(),
            &String::from_utf8_lossy(&output.stdout),
            &String::from_utf8_lossy(&output.stderr),
        )
        .map_err(|e| match e {
            AdminError::Backend { message } => {
                AdminError::backend(sanitize_error(&redact(&message, &secrets)))
            }
            other => other,
        })
    }

    /// Upload `document` as it was validated at load time, not as the file
    /// on disk reads now
    pub async fn add_policy(
        &self,
        name: &str,
        document: &serde_json::Value,
    ) -> Result<(), AdminError> {
        let file = policy_file(document)?;
        let path = file
            .path()
            .to_str()
            .ok_or_else(|| AdminError::backend("temporary policy path is not UTF-8"))?;
        self.admin(&["policy", "create", &self.alias, name, path], &[])
            .await
    }

    pub async fn policy_exists(&self, name: &str) -> Result<bool, AdminError> {
        match self.admin(&["policy", "info", &self.alias, name], &[]).await {
            Ok(()) => Ok(true),
            Err(AdminError::PolicyNotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn add_user(&self, name: &str, password: &SecureString) -> Result<(), AdminError> {
        let args = user_add_args(&self.alias, name, password)?;
        self.admin(&args, &[password.as_str()]).await
    }

    pub async fn attach_policy(&self, user: &str, policy: &str) -> Result<(), AdminError> {
        self.admin(&["policy", "attach", &self.alias, policy, "--user", user], &[])
            .await
    }
}

/// Arguments for `mc admin user add`. The password is positional, so one
/// that starts with `-` would be parsed as a flag.
fn user_add_args<'a>(
    alias: &'a str,
    name: &'a str,
    password: &'a SecureString,
) -> Result<[&'a str; 5], AdminError> {
    if password.as_str().starts_with('-') {
        return Err(AdminError::backend(format!(
            "password for user '{}' starts with '-' and cannot be passed to mc",
            name
        )));
    }
    Ok(["user", "add", alias, name, password.as_str()])
}

/// Write a policy document to a temporary file that lives until dropped
fn policy_file(document: &serde_json::Value) -> Result<NamedTempFile, AdminError> {
    let write_error = |e: std::io::Error| AdminError::backend(format!("cannot stage policy: {}", e));

    let mut file = tempfile::Builder::new()
        .prefix("minio-policy-")
        .suffix(".json")
        .tempfile()
        .map_err(write_error)?;
    let body = serde_json::to_vec_pretty(document)
        .map_err(|e| AdminError::backend(format!("cannot encode policy: {}", e)))?;
    file.write_all(&body).map_err(write_error)?;
    file.flush().map_err(write_error)?;
    Ok(file)
}

/// Interpret the output of one `mc --json` invocation.
///
/// `mc` prints one JSON object per line; an object with
/// `"status": "error"` carries `error.message` and, usually,
/// `error.cause.message`.
pub fn parse_output(success: bool, stdout: &str, stderr: &str) -> Result<(), AdminError> {
    let mut messages = Vec::new();

    for line in stdout.lines().chain(stderr.lines()) {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(line.trim()) else {
            continue;
        };
        if value.get("status").and_then(|s| s.as_str()) != Some("error") {
            continue;
        }
        let error = &value["error"];
        for message in [&error["message"], &error["cause"]["message"]] {
            if let Some(text) = message.as_str().filter(|t| !t.is_empty()) {
                messages.push(text.to_string());
            }
        }
    }

    if messages.is_empty() {
        if success {
            return Ok(());
        }
        let text = stderr.trim();
        messages.push(if text.is_empty() {
            "mc exited with an error".to_string()
        } else {
            text.to_string()
        });
    }

    Err(classify(&messages.join(": ")))
}

/// Map `mc` error text onto an [`AdminError`]
pub fn classify(message: &str) -> AdminError {
    let lower = message.to_lowercase();

    if lower.contains("already in effect") || lower.contains("already attached") {
        return AdminError::AlreadyAttached;
    }
    if lower.contains("already exists") || lower.contains("already owned by you") {
        return AdminError::AlreadyExists;
    }
    if lower.contains("policy")
        && (lower.contains("does not exist")
            || lower.contains("not found")
            || lower.contains("no such policy"))
    {
        return AdminError::PolicyNotFound;
    }

    AdminError::backend(message)
}
