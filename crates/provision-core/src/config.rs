//! Configuration file loading and validation

use crate::error::{ConfigError, Result};
use crate::types::{
    PolicyAssignment, PolicyDocument, RawPolicyAssignment, RawPolicyDocument, RawServerConfig,
    RawUser, ServerConfig, UserDescriptor,
};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use std::fs;
use tracing::{debug, warn};

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/minio_server_config.json";

/// Loaded and validated server configuration
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The validated configuration
    pub config: ServerConfig,

    /// Path to the configuration file
    pub config_path: Utf8PathBuf,
}

impl LoadedConfig {
    /// Load configuration from `path`, expanding user name placeholders from
    /// the process environment.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        Self::load_with_env(path, |var| std::env::var(var).ok())
    }

    /// Load configuration with a custom variable lookup
    pub fn load_with_env<F>(path: &Utf8Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::not_found(path.as_str())
            } else {
                ConfigError::Io(e)
            }
        })?;

        let base_dir = path
            .parent()
            .filter(|p| !p.as_str().is_empty())
            .map(|p| p.to_owned())
            .unwrap_or_else(|| Utf8PathBuf::from("."));

        let config = parse_config(&content, &base_dir, lookup)?;
        debug!(
            path = %path,
            buckets = config.buckets.len(),
            users = config.users.len(),
            policies = config.policies.len(),
            "Loaded server configuration"
        );

        Ok(Self {
            config,
            config_path: path.to_owned(),
        })
    }
}

/// Parse and validate a configuration document.
///
/// Policy document files are resolved relative to `base_dir`.
pub fn parse_config<F>(content: &str, base_dir: &Utf8Path, lookup: F) -> Result<ServerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let raw: RawServerConfig = serde_json::from_str(content)?;

    let buckets = validate_buckets(raw.buckets)?;
    let policies = load_policy_documents(raw.policies, base_dir)?;

    let mut users = Vec::with_capacity(raw.users.len());
    let mut seen = HashSet::new();
    for (index, raw_user) in raw.users.into_iter().enumerate() {
        let user = validate_user(raw_user, index, &lookup)?;
        if !seen.insert(user.name.clone()) {
            return Err(ConfigError::invalid(format!(
                "duplicate user '{}' in users[{}]",
                user.name, index
            )));
        }
        users.push(user);
    }

    for assignment in validate_assignments(raw.policy_assignments, &lookup)? {
        let user = users
            .iter_mut()
            .find(|u| u.name == assignment.user)
            .ok_or_else(|| {
                ConfigError::invalid(format!(
                    "policy assignment references unknown user '{}'",
                    assignment.user
                ))
            })?;
        for policy in assignment.policies {
            if !user.policies.contains(&policy) {
                user.policies.push(policy);
            }
        }
    }

    Ok(ServerConfig {
        buckets,
        users,
        policies,
    })
}

fn validate_buckets(raw: Vec<String>) -> Result<Vec<String>> {
    let mut buckets: Vec<String> = Vec::with_capacity(raw.len());
    for (index, name) in raw.into_iter().enumerate() {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ConfigError::invalid(format!(
                "buckets[{}] is an empty name",
                index
            )));
        }
        if buckets.contains(&name) {
            warn!(bucket = %name, "Duplicate bucket in configuration, ignoring");
            continue;
        }
        buckets.push(name);
    }
    Ok(buckets)
}

fn validate_user<F>(raw: RawUser, index: usize, lookup: &F) -> Result<UserDescriptor>
where
    F: Fn(&str) -> Option<String>,
{
    let context = format!("users[{}]", index);
    let name = non_empty(raw.name).ok_or_else(|| ConfigError::missing_field("name", &context))?;
    let name = expand_placeholders(&name, lookup)?;

    let vault_path = non_empty(raw.vault_path);
    let password = non_empty(raw.password);
    if vault_path.is_none() && password.is_none() {
        return Err(ConfigError::NoCredentialSource { user: name });
    }

    let mut policies: Vec<String> = Vec::new();
    let declared = raw
        .policies
        .into_iter()
        .chain(raw.policy)
        .map(|p| policy_name(&p));
    for policy in declared {
        if policy.is_empty() {
            return Err(ConfigError::invalid(format!(
                "{} ('{}') has an empty policy name",
                context, name
            )));
        }
        if !policies.contains(&policy) {
            policies.push(policy);
        }
    }

    Ok(UserDescriptor {
        name,
        vault_path,
        vault_key: non_empty(raw.vault_key),
        password,
        policies,
    })
}

fn validate_assignments<F>(raw: Vec<RawPolicyAssignment>, lookup: &F) -> Result<Vec<PolicyAssignment>>
where
    F: Fn(&str) -> Option<String>,
{
    raw.into_iter()
        .enumerate()
        .map(|(index, assignment)| {
            let context = format!("policy_assignments[{}]", index);
            let user = non_empty(assignment.user)
                .ok_or_else(|| ConfigError::missing_field("user", &context))?;
            let user = expand_placeholders(&user, lookup)?;

            let policies: Vec<String> = assignment
                .policies
                .iter()
                .map(|p| policy_name(p))
                .filter(|p| !p.is_empty())
                .collect();
            if policies.is_empty() {
                return Err(ConfigError::missing_field("policies", context));
            }

            Ok(PolicyAssignment { user, policies })
        })
        .collect()
}

fn load_policy_documents(
    raw: Vec<RawPolicyDocument>,
    base_dir: &Utf8Path,
) -> Result<Vec<PolicyDocument>> {
    let mut documents: Vec<PolicyDocument> = Vec::with_capacity(raw.len());

    for (index, entry) in raw.into_iter().enumerate() {
        let context = format!("policies[{}]", index);
        let file = non_empty(entry.file).ok_or_else(|| ConfigError::missing_field("file", &context))?;
        let name = match non_empty(entry.name) {
            Some(name) => name,
            None => policy_name(file_stem(&file)),
        };

        if documents.iter().any(|d| d.name == name) {
            return Err(ConfigError::invalid(format!(
                "duplicate policy document '{}' in {}",
                name, context
            )));
        }

        let path = base_dir.join(&file);
        let document_error = |message: String| ConfigError::PolicyDocument {
            name: name.clone(),
            path: path.to_string(),
            message,
        };
        let text = fs::read_to_string(&path).map_err(|e| document_error(e.to_string()))?;
        let document: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| document_error(e.to_string()))?;
        if !document.is_object() {
            return Err(document_error("policy document must be a JSON object".into()));
        }

        documents.push(PolicyDocument {
            name,
            file: path,
            document,
        });
    }

    Ok(documents)
}

/// Expand `${VAR}` and `${VAR:-default}` placeholders in a user name.
///
/// Any `$` left after expansion means a variable without a default was not
/// defined, which is a configuration error.
pub fn expand_placeholders<F>(value: &str, lookup: &F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let expanded = shellexpand::env_with_context(value, |var: &str| {
        Ok::<Option<String>, std::convert::Infallible>(lookup(var))
    })
    .map_err(|e| ConfigError::placeholder(value, e.to_string()))?;

    if expanded.contains('$') {
        return Err(ConfigError::placeholder(
            value,
            "environment variable is not defined",
        ));
    }

    let expanded = expanded.trim().to_string();
    if expanded.is_empty() {
        return Err(ConfigError::placeholder(value, "expands to an empty name"));
    }
    Ok(expanded)
}

/// Strip a trailing `.json` from a policy reference
fn policy_name(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_suffix(".json")
        .unwrap_or(trimmed)
        .to_string()
}

fn file_stem(file: &str) -> &str {
    Utf8Path::new(file).file_name().unwrap_or(file)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
