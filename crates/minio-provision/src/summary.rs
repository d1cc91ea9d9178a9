//! Per-run outcome report and exit code

use provision_minio::{EnsureOutcome, ProvisioningError};
use provision_secrets::{DegradedUser, Provenance, SkippedUser};

/// Exit code for a run with failures or skipped users
pub const EXIT_FAILURE: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityOutcome {
    pub name: String,
    pub outcome: EnsureOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedUser {
    pub name: String,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingOutcome {
    pub user: String,
    pub policy: String,
    pub outcome: EnsureOutcome,
}

/// Severity of one report line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub kind: LineKind,
    pub text: String,
}

impl ReportLine {
    fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Everything that happened during one run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub buckets: Vec<EntityOutcome>,
    pub policies: Vec<EntityOutcome>,
    pub users: Vec<ProvisionedUser>,
    pub bindings: Vec<BindingOutcome>,
    /// Users resolved from the configuration after a secret-store failure
    pub degraded: Vec<DegradedUser>,
    /// Users with no usable credential; never provisioned
    pub skipped: Vec<SkippedUser>,
    pub failures: Vec<ProvisioningError>,
}

impl RunSummary {
    /// Warnings (degraded users) do not count as failure
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            EXIT_FAILURE
        }
    }

    pub fn is_user_provisioned(&self, name: &str) -> bool {
        self.users.iter().any(|u| u.name == name)
    }

    /// Buckets that did not exist before this run
    pub fn created_buckets(&self) -> impl Iterator<Item = &str> {
        self.buckets
            .iter()
            .filter(|b| b.outcome == EnsureOutcome::Created)
            .map(|b| b.name.as_str())
    }

    /// Human-readable report, one line per entity
    pub fn report(&self) -> Vec<ReportLine> {
        let mut lines = Vec::new();

        for bucket in &self.buckets {
            let kind = match bucket.outcome {
                EnsureOutcome::Created => LineKind::Success,
                _ => LineKind::Info,
            };
            lines.push(ReportLine::new(
                kind,
                format!("Bucket '{}' {}", bucket.name, bucket.outcome),
            ));
        }

        for policy in &self.policies {
            lines.push(ReportLine::new(
                LineKind::Success,
                format!("Policy '{}' {}", policy.name, policy.outcome),
            ));
        }

        for user in &self.users {
            lines.push(ReportLine::new(
                LineKind::Success,
                format!("User '{}' provisioned ({})", user.name, user.provenance),
            ));
        }

        for binding in &self.bindings {
            let kind = match binding.outcome {
                EnsureOutcome::Created => LineKind::Success,
                _ => LineKind::Info,
            };
            lines.push(ReportLine::new(
                kind,
                format!(
                    "Policy '{}' on user '{}' {}",
                    binding.policy, binding.user, binding.outcome
                ),
            ));
        }

        for user in &self.degraded {
            lines.push(ReportLine::new(
                LineKind::Warning,
                format!(
                    "User '{}' used the configuration password: {}",
                    user.username, user.reason
                ),
            ));
        }

        for user in &self.skipped {
            lines.push(ReportLine::new(
                LineKind::Error,
                format!("User '{}' skipped: {}", user.username, user.reason),
            ));
        }

        for failure in &self.failures {
            lines.push(ReportLine::new(LineKind::Error, failure.to_string()));
        }

        lines.push(if self.is_success() {
            ReportLine::new(
                LineKind::Success,
                format!(
                    "Provisioned {} bucket(s), {} user(s), {} binding(s)",
                    self.buckets.len(),
                    self.users.len(),
                    self.bindings.len()
                ),
            )
        } else {
            ReportLine::new(
                LineKind::Error,
                format!(
                    "Finished with {} failure(s) and {} skipped user(s)",
                    self.failures.len(),
                    self.skipped.len()
                ),
            )
        });

        lines
    }
}
