//! End-to-end provisioning runs against recording fakes

mod common;

use common::{
    approle, capture_logs, write_config, FakeObjectStore, FakeVault, VaultCall,
};
use minio_provision::summary::EXIT_FAILURE;
use minio_provision::{run_from_path, RunOptions};
use provision_core::ConfigError;
use provision_minio::{EnsureOutcome, ProvisioningError};
use provision_secrets::{AuthError, CredentialPrecedence, Provenance};
use serde_json::json;

const USERS_PATH: &str = "secret/data/minio/users";
const VAULT_PASSWORD: &str = "ci-password-from-vault";
const LITERAL_PASSWORD: &str = "backup-literal-password";

fn standard_config() -> serde_json::Value {
    json!({
        "buckets": ["backups", "artifacts", "logs"],
        "users": [
            { "name": "ci", "vault_path": USERS_PATH, "policies": ["readwrite"] },
            { "name": "backup", "password": LITERAL_PASSWORD, "policies": ["readwrite"] }
        ]
    })
}

fn healthy_vault() -> FakeVault {
    FakeVault::new().with_secret(USERS_PATH, "ci", VAULT_PASSWORD)
}

#[tokio::test]
async fn test_healthy_run_provisions_everything() {
    let (_dir, path) = write_config(&standard_config(), &[]);
    let vault = healthy_vault();
    let store = FakeObjectStore::new().with_policy("readwrite");

    let summary = run_from_path(&path, &vault, approle(), &store, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.exit_code(), 0);
    assert_eq!(store.bucket_names(), vec!["artifacts", "backups", "logs"]);
    assert_eq!(
        summary.created_buckets().collect::<Vec<_>>(),
        vec!["backups", "artifacts", "logs"]
    );

    assert_eq!(store.password_of("ci").as_deref(), Some(VAULT_PASSWORD));
    assert_eq!(store.password_of("backup").as_deref(), Some(LITERAL_PASSWORD));
    assert!(store.has_binding("ci", "readwrite"));
    assert!(store.has_binding("backup", "readwrite"));

    let provenance: Vec<_> = summary
        .users
        .iter()
        .map(|u| (u.name.as_str(), u.provenance))
        .collect();
    assert_eq!(
        provenance,
        vec![("ci", Provenance::SecretStore), ("backup", Provenance::Fallback)]
    );

    // One login, one read, token revoked at the end
    assert_eq!(
        vault.calls(),
        vec![
            VaultCall::Authenticate,
            VaultCall::Fetch {
                path: USERS_PATH.to_string(),
                key: "ci".to_string(),
            },
            VaultCall::Revoke,
        ]
    );
}

#[tokio::test]
async fn test_auth_failure_skips_vault_only_user() {
    let (_dir, path) = write_config(&standard_config(), &[]);
    let vault = healthy_vault().failing_auth(AuthError::Rejected { code: 400 });
    let store = FakeObjectStore::new().with_policy("readwrite");

    let summary = run_from_path(&path, &vault, approle(), &store, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.exit_code(), EXIT_FAILURE);
    assert!(summary.failures.is_empty());
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].username, "ci");

    assert_eq!(store.password_of("ci"), None);
    assert_eq!(store.password_of("backup").as_deref(), Some(LITERAL_PASSWORD));
    assert!(!store.has_binding("ci", "readwrite"));
    assert!(store.has_binding("backup", "readwrite"));
    assert_eq!(store.bucket_names().len(), 3);

    // No session, nothing to revoke
    assert_eq!(vault.calls(), vec![VaultCall::Authenticate]);
}

#[tokio::test]
async fn test_auth_failure_degrades_every_user_with_fallback() {
    let config = json!({
        "buckets": ["backups"],
        "users": [
            { "name": "ci", "vault_path": USERS_PATH, "password": "ci-fallback" },
            { "name": "jenkins", "vault_path": USERS_PATH, "password": "jenkins-fallback" },
            { "name": "k8s", "vault_path": USERS_PATH, "password": "k8s-fallback" }
        ]
    });
    let (_dir, path) = write_config(&config, &[]);
    let vault = FakeVault::new().failing_auth(AuthError::Unreachable {
        message: "connection refused".to_string(),
    });
    let store = FakeObjectStore::new();

    let summary = run_from_path(&path, &vault, approle(), &store, RunOptions::default())
        .await
        .unwrap();

    // Warnings only
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(vault.auth_count(), 1);
    assert_eq!(summary.degraded.len(), 3);
    assert!(summary
        .users
        .iter()
        .all(|u| u.provenance == Provenance::Fallback));
    assert_eq!(store.password_of("jenkins").as_deref(), Some("jenkins-fallback"));
}

#[tokio::test]
async fn test_missing_approle_credentials_degrade_without_login() {
    let (_dir, path) = write_config(&standard_config(), &[]);
    let vault = healthy_vault();
    let store = FakeObjectStore::new().with_policy("readwrite");

    let summary = run_from_path(&path, &vault, None, &store, RunOptions::default())
        .await
        .unwrap();

    assert!(vault.calls().is_empty());
    assert_eq!(summary.skipped.len(), 1);
    assert!(summary.skipped[0].reason.contains("VAULT_ROLE_ID"));
}

#[tokio::test]
async fn test_malformed_config_touches_nothing() {
    let config = json!({
        "buckets": ["backups"],
        "users": [
            { "vault_path": USERS_PATH, "policies": ["readwrite"] }
        ]
    });
    let (_dir, path) = write_config(&config, &[]);
    let vault = healthy_vault();
    let store = FakeObjectStore::new();

    let err = run_from_path(&path, &vault, approle(), &store, RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ConfigError::MissingField { ref field, .. } if field == "name"));
    assert!(vault.calls().is_empty());
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_precedence_switch_prefers_config_password() {
    let config = json!({
        "buckets": [],
        "users": [
            { "name": "ci", "vault_path": USERS_PATH, "password": "legacy-password" }
        ]
    });
    let (_dir, path) = write_config(&config, &[]);
    let store = FakeObjectStore::new();

    let vault = healthy_vault();
    let summary = run_from_path(&path, &vault, approle(), &store, RunOptions::default())
        .await
        .unwrap();
    assert_eq!(summary.users[0].provenance, Provenance::SecretStore);
    assert_eq!(store.password_of("ci").as_deref(), Some(VAULT_PASSWORD));

    let vault = healthy_vault();
    let options = RunOptions {
        precedence: CredentialPrecedence::FallbackFirst,
    };
    let summary = run_from_path(&path, &vault, approle(), &store, options)
        .await
        .unwrap();
    assert_eq!(summary.users[0].provenance, Provenance::Fallback);
    assert_eq!(store.password_of("ci").as_deref(), Some("legacy-password"));
    assert!(vault.calls().is_empty());
}

#[tokio::test]
async fn test_binding_to_missing_policy_fails_loudly() {
    let config = json!({
        "buckets": [],
        "users": [
            { "name": "ci", "password": "ci-password", "policies": ["readwrite", "ghost"] }
        ]
    });
    let (_dir, path) = write_config(&config, &[]);
    let vault = FakeVault::new();
    let store = FakeObjectStore::new().with_policy("readwrite");

    let summary = run_from_path(&path, &vault, approle(), &store, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.exit_code(), EXIT_FAILURE);
    assert_eq!(
        summary.failures,
        vec![ProvisioningError::PolicyNotFound {
            user: "ci".to_string(),
            policy: "ghost".to_string(),
        }]
    );
    assert!(store.has_binding("ci", "readwrite"));
}

#[tokio::test]
async fn test_policy_documents_uploaded_before_binding() {
    let config = json!({
        "buckets": ["artifacts"],
        "policies": [{ "name": "ci-rw", "file": "policies/ci-rw.json" }],
        "users": [{ "name": "ci", "password": "ci-password", "policy": "ci-rw.json" }]
    });
    let policy = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Action":["s3:*"],"Resource":["arn:aws:s3:::artifacts/*"]}]}"#;
    let (_dir, path) = write_config(&config, &[("policies/ci-rw.json", policy)]);
    let vault = FakeVault::new();
    let store = FakeObjectStore::new();

    let summary = run_from_path(&path, &vault, approle(), &store, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.exit_code(), 0);
    assert_eq!(
        store.calls(),
        vec![
            "bucket_exists artifacts",
            "make_bucket artifacts",
            "add_policy ci-rw",
            "add_user ci",
            "attach_policy ci ci-rw",
        ]
    );
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let (_dir, path) = write_config(&standard_config(), &[]);
    let store = FakeObjectStore::new().with_policy("readwrite");

    let first = run_from_path(&path, &healthy_vault(), approle(), &store, RunOptions::default())
        .await
        .unwrap();
    let second = run_from_path(&path, &healthy_vault(), approle(), &store, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(first.exit_code(), 0);
    assert_eq!(second.exit_code(), 0);
    assert!(second
        .buckets
        .iter()
        .all(|b| b.outcome == EnsureOutcome::AlreadyPresent));
    assert!(second
        .bindings
        .iter()
        .all(|b| b.outcome == EnsureOutcome::AlreadyPresent));
    assert_eq!(store.bucket_names().len(), 3);
}

#[tokio::test]
async fn test_bucket_failure_does_not_stop_run() {
    let (_dir, path) = write_config(&standard_config(), &[]);
    let vault = healthy_vault();
    let store = FakeObjectStore::new()
        .with_policy("readwrite")
        .denying_bucket("artifacts");

    let summary = run_from_path(&path, &vault, approle(), &store, RunOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.exit_code(), EXIT_FAILURE);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(store.bucket_names(), vec!["backups", "logs"]);
    assert_eq!(summary.users.len(), 2);
}

#[tokio::test]
async fn test_passwords_never_reach_logs_or_reports() {
    let config = json!({
        "buckets": ["backups"],
        "users": [
            { "name": "ci", "vault_path": USERS_PATH, "password": "ci-fallback-password" },
            { "name": "missing", "vault_path": USERS_PATH, "password": "missing-fallback-password" },
            { "name": "backup", "password": LITERAL_PASSWORD, "policies": ["ghost"] }
        ]
    });
    let (_dir, path) = write_config(&config, &[]);
    let secrets = [
        VAULT_PASSWORD,
        LITERAL_PASSWORD,
        "ci-fallback-password",
        "missing-fallback-password",
        "approle-secret-id",
        common::SESSION_TOKEN,
    ];

    let scenarios = [
        healthy_vault(),
        healthy_vault().failing_auth(AuthError::Rejected { code: 400 }),
        healthy_vault().failing_auth(AuthError::Unreachable {
            message: "connection refused".to_string(),
        }),
    ];

    for vault in scenarios {
        let store = FakeObjectStore::new();
        let (logs, _guard) = capture_logs();

        let summary = run_from_path(&path, &vault, approle(), &store, RunOptions::default())
            .await
            .unwrap();

        let mut output = logs.contents();
        for line in summary.report() {
            output.push_str(&line.text);
            output.push('\n');
        }
        for failure in &summary.failures {
            output.push_str(&failure.to_string());
        }
        output.push_str(&format!("{:?}", summary));

        assert!(output.contains("ci"));
        for secret in secrets {
            assert!(
                !output.contains(secret),
                "secret leaked into diagnostics:\n{}",
                output
            );
        }
    }
}
