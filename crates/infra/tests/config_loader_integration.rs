//! Integration tests for configuration loading and runtime bootstrap
//!
//! Tests the end-to-end path from a config file on disk to a wired runtime.

mod support;

use std::io::Write;

use tempfile::{NamedTempFile, TempDir};
use ticketsync_domain::{KeySource, TicketSyncError};
use ticketsync_infra::{config, TicketSyncRuntime};

use support::{jira_source, TEST_CREDENTIAL_KEY, TEST_DB_KEY};

fn write_with_extension(contents: &str, extension: &str) -> std::path::PathBuf {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(contents.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension(extension);
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");
    path
}

#[test]
fn test_load_config_from_json_file() {
    let json_content = r#"{
        "database": {
            "path": "/tmp/ticketsync_integration.db",
            "pool_size": 2,
            "key": { "source": "keychain", "service": "ticketsync-test", "account": "db" }
        },
        "http": { "max_attempts": 5, "user_agent": "ticketsync-tests" },
        "scheduler": { "enabled": false }
    }"#;
    let path = write_with_extension(json_content, "json");

    let config = config::load_from_file(Some(path.clone())).expect("JSON config should load");

    assert_eq!(config.database.path, std::path::PathBuf::from("/tmp/ticketsync_integration.db"));
    assert_eq!(config.database.pool_size, 2);
    assert_eq!(
        config.database.key,
        KeySource::Keychain { service: "ticketsync-test".into(), account: "db".into() }
    );
    assert_eq!(config.http.max_attempts, 5);
    assert_eq!(config.http.user_agent, "ticketsync-tests");
    assert_eq!(config.http.request_timeout_secs, 30);
    assert!(!config.scheduler.enabled);
    assert_eq!(config.logging.filter, "info");

    std::fs::remove_file(path).ok();
}

#[test]
fn test_load_config_from_toml_file() {
    let toml_content = format!(
        r#"
[database]
pool_size = 3

[database.key]
source = "direct"
hex_key = "{TEST_DB_KEY}"

[security.credential_key]
source = "direct"
hex_key = "{TEST_CREDENTIAL_KEY}"

[scheduler]
join_timeout_secs = 10

[logging]
filter = "debug,hyper=warn"
json = true
"#
    );
    let path = write_with_extension(&toml_content, "toml");

    let config = config::load_from_file(Some(path.clone())).expect("TOML config should load");

    assert_eq!(config.database.pool_size, 3);
    assert!(matches!(config.database.key, KeySource::Direct { .. }));
    assert!(matches!(config.security.credential_key, KeySource::Direct { .. }));
    assert_eq!(config.scheduler.join_timeout_secs, 10);
    assert!(config.scheduler.enabled);
    assert!(config.logging.json);

    std::fs::remove_file(path).ok();
}

#[test]
fn test_load_config_from_nonexistent_file() {
    let result = config::load_from_file(Some("/nonexistent/path/ticketsync.json".into()));

    match result {
        Err(TicketSyncError::Configuration(msg)) => {
            assert!(msg.contains("not found"), "Error message should mention 'not found'");
        }
        other => panic!("Expected configuration error, got {other:?}"),
    }
}

#[test]
fn test_load_config_with_invalid_format() {
    let path = write_with_extension(r#"{ "this is": "not valid" "#, "json");

    match config::load_from_file(Some(path.clone())) {
        Err(TicketSyncError::Configuration(msg)) => {
            assert!(msg.contains("Invalid JSON"), "Error message should mention invalid JSON");
        }
        other => panic!("Expected configuration error, got {other:?}"),
    }

    std::fs::remove_file(path).ok();
}

#[test]
fn test_load_config_rejects_short_direct_key() {
    let toml_content = r#"
[security.credential_key]
source = "direct"
hex_key = "abcd"
"#;
    let path = write_with_extension(toml_content, "toml");

    let err = config::load_from_file(Some(path.clone())).unwrap_err();
    assert!(err.to_string().contains("security.credential_key"), "{err}");

    std::fs::remove_file(path).ok();
}

#[tokio::test]
async fn test_runtime_bootstraps_from_loaded_config() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("runtime.db");
    let toml_content = format!(
        r#"
[database]
path = "{}"
pool_size = 2

[database.key]
source = "direct"
hex_key = "{TEST_DB_KEY}"

[security.credential_key]
source = "direct"
hex_key = "{TEST_CREDENTIAL_KEY}"

[scheduler]
enabled = false
"#,
        db_path.display()
    );
    let path = write_with_extension(&toml_content, "toml");
    let config = config::load_from_file(Some(path.clone())).expect("config should load");

    let mut runtime = TicketSyncRuntime::initialize(&config).await.expect("runtime should start");
    assert!(!runtime.scheduler.is_running());
    assert!(db_path.exists());

    let source = jira_source("Jira", "https://jira.example.com");
    runtime.repository.config_store().save(&source).await.unwrap();
    assert!(runtime.repository.has_enabled_sources().await.unwrap());
    assert_eq!(runtime.repository.get_cached_issue_count().await.unwrap(), 0);

    let health = runtime.db.health_check().unwrap();
    assert!(health.healthy);
    assert_eq!(health.max_connections, 2);
    assert!(runtime.db.storage_metrics().connections_acquired >= 3);

    runtime.shutdown().await.expect("shutdown without scheduler is a no-op");
    drop(runtime);

    // Reopening with the same keys sees the saved source
    let runtime = TicketSyncRuntime::initialize(&config).await.expect("runtime should reopen");
    let reloaded = runtime.repository.config_store().get_by_id(&source.id).await.unwrap();
    assert_eq!(reloaded.map(|c| c.name), Some("Jira".to_string()));

    std::fs::remove_file(path).ok();
}
