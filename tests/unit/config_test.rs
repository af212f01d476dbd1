//! Tests for configuration validation

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use prometheus_task_scheduler::config::{
    SchedulerConfig, StoreBackendConfig, MAX_CLEANUP_INTERVAL_SECS, MAX_PROGRESS_INTERVAL_MS,
    MAX_RETENTION_HOURS,
};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_defaults_are_valid() {
    let cfg = SchedulerConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.max_concurrent, 2);
    assert_eq!(cfg.max_active_tasks, 15);
    assert_eq!(cfg.max_retries, 3);
    assert_eq!(cfg.retention(), Duration::from_secs(6 * 60 * 60));
    assert_eq!(cfg.cleanup_interval(), Duration::from_secs(600));
    assert_eq!(cfg.progress_interval(), Duration::from_millis(500));
    assert_eq!(cfg.store, StoreBackendConfig::InMemory);
}

#[test]
fn test_zero_concurrency_is_invalid() {
    let cfg = SchedulerConfig {
        max_concurrent: 0,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_zero_active_limit_is_invalid() {
    let cfg = SchedulerConfig {
        max_active_tasks: 0,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_empty_store_path_is_invalid() {
    let cfg = SchedulerConfig {
        store: StoreBackendConfig::File {
            path: PathBuf::new(),
        },
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_scheduler_config_from_json() {
    let json = r#"{
        "max_concurrent": 4,
        "retention_hours": 1,
        "store": { "kind": "file", "path": "/var/lib/tasks" }
    }"#;
    let cfg = SchedulerConfig::from_json_str(json).expect("valid config");
    assert_eq!(cfg.max_concurrent, 4);
    assert_eq!(cfg.max_active_tasks, 15);
    assert_eq!(cfg.retention(), Duration::from_secs(3600));
    assert_eq!(
        cfg.store,
        StoreBackendConfig::File {
            path: PathBuf::from("/var/lib/tasks")
        }
    );
}

#[test]
fn test_scheduler_config_from_json_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str(r#"{"max_concurrent": 0}"#).is_err());
    assert!(SchedulerConfig::from_json_str("not json").is_err());
}

#[test]
fn test_env_overrides() {
    let cfg = SchedulerConfig::from_lookup(lookup(&[
        ("TASK_MAX_CONCURRENT", "3"),
        ("TASK_MAX_ACTIVE", " 20 "),
        ("TASK_RETRY_BASE_SECS", "3"),
        ("TASK_STORE_PATH", "/tmp/tasks"),
    ]))
    .expect("valid env");
    assert_eq!(cfg.max_concurrent, 3);
    assert_eq!(cfg.max_active_tasks, 20);
    assert_eq!(cfg.retry_base_secs, 3);
    assert_eq!(
        cfg.store,
        StoreBackendConfig::File {
            path: PathBuf::from("/tmp/tasks")
        }
    );
}

#[test]
fn test_env_unparseable_value_names_variable() {
    let err = SchedulerConfig::from_lookup(lookup(&[("TASK_MAX_RETRIES", "many")])).unwrap_err();
    assert!(format!("{err:#}").contains("TASK_MAX_RETRIES"));
}

#[test]
fn test_env_invalid_value_is_rejected() {
    assert!(SchedulerConfig::from_lookup(lookup(&[("TASK_MAX_CONCURRENT", "0")])).is_err());
}

#[test]
fn test_oversized_periods_are_invalid() {
    let cleanup = SchedulerConfig {
        cleanup_interval_secs: u64::MAX,
        ..SchedulerConfig::default()
    };
    assert!(cleanup.validate().unwrap_err().contains("cleanup_interval_secs"));

    let retention = SchedulerConfig {
        retention_hours: u64::MAX / 1000,
        ..SchedulerConfig::default()
    };
    assert!(retention.validate().unwrap_err().contains("retention_hours"));

    let progress = SchedulerConfig {
        progress_interval_ms: MAX_PROGRESS_INTERVAL_MS + 1,
        ..SchedulerConfig::default()
    };
    assert!(progress.validate().unwrap_err().contains("progress_interval_ms"));
}

#[test]
fn test_period_upper_bounds_are_inclusive() {
    let cfg = SchedulerConfig {
        retention_hours: MAX_RETENTION_HOURS,
        cleanup_interval_secs: MAX_CLEANUP_INTERVAL_SECS,
        progress_interval_ms: MAX_PROGRESS_INTERVAL_MS,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.retention(), Duration::from_secs(MAX_RETENTION_HOURS * 3600));
}

#[test]
fn test_retention_saturates_instead_of_overflowing() {
    let cfg = SchedulerConfig {
        retention_hours: u64::MAX,
        ..SchedulerConfig::default()
    };
    assert_eq!(cfg.retention(), Duration::from_secs(u64::MAX));
}

#[test]
fn test_env_rejects_overflowing_cleanup_interval() {
    let err = SchedulerConfig::from_lookup(lookup(&[(
        "TASK_CLEANUP_INTERVAL_SECS",
        "18446744073709551615",
    )]))
    .unwrap_err();
    assert!(format!("{err:#}").contains("cleanup_interval_secs"));
}
