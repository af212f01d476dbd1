//! Scheduler configuration structures.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Longest accepted retention window: one year.
pub const MAX_RETENTION_HOURS: u64 = 24 * 365;
/// Longest accepted cleanup sweep period: one week.
pub const MAX_CLEANUP_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;
/// Longest accepted progress broadcast period: one hour.
pub const MAX_PROGRESS_INTERVAL_MS: u64 = 60 * 60 * 1000;

/// Task store / queue backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum StoreBackendConfig {
    /// In-memory backends for development/testing. Nothing survives a restart.
    #[default]
    InMemory,
    /// JSON files under `path` for both task records and the queue.
    File {
        /// Root directory.
        path: PathBuf,
    },
}

/// Root scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Execution slots: tasks allowed to run at once.
    pub max_concurrent: usize,
    /// Pending + running tasks allowed before creation is rejected.
    pub max_active_tasks: usize,
    /// Failed runs tolerated before a task fails for good.
    pub max_retries: u32,
    /// Backoff base: the delay before retry `n` is `base^n` seconds.
    pub retry_base_secs: u64,
    /// How often running tasks broadcast progress, in milliseconds.
    pub progress_interval_ms: u64,
    /// How long terminal tasks are kept, in hours.
    pub retention_hours: u64,
    /// How often the cleanup sweep runs, in seconds.
    pub cleanup_interval_secs: u64,
    /// Per-subscriber buffer of the default broadcast sink.
    pub event_buffer: usize,
    /// Backend selection.
    pub store: StoreBackendConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            max_active_tasks: 15,
            max_retries: 3,
            retry_base_secs: 2,
            progress_interval_ms: 500,
            retention_hours: 6,
            cleanup_interval_secs: 10 * 60,
            event_buffer: 256,
            store: StoreBackendConfig::InMemory,
        }
    }
}

impl SchedulerConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent == 0 {
            return Err("max_concurrent must be greater than 0".into());
        }
        if self.max_active_tasks == 0 {
            return Err("max_active_tasks must be greater than 0".into());
        }
        if self.retry_base_secs == 0 {
            return Err("retry_base_secs must be greater than 0".into());
        }
        if !(1..=MAX_PROGRESS_INTERVAL_MS).contains(&self.progress_interval_ms) {
            return Err(format!(
                "progress_interval_ms must be between 1 and {MAX_PROGRESS_INTERVAL_MS}"
            ));
        }
        if !(1..=MAX_RETENTION_HOURS).contains(&self.retention_hours) {
            return Err(format!("retention_hours must be between 1 and {MAX_RETENTION_HOURS}"));
        }
        if !(1..=MAX_CLEANUP_INTERVAL_SECS).contains(&self.cleanup_interval_secs) {
            return Err(format!(
                "cleanup_interval_secs must be between 1 and {MAX_CLEANUP_INTERVAL_SECS}"
            ));
        }
        if self.event_buffer == 0 {
            return Err("event_buffer must be greater than 0".into());
        }
        if let StoreBackendConfig::File { path } = &self.store {
            if path.as_os_str().is_empty() {
                return Err("store path must not be empty".into());
            }
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    /// Recognised variables: `TASK_MAX_CONCURRENT`, `TASK_MAX_ACTIVE`,
    /// `TASK_MAX_RETRIES`, `TASK_RETRY_BASE_SECS`, `TASK_PROGRESS_INTERVAL_MS`,
    /// `TASK_RETENTION_HOURS`, `TASK_CLEANUP_INTERVAL_SECS`, `TASK_EVENT_BUFFER`
    /// and `TASK_STORE_PATH` (selects the file backend).
    ///
    /// # Errors
    ///
    /// Fails if a variable cannot be parsed or the result does not validate.
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] but reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Fails if a variable cannot be parsed or the result does not validate.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        override_from(&lookup, "TASK_MAX_CONCURRENT", &mut cfg.max_concurrent)?;
        override_from(&lookup, "TASK_MAX_ACTIVE", &mut cfg.max_active_tasks)?;
        override_from(&lookup, "TASK_MAX_RETRIES", &mut cfg.max_retries)?;
        override_from(&lookup, "TASK_RETRY_BASE_SECS", &mut cfg.retry_base_secs)?;
        override_from(&lookup, "TASK_PROGRESS_INTERVAL_MS", &mut cfg.progress_interval_ms)?;
        override_from(&lookup, "TASK_RETENTION_HOURS", &mut cfg.retention_hours)?;
        override_from(&lookup, "TASK_CLEANUP_INTERVAL_SECS", &mut cfg.cleanup_interval_secs)?;
        override_from(&lookup, "TASK_EVENT_BUFFER", &mut cfg.event_buffer)?;
        if let Some(path) = lookup("TASK_STORE_PATH").filter(|p| !p.trim().is_empty()) {
            cfg.store = StoreBackendConfig::File { path: path.into() };
        }
        cfg.validate()
            .map_err(anyhow::Error::msg)
            .context("invalid scheduler configuration")?;
        Ok(cfg)
    }

    /// Retention window for terminal tasks. Saturates for unvalidated values.
    #[must_use]
    pub const fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours.saturating_mul(60 * 60))
    }

    /// Cleanup sweep period.
    #[must_use]
    pub const fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    /// Progress broadcast period.
    #[must_use]
    pub const fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

fn override_from<F, T>(lookup: &F, key: &str, slot: &mut T) -> AppResult<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has invalid value `{raw}`"))?;
    }
    Ok(())
}
