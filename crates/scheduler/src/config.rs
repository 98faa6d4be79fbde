use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound on pool size; each worker is a dedicated OS thread.
pub const MAX_WORKERS: usize = 256;

const ENV_WORKERS: &str = "TASKHIVE_WORKERS";
const ENV_WORKER_TIMEOUT: &str = "TASKHIVE_WORKER_TIMEOUT_MS";
const ENV_WORKER_SLEEP: &str = "TASKHIVE_WORKER_SLEEP_MS";
const ENV_MAX_CALLBACKS: &str = "TASKHIVE_MAX_CALLBACKS";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn parse_or<T: FromStr>(raw: Option<String>, current: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(current)
}

/// Tunables for a [`TaskManager`](crate::TaskManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Worker threads started by `create` when no explicit count is given.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Milliseconds an idle worker keeps yielding before it starts sleeping.
    #[serde(default = "default_worker_inactive_timeout_ms")]
    pub worker_inactive_timeout_ms: u64,
    /// Milliseconds a sleeping worker waits between checks for new work.
    #[serde(default = "default_worker_sleep_ms")]
    pub worker_sleep_ms: u64,
    /// Deferred handlers run per `update` call.
    #[serde(default = "default_max_callbacks_per_update")]
    pub max_callbacks_per_update: usize,
}

fn default_worker_count() -> usize { 5 }
fn default_worker_inactive_timeout_ms() -> u64 { 2000 }
fn default_worker_sleep_ms() -> u64 { 100 }
fn default_max_callbacks_per_update() -> usize { 10 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            worker_inactive_timeout_ms: default_worker_inactive_timeout_ms(),
            worker_sleep_ms: default_worker_sleep_ms(),
            max_callbacks_per_update: default_max_callbacks_per_update(),
        }
    }
}

impl SchedulerConfig {
    /// Defaults overridden by `TASKHIVE_*` environment variables (call
    /// [`load_dotenv`] first to pick up a `.env` file). Unparsable values
    /// keep the default.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Parse config from a TOML string, apply env overrides, then validate.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(env_opt);
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.worker_count = parse_or(lookup(ENV_WORKERS), self.worker_count);
        self.worker_inactive_timeout_ms =
            parse_or(lookup(ENV_WORKER_TIMEOUT), self.worker_inactive_timeout_ms);
        self.worker_sleep_ms = parse_or(lookup(ENV_WORKER_SLEEP), self.worker_sleep_ms);
        self.max_callbacks_per_update =
            parse_or(lookup(ENV_MAX_CALLBACKS), self.max_callbacks_per_update);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::Invalid(
                "worker_count must be at least 1".into(),
            ));
        }
        if self.worker_count > MAX_WORKERS {
            return Err(ConfigError::Invalid(format!(
                "worker_count {} exceeds the maximum of {MAX_WORKERS}",
                self.worker_count
            )));
        }
        if self.max_callbacks_per_update == 0 {
            return Err(ConfigError::Invalid(
                "max_callbacks_per_update must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn worker_inactive_timeout(&self) -> Duration {
        Duration::from_millis(self.worker_inactive_timeout_ms)
    }

    pub fn worker_sleep(&self) -> Duration {
        Duration::from_millis(self.worker_sleep_ms)
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Scheduler config:");
        tracing::info!("  workers:        {}", self.worker_count);
        tracing::info!(
            "  worker idle:    yield for {}ms, then sleep {}ms between checks",
            self.worker_inactive_timeout_ms,
            self.worker_sleep_ms
        );
        tracing::info!("  max callbacks:  {} per update", self.max_callbacks_per_update);
    }
}
