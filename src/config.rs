//! Service configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::prediction::{LabelSet, DEFAULT_N_TOP};

/// Settings for the registry service, its worker pool and the HTTP surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Queue training jobs are sent to and consumed from.
    pub queue_name: String,
    /// Number of training worker threads.
    pub worker_count: usize,
    /// How long a worker waits on an empty queue before polling again.
    pub poll_interval_ms: u64,
    /// Labels returned by a prediction that does not set `n_top`.
    pub default_n_top: usize,
    /// Refuse predictions from models that are not `active`.
    pub require_active_model: bool,
    pub labels: LabelSet,
    pub http_addr: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            queue_name: "training".to_string(),
            worker_count: 1,
            poll_interval_ms: 50,
            default_n_top: DEFAULT_N_TOP,
            require_active_model: false,
            labels: LabelSet::default(),
            http_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Defaults overlaid with any `TEXTCAT_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup("TEXTCAT_QUEUE_NAME").filter(|v| !v.trim().is_empty()) {
            config.queue_name = name;
        }
        if let Some(addr) = lookup("TEXTCAT_HTTP_ADDR").filter(|v| !v.trim().is_empty()) {
            config.http_addr = addr;
        }
        config.worker_count = parsed(&lookup, "TEXTCAT_WORKER_COUNT", config.worker_count);
        config.poll_interval_ms =
            parsed(&lookup, "TEXTCAT_POLL_INTERVAL_MS", config.poll_interval_ms);
        config.default_n_top = match parsed(&lookup, "TEXTCAT_DEFAULT_N_TOP", config.default_n_top) {
            0 => {
                warn!("TEXTCAT_DEFAULT_N_TOP must be positive, falling back to {}", DEFAULT_N_TOP);
                DEFAULT_N_TOP
            }
            n => n,
        };
        config.require_active_model = parsed(
            &lookup,
            "TEXTCAT_REQUIRE_ACTIVE_MODEL",
            config.require_active_model,
        );

        if let Some(raw) = lookup("TEXTCAT_LABELS") {
            match LabelSet::new(raw.split(',').map(str::trim)) {
                Ok(labels) => config.labels = labels,
                Err(e) => warn!("Invalid TEXTCAT_LABELS='{}' ({}), using defaults", raw, e),
            }
        }

        config
    }
}

fn parsed<F, T>(lookup: &F, key: &str, fallback: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("Invalid {}='{}', falling back to {}", key, raw, fallback);
                fallback
            }
        },
        None => fallback,
    }
}
