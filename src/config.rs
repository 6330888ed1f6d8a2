//! Layered runtime settings.
//!
//! Built-in defaults, then an optional config file, then `UPWATCH_*`
//! environment variables. Command-line flags are applied on top by the
//! binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::data::duration::parse_duration;
use crate::view::{StalePolicy, ViewSettings};

/// Settings as written in files and environment variables.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawSettings {
    poll_interval: String,
    refresh_period: String,
    idle_threshold: String,
    stale_policy: StalePolicy,
    log_filter: String,
    log_file: Option<PathBuf>,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            poll_interval: "5s".to_string(),
            refresh_period: "1s".to_string(),
            idle_threshold: "60s".to_string(),
            stale_policy: StalePolicy::Retain,
            log_filter: "info".to_string(),
            log_file: None,
        }
    }
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// How often the root source is polled.
    pub poll_interval: Duration,
    /// Period of timestamp refresh.
    pub refresh_period: Duration,
    /// Inactivity before attention may move the view.
    pub idle_threshold: Duration,
    pub stale_policy: StalePolicy,
    /// Filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Where logs go; discarded when unset.
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        // The built-in defaults always parse.
        Self::from_raw(RawSettings::default()).unwrap_or(Self {
            poll_interval: Duration::from_secs(5),
            refresh_period: Duration::from_secs(1),
            idle_threshold: Duration::from_secs(60),
            stale_policy: StalePolicy::Retain,
            log_filter: "info".to_string(),
            log_file: None,
        })
    }
}

impl Settings {
    /// Load settings from an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(Environment::with_prefix("UPWATCH"))
            .build()
            .context("Failed to load configuration")?;
        let raw: RawSettings = config
            .try_deserialize()
            .context("Invalid configuration")?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSettings) -> Result<Self> {
        let duration = |name: &str, value: &str| {
            parse_duration(value).with_context(|| format!("Invalid {}: {:?}", name, value))
        };
        Ok(Self {
            poll_interval: duration("poll_interval", &raw.poll_interval)?,
            refresh_period: duration("refresh_period", &raw.refresh_period)?,
            idle_threshold: duration("idle_threshold", &raw.idle_threshold)?,
            stale_policy: raw.stale_policy,
            log_filter: raw.log_filter,
            log_file: raw.log_file,
        })
    }

    /// The subset of settings the view engine consumes.
    pub fn view_settings(&self) -> ViewSettings {
        ViewSettings {
            idle_threshold: self.idle_threshold,
            refresh_period: self.refresh_period,
            stale_policy: self.stale_policy,
        }
    }
}
