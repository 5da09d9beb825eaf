//! vitals.toml configuration parser.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::RegistrantInfo;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_HEARTBEAT_RETRIES: u32 = 3;
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_REPORT_BUFFER: usize = 64;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 4;
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_RETENTION: usize = 1024;

/// Upper bound for every configured duration.
pub const MAX_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid duration for `{field}`: {value:?}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),

    #[error("`{field}` must not exceed {max:?}")]
    TooLarge { field: &'static str, max: Duration },

    #[error("duplicate registrant: {0}")]
    DuplicateRegistrant(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VitalsConfig {
    #[serde(default)]
    pub health: HealthSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub metrics: MetricsSection,
    #[serde(default, rename = "registrant")]
    pub registrants: Vec<RegistrantInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthSection {
    pub interval: Option<String>,
    pub max_heartbeat_retries: Option<u32>,
    pub probe_timeout: Option<String>,
    pub report_buffer: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrySection {
    pub max_attempts: Option<u32>,
    pub base_delay: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSection {
    /// Samples kept per (metric, service) series.
    pub retention: Option<usize>,
}

impl VitalsConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate a TOML document.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: VitalsConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.health.interval()?.is_zero() {
            return Err(ConfigError::Zero("health.interval"));
        }
        if self.health.probe_timeout()?.is_zero() {
            return Err(ConfigError::Zero("health.probe_timeout"));
        }
        self.retry.base_delay()?;
        if self.health.max_heartbeat_retries() == 0 {
            return Err(ConfigError::Zero("health.max_heartbeat_retries"));
        }
        if self.health.report_buffer() == 0 {
            return Err(ConfigError::Zero("health.report_buffer"));
        }
        if self.metrics.retention() == 0 {
            return Err(ConfigError::Zero("metrics.retention"));
        }

        let mut seen = HashSet::new();
        for r in &self.registrants {
            if !seen.insert(r.service_name.as_str()) {
                return Err(ConfigError::DuplicateRegistrant(r.service_name.clone()));
            }
        }
        Ok(())
    }
}

impl HealthSection {
    pub fn interval(&self) -> Result<Duration, ConfigError> {
        resolve_duration("health.interval", self.interval.as_deref(), DEFAULT_INTERVAL)
    }

    pub fn probe_timeout(&self) -> Result<Duration, ConfigError> {
        resolve_duration(
            "health.probe_timeout",
            self.probe_timeout.as_deref(),
            DEFAULT_PROBE_TIMEOUT,
        )
    }

    pub fn max_heartbeat_retries(&self) -> u32 {
        self.max_heartbeat_retries
            .unwrap_or(DEFAULT_MAX_HEARTBEAT_RETRIES)
    }

    pub fn report_buffer(&self) -> usize {
        self.report_buffer.unwrap_or(DEFAULT_REPORT_BUFFER)
    }
}

impl RetrySection {
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS)
    }

    pub fn base_delay(&self) -> Result<Duration, ConfigError> {
        resolve_duration(
            "retry.base_delay",
            self.base_delay.as_deref(),
            DEFAULT_RETRY_BASE_DELAY,
        )
    }
}

impl MetricsSection {
    pub fn retention(&self) -> usize {
        self.retention.unwrap_or(DEFAULT_RETENTION)
    }
}

fn resolve_duration(
    field: &'static str,
    value: Option<&str>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        None => Ok(default),
        Some(s) => {
            let d = parse_duration(s).ok_or_else(|| ConfigError::InvalidDuration {
                field,
                value: s.to_string(),
            })?;
            if d > MAX_DURATION {
                return Err(ConfigError::TooLarge {
                    field,
                    max: MAX_DURATION,
                });
            }
            Ok(d)
        }
    }
}

/// Parse a duration string like "5s", "500ms", "1m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
