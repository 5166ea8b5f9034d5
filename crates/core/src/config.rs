// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration file for poll scheduling and log retention
//!
//! ```toml
//! [polling]
//! update_interval = "60s"
//!
//! [retention]
//! storage_cutoff = 1000        # or "unbounded"
//! display_cutoff = 1000        # or "unbounded"
//! ```

use crate::adapter::PollConfig;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default number of entries retained and displayed per log owner
pub const DEFAULT_CUTOFF: usize = 1000;

/// Errors that can occur loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub polling: PollingConfig,
    pub retention: RetentionConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Interval between polls for poll-driven adapters
    #[serde(with = "humantime_serde")]
    pub update_interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            update_interval: PollConfig::default().update_interval,
        }
    }
}

/// Retention limits. `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    #[serde(with = "cutoff")]
    pub storage_cutoff: Option<usize>,
    #[serde(with = "cutoff")]
    pub display_cutoff: Option<usize>,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            storage_cutoff: Some(DEFAULT_CUTOFF),
            display_cutoff: Some(DEFAULT_CUTOFF),
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file. A missing file is an error; use `Config::default()`
    /// when no file is expected.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polling.update_interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "polling.update_interval",
                reason: "must be greater than zero".to_string(),
            });
        }
        for (field, value) in [
            ("retention.storage_cutoff", self.retention.storage_cutoff),
            ("retention.display_cutoff", self.retention.display_cutoff),
        ] {
            if value == Some(0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be positive, or \"unbounded\"".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig::from(&self.polling)
    }
}

impl From<&PollingConfig> for PollConfig {
    fn from(config: &PollingConfig) -> Self {
        PollConfig::every(config.update_interval)
    }
}

/// A cutoff is either a count or the keyword `"unbounded"`
mod cutoff {
    use super::*;

    const UNBOUNDED: &str = "unbounded";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Count(usize),
        Keyword(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(n) => serializer.serialize_u64(*n as u64),
            None => serializer.serialize_str(UNBOUNDED),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Count(n) => Ok(Some(n)),
            Raw::Keyword(k) if k == UNBOUNDED => Ok(None),
            Raw::Keyword(k) => Err(serde::de::Error::custom(format!(
                "expected a count or \"{UNBOUNDED}\", got \"{k}\""
            ))),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
