// averaging-core/src/config.rs

//! Configuration management for the averaging runtime.
//!
//! This module provides configuration parsing from TOML files, environment
//! variable overrides, and validation of configuration values.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::{AveragingError, Result};

// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AveragingConfig {
    pub averaging: AveragerConfig,
}

// Averaging schedule options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AveragerConfig {
    // Number of optimizer steps between averaging rounds.
    pub period: u64,
    /// Number of leading steps during which averaging runs on every call.
    pub warmup_steps: u64,
}

impl Default for AveragerConfig {
    fn default() -> Self {
        Self {
            period: 4,
            warmup_steps: 0,
        }
    }
}

impl FromStr for AveragingConfig {
    type Err = AveragingError;

    /// Parse configuration from a TOML string.
    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| AveragingError::config_with_source("failed to parse TOML config", e))
    }
}

impl AveragingConfig {
    // Load configuration from a TOML file.
    //
    // # Errors
    //
    // Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AveragingError::config_with_source(
                format!("failed to read config file '{}'", path.display()),
                e,
            )
        })?;
        let config: Self = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    // Apply environment variable overrides.
    //
    // Environment variables are prefixed with `PMA_`:
    // - `PMA_PERIOD` overrides `averaging.period`
    // - `PMA_WARMUP_STEPS` overrides `averaging.warmup_steps`
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("PMA_PERIOD") {
            if let Ok(v) = val.parse() {
                self.averaging.period = v;
            }
        }
        if let Ok(val) = std::env::var("PMA_WARMUP_STEPS") {
            if let Ok(v) = val.parse() {
                self.averaging.warmup_steps = v;
            }
        }
        self
    }

    // Validate all configuration values.
    //
    // # Errors
    //
    // Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.averaging.period < 1 {
            return Err(AveragingError::config(
                "averaging.period must be at least 1",
            ));
        }
        Ok(())
    }
}
