// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::utils::limits::LimitConfig;

use core::time::Duration;
use std::path::Path;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Executor settings. Every field has a default, so a config file only needs
/// to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Maximum number of statements and loop iterations per run.
    pub max_steps: Option<u64>,
    /// Maximum nesting of script function calls.
    pub max_call_depth: usize,
    /// Wall-clock limit per run, excluding time spent waiting for input.
    pub time_limit_ms: Option<u64>,
    /// Log the translated text of every run at `info` level.
    pub log_translation: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_steps: None,
            max_call_depth: LimitConfig::default().max_call_depth,
            time_limit_ms: None,
            log_translation: false,
        }
    }
}

impl ExecutorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        match std::fs::read_to_string(&path) {
            Ok(c) => Self::from_json_str(&c),
            Err(e) => bail!("Failed to read {}. {e}", path.as_ref().display()),
        }
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        match std::fs::read_to_string(&path) {
            Ok(c) => Self::from_yaml_str(&c),
            Err(e) => bail!("Failed to read {}. {e}", path.as_ref().display()),
        }
    }

    /// Loads json, or yaml when the feature is enabled and the file has a
    /// `.yaml`/`.yml` extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        match ext {
            #[cfg(feature = "yaml")]
            "yaml" | "yml" => Self::from_yaml_file(path),
            #[cfg(not(feature = "yaml"))]
            "yaml" | "yml" => bail!("yaml configuration requires the `yaml` feature"),
            _ => Self::from_json_file(path),
        }
    }

    pub fn limits(&self) -> LimitConfig {
        LimitConfig {
            max_steps: self.max_steps,
            max_call_depth: self.max_call_depth,
            time_limit: self.time_limit_ms.map(Duration::from_millis),
            ..LimitConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() -> Result<()> {
        let config = ExecutorConfig::from_json_str(r#"{ "max_steps": 100 }"#)?;
        assert_eq!(config.max_steps, Some(100));
        assert_eq!(config.max_call_depth, 64);
        assert!(!config.log_translation);
        assert_eq!(config.limits().max_steps, Some(100));
        Ok(())
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(ExecutorConfig::from_json_str(r#"{ "max_step": 1 }"#).is_err());
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn yaml() -> Result<()> {
        let config = ExecutorConfig::from_yaml_str("max_call_depth: 8\ntime_limit_ms: 50\n")?;
        assert_eq!(config.max_call_depth, 8);
        assert_eq!(config.limits().time_limit, Some(Duration::from_millis(50)));
        Ok(())
    }
}
