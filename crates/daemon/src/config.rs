// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler configuration: the values `SchedulerConfig` consumes per
//! `EXTERNAL INTERFACES`. Loaded from YAML with every field defaulted, so
//! a missing or partial config file is never fatal.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("invalid YAML in {path}: {source}")]
    Yaml { path: PathBuf, #[source] source: serde_yaml::Error },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub vault_path: PathBuf,
    pub poll_interval_secs: u64,
    pub max_concurrent_tasks: usize,
    pub agent_binary: String,
    pub agent_timeout_secs: u64,
    pub stop_hook_file: String,
    pub max_iterations: u32,
    pub dry_run: bool,
    pub urgency_weight: f64,
    pub deadline_weight: f64,
    pub sender_weight: f64,
    pub vip_senders: Vec<String>,
    pub approval_keywords: Vec<String>,
    pub allow_legacy_approval_fallback: bool,
    /// Passed to `tracing_subscriber::EnvFilter` at binary entry; a pure
    /// logging concern, so it rides along even though CLI parsing itself
    /// is out of scope.
    pub log_level: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            vault_path: PathBuf::from("."),
            poll_interval_secs: 30,
            max_concurrent_tasks: 5,
            agent_binary: "claude".to_string(),
            agent_timeout_secs: 3600,
            stop_hook_file: ".claude_stop".to_string(),
            max_iterations: 100,
            dry_run: false,
            urgency_weight: 0.4,
            deadline_weight: 0.3,
            sender_weight: 0.3,
            vip_senders: vec!["ceo@company.com".to_string(), "board@company.com".to_string()],
            approval_keywords: vec![
                "deploy".to_string(),
                "production".to_string(),
                "delete".to_string(),
                "payment".to_string(),
                "wire".to_string(),
                "send email".to_string(),
                "execute".to_string(),
                "remove".to_string(),
            ],
            allow_legacy_approval_fallback: true,
            log_level: "info".to_string(),
        }
    }
}

impl SchedulerConfig {
    /// Load from `path`; falls back to [`SchedulerConfig::default`] with a
    /// warning if the file does not exist. A file that exists but fails to
    /// parse is a hard error.
    pub fn from_yaml(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "no config file found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Io { path: path.to_path_buf(), source }),
        };
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Yaml { path: path.to_path_buf(), source })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
