// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audit log (C2): append-only JSON-lines event stream.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A single audit line. `event_type` plus a free-form payload, tagged the
/// way the orchestrator's event vocabulary requires (`state_transition`,
/// `approval_created`, `mcp_action`, ...). Kept untyped here so every
/// producing crate can serialize its own event shape without `fte-store`
/// depending on them; readers deserialize into [`serde_json::Value`] and
/// leave interpretation to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Append-only, single-writer-per-process JSON-lines log. The internal
/// mutex serializes concurrent appends from multiple tasks within one
/// process; cross-process safety is out of scope (one scheduler per
/// vault, per the concurrency model).
pub struct AuditLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `event_type` + `fields` as one JSON line. Crash-safe in the
    /// sense that a torn write only ever affects the last line; readers
    /// skip unparseable trailing lines.
    pub fn append<T: Serialize>(&self, event_type: &str, fields: &T) -> Result<(), AuditError> {
        let _guard = self.lock.lock();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| AuditError::Io { path: parent.to_path_buf(), source: e })?;
        }
        let mut value = serde_json::to_value(fields)?;
        if let Some(map) = value.as_object_mut() {
            map.insert("timestamp".to_string(), serde_json::Value::String(Utc::now().to_rfc3339()));
            map.insert("event_type".to_string(), serde_json::Value::String(event_type.to_string()));
        } else {
            value = serde_json::json!({
                "timestamp": Utc::now().to_rfc3339(),
                "event_type": event_type,
                "value": value,
            });
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AuditError::Io { path: self.path.clone(), source: e })?;
        let line = serde_json::to_string(&value)?;
        writeln!(file, "{line}").map_err(|e| AuditError::Io { path: self.path.clone(), source: e })?;
        Ok(())
    }

    /// Read every parseable line; a malformed trailing line (torn write)
    /// is silently skipped rather than failing the whole read.
    pub fn read_all(&self) -> Result<Vec<AuditRecord>, AuditError> {
        let Ok(file) = fs::File::open(&self.path) else {
            return Ok(Vec::new());
        };
        let reader = BufReader::new(file);
        let mut out = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|e| AuditError::Io { path: self.path.clone(), source: e })?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(record) = serde_json::from_str::<AuditRecord>(&line) {
                out.push(record);
            }
        }
        Ok(out)
    }

    /// Last `n` parseable records.
    pub fn query_recent(&self, n: usize) -> Result<Vec<AuditRecord>, AuditError> {
        let mut all = self.read_all()?;
        if all.len() > n {
            all.drain(..all.len() - n);
        }
        Ok(all)
    }

    /// Records matching `predicate`, optionally restricted to records at
    /// or after `since`.
    pub fn filter(
        &self,
        since: Option<DateTime<Utc>>,
        predicate: impl Fn(&AuditRecord) -> bool,
    ) -> Result<Vec<AuditRecord>, AuditError> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| since.map_or(true, |s| r.timestamp >= s))
            .filter(predicate)
            .collect())
    }
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
