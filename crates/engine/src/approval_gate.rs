// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Approval gate (C10): HITL trigger. Scans a task body for
//! approval-required keywords and, if present, hands off to
//! [`fte_approval::ApprovalManager`] to create and check structured
//! approval requests.
//!
//! Zero-bypass guarantee: a keyword match always routes through the
//! manager; there is no code path that executes a flagged task without
//! an `approved` record in `/Approvals`.

use std::collections::BTreeMap;
use std::path::Path;

use fte_approval::{ActionType, ApprovalError, ApprovalManager, ApprovalRequest};
use regex::Regex;
use serde_yaml::Value;

const DEFAULT_KEYWORDS: [&str; 8] =
    ["deploy", "production", "delete", "payment", "wire", "send email", "execute", "remove"];

const ACTION_TYPE_MAP: [(&[&str], ActionType); 5] = [
    (&["payment", "wire"], ActionType::Payment),
    (&["deploy", "production"], ActionType::Deploy),
    (&["delete", "remove"], ActionType::Delete),
    (&["send email", "email"], ActionType::Email),
    (&["execute"], ActionType::Execute),
];

fn derive_action_type(keywords: &[String]) -> ActionType {
    let lower: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    for (triggers, action_type) in ACTION_TYPE_MAP {
        if triggers.iter().any(|t| lower.iter().any(|k| k == t)) {
            return action_type;
        }
    }
    ActionType::Unknown
}

#[derive(Debug, Clone)]
pub struct ApprovalGateConfig {
    pub keywords: Vec<String>,
    /// Accept a hand-written approval file containing "approved" (and not
    /// "pending") in its body, as a fallback when no structured
    /// [`ApprovalManager`] record exists for the task.
    pub allow_legacy_fallback: bool,
}

impl Default for ApprovalGateConfig {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            allow_legacy_fallback: true,
        }
    }
}

/// Keyword scanner plus the structured-approval lifecycle it gates.
pub struct ApprovalGate {
    config: ApprovalGateConfig,
    patterns: Vec<Regex>,
    approvals_dir: std::path::PathBuf,
    manager: ApprovalManager,
}

impl ApprovalGate {
    pub fn new(config: ApprovalGateConfig, approvals_dir: impl Into<std::path::PathBuf>, manager: ApprovalManager) -> Self {
        let patterns = config
            .keywords
            .iter()
            .map(|kw| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(kw))))
            .filter_map(Result::ok)
            .collect();
        Self { config, patterns, approvals_dir: approvals_dir.into(), manager }
    }

    pub fn requires_approval(&self, body: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(body))
    }

    pub fn matched_keywords(&self, body: &str) -> Vec<String> {
        self.config
            .keywords
            .iter()
            .zip(&self.patterns)
            .filter(|(_, p)| p.is_match(body))
            .map(|(kw, _)| kw.clone())
            .collect()
    }

    /// Structured approval first; if absent and legacy fallback is
    /// enabled, accept a hand-written Markdown file under `/Approvals`
    /// whose name contains `task_id` and whose body says "approved"
    /// without also saying "pending".
    pub fn is_approved(&self, task_id: &str) -> Result<bool, ApprovalError> {
        if self.manager.is_approved(task_id)? {
            return Ok(true);
        }
        if !self.config.allow_legacy_fallback {
            return Ok(false);
        }
        Ok(self.legacy_is_approved(task_id))
    }

    fn legacy_is_approved(&self, task_id: &str) -> bool {
        let Ok(entries) = std::fs::read_dir(&self.approvals_dir) else {
            return false;
        };
        let lower_stem = task_id.to_lowercase();
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
            if !name.to_lowercase().contains(&lower_stem) {
                continue;
            }
            if let Ok(body) = std::fs::read_to_string(&path) {
                let lower_body = body.to_lowercase();
                if lower_body.contains("approved") && !lower_body.contains("pending") {
                    return true;
                }
            }
        }
        false
    }

    pub fn create_approval_request(&self, task_path: &Path, body: &str) -> Result<ApprovalRequest, ApprovalError> {
        let task_id = task_path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
        let keywords = self.matched_keywords(body);
        let action_type = derive_action_type(&keywords);
        let action: BTreeMap<String, Value> = BTreeMap::new();
        self.manager.create(&task_id, action_type, &keywords, action)
    }
}

#[cfg(test)]
#[path = "approval_gate_tests.rs"]
mod tests;
