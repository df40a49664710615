// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Approval manager (C5): full lifecycle of HITL approval records with a
//! zero-bypass guarantee — an approval that is expired, replayed, or
//! tampered can never transition to `approved`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use fte_store::{frontmatter, AuditLog, NonceRegister};
use serde_yaml::Value;
use thiserror::Error;

use crate::model::{ActionType, ApprovalRequest, ApprovalStatus, RiskLevel};

pub const DEFAULT_TIMEOUT_HOURS: i64 = 12;
const HIGH_RISK_TYPES: [ActionType; 2] = [ActionType::Payment, ActionType::Deploy];

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed approval file {path}: {source}")]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: frontmatter::FrontmatterError,
    },
    #[error("no approval found for id {0}")]
    NotFound(String),
    #[error("approval {0} is not pending (status guard failed)")]
    NotPending(String),
    #[error("approval {0} has expired")]
    Expired(String),
    #[error("nonce for approval {0} has already been used")]
    NonceReplayed(String),
    #[error("integrity check failed for approval {0}")]
    IntegrityMismatch(String),
    #[error(transparent)]
    Nonce(#[from] fte_store::NonceError),
    #[error(transparent)]
    Audit(#[from] fte_store::AuditError),
}

/// Full HITL approval lifecycle. Holds the directory approval files live
/// in plus the shared nonce ledger and audit log.
pub struct ApprovalManager {
    approvals_dir: PathBuf,
    nonces: Arc<NonceRegister>,
    audit: Arc<AuditLog>,
}

impl ApprovalManager {
    pub fn new(approvals_dir: impl Into<PathBuf>, nonces: Arc<NonceRegister>, audit: Arc<AuditLog>) -> Self {
        Self { approvals_dir: approvals_dir.into(), nonces, audit }
    }

    fn file_path(&self, approval_id: &str) -> PathBuf {
        self.approvals_dir.join(format!("{approval_id}.md"))
    }

    /// Derive `risk_level` from `action_type` and, for payment/wire, an
    /// `amount` field in `action` (bumped to `critical` above 10,000).
    fn classify_risk(action_type: ActionType, action: &BTreeMap<String, Value>) -> RiskLevel {
        match action_type {
            ActionType::Payment => {
                let amount = action.get("amount").and_then(Value::as_f64).unwrap_or(0.0);
                if amount > 10_000.0 {
                    RiskLevel::Critical
                } else {
                    RiskLevel::High
                }
            }
            t if HIGH_RISK_TYPES.contains(&t) || t == ActionType::Delete => RiskLevel::High,
            _ => RiskLevel::Medium,
        }
    }

    /// Deterministic Markdown body: re-rendering the same fields produces
    /// a byte-identical string, which is what lets the integrity hash be
    /// recomputed and compared on `approve`.
    fn render_body(request: &ApprovalRequest, keywords: &[String]) -> String {
        let mut out = String::new();
        out.push_str("# Approval Request\n\n");
        out.push_str(&format!("**Action Type**: {}\n", request.action_type));
        out.push_str(&format!("**Risk Level**: {}\n", risk_level_str(request.risk_level)));
        out.push_str(&format!("**Task ID**: {}\n", request.task_id));
        out.push_str(&format!("**Created**: {}\n", request.created_at.to_rfc3339()));
        out.push_str(&format!("**Expires**: {}\n", request.expires_at.to_rfc3339()));
        if !keywords.is_empty() {
            out.push_str(&format!("**Triggered By**: {}\n", keywords.join(", ")));
        }
        out.push_str("\n## Action Details\n\n");
        for (key, value) in &request.action {
            out.push_str(&format!("- **{key}**: {value:?}\n"));
        }
        out.push_str("\n## How to Respond\n\n");
        out.push_str(&format!(
            "```\nfte vault approve {}\nfte vault reject {} --reason \"...\"\n```\n",
            request.approval_id, request.approval_id
        ));
        out.push_str(&format!("\n<!-- nonce: {} -->\n", request.nonce));
        out
    }

    pub fn create(
        &self,
        task_id: &str,
        action_type: ActionType,
        keywords: &[String],
        action: BTreeMap<String, Value>,
    ) -> Result<ApprovalRequest, ApprovalError> {
        let now = Utc::now();
        let nonce = self.nonces.generate();
        let approval_id = format!("APR-{task_id}-{}", now.format("%Y%m%d%H%M"));
        let risk_level = Self::classify_risk(action_type, &action);
        let expires_at = now + ChronoDuration::hours(DEFAULT_TIMEOUT_HOURS);

        let mut request = ApprovalRequest {
            approval_id: approval_id.clone(),
            task_id: task_id.to_string(),
            nonce,
            action_type,
            risk_level,
            approval_status: ApprovalStatus::Pending,
            created_at: now,
            expires_at,
            integrity_hash: String::new(),
            action,
        };
        let body = Self::render_body(&request, keywords);
        request.integrity_hash = fte_store::integrity::compute_hash(&body);

        let path = self.file_path(&approval_id);
        self.write(&request, &body, &path)?;

        self.audit.append(
            "approval_created",
            &serde_json::json!({
                "approval_id": request.approval_id,
                "task_id": request.task_id,
                "action_type": request.action_type.to_string(),
                "risk_level": risk_level_str(request.risk_level),
                "status": "pending",
            }),
        )?;
        Ok(request)
    }

    fn write(&self, request: &ApprovalRequest, body: &str, path: &Path) -> Result<(), ApprovalError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ApprovalError::Io { path: parent.to_path_buf(), source: e })?;
        }
        let rendered = frontmatter::render(request, body)
            .map_err(|e| ApprovalError::Frontmatter { path: path.to_path_buf(), source: e })?;
        fs::write(path, rendered).map_err(|e| ApprovalError::Io { path: path.to_path_buf(), source: e })
    }

    fn read(&self, path: &Path) -> Result<(ApprovalRequest, String), ApprovalError> {
        let raw = fs::read_to_string(path).map_err(|e| ApprovalError::Io { path: path.to_path_buf(), source: e })?;
        frontmatter::parse(&raw).map_err(|e| ApprovalError::Frontmatter { path: path.to_path_buf(), source: e })
    }

    pub fn get(&self, approval_id: &str) -> Result<ApprovalRequest, ApprovalError> {
        let path = self.file_path(approval_id);
        if !path.exists() {
            return Err(ApprovalError::NotFound(approval_id.to_string()));
        }
        self.read(&path).map(|(r, _)| r)
    }

    fn list_approval_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(&self.approvals_dir) else {
            return Vec::new();
        };
        entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("md"))
            .collect()
    }

    /// The most recently created approval request for `task_id`, if any.
    pub fn find_for_task(&self, task_id: &str) -> Result<Option<ApprovalRequest>, ApprovalError> {
        let mut matches = Vec::new();
        for path in self.list_approval_files() {
            if let Ok((request, _)) = self.read(&path) {
                if request.task_id == task_id {
                    matches.push(request);
                }
            }
        }
        Ok(matches.into_iter().max_by_key(|r| r.created_at))
    }

    /// Guard chain: status -> expiry -> replay -> integrity. Any failure
    /// aborts with a specific error and leaves the on-disk state
    /// unchanged.
    pub fn approve(&self, approval_id: &str) -> Result<ApprovalRequest, ApprovalError> {
        let path = self.file_path(approval_id);
        if !path.exists() {
            return Err(ApprovalError::NotFound(approval_id.to_string()));
        }
        let (mut request, body) = self.read(&path)?;

        if request.approval_status != ApprovalStatus::Pending {
            return Err(ApprovalError::NotPending(approval_id.to_string()));
        }
        let now = Utc::now();
        if request.is_expired(now) {
            return Err(ApprovalError::Expired(approval_id.to_string()));
        }
        if self.nonces.is_used(&request.nonce)? {
            return Err(ApprovalError::NonceReplayed(approval_id.to_string()));
        }
        if !fte_store::integrity::verify(&body, &request.integrity_hash) {
            return Err(ApprovalError::IntegrityMismatch(approval_id.to_string()));
        }

        request.approval_status = ApprovalStatus::Approved;
        self.write(&request, &body, &path)?;
        self.nonces.record_used(&request.nonce)?;
        self.audit.append(
            "approval_approved",
            &serde_json::json!({
                "approval_id": request.approval_id,
                "task_id": request.task_id,
                "action_type": request.action_type.to_string(),
                "risk_level": risk_level_str(request.risk_level),
                "status": "approved",
            }),
        )?;
        Ok(request)
    }

    pub fn reject(&self, approval_id: &str, reason: Option<&str>) -> Result<ApprovalRequest, ApprovalError> {
        let path = self.file_path(approval_id);
        if !path.exists() {
            return Err(ApprovalError::NotFound(approval_id.to_string()));
        }
        let (mut request, mut body) = self.read(&path)?;
        if request.approval_status != ApprovalStatus::Pending {
            return Err(ApprovalError::NotPending(approval_id.to_string()));
        }
        request.approval_status = ApprovalStatus::Rejected;
        if let Some(reason) = reason {
            body.push_str(&format!("\n> **Rejection reason**: {reason}\n"));
        }
        self.write(&request, &body, &path)?;
        self.audit.append(
            "approval_rejected",
            &serde_json::json!({
                "approval_id": request.approval_id,
                "task_id": request.task_id,
                "action_type": request.action_type.to_string(),
                "risk_level": risk_level_str(request.risk_level),
                "status": "rejected",
                "reason": reason,
            }),
        )?;
        Ok(request)
    }

    /// The most recent request for `task_id` must exist, be `approved`,
    /// and not yet be expired. A previously approved record grants
    /// nothing once its `expires_at` has passed.
    pub fn is_approved(&self, task_id: &str) -> Result<bool, ApprovalError> {
        let Some(request) = self.find_for_task(task_id)? else {
            return Ok(false);
        };
        Ok(request.approval_status == ApprovalStatus::Approved && !request.is_expired(Utc::now()))
    }

    /// Bulk sweep: every `pending` request whose `expires_at` has passed
    /// is flipped to `timeout` and audited.
    pub fn check_expired(&self) -> Result<Vec<ApprovalRequest>, ApprovalError> {
        let now = Utc::now();
        let mut timed_out = Vec::new();
        for path in self.list_approval_files() {
            let Ok((mut request, body)) = self.read(&path) else { continue };
            if request.approval_status == ApprovalStatus::Pending && request.is_expired(now) {
                request.approval_status = ApprovalStatus::Timeout;
                self.write(&request, &body, &path)?;
                self.audit.append(
                    "approval_timeout",
                    &serde_json::json!({
                        "approval_id": request.approval_id,
                        "task_id": request.task_id,
                        "action_type": request.action_type.to_string(),
                        "risk_level": risk_level_str(request.risk_level),
                        "status": "timeout",
                    }),
                )?;
                timed_out.push(request);
            }
        }
        Ok(timed_out)
    }
}

fn risk_level_str(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "low",
        RiskLevel::Medium => "medium",
        RiskLevel::High => "high",
        RiskLevel::Critical => "critical",
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
