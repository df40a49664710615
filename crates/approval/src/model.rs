// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Closed types for the HITL approval lifecycle.

use chrono::{DateTime, Utc};
use fte_core::simple_display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Payment,
    Deploy,
    Delete,
    Email,
    Execute,
    Unknown,
}

simple_display! {
    ActionType {
        Payment => "payment",
        Deploy => "deploy",
        Delete => "delete",
        Email => "email",
        Execute => "execute",
        Unknown => "unknown",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Timeout,
}

impl ApprovalStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A single HITL approval record, persisted as a Markdown file in
/// `Approvals/` with every field carried in the YAML frontmatter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub approval_id: String,
    pub task_id: String,
    pub nonce: String,
    pub action_type: ActionType,
    pub risk_level: RiskLevel,
    pub approval_status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub integrity_hash: String,
    #[serde(default)]
    pub action: BTreeMap<String, serde_yaml::Value>,
}

impl ApprovalRequest {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
