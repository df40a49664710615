// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Priority scorer (C7): weighted urgency/deadline/sender scoring with an
//! age-based boost, so tasks cannot starve in `/Needs_Action` forever.
//!
//! `score = urgency_w * urgency + deadline_w * deadline + sender_w * sender + age_boost`,
//! clamped to `[1.0, 5.0]` after the boost is applied.

use std::path::Path;
use std::sync::LazyLock;
use std::time::SystemTime;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PriorityScorerError {
    #[error("io error reading {path}: {source}")]
    Io { path: std::path::PathBuf, #[source] source: std::io::Error },
}

#[derive(Debug, Clone)]
pub struct PriorityScorerConfig {
    pub urgency_weight: f64,
    pub deadline_weight: f64,
    pub sender_weight: f64,
    pub vip_senders: Vec<String>,
}

impl Default for PriorityScorerConfig {
    fn default() -> Self {
        Self {
            urgency_weight: 0.4,
            deadline_weight: 0.3,
            sender_weight: 0.3,
            vip_senders: vec!["ceo@company.com".to_string(), "board@company.com".to_string()],
        }
    }
}

#[allow(clippy::expect_used)]
static URGENCY_KEYWORDS: LazyLock<Vec<(Regex, f64)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"(?i)\bURGENT\b").expect("constant regex pattern is valid"), 5.0),
        (Regex::new(r"(?i)\bASAP\b|(?i)\bhigh.priority\b").expect("constant regex pattern is valid"), 4.0),
        (Regex::new(r"(?i)\blow.priority\b").expect("constant regex pattern is valid"), 2.0),
        (Regex::new(r"(?i)\bwhenever\b|(?i)\bno.rush\b").expect("constant regex pattern is valid"), 1.0),
    ]
});

#[allow(clippy::expect_used)]
static DEADLINE_PATTERNS: LazyLock<Vec<(Regex, f64)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"(?i)by\s+(today|end.of.day|EOD)").expect("constant regex pattern is valid"), 5.0),
        (Regex::new(r"(?i)by\s+(tomorrow|end.of.week|Friday|this week)").expect("constant regex pattern is valid"), 4.0),
        (Regex::new(r"(?i)by\s+(next\s+week|next\s+monday)").expect("constant regex pattern is valid"), 3.0),
        (Regex::new(r"(?i)by\s+(end.of.month|next\s+month)").expect("constant regex pattern is valid"), 2.0),
    ]
});

#[allow(clippy::expect_used)]
static WEEKDAY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)by\s+(friday|monday|tuesday|wednesday|thursday|saturday|sunday)")
        .expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static FROM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*From\*\*:\s*(\S+@\S+)").expect("constant regex pattern is valid"));

#[allow(clippy::expect_used)]
static SENDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)sender[:\s]+(\S+@\S+)").expect("constant regex pattern is valid"));

#[allow(clippy::expect_used)]
static CLIENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)client").expect("constant regex pattern is valid"));

pub struct PriorityScorer {
    config: PriorityScorerConfig,
    vip_set: std::collections::HashSet<String>,
}

impl PriorityScorer {
    pub fn new(config: PriorityScorerConfig) -> Self {
        let vip_set = config.vip_senders.iter().map(|s| s.to_lowercase()).collect();
        Self { config, vip_set }
    }

    /// Read `task_path`, extract urgency/deadline/sender signals, and
    /// return a weighted score with an age-based starvation guard,
    /// clamped to `[1.0, 5.0]`.
    pub fn score(&self, task_path: &Path) -> Result<f64, PriorityScorerError> {
        let text = std::fs::read_to_string(task_path)
            .map_err(|e| PriorityScorerError::Io { path: task_path.to_path_buf(), source: e })?;

        let urgency = self.score_urgency(&text);
        let deadline = self.score_deadline(&text);
        let sender = self.score_sender(&text);
        let age_boost = self.age_boost(task_path);

        let raw = self.config.urgency_weight * urgency
            + self.config.deadline_weight * deadline
            + self.config.sender_weight * sender
            + age_boost;
        Ok(raw.clamp(1.0, 5.0))
    }

    fn score_urgency(&self, text: &str) -> f64 {
        for (pattern, score) in URGENCY_KEYWORDS.iter() {
            if pattern.is_match(text) {
                return *score;
            }
        }
        let lower = text.to_lowercase();
        if text.contains('\u{1F534}') || lower.contains("urgent") {
            5.0
        } else if text.contains('\u{1F7E0}') || lower.contains("high") {
            4.0
        } else if text.contains('\u{1F7E1}') || lower.contains("medium") {
            3.0
        } else if text.contains('\u{1F7E2}') || lower.contains("low") {
            2.0
        } else {
            3.0
        }
    }

    fn score_deadline(&self, text: &str) -> f64 {
        for (pattern, score) in DEADLINE_PATTERNS.iter() {
            if pattern.is_match(text) {
                return *score;
            }
        }
        if WEEKDAY_PATTERN.is_match(text) {
            4.0
        } else {
            1.0
        }
    }

    fn score_sender(&self, text: &str) -> f64 {
        let captured = FROM_PATTERN.captures(text).or_else(|| SENDER_PATTERN.captures(text));
        let Some(captured) = captured else {
            return 2.0;
        };
        let sender = captured[1].trim().to_lowercase();

        if self.vip_set.contains(&sender) {
            return 5.0;
        }
        let preview: String = text.chars().take(500).collect();
        if sender.contains("client") || CLIENT_PATTERN.is_match(&preview) {
            return 4.0;
        }
        let vip_domains: std::collections::HashSet<&str> =
            self.vip_set.iter().filter_map(|s| s.split('@').nth(1)).collect();
        let sender_domain = sender.split('@').nth(1).unwrap_or("");
        if vip_domains.contains(sender_domain) {
            return 3.0;
        }
        2.0
    }

    /// Boost favouring tasks that have been waiting longest, keyed off
    /// the file's last-modified time. Any failure to stat the file (e.g.
    /// it was moved mid-sweep) yields no boost rather than an error.
    fn age_boost(&self, task_path: &Path) -> f64 {
        let Ok(metadata) = std::fs::metadata(task_path) else {
            return 0.0;
        };
        let Ok(modified) = metadata.modified() else {
            return 0.0;
        };
        let age_days = SystemTime::now()
            .duration_since(modified)
            .map(|d| d.as_secs_f64() / 86_400.0)
            .unwrap_or(0.0);

        if age_days >= 7.0 {
            1.0
        } else if age_days >= 3.0 {
            0.5
        } else if age_days >= 1.0 {
            0.25
        } else {
            0.0
        }
    }
}

#[cfg(test)]
#[path = "priority_scorer_tests.rs"]
mod tests;
