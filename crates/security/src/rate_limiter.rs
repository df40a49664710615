// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate limiter (C11): per-`(server, action_type)` token bucket with
//! persisted state.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use fte_core::Clock;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RateLimiterError {
    #[error("rate limit exceeded for {key}: {tokens:.1}/{max_tokens} tokens available")]
    Exceeded { key: String, tokens: f64, max_tokens: f64 },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed rate-limit state: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy)]
struct Limit {
    per_minute: f64,
    per_hour: f64,
}

const DEFAULT_LIMIT: Limit = Limit { per_minute: 60.0, per_hour: 3600.0 };

fn default_limit_for(action_type: &str) -> Limit {
    match action_type {
        "email" => Limit { per_minute: 10.0, per_hour: 100.0 },
        "payment" => Limit { per_minute: 1.0, per_hour: 10.0 },
        "deploy" => Limit { per_minute: 2.0, per_hour: 20.0 },
        _ => DEFAULT_LIMIT,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BucketState {
    max_tokens: f64,
    refill_per_minute: f64,
    tokens: f64,
    last_refill_ms: u64,
}

impl BucketState {
    fn fresh(limit: Limit, now_ms: u64) -> Self {
        Self {
            max_tokens: limit.per_hour,
            refill_per_minute: limit.per_minute,
            tokens: limit.per_hour,
            last_refill_ms: now_ms,
        }
    }

    fn refill(&mut self, now_ms: u64) {
        let elapsed_secs = now_ms.saturating_sub(self.last_refill_ms) as f64 / 1000.0;
        let rate_per_sec = self.refill_per_minute / 60.0;
        self.tokens = (self.tokens + elapsed_secs * rate_per_sec).min(self.max_tokens);
        self.last_refill_ms = now_ms;
    }
}

/// Token-bucket rate limiter keyed by `"server:action_type"`, persisted
/// as a JSON map so state survives process restarts.
pub struct RateLimiter<C: Clock> {
    state_path: PathBuf,
    clock: C,
    buckets: Mutex<HashMap<String, BucketState>>,
}

impl<C: Clock> RateLimiter<C> {
    pub fn new(state_path: impl Into<PathBuf>, clock: C) -> Self {
        let state_path = state_path.into();
        let buckets = Self::load(&state_path).unwrap_or_default();
        Self { state_path, clock, buckets: Mutex::new(buckets) }
    }

    fn load(path: &Path) -> Result<HashMap<String, BucketState>, RateLimiterError> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(RateLimiterError::Io { path: path.to_path_buf(), source: e }),
        }
    }

    fn persist(&self, buckets: &HashMap<String, BucketState>) -> Result<(), RateLimiterError> {
        if let Some(parent) = self.state_path.parent() {
            fs::create_dir_all(parent).map_err(|e| RateLimiterError::Io { path: parent.to_path_buf(), source: e })?;
        }
        let json = serde_json::to_string_pretty(buckets)?;
        fs::write(&self.state_path, json).map_err(|e| RateLimiterError::Io { path: self.state_path.clone(), source: e })
    }

    fn key(server: &str, action_type: &str) -> String {
        format!("{server}:{action_type}")
    }

    /// Consume `tokens` from the `(server, action_type)` bucket, refilling
    /// first. Fails without mutating state if insufficient tokens remain.
    pub fn consume(&self, server: &str, action_type: &str, tokens: f64) -> Result<(), RateLimiterError> {
        let key = Self::key(server, action_type);
        let now_ms = self.clock.epoch_ms();
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry(key.clone())
            .or_insert_with(|| BucketState::fresh(default_limit_for(action_type), now_ms));
        bucket.refill(now_ms);
        if bucket.tokens < tokens {
            return Err(RateLimiterError::Exceeded { key, tokens: bucket.tokens, max_tokens: bucket.max_tokens });
        }
        bucket.tokens -= tokens;
        self.persist(&buckets)
    }

    /// Non-destructive refill + read.
    pub fn remaining(&self, server: &str, action_type: &str) -> f64 {
        let key = Self::key(server, action_type);
        let now_ms = self.clock.epoch_ms();
        let mut buckets = self.buckets.lock();
        let bucket = buckets
            .entry(key)
            .or_insert_with(|| BucketState::fresh(default_limit_for(action_type), now_ms));
        bucket.refill(now_ms);
        bucket.tokens
    }
}

#[cfg(test)]
#[path = "rate_limiter_tests.rs"]
mod tests;
