// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Nonce register (C3): single-use token issuance and a consumption
//! ledger. The ledger is a single append-only file; operations are
//! serialized per-vault via an internal mutex.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NonceError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 128+ bits of URL-safe randomness per generated nonce (22 nanoid
/// characters from the default 64-symbol alphabet, ~132 bits of entropy).
const NONCE_LEN: usize = 22;

pub struct NonceRegister {
    ledger_path: PathBuf,
    lock: Mutex<()>,
}

impl NonceRegister {
    pub fn new(ledger_path: impl Into<PathBuf>) -> Self {
        Self { ledger_path: ledger_path.into(), lock: Mutex::new(()) }
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    /// Mint a new single-use token. Generation does not consult the
    /// ledger; collision probability at this entropy is negligible.
    pub fn generate(&self) -> String {
        nanoid::nanoid!(NONCE_LEN)
    }

    /// Append `nonce` to the ledger. Does not check for a prior entry;
    /// callers that require single-use enforcement must check
    /// [`is_used`](Self::is_used) first under the same guard.
    pub fn record_used(&self, nonce: &str) -> Result<(), NonceError> {
        let _guard = self.lock.lock();
        if let Some(parent) = self.ledger_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| NonceError::Io { path: parent.to_path_buf(), source: e })?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.ledger_path)
            .map_err(|e| NonceError::Io { path: self.ledger_path.clone(), source: e })?;
        writeln!(file, "{nonce}")
            .map_err(|e| NonceError::Io { path: self.ledger_path.clone(), source: e })
    }

    pub fn is_used(&self, nonce: &str) -> Result<bool, NonceError> {
        let _guard = self.lock.lock();
        self.load_set().map(|set| set.contains(nonce))
    }

    fn load_set(&self) -> Result<HashSet<String>, NonceError> {
        match fs::read_to_string(&self.ledger_path) {
            Ok(contents) => Ok(contents.lines().map(|l| l.to_string()).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashSet::new()),
            Err(e) => Err(NonceError::Io { path: self.ledger_path.clone(), source: e }),
        }
    }
}

#[cfg(test)]
#[path = "nonce_tests.rs"]
mod tests;
