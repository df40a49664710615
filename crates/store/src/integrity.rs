// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integrity hasher (C4): SHA-256 content hashing for approval bodies,
//! with a constant-time verify so the comparison doesn't leak timing
//! information about where a tampered body first diverges.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of `content`.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex_encode(&hasher.finalize())
}

/// True iff `compute_hash(content) == expected`, compared in constant
/// time over the hex digest bytes so that string equality can't be used
/// as an oracle for partial matches.
pub fn verify(content: &str, expected: &str) -> bool {
    let actual = compute_hash(content);
    constant_time_eq(actual.as_bytes(), expected.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

#[cfg(test)]
#[path = "integrity_tests.rs"]
mod tests;
