// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn generate_produces_url_safe_token_of_expected_length() {
    let dir = tempdir().unwrap();
    let reg = NonceRegister::new(dir.path().join("nonces.ledger"));
    let nonce = reg.generate();
    assert_eq!(nonce.len(), NONCE_LEN);
    assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
}

#[test]
fn unused_nonce_on_empty_ledger() {
    let dir = tempdir().unwrap();
    let reg = NonceRegister::new(dir.path().join("nonces.ledger"));
    assert!(!reg.is_used("never-seen").unwrap());
}

#[test]
fn record_used_makes_is_used_true() {
    let dir = tempdir().unwrap();
    let reg = NonceRegister::new(dir.path().join("nonces.ledger"));
    let nonce = reg.generate();
    assert!(!reg.is_used(&nonce).unwrap());
    reg.record_used(&nonce).unwrap();
    assert!(reg.is_used(&nonce).unwrap());
}

#[test]
fn each_nonce_is_recorded_independently() {
    let dir = tempdir().unwrap();
    let reg = NonceRegister::new(dir.path().join("nonces.ledger"));
    let a = reg.generate();
    let b = reg.generate();
    reg.record_used(&a).unwrap();
    assert!(reg.is_used(&a).unwrap());
    assert!(!reg.is_used(&b).unwrap());
}
