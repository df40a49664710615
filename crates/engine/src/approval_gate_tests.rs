// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fte_store::{AuditLog, NonceRegister};
use std::sync::Arc;
use tempfile::tempdir;

fn make_gate(dir: &std::path::Path) -> ApprovalGate {
    let approvals_dir = dir.join("Approvals");
    std::fs::create_dir_all(&approvals_dir).unwrap();
    let nonces = Arc::new(NonceRegister::new(dir.join("nonces.json")));
    let audit = Arc::new(AuditLog::new(dir.join("audit.jsonl")));
    let manager = ApprovalManager::new(approvals_dir.clone(), nonces, audit);
    ApprovalGate::new(ApprovalGateConfig::default(), approvals_dir, manager)
}

#[test]
fn plain_task_does_not_require_approval() {
    let dir = tempdir().unwrap();
    let gate = make_gate(dir.path());
    assert!(!gate.requires_approval("Just a routine status update, nothing scary here."));
}

#[test]
fn deploy_keyword_requires_approval_and_maps_to_deploy_action() {
    let dir = tempdir().unwrap();
    let gate = make_gate(dir.path());
    let body = "Please deploy the new release to production.";
    assert!(gate.requires_approval(body));
    let keywords = gate.matched_keywords(body);
    assert!(keywords.contains(&"deploy".to_string()));
    assert_eq!(derive_action_type(&keywords), ActionType::Deploy);
}

#[test]
fn payment_keyword_maps_to_payment_action() {
    let dir = tempdir().unwrap();
    let gate = make_gate(dir.path());
    let body = "Send a wire payment to the vendor.";
    let keywords = gate.matched_keywords(body);
    assert_eq!(derive_action_type(&keywords), ActionType::Payment);
}

#[test]
fn newly_created_request_is_not_yet_approved() {
    let dir = tempdir().unwrap();
    let gate = make_gate(dir.path());
    let task_path = dir.path().join("TASK-1.md");
    let body = "Please delete the stale backups.";
    std::fs::write(&task_path, body).unwrap();
    gate.create_approval_request(&task_path, body).unwrap();
    assert!(!gate.is_approved("TASK-1").unwrap());
}

#[test]
fn approving_through_the_manager_is_visible_to_the_gate() {
    let dir = tempdir().unwrap();
    let gate = make_gate(dir.path());
    let task_path = dir.path().join("TASK-2.md");
    let body = "Please delete the stale backups.";
    std::fs::write(&task_path, body).unwrap();
    let request = gate.create_approval_request(&task_path, body).unwrap();
    gate.manager.approve(&request.approval_id).unwrap();
    assert!(gate.is_approved("TASK-2").unwrap());
}

#[test]
fn legacy_markdown_approval_is_honored_as_a_fallback() {
    let dir = tempdir().unwrap();
    let gate = make_gate(dir.path());
    let legacy_path = dir.path().join("Approvals").join("TASK-3-approval.md");
    std::fs::write(&legacy_path, "Status: approved by manager").unwrap();
    assert!(gate.is_approved("TASK-3").unwrap());
}

#[test]
fn legacy_markdown_still_pending_is_not_approved() {
    let dir = tempdir().unwrap();
    let gate = make_gate(dir.path());
    let legacy_path = dir.path().join("Approvals").join("TASK-4-approval.md");
    std::fs::write(&legacy_path, "Status: approved, pending final signoff").unwrap();
    assert!(!gate.is_approved("TASK-4").unwrap());
}

#[test]
fn legacy_fallback_disabled_ignores_markdown_files() {
    let dir = tempdir().unwrap();
    let approvals_dir = dir.path().join("Approvals");
    std::fs::create_dir_all(&approvals_dir).unwrap();
    let nonces = Arc::new(NonceRegister::new(dir.path().join("nonces.json")));
    let audit = Arc::new(AuditLog::new(dir.path().join("audit.jsonl")));
    let manager = ApprovalManager::new(approvals_dir.clone(), nonces, audit);
    let config = ApprovalGateConfig { allow_legacy_fallback: false, ..ApprovalGateConfig::default() };
    let gate = ApprovalGate::new(config, approvals_dir.clone(), manager);

    std::fs::write(approvals_dir.join("TASK-5-approval.md"), "approved").unwrap();
    assert!(!gate.is_approved("TASK-5").unwrap());
}
