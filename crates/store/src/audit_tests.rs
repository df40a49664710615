// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use tempfile::tempdir;

#[test]
fn empty_log_queries_return_empty() {
    let dir = tempdir().unwrap();
    let log = AuditLog::new(dir.path().join("audit.jsonl"));
    assert!(log.read_all().unwrap().is_empty());
    assert!(log.query_recent(10).unwrap().is_empty());
}

#[test]
fn append_then_read_round_trips_event_type() {
    let dir = tempdir().unwrap();
    let log = AuditLog::new(dir.path().join("audit.jsonl"));
    log.append("state_transition", &json!({"task_id": "t1"})).unwrap();
    log.append("approval_created", &json!({"approval_id": "APR-t1-1"})).unwrap();

    let all = log.read_all().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].event_type, "state_transition");
    assert_eq!(all[1].event_type, "approval_created");
}

#[test]
fn query_recent_returns_last_n() {
    let dir = tempdir().unwrap();
    let log = AuditLog::new(dir.path().join("audit.jsonl"));
    for i in 0..5 {
        log.append("mcp_action", &json!({"seq": i})).unwrap();
    }
    let recent = log.query_recent(2).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[1].fields["seq"], 4);
}

#[test]
fn malformed_trailing_line_is_skipped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let log = AuditLog::new(&path);
    log.append("mcp_action", &json!({"seq": 1})).unwrap();
    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    use std::io::Write;
    write!(file, "{{not valid json").unwrap();

    let all = log.read_all().unwrap();
    assert_eq!(all.len(), 1);
}

#[test]
fn filter_restricts_by_predicate() {
    let dir = tempdir().unwrap();
    let log = AuditLog::new(dir.path().join("audit.jsonl"));
    log.append("mcp_action", &json!({"result": "success"})).unwrap();
    log.append("mcp_action", &json!({"result": "rate_limit_exceeded"})).unwrap();

    let rate_limited = log
        .filter(None, |r| r.fields.get("result").and_then(|v| v.as_str()) == Some("rate_limit_exceeded"))
        .unwrap();
    assert_eq!(rate_limited.len(), 1);
}
