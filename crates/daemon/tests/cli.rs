// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Black-box tests for the binary's argument handling. The sweep loop
//! itself is covered by the workspace-level specs against a real vault.

use assert_cmd::Command;

#[test]
fn version_flag_prints_and_exits_cleanly() {
    let output = Command::cargo_bin("fte-orchestrator").unwrap().arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("fte-orchestrator"));
}

#[test]
fn help_flag_prints_usage_and_exits_cleanly() {
    let output = Command::cargo_bin("fte-orchestrator").unwrap().arg("--help").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("USAGE"));
}
