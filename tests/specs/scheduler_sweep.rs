// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The two literal end-to-end scenarios: a plain task sweeps all the way
//! to `Done` under dry-run, and a task whose body trips an approval
//! keyword sits in `Approvals` until a human grants it, then resumes.

use std::process::Stdio;
use std::time::Duration;

use serial_test::serial;

use crate::prelude::{wait_for, Vault, SPEC_WAIT_MAX_MS};

fn stop_and_reap(mut child: std::process::Child, vault: &Vault) {
    vault.signal_stop();
    let exited = wait_for(SPEC_WAIT_MAX_MS, || child.try_wait().expect("try_wait should not fail").is_some());
    if !exited {
        let _ = child.kill();
    }
    let _ = child.wait();
}

#[test]
#[serial]
fn happy_path_dry_run_sweep_completes_a_plain_task() {
    let vault = Vault::new();
    vault.seed_task("Needs_Action", "task-1", "# Task\nJust tidy up the changelog.\n");

    let child = vault
        .orchestrator()
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("orchestrator should spawn");

    let landed = wait_for(SPEC_WAIT_MAX_MS, || vault.exists_in("Done", "task-1"));
    assert!(landed, "plain task should sweep through to Done under dry-run");
    assert!(!vault.exists_in("Needs_Action", "task-1"));

    stop_and_reap(child, &vault);
}

#[test]
#[serial]
fn approval_required_task_blocks_until_approved_then_resumes() {
    let vault = Vault::new();
    vault.seed_task("Needs_Action", "task-2", "# Task\nPlease deploy this to production.\n");

    let child = vault
        .orchestrator()
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("orchestrator should spawn");

    let parked = wait_for(SPEC_WAIT_MAX_MS, || vault.exists_in("Approvals", "task-2"));
    assert!(parked, "deploy-to-production task should be parked pending approval");
    assert!(!vault.exists_in("Done", "task-2"), "a flagged task must never execute unapproved");

    // Give the orchestrator a moment to have swept past the unapproved
    // task at least once before the approval lands.
    std::thread::sleep(Duration::from_millis(200));
    vault.approve_legacy("task-2");

    let resumed = wait_for(SPEC_WAIT_MAX_MS, || vault.exists_in("Done", "task-2"));
    assert!(resumed, "task should resume and complete once approval is granted");

    stop_and_reap(child, &vault);
}
