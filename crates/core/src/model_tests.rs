// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn legal_transition_graph_matches_spec() {
    use WorkflowState::*;
    assert!(Inbox.can_transition_to(NeedsAction));
    assert!(NeedsAction.can_transition_to(Planning));
    assert!(Planning.can_transition_to(PendingApproval));
    assert!(Planning.can_transition_to(Executing));
    assert!(Planning.can_transition_to(NeedsAction));
    assert!(PendingApproval.can_transition_to(Executing));
    assert!(PendingApproval.can_transition_to(Rejected));
    assert!(Executing.can_transition_to(Done));
    assert!(Executing.can_transition_to(Rejected));
    assert!(Rejected.can_transition_to(Inbox));
}

#[test]
fn illegal_edges_are_rejected() {
    use WorkflowState::*;
    assert!(!Inbox.can_transition_to(Done));
    assert!(!NeedsAction.can_transition_to(Executing));
    assert!(!Done.can_transition_to(Rejected));
    assert!(!Executing.can_transition_to(NeedsAction));
}

#[test]
fn done_is_terminal_with_no_targets() {
    assert!(WorkflowState::Done.is_terminal());
    assert!(WorkflowState::Done.legal_targets().is_empty());
}

#[test]
fn folder_collapse_matches_spec() {
    assert_eq!(WorkflowState::Planning.folder_name(), "In_Progress");
    assert_eq!(WorkflowState::Executing.folder_name(), "In_Progress");
    assert_eq!(WorkflowState::PendingApproval.folder_name(), "Approvals");
}

#[test]
fn vault_layout_paths_are_rooted() {
    let layout = VaultLayout::new("/tmp/vault");
    assert_eq!(layout.dir_for(WorkflowState::Done), Path::new("/tmp/vault/Done"));
    assert_eq!(layout.metadata_dir(), Path::new("/tmp/vault/.fte"));
    assert_eq!(layout.audit_log_path(), Path::new("/tmp/vault/.fte/audit.jsonl"));
}
