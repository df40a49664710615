// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fte_core::Priority;
use std::collections::BTreeMap;
use tempfile::tempdir;

fn sample_task(path: PathBuf) -> Task {
    let now = Utc::now();
    Task {
        id: "t1".into(),
        state: WorkflowState::NeedsAction,
        priority: Priority::Medium,
        created_at: now,
        modified_at: now,
        metadata: BTreeMap::new(),
        persistence_loop: None,
        body: "# Task\nbody text\n".into(),
        file_path: path,
    }
}

#[test]
fn save_then_load_round_trips_id_and_body() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Needs_Action").join("t1.md");
    let store = TaskStore::new();
    let task = sample_task(path.clone());
    store.save(&task, &path).unwrap();

    let loaded = store.load(&path).unwrap();
    assert_eq!(loaded.id, "t1");
    assert_eq!(loaded.body, task.body);
    assert_eq!(loaded.file_path, path);
}

#[test]
fn load_missing_frontmatter_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("no_frontmatter.md");
    std::fs::write(&path, "# Just a heading\n").unwrap();
    let store = TaskStore::new();
    assert!(store.load(&path).is_err());
}

#[test]
fn derive_state_from_location_maps_known_folders() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Done").join("t1.md");
    let store = TaskStore::new();
    let task = sample_task(path);
    assert_eq!(store.derive_state_from_location(&task).unwrap(), WorkflowState::Done);
}

#[test]
fn derive_state_from_location_rejects_unknown_folder() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Mystery").join("t1.md");
    let store = TaskStore::new();
    let task = sample_task(path);
    assert!(store.derive_state_from_location(&task).is_err());
}

#[test]
fn sync_state_bumps_modified_at_on_divergence() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Done").join("t1.md");
    let store = TaskStore::new();
    let mut task = sample_task(path);
    task.state = WorkflowState::NeedsAction;
    let before = task.modified_at;
    store.sync_state(&mut task).unwrap();
    assert_eq!(task.state, WorkflowState::Done);
    assert!(task.modified_at >= before);
}

#[test]
fn move_task_renames_across_directories() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("Needs_Action").join("t1.md");
    let dst = dir.path().join("Done").join("t1.md");
    let store = TaskStore::new();
    let task = sample_task(src.clone());
    store.save(&task, &src).unwrap();

    store.move_task(&src, &dst).unwrap();
    assert!(!src.exists());
    assert!(dst.exists());
}
