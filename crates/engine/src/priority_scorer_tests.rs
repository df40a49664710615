// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn write_task(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn urgent_keyword_dominates_score() {
    let dir = tempdir().unwrap();
    let path = write_task(dir.path(), "t1.md", "This is URGENT, please handle.");
    let scorer = PriorityScorer::new(PriorityScorerConfig::default());
    assert!(scorer.score(&path).unwrap() >= 3.0);
}

#[test]
fn vip_sender_maxes_out_sender_component() {
    let dir = tempdir().unwrap();
    let path = write_task(dir.path(), "t1.md", "**From**: ceo@company.com\nplease review");
    let scorer = PriorityScorer::new(PriorityScorerConfig::default());
    let score = scorer.score(&path).unwrap();
    // sender alone contributes 0.3 * 5.0 = 1.5, default urgency/deadline add more.
    assert!(score > 2.0);
}

#[test]
fn deadline_today_scores_higher_than_no_deadline() {
    let dir = tempdir().unwrap();
    let with_deadline = write_task(dir.path(), "t1.md", "Please finish by EOD today.");
    let without_deadline = write_task(dir.path(), "t2.md", "No particular deadline here.");
    let scorer = PriorityScorer::new(PriorityScorerConfig::default());
    assert!(scorer.score(&with_deadline).unwrap() > scorer.score(&without_deadline).unwrap());
}

#[test]
fn score_is_clamped_to_one_and_five() {
    let dir = tempdir().unwrap();
    let path = write_task(dir.path(), "t1.md", "whenever you get a chance, no rush");
    let scorer = PriorityScorer::new(PriorityScorerConfig::default());
    let score = scorer.score(&path).unwrap();
    assert!((1.0..=5.0).contains(&score));
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let scorer = PriorityScorer::new(PriorityScorerConfig::default());
    assert!(scorer.score(&dir.path().join("missing.md")).is_err());
}
