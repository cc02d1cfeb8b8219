//! Integration tests for stage3 (changes since the last tag)

use crate::helpers::{TestWorkspace, outcome_of, run_release_train_raw};
use anyhow::Result;

/// pkg-a history: v1.0.0 -> feature_one.py -> v1.1.0 -> feature_two.py
fn tagged_workspace() -> Result<TestWorkspace> {
  let ws = TestWorkspace::new(&[("pkg-a", "1.1.0"), ("pkg-b", "0.4.0")])?;
  ws.package_git("pkg-a", &["tag", "-a", "v1.0.0", "-m", "Release 1.0.0"])?;
  ws.commit_package_file("pkg-a", "feature_one.py", "ONE = 1\n", "feat: one")?;
  ws.package_git("pkg-a", &["tag", "-a", "v1.1.0", "-m", "Release 1.1.0"])?;
  ws.commit_package_file("pkg-a", "feature_two.py", "TWO = 2\n", "feat: two")?;
  Ok(ws)
}

#[test]
fn test_stage3_diffs_from_last_tag() -> Result<()> {
  let ws = tagged_workspace()?;

  ws.run(&["stage3"])?;

  let since = ws.read_file("release/changes/pkg-a/changes_since_tag.txt")?;
  assert!(since.contains("feature_two.py"));
  assert!(!since.contains("feature_one.py"));

  let template = ws.read_file("release/changes/pkg-a/tag_message.md")?;
  assert!(template.contains("{VERSION}"));
  assert!(template.contains("{PREV_VERSION}"));
  Ok(())
}

#[test]
fn test_stage3_tags_file_wins_over_last_tag() -> Result<()> {
  let ws = tagged_workspace()?;
  ws.write_file("tags.json", r#"{"pkg-a": "v1.0.0"}"#)?;

  let summary = ws.run_json(&["stage3", "--tags-file", "tags.json"])?;

  assert_eq!(outcome_of(&summary, "pkg-a"), Some("done"));
  let since = ws.read_file("release/changes/pkg-a/changes_since_tag.txt")?;
  assert!(since.contains("feature_one.py"));
  assert!(since.contains("feature_two.py"));
  Ok(())
}

#[test]
fn test_stage3_missing_explicit_tag_skips_package() -> Result<()> {
  let ws = tagged_workspace()?;
  ws.write_file("tags.json", r#"{"pkg-a": "v9.9.9"}"#)?;

  let summary = ws.run_json(&["stage3", "--tags-file", "tags.json"])?;

  assert_eq!(outcome_of(&summary, "pkg-a"), Some("skipped"));
  assert!(!ws.changes_dir("pkg-a").exists());
  // No tag at all: everything since the first commit
  assert_eq!(outcome_of(&summary, "pkg-b"), Some("done"));
  assert!(ws.read_file("release/changes/pkg-b/changes_since_tag.txt")?.contains("module.py"));
  Ok(())
}

#[test]
fn test_stage3_no_commits_since_tag_is_no_op() -> Result<()> {
  let ws = TestWorkspace::new(&[("pkg-a", "1.0.0")])?;
  ws.package_git("pkg-a", &["tag", "-a", "v1.0.0", "-m", "Release 1.0.0"])?;

  let summary = ws.run_json(&["stage3"])?;

  assert_eq!(outcome_of(&summary, "pkg-a"), Some("no_op"));
  assert!(!ws.changes_dir("pkg-a").exists());
  Ok(())
}

#[test]
fn test_stage3_keeps_edited_tag_message() -> Result<()> {
  let ws = tagged_workspace()?;
  ws.run(&["stage3"])?;
  ws.write_file("release/changes/pkg-a/tag_message.md", "Second feature\n")?;

  ws.run(&["stage3"])?;

  assert_eq!(ws.read_file("release/changes/pkg-a/tag_message.md")?, "Second feature\n");
  Ok(())
}

#[test]
fn test_stage3_invalid_tags_file_exits_with_config_error() -> Result<()> {
  let ws = tagged_workspace()?;
  ws.write_file("tags.json", "[\"not\", \"an\", \"object\"]")?;

  let output = run_release_train_raw(&ws.path, &["stage3", "--tags-file", "tags.json"])?;
  assert_eq!(output.status.code(), Some(1));

  let output = run_release_train_raw(&ws.path, &["stage3", "--tags-file", "missing.json"])?;
  assert_eq!(output.status.code(), Some(1));

  assert!(!ws.file_exists("release"));
  Ok(())
}
