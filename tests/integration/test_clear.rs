//! Integration tests for `clear`

use crate::helpers::TestWorkspace;
use anyhow::Result;

fn workspace_with_artifacts() -> Result<TestWorkspace> {
  let ws = TestWorkspace::new(&[("pkg-a", "1.2.3")])?;
  ws.write_package_file("pkg-a", "module.py", "VALUE = 2\n")?;
  ws.run(&["stage1"])?;
  Ok(ws)
}

#[test]
fn test_clear_dry_run_lists_files() -> Result<()> {
  let ws = workspace_with_artifacts()?;

  let stdout = ws.run(&["clear", "--dry-run"])?;

  assert!(stdout.contains("changes_uncommitted.txt"));
  assert!(stdout.contains("commit_message.txt"));
  assert!(ws.file_exists("release/changes/pkg-a/changes_uncommitted.txt"));
  Ok(())
}

#[test]
fn test_clear_removes_and_recreates_root() -> Result<()> {
  let ws = workspace_with_artifacts()?;

  let summary = ws.run_json(&["clear"])?;

  assert_eq!(summary["files"].as_array().map(Vec::len), Some(2));
  assert!(ws.file_exists("release/changes"));
  assert!(!ws.file_exists("release/changes/pkg-a"));

  // Nothing is in the cycle any more
  let summary = ws.run_json(&["stage5"])?;
  assert_eq!(summary["packages"].as_array().map(Vec::len), Some(0));
  Ok(())
}

#[test]
fn test_clear_missing_root_is_created() -> Result<()> {
  let ws = TestWorkspace::new(&[("pkg-a", "1.2.3")])?;

  let stdout = ws.run(&["clear", "--dry-run"])?;
  assert!(stdout.contains("nothing to clear"));
  assert!(!ws.file_exists("release"));

  let stdout = ws.run(&["clear"])?;
  assert!(stdout.contains("nothing to clear"));
  assert!(ws.file_exists("release/changes"));
  assert_eq!(std::fs::read_dir(ws.path.join("release/changes"))?.count(), 0);
  Ok(())
}
