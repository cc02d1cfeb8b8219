//! Integration tests for stage0 (dev branch preparation)

use crate::helpers::{TestWorkspace, outcome_of, run_release_train_raw};
use anyhow::Result;

#[test]
fn test_stage0_creates_branch_from_remote_base() -> Result<()> {
  let ws = TestWorkspace::new(&[("pkg-a", "1.2.3"), ("pkg-b", "0.4.0")])?;

  let summary = ws.run_json(&["stage0", "--branch", "dev"])?;

  assert_eq!(outcome_of(&summary, "pkg-a"), Some("done"));
  assert_eq!(outcome_of(&summary, "pkg-b"), Some("done"));
  assert_eq!(ws.package_git("pkg-a", &["rev-parse", "--abbrev-ref", "HEAD"])?, "dev");
  assert_eq!(ws.package_git("pkg-b", &["rev-parse", "--abbrev-ref", "HEAD"])?, "dev");
  Ok(())
}

#[test]
fn test_stage0_rerun_is_no_op() -> Result<()> {
  let ws = TestWorkspace::new(&[("pkg-a", "1.2.3")])?;
  ws.run(&["stage0", "--branch", "dev", "--push"])?;
  assert_eq!(ws.remote_git("pkg-a", &["branch", "--list", "dev"])?, "dev");

  let summary = ws.run_json(&["stage0", "--branch", "dev", "--push"])?;

  assert_eq!(outcome_of(&summary, "pkg-a"), Some("no_op"));
  assert_eq!(summary["packages"][0]["pushed"], false);
  Ok(())
}

#[test]
fn test_stage0_restores_stashed_changes() -> Result<()> {
  let ws = TestWorkspace::new(&[("pkg-a", "1.2.3")])?;
  ws.write_package_file("pkg-a", "notes.txt", "work in progress\n")?;
  ws.write_package_file("pkg-a", "module.py", "VALUE = 2\n")?;

  let summary = ws.run_json(&["stage0", "--branch", "dev"])?;

  let row = &summary["packages"][0];
  assert_eq!(row["outcome"], "done");
  assert_eq!(row["stash"]["kept"], false);
  assert_eq!(ws.package_git("pkg-a", &["rev-parse", "--abbrev-ref", "HEAD"])?, "dev");
  assert_eq!(ws.read_file("packages/pkg-a/module.py")?, "VALUE = 2\n");
  assert!(ws.file_exists("packages/pkg-a/notes.txt"));
  assert_eq!(ws.package_git("pkg-a", &["stash", "list"])?, "");
  Ok(())
}

#[test]
fn test_stage0_keeps_stash_on_conflict() -> Result<()> {
  let ws = TestWorkspace::new(&[("pkg-a", "1.2.3")])?;
  ws.push_from_other_clone("pkg-a", "main", "module.py", "VALUE = 10\n", "Change value upstream")?;
  ws.write_package_file("pkg-a", "module.py", "VALUE = 20\n")?;

  let summary = ws.run_json(&["stage0", "--branch", "dev", "--stash-name", "wip-before-dev"])?;

  let row = &summary["packages"][0];
  assert_eq!(row["outcome"], "done");
  assert_eq!(row["stash"]["kept"], true);
  assert_eq!(row["stash"]["conflicted"], true);
  assert!(ws.package_git("pkg-a", &["stash", "list"])?.contains("wip-before-dev"));
  assert_eq!(ws.package_git("pkg-a", &["rev-parse", "--abbrev-ref", "HEAD"])?, "dev");
  Ok(())
}

#[test]
fn test_stage0_no_stash_reports_dirty_package() -> Result<()> {
  let ws = TestWorkspace::new(&[("pkg-a", "1.2.3"), ("pkg-b", "0.4.0")])?;
  ws.write_package_file("pkg-a", "module.py", "VALUE = 2\n")?;

  let output = run_release_train_raw(&ws.path, &["--json", "stage0", "--branch", "dev", "--no-stash"])?;

  // Per-package failures do not change the exit code
  assert!(output.status.success());
  let summary: serde_json::Value = serde_json::from_slice(&output.stdout)?;
  assert_eq!(outcome_of(&summary, "pkg-a"), Some("failed"));
  assert_eq!(outcome_of(&summary, "pkg-b"), Some("done"));
  assert_eq!(ws.package_git("pkg-a", &["rev-parse", "--abbrev-ref", "HEAD"])?, "main");
  Ok(())
}

#[test]
fn test_stage0_no_stash_allows_dirty_tree_already_on_branch() -> Result<()> {
  let ws = TestWorkspace::new(&[("pkg-a", "1.2.3")])?;
  ws.run(&["stage0", "--branch", "dev", "--push"])?;
  ws.write_package_file("pkg-a", "module.py", "VALUE = 2\n")?;

  let summary = ws.run_json(&["stage0", "--branch", "dev", "--no-stash"])?;

  assert_eq!(outcome_of(&summary, "pkg-a"), Some("no_op"));
  assert_eq!(summary["packages"][0]["status"]["uncommitted"], true);
  assert_eq!(ws.read_file("packages/pkg-a/module.py")?, "VALUE = 2\n");
  assert_eq!(ws.package_git("pkg-a", &["stash", "list"])?, "");
  Ok(())
}

#[test]
fn test_stage0_divergence_is_reported_not_fatal() -> Result<()> {
  let ws = TestWorkspace::new(&[("pkg-a", "1.2.3")])?;
  ws.run(&["stage0", "--branch", "dev", "--push"])?;
  ws.push_from_other_clone("pkg-a", "dev", "upstream.py", "UP = 1\n", "Upstream change")?;
  ws.commit_package_file("pkg-a", "local.py", "LOCAL = 1\n", "Local change")?;

  let summary = ws.run_json(&["stage0", "--branch", "dev"])?;

  let row = &summary["packages"][0];
  assert_eq!(row["outcome"], "done");
  assert_eq!(row["detail"], "diverged from remote");
  assert_eq!(row["status"]["ahead"], 1);
  assert_eq!(row["status"]["behind"], 1);
  assert_eq!(ws.package_git("pkg-a", &["log", "-1", "--pretty=%s"])?, "Local change");
  Ok(())
}

#[test]
fn test_stage0_falls_back_to_remote_default_branch() -> Result<()> {
  let ws = TestWorkspace::new(&[("pkg-a", "1.2.3")])?;
  ws.package_git("pkg-a", &["remote", "set-head", "origin", "main"])?;

  let summary = ws.run_json(&["stage0", "--branch", "dev", "--base-branch", "release"])?;

  assert_eq!(outcome_of(&summary, "pkg-a"), Some("done"));
  assert_eq!(
    ws.package_git("pkg-a", &["rev-parse", "dev"])?,
    ws.package_git("pkg-a", &["rev-parse", "origin/main"])?
  );
  Ok(())
}

#[test]
fn test_stage0_falls_back_to_local_base() -> Result<()> {
  let ws = TestWorkspace::new(&[("pkg-a", "1.2.3")])?;
  ws.package_git("pkg-a", &["checkout", "-b", "release"])?;
  ws.commit_package_file("pkg-a", "release.py", "R = 1\n", "Local release work")?;
  ws.package_git("pkg-a", &["checkout", "main"])?;

  let summary = ws.run_json(&[
    "stage0",
    "--branch",
    "dev",
    "--base-branch",
    "release",
    "--no-fallback-head",
  ])?;

  assert_eq!(outcome_of(&summary, "pkg-a"), Some("done"));
  assert_eq!(
    ws.package_git("pkg-a", &["rev-parse", "dev"])?,
    ws.package_git("pkg-a", &["rev-parse", "release"])?
  );
  Ok(())
}

#[test]
fn test_stage0_without_start_point_fails_package() -> Result<()> {
  let ws = TestWorkspace::new(&[("pkg-a", "1.2.3")])?;

  let summary = ws.run_json(&[
    "stage0",
    "--branch",
    "dev",
    "--base-branch",
    "release",
    "--no-fallback-head",
    "--no-fallback-local",
  ])?;

  let row = &summary["packages"][0];
  assert_eq!(row["outcome"], "failed");
  assert!(row["detail"].as_str().unwrap_or_default().contains("No start point"));
  assert_eq!(ws.package_git("pkg-a", &["branch", "--list", "dev"])?, "");
  Ok(())
}

#[test]
fn test_stage0_skips_packages_without_remote() -> Result<()> {
  let ws = TestWorkspace::new(&[("pkg-a", "1.2.3")])?;
  ws.package_git("pkg-a", &["remote", "remove", "origin"])?;

  let summary = ws.run_json(&["stage0"])?;

  assert_eq!(outcome_of(&summary, "pkg-a"), Some("skipped"));
  assert_eq!(ws.package_git("pkg-a", &["rev-parse", "--abbrev-ref", "HEAD"])?, "main");
  Ok(())
}

#[test]
fn test_stage0_dry_run_leaves_branch_alone() -> Result<()> {
  let ws = TestWorkspace::new(&[("pkg-a", "1.2.3")])?;

  let stdout = ws.run(&["stage0", "--branch", "dev", "--dry-run"])?;

  assert!(stdout.contains("[dry-run]"));
  assert_eq!(ws.package_git("pkg-a", &["rev-parse", "--abbrev-ref", "HEAD"])?, "main");
  assert_eq!(ws.package_git("pkg-a", &["branch", "--list", "dev"])?, "");
  Ok(())
}
