//! Integration tests for configuration handling and exit codes

use crate::helpers::{TestWorkspace, outcome_of, run_release_train_raw};
use anyhow::Result;

#[test]
fn test_missing_packages_dir_exits_with_config_error() -> Result<()> {
  let ws = TestWorkspace::new(&[("pkg-a", "1.2.3")])?;
  ws.write_file("release-train.toml", "packages_dir = \"does-not-exist\"\n")?;

  let output = run_release_train_raw(&ws.path, &["stage1"])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("does-not-exist"));
  Ok(())
}

#[test]
fn test_invalid_config_exits_with_config_error() -> Result<()> {
  let ws = TestWorkspace::new(&[("pkg-a", "1.2.3")])?;
  ws.write_file("release-train.toml", "packages_dir = [\n")?;

  let output = run_release_train_raw(&ws.path, &["stage1"])?;
  assert_eq!(output.status.code(), Some(1));

  let output = run_release_train_raw(&ws.path, &["--config", "nowhere.toml", "clear"])?;
  assert_eq!(output.status.code(), Some(1));
  Ok(())
}

#[test]
fn test_nested_config_table_and_custom_paths() -> Result<()> {
  let ws = TestWorkspace::new(&[("pkg-a", "1.2.3")])?;
  ws.write_file(
    "ops/release.toml",
    r#"[tool.release-train]
changes_output_dir = "out/cycle"
commit_message_filename = "message.txt"
"#,
  )?;
  ws.write_package_file("pkg-a", "module.py", "VALUE = 2\n")?;

  let summary = ws.run_json(&["--config", "ops/release.toml", "stage1"])?;

  assert_eq!(outcome_of(&summary, "pkg-a"), Some("done"));
  assert!(ws.file_exists("out/cycle/pkg-a/message.txt"));
  assert!(ws.file_exists("out/cycle/pkg-a/changes_uncommitted.txt"));
  Ok(())
}

#[test]
fn test_config_dry_run_applies_to_every_stage() -> Result<()> {
  let ws = TestWorkspace::new(&[("pkg-a", "1.2.3")])?;
  ws.write_file("release-train.toml", "tag_prefix = \"v\"\ndry_run = true\n")?;
  ws.write_package_file("pkg-a", "module.py", "VALUE = 2\n")?;

  let summary = ws.run_json(&["stage1"])?;

  assert_eq!(summary["dry_run"], true);
  assert!(!ws.file_exists("release"));
  Ok(())
}

#[test]
fn test_json_output_keeps_stdout_clean() -> Result<()> {
  let ws = TestWorkspace::new(&[("pkg-a", "1.2.3")])?;

  let output = run_release_train_raw(&ws.path, &["--json", "stage1"])?;

  assert!(output.status.success());
  let summary: serde_json::Value = serde_json::from_slice(&output.stdout)?;
  assert_eq!(summary["stage"], "stage1");
  assert!(String::from_utf8_lossy(&output.stderr).contains("Stage 1"));
  Ok(())
}
