//! `clear`: reset the artifact tree for a new cycle

use crate::core::artifacts;
use crate::core::context::StageContext;
use crate::core::error::{ReleaseResult, ResultExt};
use crate::ui::{self, say};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// Result of a `clear` invocation
#[derive(Debug, Clone, Serialize)]
pub struct ClearReport {
  pub root: PathBuf,
  pub dry_run: bool,
  pub started_at: DateTime<Utc>,
  /// Whether the artifact root existed before the run
  pub existed: bool,
  /// Files removed (or that would be removed)
  pub files: Vec<PathBuf>,
}

impl ClearReport {
  pub fn print(&self) -> ReleaseResult<()> {
    if ui::machine_output() {
      println!("{}", serde_json::to_string_pretty(self)?);
      return Ok(());
    }

    if !self.existed {
      return Ok(());
    }
    let verb = if self.dry_run { "would remove" } else { "removed" };
    say!("\n📊 clear: {} {} file(s)\n", verb, self.files.len());
    Ok(())
  }
}

/// Remove and recreate the artifact root
///
/// Every package counts as outside the current cycle afterwards.
pub fn run_clear(ctx: &StageContext) -> ReleaseResult<ClearReport> {
  let root = ctx.config.changes_root(&ctx.root);
  let mut report = ClearReport {
    root: root.clone(),
    dry_run: ctx.dry_run,
    started_at: Utc::now(),
    existed: root.exists(),
    files: Vec::new(),
  };

  if !report.existed {
    say!("ℹ️  {} does not exist, nothing to clear", root.display());
    if !ctx.dry_run {
      fs::create_dir_all(&root).with_context(|| format!("Failed to create {}", root.display()))?;
    }
    return Ok(report);
  }

  report.files = artifacts::list_files(&root)?;

  if ctx.dry_run {
    say!("🧹 [dry-run] would clear {}", root.display());
    for file in &report.files {
      say!("     {}", file.strip_prefix(&root).unwrap_or(file).display());
    }
    return Ok(report);
  }

  fs::remove_dir_all(&root).with_context(|| format!("Failed to remove {}", root.display()))?;
  fs::create_dir_all(&root).with_context(|| format!("Failed to recreate {}", root.display()))?;
  tracing::debug!(path = %root.display(), files = report.files.len(), "artifact root cleared");
  say!("🧹 cleared {}", root.display());
  Ok(report)
}
