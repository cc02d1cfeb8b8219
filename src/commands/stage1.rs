//! Stage 1: snapshot uncommitted changes into artifacts

use crate::commands::report::{PackageOutcome, StageReport};
use crate::core::artifacts::UncommittedSnapshot;
use crate::core::context::StageContext;
use crate::core::error::ReleaseResult;
use crate::core::packages::Package;
use crate::ui::say;

/// Run stage 1
pub fn run_stage1(ctx: &StageContext, full_diff: bool) -> ReleaseResult<StageReport> {
  let registry = ctx.packages()?;
  say!(
    "📦 Stage 1: collecting uncommitted changes (config: {}){}",
    ctx.config.source_display(),
    if ctx.dry_run { " (dry-run)" } else { "" }
  );

  let mut report = StageReport::new("stage1", ctx.dry_run);

  for pkg in registry.all() {
    report.record(pkg, || snapshot_package(ctx, pkg, full_diff));
  }

  say!(
    "\n📝 Edit {} in {} before running stage2",
    ctx.config.commit_message_filename,
    ctx.config.changes_root(&ctx.root).display()
  );
  Ok(report)
}

fn snapshot_package(ctx: &StageContext, pkg: &Package, full_diff: bool) -> ReleaseResult<PackageOutcome> {
  let git = pkg.repo()?;
  let snapshot = UncommittedSnapshot::capture(&git, full_diff)?;
  if snapshot.is_empty() {
    return Ok(PackageOutcome::no_op(pkg, "no uncommitted changes"));
  }

  let store = ctx.artifacts();
  store.write_uncommitted(pkg, &snapshot)?;

  if !ctx.dry_run {
    say!("   ✅ {}: changes saved to {}", pkg.name, store.uncommitted_path(pkg).display());
  }
  Ok(PackageOutcome::done(pkg, "changes captured"))
}
