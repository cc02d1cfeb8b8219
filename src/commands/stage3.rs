//! Stage 3: snapshot changes since the last release tag

use crate::commands::report::{PackageOutcome, StageReport};
use crate::core::context::StageContext;
use crate::core::error::ReleaseResult;
use crate::core::packages::Package;
use crate::release::tags;
use crate::ui::say;
use std::collections::BTreeMap;
use std::path::Path;

/// Run stage 3
///
/// The tags file is loaded before any repository is touched; a missing or
/// malformed file aborts the invocation.
pub fn run_stage3(ctx: &StageContext, tags_file: Option<&Path>) -> ReleaseResult<StageReport> {
  let overrides = match tags_file {
    Some(path) => tags::load_tags_file(&ctx.root.join(path))?,
    None => BTreeMap::new(),
  };
  let registry = ctx.packages()?;

  say!(
    "📦 Stage 3: collecting changes since the last tag{}{}",
    if overrides.is_empty() {
      String::new()
    } else {
      format!(" ({} explicit tag(s))", overrides.len())
    },
    if ctx.dry_run { " (dry-run)" } else { "" }
  );

  let mut report = StageReport::new("stage3", ctx.dry_run);
  for pkg in registry.all() {
    let explicit = overrides.get(&pkg.name).map(String::as_str);
    report.record(pkg, || snapshot_since_tag(ctx, pkg, explicit));
  }

  say!(
    "\n📝 Edit {} in {} before running stage4",
    ctx.config.tag_message_filename,
    ctx.config.changes_root(&ctx.root).display()
  );
  Ok(report)
}

fn snapshot_since_tag(ctx: &StageContext, pkg: &Package, explicit: Option<&str>) -> ReleaseResult<PackageOutcome> {
  let git = pkg.repo()?;

  let Some(base) = tags::resolve_base(&git, explicit)? else {
    return Ok(PackageOutcome::skipped(
      pkg,
      format!("tag '{}' from tags file not found", explicit.unwrap_or_default()),
    ));
  };
  tracing::debug!(package = %pkg.name, base = %base.describe(), "resolved since-tag base");

  if git.commits_since(base.as_rev())? == 0 {
    return Ok(PackageOutcome::no_op(
      pkg,
      format!("no new commits since {}", base.describe()),
    ));
  }

  let diff = git.diff_since(base.as_rev())?;
  if diff.trim().is_empty() {
    return Ok(PackageOutcome::no_op(pkg, format!("no changes since {}", base.describe())));
  }

  let store = ctx.artifacts();
  store.write_since_tag(pkg, &diff)?;

  let since = base.describe();
  if !ctx.dry_run {
    say!("   ✅ {}: changes since {} saved to {}", pkg.name, since, store.since_tag_path(pkg).display());
  }
  Ok(PackageOutcome::done(pkg, format!("changes since {}", since)))
}
