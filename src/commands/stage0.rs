//! Stage 0: prepare the dev branch in every package

use crate::commands::report::{PackageOutcome, StageReport};
use crate::core::branch::{PrepareOptions, prepare_branch};
use crate::core::context::StageContext;
use crate::core::error::ReleaseResult;
use crate::core::packages::Package;
use crate::ui::say;

/// Options for stage 0
#[derive(Debug, Clone)]
pub struct Stage0Options {
  pub branch: String,
  pub base_branch: String,
  pub push: bool,
  pub no_stash: bool,
  /// Defaults to `release-train-stage0-<branch>`
  pub stash_name: Option<String>,
  pub keep_stash: bool,
  pub no_fallback_head: bool,
  pub no_fallback_local: bool,
}

/// Run stage 0
pub fn run_stage0(ctx: &StageContext, opts: &Stage0Options) -> ReleaseResult<StageReport> {
  let registry = ctx.packages()?;
  let stash_name = opts
    .stash_name
    .clone()
    .unwrap_or_else(|| format!("release-train-stage0-{}", opts.branch));

  say!(
    "📦 Stage 0: preparing '{}' from '{}' in {} package(s){}",
    opts.branch,
    opts.base_branch,
    registry.all().len(),
    if ctx.dry_run { " (dry-run)" } else { "" }
  );

  let mut report = StageReport::new("stage0", ctx.dry_run);
  for pkg in registry.all() {
    report.record(pkg, || prepare_package(ctx, pkg, opts, &stash_name));
  }

  Ok(report)
}

fn prepare_package(ctx: &StageContext, pkg: &Package, opts: &Stage0Options, stash_name: &str) -> ReleaseResult<PackageOutcome> {
  let git = pkg.repo()?;
  if !git.has_remote(ctx.remote())? {
    return Ok(PackageOutcome::skipped(pkg, format!("remote '{}' not configured", ctx.remote())));
  }

  say!("\n📦 {}", pkg.name);
  let prepared = prepare_branch(
    &git,
    &PrepareOptions {
      branch: &opts.branch,
      base: &opts.base_branch,
      remote: ctx.remote(),
      push: opts.push,
      use_stash: !opts.no_stash,
      stash_name,
      keep_stash: opts.keep_stash,
      fallback_head: !opts.no_fallback_head,
      fallback_local: !opts.no_fallback_local,
      dry_run: ctx.dry_run,
    },
  )?;

  if prepared.stash.kept {
    let reason = if prepared.stash.conflicted {
      "conflicts while restoring"
    } else {
      "--keep-stash"
    };
    tracing::warn!(package = %pkg.name, conflicted = prepared.stash.conflicted, "stash kept");
    say!("   ⚠️  stash '{}' kept ({}); resolve and drop it manually", stash_name, reason);
  }
  if prepared.diverged {
    tracing::warn!(package = %pkg.name, branch = %opts.branch, "local and remote branches diverged");
    say!("   ⚠️  {} diverged from {}/{}; left as-is", opts.branch, ctx.remote(), opts.branch);
  }
  if prepared.pushed {
    say!("   🚀 pushed {}", opts.branch);
  }

  if !ctx.dry_run && !prepared.moved && !prepared.diverged && !prepared.stash.kept {
    return Ok(
      PackageOutcome::no_op(pkg, format!("already up to date on {}", opts.branch))
        .with_status(prepared.status)
        .with_stash(prepared.stash),
    );
  }

  let detail = if prepared.diverged {
    "diverged from remote".to_string()
  } else if prepared.stash.conflicted {
    "stash conflict, stash kept".to_string()
  } else {
    format!("on {}", opts.branch)
  };
  if !ctx.dry_run {
    say!("   ✅ {}", detail);
  }

  Ok(
    PackageOutcome::done(pkg, detail)
      .pushed(prepared.pushed)
      .with_status(prepared.status)
      .with_stash(prepared.stash),
  )
}
