//! Stage 6: open the next development cycle
//!
//! Released packages get a fresh dev branch from the up-to-date base and a
//! `.dev0` version of the next patch release.

use crate::commands::report::{PackageOutcome, StageReport};
use crate::core::context::StageContext;
use crate::core::error::ReleaseResult;
use crate::core::manifest::Manifest;
use crate::core::packages::Package;
use crate::core::status;
use crate::core::vcs::GitRepo;
use crate::release::version;
use crate::ui::say;
use std::path::Path;

/// Options for stage 6
#[derive(Debug, Clone)]
pub struct Stage6Options {
  pub branch: String,
  pub base_branch: String,
  pub push: bool,
  /// Overrides `git_remote`
  pub remote: Option<String>,
}

/// Run stage 6
pub fn run_stage6(ctx: &StageContext, opts: &Stage6Options) -> ReleaseResult<StageReport> {
  let registry = ctx.packages()?;
  let remote = opts.remote.as_deref().unwrap_or(ctx.remote());
  let cycle = registry.current_cycle();

  say!(
    "📦 Stage 6: starting the next cycle on {} for {} package(s){}",
    opts.branch,
    cycle.len(),
    if ctx.dry_run { " (dry-run)" } else { "" }
  );

  let mut report = StageReport::new("stage6", ctx.dry_run);
  for pkg in cycle {
    report.record(pkg, || start_next_cycle(ctx, pkg, opts, remote));
  }
  Ok(report)
}

fn start_next_cycle(ctx: &StageContext, pkg: &Package, opts: &Stage6Options, remote: &str) -> ReleaseResult<PackageOutcome> {
  let config = &ctx.config;
  let git = pkg.repo()?;

  if git.is_dirty()? {
    return Ok(PackageOutcome::skipped(pkg, "uncommitted changes"));
  }

  let mut manifest = Manifest::load(&pkg.manifest_path)?;
  let current = manifest.require_str(&config.manifest_version_key)?;
  let next = version::next_dev(&current)?;
  let message = format!("chore: start {} development", next);

  say!("\n📦 {}: {} -> {}", pkg.name, current, next);

  if ctx.dry_run {
    let start = start_point(&git, remote, &opts.base_branch)?;
    say!("     [dry-run] git -C {} fetch {}", pkg.path.display(), remote);
    say!("     [dry-run] git -C {} checkout -B {} {}", pkg.path.display(), opts.branch, start);
    say!("     [dry-run] set {} = {:?}", config.manifest_version_key, next);
    say!("     [dry-run] git -C {} commit -m {:?}", pkg.path.display(), message);
    if opts.push {
      say!("     [dry-run] git -C {} push -u {} {}", pkg.path.display(), remote, opts.branch);
    }
    return Ok(PackageOutcome::done(pkg, format!("{} planned on {}", next, opts.branch)));
  }

  if let Err(e) = git.fetch(remote) {
    tracing::warn!(package = %pkg.name, "fetch failed: {}", e);
    say!("   ⚠️  fetch from {} failed, using local refs: {}", remote, e);
  }

  let start = start_point(&git, remote, &opts.base_branch)?;
  git.checkout_reset(&opts.branch, &start)?;
  tracing::debug!(package = %pkg.name, branch = %opts.branch, start = %start, "dev branch reset");

  // Re-read: the checkout may have changed the manifest under us
  manifest = Manifest::load(&pkg.manifest_path)?;
  manifest.set_str(&config.manifest_version_key, &next)?;
  manifest.save()?;

  let manifest_file = Path::new(&config.manifest_filename);
  git.add_path(manifest_file)?;
  git.commit_path(&message, manifest_file)?;
  say!("   ✅ {} on {}", next, opts.branch);

  let mut pushed = false;
  if opts.push && git.has_commits_to_push(remote, &opts.branch)? {
    git.push_branch(remote, &opts.branch)?;
    say!("   🚀 pushed {}", opts.branch);
    pushed = true;
  }

  let repo_status = status::analyze(&git, &opts.branch, remote)?;
  Ok(
    PackageOutcome::done(pkg, format!("{} on {}", next, opts.branch))
      .pushed(pushed)
      .with_status(repo_status),
  )
}

/// `remote/base`, else the local base branch, else the current HEAD
fn start_point(git: &GitRepo, remote: &str, base: &str) -> ReleaseResult<String> {
  if git.remote_branch_exists(remote, base)? {
    return Ok(format!("{}/{}", remote, base));
  }
  if git.local_branch_exists(base)? {
    return Ok(base.to_string());
  }
  Ok("HEAD".to_string())
}
