//! Stage 2: commit prepared messages and/or push

use crate::commands::report::{PackageOutcome, StageReport};
use crate::core::context::StageContext;
use crate::core::error::ReleaseResult;
use crate::core::packages::Package;
use crate::core::status;
use crate::ui::say;

/// Run stage 2 (neither flag = commit only)
pub fn run_stage2(ctx: &StageContext, commit: bool, push: bool) -> ReleaseResult<StageReport> {
  let registry = ctx.packages()?;
  let commit = commit || !push;

  let actions = match (commit, push) {
    (true, true) => "commit and push",
    (false, true) => "push",
    _ => "commit",
  };
  say!("📦 Stage 2: {}{}", actions, if ctx.dry_run { " (dry-run)" } else { "" });

  let mut report = StageReport::new("stage2", ctx.dry_run);
  for pkg in registry.all() {
    report.record(pkg, || process_package(ctx, pkg, commit, push));
  }
  Ok(report)
}

fn process_package(ctx: &StageContext, pkg: &Package, commit: bool, push: bool) -> ReleaseResult<PackageOutcome> {
  let git = pkg.repo()?;
  let remote = ctx.remote();
  let mut done = Vec::new();

  if commit {
    match ctx.artifacts().commit_message(pkg)? {
      None if !push => return Ok(PackageOutcome::skipped(pkg, "no commit message")),
      None => tracing::debug!(package = %pkg.name, "no commit message, push only"),
      Some(message) => {
        if ctx.dry_run {
          say!("     [dry-run] git -C {} add -A", pkg.path.display());
          say!("     [dry-run] git -C {} commit -m {:?}", pkg.path.display(), first_line(&message));
          done.push("commit planned");
        } else {
          git.add_all()?;
          if git.commit(&message)? {
            say!("   ✅ {}: committed", pkg.name);
            done.push("committed");
          } else {
            tracing::debug!(package = %pkg.name, "nothing to commit");
          }
        }
      }
    }
  }

  let branch = git.current_branch()?;
  let mut pushed = false;
  if push {
    if git.has_commits_to_push(remote, &branch)? {
      if ctx.dry_run {
        say!("     [dry-run] git -C {} push -u {} {}", pkg.path.display(), remote, branch);
        done.push("push planned");
      } else {
        git.push_branch(remote, &branch)?;
        say!("   🚀 {}: pushed {}", pkg.name, branch);
        pushed = true;
        done.push("pushed");
      }
    } else {
      tracing::debug!(package = %pkg.name, "not ahead of {}/{}, push skipped", remote, branch);
    }
  }

  let repo_status = status::analyze(&git, &branch, remote)?;
  let outcome = if done.is_empty() {
    PackageOutcome::no_op(pkg, "nothing to commit or push")
  } else {
    PackageOutcome::done(pkg, done.join(", "))
  };
  Ok(outcome.pushed(pushed).with_status(repo_status))
}

fn first_line(text: &str) -> &str {
  text.lines().next().unwrap_or_default()
}
