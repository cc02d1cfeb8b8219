//! Stage 4: bump versions, commit the release and pin staging
//!
//! Only packages whose `tag_message` was edited away from the template are
//! released. The bumped version is recorded in the `release_version`
//! artifact, so a re-run after a successful bump is a no-op instead of a
//! second bump.

use crate::commands::report::{PackageOutcome, StageReport};
use crate::commands::{commit_root_manifest, load_root_manifest};
use crate::core::artifacts::{is_placeholder, substitute_placeholders};
use crate::core::context::StageContext;
use crate::core::error::ReleaseResult;
use crate::core::manifest::Manifest;
use crate::core::packages::Package;
use crate::core::vcs::GitRepo;
use crate::release::version::{self, BumpPart};
use crate::ui::say;
use crate::utils;
use std::path::Path;

const STAGING_COMMIT_MESSAGE: &str = "chore(staging): update dependencies";

/// Options for stage 4
#[derive(Debug, Clone, Copy)]
pub struct Stage4Options {
  pub bump: Option<BumpPart>,
  pub push: bool,
}

/// Run stage 4
pub fn run_stage4(ctx: &StageContext, opts: Stage4Options) -> ReleaseResult<StageReport> {
  let registry = ctx.packages()?;
  let mut report = StageReport::new("stage4", ctx.dry_run);

  let Some(part) = opts.bump else {
    if !opts.push {
      say!("📦 Stage 4: nothing to do (neither --bump nor --push given)");
      return Ok(report);
    }

    say!("📦 Stage 4: pushing without bump{}", if ctx.dry_run { " (dry-run)" } else { "" });
    for pkg in registry.all() {
      report.record(pkg, || push_only(ctx, pkg));
    }
    return Ok(report);
  };

  say!(
    "📦 Stage 4: preparing releases ({} bump){}",
    part,
    if ctx.dry_run { " (dry-run)" } else { "" }
  );

  let mut staging = load_root_manifest(&ctx.staging_manifest());
  let mut staging_changed = false;

  for pkg in registry.all() {
    report.record(pkg, || {
      let (outcome, pinned) = release_package(ctx, pkg, part, opts.push, staging.as_mut())?;
      staging_changed |= pinned;
      Ok(outcome)
    });
  }

  if staging_changed && let Some(staging) = &staging {
    commit_root_manifest(ctx, staging, STAGING_COMMIT_MESSAGE, opts.push);
  }

  Ok(report)
}

/// Bump, commit and optionally push one package; returns whether staging was re-pinned
fn release_package(
  ctx: &StageContext,
  pkg: &Package,
  part: BumpPart,
  push: bool,
  staging: Option<&mut Manifest>,
) -> ReleaseResult<(PackageOutcome, bool)> {
  let store = ctx.artifacts();
  let config = &ctx.config;

  let Some(tag_message) = store.tag_message(pkg)? else {
    return Ok((PackageOutcome::skipped(pkg, "no tag message"), false));
  };
  if is_placeholder(&tag_message) {
    return Ok((PackageOutcome::skipped(pkg, "tag message not edited"), false));
  }

  let git = pkg.repo()?;
  let mut manifest = Manifest::load(&pkg.manifest_path)?;
  let project_name = manifest.require_str(&config.manifest_name_key)?;
  let current = manifest.require_str(&config.manifest_version_key)?;

  say!("\n📦 {}", pkg.name);

  let already_bumped = store.release_version(pkg)?.as_deref() == Some(current.as_str());
  let target = if already_bumped {
    current.clone()
  } else {
    version::bump(&current, part)?
  };

  let mut done = Vec::new();
  if already_bumped {
    tracing::debug!(package = %pkg.name, version = %current, "already bumped in this cycle");
    let manifest_file = Path::new(&config.manifest_filename);
    if !ctx.dry_run && git.is_path_dirty(manifest_file)? {
      // Bumped by an earlier run whose commit did not happen
      git.add_all()?;
      if git.commit(&substitute_placeholders(&tag_message, &target, &current))? {
        done.push(format!("committed {}", target));
      }
    }
  } else if ctx.dry_run {
    say!("     [dry-run] {}: {} -> {}", pkg.name, current, target);
    say!("     [dry-run] git -C {} add -A", pkg.path.display());
    say!("     [dry-run] git -C {} commit -m <tag message>", pkg.path.display());
    done.push(format!("{} -> {} planned", current, target));
  } else {
    // Record the target first so an interrupted run resumes instead of bumping twice
    store.write_release_version(pkg, &target)?;
    manifest.set_str(&config.manifest_version_key, &target)?;
    if manifest.strip_workspace_sources(&config.dependency_sources_key) {
      tracing::debug!(package = %pkg.name, "removed workspace source markers");
    }
    manifest.save()?;

    git.add_all()?;
    git.commit(&substitute_placeholders(&tag_message, &target, &current))?;
    say!("   ✅ {} -> {} committed", current, target);
    done.push(format!("{} -> {}", current, target));
  }

  let pushed = push && push_with_link(ctx, &git)?;
  if pushed {
    done.push("pushed".to_string());
  }

  let tag = config.tag_name(&target);
  let pinned = match staging {
    Some(staging) => staging.set_dependency_ref(
      &config.dependency_sources_key,
      &project_name,
      &config.dependency_ref_field,
      &tag,
    ),
    None => false,
  };
  if pinned {
    say!("   📝 staging pin {} = {}", project_name, tag);
    done.push(format!("staging -> {}", tag));
  }

  let outcome = if done.is_empty() {
    PackageOutcome::no_op(pkg, format!("already at {}", target))
  } else {
    PackageOutcome::done(pkg, done.join(", "))
  };
  Ok((outcome.pushed(pushed), pinned))
}

fn push_only(ctx: &StageContext, pkg: &Package) -> ReleaseResult<PackageOutcome> {
  let git = pkg.repo()?;
  if push_with_link(ctx, &git)? {
    Ok(PackageOutcome::done(pkg, "pushed").pushed(true))
  } else {
    Ok(PackageOutcome::no_op(pkg, "nothing to push"))
  }
}

/// Push the current branch if it has unpushed commits and print a PR link
fn push_with_link(ctx: &StageContext, git: &GitRepo) -> ReleaseResult<bool> {
  let branch = git.current_branch()?;
  if !git.has_commits_to_push(ctx.remote(), &branch)? {
    return Ok(false);
  }

  if ctx.dry_run {
    say!("     [dry-run] git -C {} push -u {} {}", git.path().display(), ctx.remote(), branch);
    return Ok(false);
  }

  git.push_branch(ctx.remote(), &branch)?;
  say!("   🚀 pushed {}", branch);

  if let Some(link) = git
    .remote_url(ctx.remote())?
    .and_then(|url| utils::compare_link(&url, &branch))
  {
    say!("   🔗 Open a PR: {}", link);
  }
  Ok(true)
}
