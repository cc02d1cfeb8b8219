//! Stage 5: tag releases and pin prod
//!
//! The version to tag is the one stage 4 recorded, falling back to the
//! manifest. An existing tag for it means the package was already released:
//! it is reported and left completely untouched. A HEAD whose manifest does
//! not carry that version is never tagged.

use crate::commands::report::{PackageOutcome, StageReport};
use crate::commands::{commit_root_manifest, load_root_manifest};
use crate::core::artifacts::{is_placeholder, substitute_placeholders};
use crate::core::context::StageContext;
use crate::core::error::ReleaseResult;
use crate::core::manifest::Manifest;
use crate::core::packages::Package;
use crate::core::vcs::GitRepo;
use crate::release::tags;
use crate::ui::say;
use crate::utils;

const PROD_COMMIT_MESSAGE: &str = "chore(prod): update dependencies";

/// Options for stage 5
#[derive(Debug, Clone)]
pub struct Stage5Options {
  pub push: bool,
  /// Fast-forward the base branch before tagging
  pub sync: bool,
  pub base_branch: String,
  /// Local branch to delete after syncing
  pub delete_branch: Option<String>,
  /// Overrides `git_remote`
  pub remote: Option<String>,
}

/// Run stage 5
pub fn run_stage5(ctx: &StageContext, opts: &Stage5Options) -> ReleaseResult<StageReport> {
  let registry = ctx.packages()?;
  let remote = opts.remote.as_deref().unwrap_or(ctx.remote());
  let cycle = registry.current_cycle();

  say!(
    "📦 Stage 5: tagging {} package(s) of the current cycle{}",
    cycle.len(),
    if ctx.dry_run { " (dry-run)" } else { "" }
  );

  let mut prod = load_root_manifest(&ctx.prod_manifest());
  let mut prod_changed = false;
  let mut report = StageReport::new("stage5", ctx.dry_run);

  for pkg in cycle {
    report.record(pkg, || {
      let (outcome, pinned) = tag_package(ctx, pkg, opts, remote, prod.as_mut())?;
      prod_changed |= pinned;
      Ok(outcome)
    });
  }

  if prod_changed && let Some(prod) = &prod {
    commit_root_manifest(ctx, prod, PROD_COMMIT_MESSAGE, opts.push);
  }

  Ok(report)
}

fn tag_package(
  ctx: &StageContext,
  pkg: &Package,
  opts: &Stage5Options,
  remote: &str,
  prod: Option<&mut Manifest>,
) -> ReleaseResult<(PackageOutcome, bool)> {
  let store = ctx.artifacts();
  let config = &ctx.config;

  let tag_message = store.tag_message(pkg)?;
  if tag_message.as_deref().is_some_and(is_placeholder) {
    return Ok((PackageOutcome::skipped(pkg, "tag message not edited"), false));
  }

  let git = pkg.repo()?;
  let manifest = Manifest::load(&pkg.manifest_path)?;
  let project_name = manifest.require_str(&config.manifest_name_key)?;
  // The version stage 4 released wins over whatever branch is checked out now
  let version = match store.release_version(pkg)? {
    Some(released) => released,
    None => manifest.require_str(&config.manifest_version_key)?,
  };
  let tag = config.tag_name(&version);

  if git.tag_exists(&tag)? {
    return Ok((PackageOutcome::no_op(pkg, format!("tag {} already exists", tag)), false));
  }

  say!("\n📦 {} -> {}", pkg.name, tag);

  if opts.sync && !sync_base(ctx, &git, opts, remote) {
    return Ok((
      PackageOutcome::skipped(pkg, format!("could not sync {}", opts.base_branch)),
      false,
    ));
  }

  // The tag goes on HEAD, which must carry the release commit
  if !ctx.dry_run {
    let head_version = Manifest::load(&pkg.manifest_path)?.require_str(&config.manifest_version_key)?;
    if head_version != version {
      let branch = git.current_branch()?;
      tracing::warn!(package = %pkg.name, expected = %version, found = %head_version, "release commit not checked out");
      say!("   ⚠️  {} is at {} on {}, expected {}; not tagging", pkg.name, head_version, branch, version);
      return Ok((
        PackageOutcome::skipped(pkg, format!("release commit not on {}", branch)),
        false,
      ));
    }
  }

  let prev_version = git
    .last_tag()?
    .map(|prev| tags::version_from_tag(&prev, &config.tag_prefix).to_string())
    .unwrap_or_else(|| version.clone());

  let raw_message = match tag_message {
    Some(message) => message,
    None => {
      let last = git.last_commit_message()?;
      if last.is_empty() { format!("Release {}", tag) } else { last }
    }
  };
  let message = substitute_placeholders(&raw_message, &version, &prev_version);

  let mut pushed = false;
  if ctx.dry_run {
    say!(
      "     [dry-run] git -C {} tag -a {} -m {:?}",
      pkg.path.display(),
      tag,
      message.lines().next().unwrap_or_default()
    );
    if opts.push {
      say!("     [dry-run] git -C {} push {} refs/tags/{}", pkg.path.display(), remote, tag);
    }
  } else {
    git.create_annotated_tag(&tag, &message)?;
    say!("   ✅ created tag {}", tag);

    if opts.push {
      git.push_tag(remote, &tag)?;
      pushed = true;
      say!("   🚀 pushed {}", tag);
      if let Some(link) = git.remote_url(remote)?.and_then(|url| utils::release_link(&url, &tag)) {
        say!("   🔗 {}", link);
      }
    }
  }

  let pinned = match prod {
    Some(prod) => prod.set_dependency_ref(
      &config.dependency_sources_key,
      &project_name,
      &config.dependency_ref_field,
      &tag,
    ),
    None => false,
  };
  if pinned {
    say!("   📝 prod pin {} = {}", project_name, tag);
  }

  let detail = match (ctx.dry_run, pushed) {
    (true, _) => format!("tag {} planned", tag),
    (false, true) => format!("tagged and pushed {}", tag),
    (false, false) => format!("tagged {}", tag),
  };
  Ok((PackageOutcome::done(pkg, detail).pushed(pushed), pinned))
}

/// Bring the base branch up to date before tagging
///
/// Returns false when the base could not be checked out or fast-forwarded.
/// A failed branch delete is only a warning.
fn sync_base(ctx: &StageContext, git: &GitRepo, opts: &Stage5Options, remote: &str) -> bool {
  let base = &opts.base_branch;
  let remote_base = format!("{}/{}", remote, base);

  if ctx.dry_run {
    say!("     [dry-run] git -C {} fetch {}", git.path().display(), remote);
    say!("     [dry-run] git -C {} checkout {}", git.path().display(), base);
    say!("     [dry-run] git -C {} merge --ff-only {}", git.path().display(), remote_base);
    if let Some(branch) = &opts.delete_branch {
      say!("     [dry-run] git -C {} branch -d {}", git.path().display(), branch);
    }
    return true;
  }

  if let Err(e) = git.fetch(remote).and_then(|()| git.checkout(base)) {
    tracing::warn!(repo = %git.name(), "sync failed: {}", e);
    say!("   ⚠️  could not switch to {}: {}", base, e);
    return false;
  }

  match git.fast_forward(&remote_base) {
    Ok(true) => say!("   ⬆️  {} fast-forwarded to {}", base, remote_base),
    Ok(false) => {}
    Err(e) => {
      tracing::warn!(repo = %git.name(), "sync merge failed: {}", e);
      say!("   ⚠️  could not fast-forward {}: {}", base, e);
      return false;
    }
  }

  if let Some(branch) = &opts.delete_branch {
    match git.delete_branch(branch) {
      Ok(()) => say!("   🧹 deleted local branch {}", branch),
      Err(e) => {
        tracing::warn!(repo = %git.name(), branch = %branch, "branch delete failed: {}", e);
        say!("   ⚠️  could not delete {}: {}", branch, e);
      }
    }
  }
  true
}
