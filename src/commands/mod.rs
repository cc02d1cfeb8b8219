//! Stage entry points for release-train
//!
//! Each stage is a separate, re-runnable invocation. They are meant to be
//! run in order, with human edits in between:
//!
//! - **stage0**: prepare the dev branch in every package
//! - **stage1**: snapshot uncommitted changes (then edit `commit_message`)
//! - **stage2**: commit and/or push
//! - **stage3**: snapshot changes since the last tag (then edit `tag_message`)
//! - **stage4**: bump versions, commit the release, pin staging
//! - **stage5**: tag releases, pin prod
//! - **stage6**: start the next dev cycle
//! - **clear**: reset the artifact tree
//!
//! All stages accept `&StageContext` and return a [`report::StageReport`].

pub mod clear;
pub mod report;
pub mod stage0;
pub mod stage1;
pub mod stage2;
pub mod stage3;
pub mod stage4;
pub mod stage5;
pub mod stage6;

pub use clear::run_clear;
pub use stage0::{Stage0Options, run_stage0};
pub use stage1::run_stage1;
pub use stage2::run_stage2;
pub use stage3::run_stage3;
pub use stage4::{Stage4Options, run_stage4};
pub use stage5::{Stage5Options, run_stage5};
pub use stage6::{Stage6Options, run_stage6};

use crate::core::context::StageContext;
use crate::core::error::{ManifestError, ReleaseError, ReleaseResult};
use crate::core::manifest::Manifest;
use crate::ui::say;
use std::path::Path;

/// Load a staging/prod root manifest
///
/// A missing manifest means "nothing to pin"; an unreadable one is reported
/// and treated the same way so package work still happens.
fn load_root_manifest(path: &Path) -> Option<Manifest> {
  match Manifest::load(path) {
    Ok(manifest) => Some(manifest),
    Err(ReleaseError::Manifest(ManifestError::NotFound { .. })) => {
      tracing::debug!(path = %path.display(), "root manifest not found, pins skipped");
      None
    }
    Err(e) => {
      tracing::warn!(path = %path.display(), "{}", e);
      say!("   ⚠️  {}; pins not updated", e);
      None
    }
  }
}

/// Save a changed root manifest and commit it in the workspace root repository
///
/// Failures are reported, not returned: package releases have already
/// happened at this point and must still show up in the summary.
fn commit_root_manifest(ctx: &StageContext, manifest: &Manifest, message: &str, push: bool) {
  let relative = manifest
    .path()
    .strip_prefix(&ctx.root)
    .unwrap_or(manifest.path())
    .to_path_buf();

  if ctx.dry_run {
    say!("     [dry-run] write {}", relative.display());
    say!("     [dry-run] git add {}", relative.display());
    say!("     [dry-run] git commit -m {:?}", message);
    if push {
      say!("     [dry-run] git push {}", ctx.remote());
    }
    return;
  }

  if let Err(e) = save_and_commit(ctx, manifest, &relative, message, push) {
    tracing::error!(path = %relative.display(), "{}", e);
    say!("   ❌ {}: {}", relative.display(), e);
  }
}

fn save_and_commit(ctx: &StageContext, manifest: &Manifest, relative: &Path, message: &str, push: bool) -> ReleaseResult<()> {
  manifest.save()?;
  say!("   📝 {} updated", relative.display());

  let Some(root) = ctx.root_repo() else {
    say!("   ⚠️  workspace root is not a git repository; {} left uncommitted", relative.display());
    return Ok(());
  };

  root.add_path(relative)?;
  if root.commit_path(message, relative)? {
    say!("   ✅ committed {} ({})", relative.display(), message);
  }

  if push && !root.has_remote(ctx.remote())? {
    say!("   ⚠️  workspace root has no remote '{}'; push skipped", ctx.remote());
  } else if push {
    let branch = root.current_branch()?;
    if root.has_commits_to_push(ctx.remote(), &branch)? {
      root.push_branch(ctx.remote(), &branch)?;
      say!("   🚀 pushed workspace root ({})", branch);
    }
  }
  Ok(())
}
