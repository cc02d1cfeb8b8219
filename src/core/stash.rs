//! Scoped stash around branch switching
//!
//! [`ScopedStash`] stashes a dirty working tree on acquisition and restores
//! it on [`ScopedStash::release`]. If the guard is dropped without an explicit
//! release (early `?` return, panic) the restore runs from `Drop`, so the
//! operator's changes are never left silently stashed.
//!
//! The entry is tracked by commit id. Other stashes pushed or dropped in the
//! meantime do not confuse it, and two entries with the same message cannot be
//! mixed up.

use crate::core::error::ReleaseResult;
use crate::core::vcs::{GitRepo, StashEntry};
use serde::Serialize;

/// Result of restoring a stash
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StashOutcome {
  /// A stash entry still exists and must be surfaced to the operator
  pub kept: bool,
  /// Applying the stash produced conflicts
  pub conflicted: bool,
}

/// RAII guard over a stash entry created by this process
#[derive(Debug)]
pub struct ScopedStash<'a> {
  git: &'a GitRepo,
  entry: Option<StashEntry>,
  keep: bool,
}

impl<'a> ScopedStash<'a> {
  /// Stash uncommitted changes (including untracked files)
  ///
  /// A clean tree yields an inactive guard whose release is a no-op.
  pub fn acquire(git: &'a GitRepo, message: &str, keep: bool) -> ReleaseResult<Self> {
    let entry = git.stash_push(message)?;
    if let Some(entry) = &entry {
      tracing::debug!(repo = %git.name(), oid = %entry.oid, message = %entry.message, "stashed working tree");
    }
    Ok(Self { git, entry, keep })
  }

  /// Restore the stashed changes
  ///
  /// Clean apply: the entry is dropped unless `keep` was requested.
  /// Failed or conflicting apply: the entry is kept.
  pub fn release(mut self) -> ReleaseResult<StashOutcome> {
    self.restore()
  }

  fn restore(&mut self) -> ReleaseResult<StashOutcome> {
    let Some(entry) = self.entry.take() else {
      return Ok(StashOutcome::default());
    };

    let Some(index) = self.git.stash_index(&entry)? else {
      tracing::warn!(repo = %self.git.name(), oid = %entry.oid, "stash entry disappeared before restore");
      return Ok(StashOutcome::default());
    };

    let applied = self.git.stash_apply(index)?;
    if !applied.success {
      let conflicted = applied.combined().contains("CONFLICT") || !self.git.conflicted_files()?.is_empty();
      tracing::warn!(
        repo = %self.git.name(),
        oid = %entry.oid,
        conflicted,
        "stash could not be applied cleanly, keeping it"
      );
      return Ok(StashOutcome { kept: true, conflicted });
    }

    if self.keep {
      return Ok(StashOutcome {
        kept: true,
        conflicted: false,
      });
    }

    // Apply does not reorder the list, but resolve again anyway
    if let Some(index) = self.git.stash_index(&entry)? {
      self.git.stash_drop(index)?;
    }
    Ok(StashOutcome::default())
  }
}

impl Drop for ScopedStash<'_> {
  fn drop(&mut self) {
    if self.entry.is_none() {
      return;
    }
    match self.restore() {
      Ok(outcome) if outcome.kept => {
        eprintln!("⚠️  {}: stash kept after interrupted branch switch (see `git stash list`)", self.git.name());
      }
      Ok(_) => {}
      Err(e) => {
        tracing::error!(repo = %self.git.name(), "failed to restore stash: {}", e);
      }
    }
  }
}
