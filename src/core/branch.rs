//! Dev branch preparation
//!
//! Brings a package repository onto the dev branch:
//!
//! 1. fetch the remote
//! 2. remote dev branch exists: check it out (tracking) and fast-forward it
//! 3. otherwise: reuse a local dev branch as-is, or create it from the first
//!    start point that exists (`remote/base`, the remote default branch,
//!    local `base`)
//! 4. a dirty working tree is stashed around the switch and restored after
//! 5. optionally push when the branch has commits the remote lacks
//!
//! Divergence from the remote is reported, never forced.

use crate::core::error::{GitError, ReleaseError, ReleaseResult};
use crate::core::stash::{ScopedStash, StashOutcome};
use crate::core::status::{self, RepoStatus};
use crate::core::vcs::GitRepo;
use crate::ui::say;
use serde::Serialize;

/// Options for [`prepare_branch`]
#[derive(Debug, Clone)]
pub struct PrepareOptions<'a> {
  pub branch: &'a str,
  pub base: &'a str,
  pub remote: &'a str,
  pub push: bool,
  /// Stash a dirty tree around the switch (false = a dirty tree blocks any checkout)
  pub use_stash: bool,
  pub stash_name: &'a str,
  pub keep_stash: bool,
  /// Allow the remote default branch as a start point
  pub fallback_head: bool,
  /// Allow the local base branch as a start point
  pub fallback_local: bool,
  pub dry_run: bool,
}

/// How the dev branch is reached
#[derive(Debug, Clone, PartialEq, Eq)]
enum SwitchPlan {
  /// Remote branch exists: track it and fast-forward
  Track { remote_ref: String, local_exists: bool },
  /// Local branch exists without a remote counterpart: use it unchanged
  Existing,
  /// Create the branch at a start point
  Create { start: String },
}

impl SwitchPlan {
  fn needs_checkout(&self, on_branch: bool) -> bool {
    match self {
      SwitchPlan::Track { local_exists, .. } => !local_exists || !on_branch,
      SwitchPlan::Existing => !on_branch,
      SwitchPlan::Create { .. } => true,
    }
  }
}

/// What [`prepare_branch`] did
#[derive(Debug, Clone, Default, Serialize)]
pub struct PreparedBranch {
  pub status: RepoStatus,
  pub pushed: bool,
  pub stash: StashOutcome,
  /// Local and remote dev branches have diverged
  pub diverged: bool,
  /// HEAD changed: a checkout, a fast-forward or a push happened
  pub moved: bool,
}

/// Result of the checkout/fast-forward step
#[derive(Debug, Clone, Copy, Default)]
struct Switched {
  diverged: bool,
  moved: bool,
}

/// Prepare the dev branch in one package repository
pub fn prepare_branch(git: &GitRepo, opts: &PrepareOptions<'_>) -> ReleaseResult<PreparedBranch> {
  if opts.dry_run {
    say!("     [dry-run] git fetch {}", opts.remote);
  } else {
    git.fetch(opts.remote)?;
  }

  let plan = plan_switch(git, opts)?;
  let on_branch = git.current_branch()? == opts.branch;

  // A dirty tree only matters when the checkout would carry it across branches
  let dirty = git.is_dirty()?;
  if dirty && !opts.use_stash && plan.needs_checkout(on_branch) {
    return Err(ReleaseError::Git(GitError::DirtyWorkingTree {
      path: git.path().to_path_buf(),
    }));
  }
  let stash_needed = dirty && opts.use_stash;

  if opts.dry_run {
    print_plan(&plan, opts, stash_needed);
    return Ok(PreparedBranch {
      status: status::analyze(git, opts.branch, opts.remote)?,
      ..PreparedBranch::default()
    });
  }

  let stash = if stash_needed {
    Some(ScopedStash::acquire(git, opts.stash_name, opts.keep_stash)?)
  } else {
    None
  };

  let switched = switch_branch(git, opts, &plan, on_branch);
  let stash = match stash {
    Some(guard) => guard.release(),
    None => Ok(StashOutcome::default()),
  };
  let switched = switched?;
  let stash = stash?;

  if git.remote_branch_exists(opts.remote, opts.branch)? {
    git.set_upstream(opts.branch, opts.remote)?;
  }

  let mut pushed = false;
  if opts.push && git.has_commits_to_push(opts.remote, opts.branch)? {
    git.push_branch(opts.remote, opts.branch)?;
    pushed = true;
  }

  Ok(PreparedBranch {
    status: status::analyze(git, opts.branch, opts.remote)?,
    pushed,
    stash,
    diverged: switched.diverged,
    moved: switched.moved || pushed,
  })
}

fn plan_switch(git: &GitRepo, opts: &PrepareOptions<'_>) -> ReleaseResult<SwitchPlan> {
  let local_exists = git.local_branch_exists(opts.branch)?;

  if git.remote_branch_exists(opts.remote, opts.branch)? {
    return Ok(SwitchPlan::Track {
      remote_ref: format!("{}/{}", opts.remote, opts.branch),
      local_exists,
    });
  }

  if local_exists {
    return Ok(SwitchPlan::Existing);
  }

  Ok(SwitchPlan::Create {
    start: resolve_start_point(git, opts)?,
  })
}

/// First existing start point: `remote/base`, remote default branch, local `base`
fn resolve_start_point(git: &GitRepo, opts: &PrepareOptions<'_>) -> ReleaseResult<String> {
  if git.remote_branch_exists(opts.remote, opts.base)? {
    return Ok(format!("{}/{}", opts.remote, opts.base));
  }

  if opts.fallback_head
    && let Some(default) = git.remote_default_branch(opts.remote)?
    && git.remote_branch_exists(opts.remote, &default)?
  {
    tracing::debug!(repo = %git.name(), default = %default, "using remote default branch as start point");
    return Ok(format!("{}/{}", opts.remote, default));
  }

  if opts.fallback_local && git.local_branch_exists(opts.base)? {
    tracing::debug!(repo = %git.name(), base = %opts.base, "using local base branch as start point");
    return Ok(opts.base.to_string());
  }

  Err(ReleaseError::Git(GitError::NoStartPoint {
    branch: opts.branch.to_string(),
    base: opts.base.to_string(),
  }))
}

/// Perform the switch
fn switch_branch(git: &GitRepo, opts: &PrepareOptions<'_>, plan: &SwitchPlan, on_branch: bool) -> ReleaseResult<Switched> {
  let checked_out = plan.needs_checkout(on_branch);

  match plan {
    SwitchPlan::Track {
      remote_ref,
      local_exists,
    } => {
      if !local_exists {
        git.checkout_new(opts.branch, remote_ref)?;
      } else if !on_branch {
        git.checkout(opts.branch)?;
      }

      match git.fast_forward(remote_ref) {
        Ok(advanced) => Ok(Switched {
          diverged: false,
          moved: checked_out || advanced,
        }),
        Err(ReleaseError::Git(GitError::FastForwardRejected { output, .. })) => {
          tracing::warn!(repo = %git.name(), "{} diverged from {}: {}", opts.branch, remote_ref, output);
          Ok(Switched {
            diverged: true,
            moved: checked_out,
          })
        }
        Err(e) => Err(e),
      }
    }
    SwitchPlan::Existing => {
      if !on_branch {
        git.checkout(opts.branch)?;
      }
      Ok(Switched {
        diverged: false,
        moved: checked_out,
      })
    }
    SwitchPlan::Create { start } => {
      git.checkout_new(opts.branch, start)?;
      Ok(Switched {
        diverged: false,
        moved: true,
      })
    }
  }
}

fn print_plan(plan: &SwitchPlan, opts: &PrepareOptions<'_>, stash: bool) {
  if stash {
    say!("     [dry-run] git stash push --include-untracked -m {}", opts.stash_name);
  }
  match plan {
    SwitchPlan::Track {
      remote_ref,
      local_exists,
    } => {
      if *local_exists {
        say!("     [dry-run] git checkout {}", opts.branch);
      } else {
        say!("     [dry-run] git checkout -b {} {}", opts.branch, remote_ref);
      }
      say!("     [dry-run] git merge --ff-only {}", remote_ref);
    }
    SwitchPlan::Existing => say!("     [dry-run] git checkout {}", opts.branch),
    SwitchPlan::Create { start } => say!("     [dry-run] git checkout -b {} {}", opts.branch, start),
  }
  if stash {
    say!("     [dry-run] git stash apply <{}>", opts.stash_name);
  }
  if opts.push {
    say!("     [dry-run] git push -u {} {} (if ahead)", opts.remote, opts.branch);
  }
}
