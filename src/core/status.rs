//! Ahead/behind/uncommitted snapshot of a package repository

use crate::core::error::ReleaseResult;
use crate::core::vcs::GitRepo;
use serde::Serialize;

/// Point-in-time status of a branch relative to its remote counterpart
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RepoStatus {
  pub ahead: u32,
  pub behind: u32,
  pub uncommitted: bool,
}

/// Compute the status of `branch` against `remote/branch`
///
/// Counts are 0/0 when the remote branch does not exist.
pub fn analyze(git: &GitRepo, branch: &str, remote: &str) -> ReleaseResult<RepoStatus> {
  let (ahead, behind) = if git.remote_branch_exists(remote, branch)? {
    git.ahead_behind(branch, &format!("{}/{}", remote, branch))?
  } else {
    (0, 0)
  };

  Ok(RepoStatus {
    ahead,
    behind,
    uncommitted: git.is_dirty()?,
  })
}
