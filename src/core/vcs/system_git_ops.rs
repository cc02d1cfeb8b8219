//! Git primitives for release stages (branches, remotes, tags, diffs, stash)

use super::system_git::{GitOutput, GitRepo};
use crate::core::error::{GitError, ReleaseError, ReleaseResult};
use crate::utils::path_to_git_format;
use std::path::Path;

/// A stash entry created by this process, identified by commit id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StashEntry {
  /// Commit id of the stash (stable while entries are pushed/dropped around it)
  pub oid: String,
  pub message: String,
}

impl GitRepo {
  // ==========================================================================
  // Remotes & branches
  // ==========================================================================

  /// Fetch from remote
  pub fn fetch(&self, remote: &str) -> ReleaseResult<()> {
    self.run_checked(&["fetch", remote])?;
    Ok(())
  }

  /// Check if remote is configured
  pub fn has_remote(&self, name: &str) -> ReleaseResult<bool> {
    Ok(self.run(&["remote", "get-url", name])?.success)
  }

  /// Get remote URL
  pub fn remote_url(&self, name: &str) -> ReleaseResult<Option<String>> {
    let output = self.run(&["remote", "get-url", name])?;
    Ok(if output.success && !output.text().is_empty() {
      Some(output.text().to_string())
    } else {
      None
    })
  }

  /// Check if `remote/branch` exists as a remote-tracking ref
  pub fn remote_branch_exists(&self, remote: &str, branch: &str) -> ReleaseResult<bool> {
    let refname = format!("refs/remotes/{}/{}", remote, branch);
    Ok(self.run(&["rev-parse", "--verify", "--quiet", &refname])?.success)
  }

  /// Check if a local branch exists
  pub fn local_branch_exists(&self, branch: &str) -> ReleaseResult<bool> {
    let refname = format!("refs/heads/{}", branch);
    Ok(self.run(&["show-ref", "--verify", "--quiet", &refname])?.success)
  }

  /// Default branch advertised by the remote (`refs/remotes/<remote>/HEAD`)
  pub fn remote_default_branch(&self, remote: &str) -> ReleaseResult<Option<String>> {
    let refname = format!("refs/remotes/{}/HEAD", remote);
    let output = self.run(&["symbolic-ref", "--short", &refname])?;
    if !output.success {
      return Ok(None);
    }
    let prefix = format!("{}/", remote);
    Ok(
      output
        .text()
        .strip_prefix(&prefix)
        .filter(|b| !b.is_empty())
        .map(str::to_string),
    )
  }

  /// Get current branch name ("HEAD" when detached)
  pub fn current_branch(&self) -> ReleaseResult<String> {
    self.read(&["rev-parse", "--abbrev-ref", "HEAD"])
  }

  /// Checkout an existing branch
  pub fn checkout(&self, branch: &str) -> ReleaseResult<()> {
    self.run_checked(&["checkout", branch])?;
    Ok(())
  }

  /// Create a branch at `start` and check it out
  pub fn checkout_new(&self, branch: &str, start: &str) -> ReleaseResult<()> {
    self.run_checked(&["checkout", "-b", branch, start])?;
    Ok(())
  }

  /// Create or reset a branch to `start` and check it out
  pub fn checkout_reset(&self, branch: &str, start: &str) -> ReleaseResult<()> {
    self.run_checked(&["checkout", "-B", branch, start])?;
    Ok(())
  }

  /// Fast-forward the current branch to `target`
  ///
  /// Returns whether HEAD moved. Divergence is [`GitError::FastForwardRejected`].
  pub fn fast_forward(&self, target: &str) -> ReleaseResult<bool> {
    let output = self.run(&["merge", "--ff-only", target])?;
    if output.success {
      return Ok(!output.combined().contains("Already up to date"));
    }
    Err(ReleaseError::Git(GitError::FastForwardRejected {
      target: target.to_string(),
      output: output.combined(),
    }))
  }

  /// Configure `remote/branch` as upstream of `branch`
  pub fn set_upstream(&self, branch: &str, remote: &str) -> ReleaseResult<()> {
    let upstream = format!("{}/{}", remote, branch);
    self.run_checked(&["branch", "--set-upstream-to", &upstream, branch])?;
    Ok(())
  }

  /// Delete a merged local branch
  pub fn delete_branch(&self, branch: &str) -> ReleaseResult<()> {
    self.run_checked(&["branch", "-d", branch])?;
    Ok(())
  }

  /// Commits `(ahead, behind)` of `local` relative to `upstream`
  pub fn ahead_behind(&self, local: &str, upstream: &str) -> ReleaseResult<(u32, u32)> {
    let range = format!("{}...{}", local, upstream);
    let output = self.run(&["rev-list", "--left-right", "--count", &range])?;
    if !output.success {
      return Ok((0, 0));
    }
    Ok(parse_left_right(output.text()))
  }

  /// Whether `branch` has commits the remote does not (true if the remote branch is missing)
  pub fn has_commits_to_push(&self, remote: &str, branch: &str) -> ReleaseResult<bool> {
    if !self.remote_branch_exists(remote, branch)? {
      return Ok(true);
    }
    let (ahead, _) = self.ahead_behind(branch, &format!("{}/{}", remote, branch))?;
    Ok(ahead > 0)
  }

  /// Push a branch and set its upstream
  pub fn push_branch(&self, remote: &str, branch: &str) -> ReleaseResult<()> {
    let output = self.run(&["push", "-u", remote, branch])?;
    if !output.success {
      return Err(ReleaseError::Git(GitError::PushFailed {
        remote: remote.to_string(),
        refspec: branch.to_string(),
        reason: output.combined(),
      }));
    }
    Ok(())
  }

  /// Push a single tag
  pub fn push_tag(&self, remote: &str, tag: &str) -> ReleaseResult<()> {
    let refspec = format!("refs/tags/{}", tag);
    let output = self.run(&["push", remote, &refspec])?;
    if !output.success {
      return Err(ReleaseError::Git(GitError::PushFailed {
        remote: remote.to_string(),
        refspec,
        reason: output.combined(),
      }));
    }
    Ok(())
  }

  // ==========================================================================
  // Working tree
  // ==========================================================================

  /// `git status --porcelain`
  pub fn status_porcelain(&self) -> ReleaseResult<String> {
    Ok(self.run_checked(&["status", "--porcelain"])?.stdout.trim_end().to_string())
  }

  /// Whether the working tree has uncommitted changes (tracked or untracked)
  pub fn is_dirty(&self) -> ReleaseResult<bool> {
    Ok(!self.status_porcelain()?.trim().is_empty())
  }

  /// Whether a single path has uncommitted changes
  pub fn is_path_dirty(&self, path: &Path) -> ReleaseResult<bool> {
    let path = path_to_git_format(path);
    let output = self.run_checked(&["status", "--porcelain", "--", &path])?;
    Ok(!output.text().is_empty())
  }

  /// `git diff --stat` of the working tree
  pub fn diff_stat(&self) -> ReleaseResult<String> {
    Ok(self.run_checked(&["diff", "--stat"])?.stdout.trim_end().to_string())
  }

  /// Full `git diff` of the working tree
  pub fn diff(&self) -> ReleaseResult<String> {
    Ok(self.run_checked(&["diff"])?.stdout.trim_end().to_string())
  }

  /// Stage everything
  pub fn add_all(&self) -> ReleaseResult<()> {
    self.run_checked(&["add", "-A"])?;
    Ok(())
  }

  /// Stage a single path
  pub fn add_path(&self, path: &Path) -> ReleaseResult<()> {
    let path = path_to_git_format(path);
    self.run_checked(&["add", "--", &path])?;
    Ok(())
  }

  /// Commit staged changes
  ///
  /// Returns `false` when there was nothing to commit.
  pub fn commit(&self, message: &str) -> ReleaseResult<bool> {
    let output = self.run(&["commit", "-m", message])?;
    if output.success {
      return Ok(true);
    }
    if is_nothing_to_commit(&output) {
      return Ok(false);
    }
    Err(ReleaseError::Git(GitError::CommandFailed {
      command: "git commit".to_string(),
      output: output.combined(),
    }))
  }

  /// Commit a single staged path, leaving the rest of the index alone
  ///
  /// Returns `false` when the path had nothing to commit.
  pub fn commit_path(&self, message: &str, path: &Path) -> ReleaseResult<bool> {
    let path = path_to_git_format(path);
    let output = self.run(&["commit", "-m", message, "--", &path])?;
    if output.success {
      return Ok(true);
    }
    if is_nothing_to_commit(&output) {
      return Ok(false);
    }
    Err(ReleaseError::Git(GitError::CommandFailed {
      command: format!("git commit -- {}", path),
      output: output.combined(),
    }))
  }

  /// Full message of the HEAD commit
  pub fn last_commit_message(&self) -> ReleaseResult<String> {
    let output = self.run(&["log", "-1", "--pretty=%B"])?;
    Ok(if output.success { output.text().to_string() } else { String::new() })
  }

  // ==========================================================================
  // Tags & history
  // ==========================================================================

  /// Most recent tag reachable from HEAD
  pub fn last_tag(&self) -> ReleaseResult<Option<String>> {
    let output = self.run(&["describe", "--tags", "--abbrev=0"])?;
    Ok(if output.success && !output.text().is_empty() {
      Some(output.text().to_string())
    } else {
      None
    })
  }

  /// Check if a tag exists
  pub fn tag_exists(&self, tag: &str) -> ReleaseResult<bool> {
    let refname = format!("refs/tags/{}", tag);
    Ok(self.run(&["rev-parse", "--verify", "--quiet", &refname])?.success)
  }

  /// Check if a revision resolves to a commit
  pub fn resolves_to_commit(&self, rev: &str) -> ReleaseResult<bool> {
    let spec = format!("{}^{{commit}}", rev);
    Ok(self.run(&["rev-parse", "--verify", "--quiet", &spec])?.success)
  }

  /// Create an annotated tag at HEAD
  pub fn create_annotated_tag(&self, tag: &str, message: &str) -> ReleaseResult<()> {
    self.run_checked(&["tag", "-a", tag, "-m", message])?;
    Ok(())
  }

  /// Number of commits after `since` (None = all commits reachable from HEAD)
  pub fn commits_since(&self, since: Option<&str>) -> ReleaseResult<u32> {
    let range = match since {
      Some(tag) => format!("{}..HEAD", tag),
      None => "HEAD".to_string(),
    };
    let output = self.run(&["rev-list", "--count", &range])?;
    if !output.success {
      // Unborn HEAD has no commits
      return Ok(0);
    }
    Ok(output.text().parse().unwrap_or(0))
  }

  /// Diff between `since` and HEAD (None = from the empty tree)
  pub fn diff_since(&self, since: Option<&str>) -> ReleaseResult<String> {
    let base = match since {
      Some(tag) => tag.to_string(),
      None => self.empty_tree()?,
    };
    Ok(self.run_checked(&["diff", &base, "HEAD"])?.stdout.trim_end().to_string())
  }

  /// Object id of the empty tree in this repository's hash format
  fn empty_tree(&self) -> ReleaseResult<String> {
    self.read(&["hash-object", "-t", "tree", "--stdin"])
  }

  // ==========================================================================
  // Stash
  // ==========================================================================

  /// Stash all changes including untracked files
  ///
  /// Returns `None` when git had nothing to stash.
  pub fn stash_push(&self, message: &str) -> ReleaseResult<Option<StashEntry>> {
    let before = self.stash_top()?;
    self.run_checked(&["stash", "push", "--include-untracked", "-m", message])?;
    let after = self.stash_top()?;

    Ok(match after {
      Some(oid) if before.as_deref() != Some(oid.as_str()) => Some(StashEntry {
        oid,
        message: message.to_string(),
      }),
      _ => None,
    })
  }

  /// Current position of an entry in `stash list`, looked up by commit id
  pub fn stash_index(&self, entry: &StashEntry) -> ReleaseResult<Option<usize>> {
    let output = self.run_checked(&["stash", "list", "--format=%H"])?;
    Ok(output.stdout.lines().position(|line| line.trim() == entry.oid))
  }

  /// Apply a stash entry without dropping it
  pub fn stash_apply(&self, index: usize) -> ReleaseResult<GitOutput> {
    let stash_ref = format!("stash@{{{}}}", index);
    self.run(&["stash", "apply", &stash_ref])
  }

  /// Drop a stash entry
  pub fn stash_drop(&self, index: usize) -> ReleaseResult<()> {
    let stash_ref = format!("stash@{{{}}}", index);
    self.run_checked(&["stash", "drop", &stash_ref])?;
    Ok(())
  }

  /// Paths with unresolved merge conflicts
  pub fn conflicted_files(&self) -> ReleaseResult<Vec<String>> {
    let output = self.run(&["diff", "--name-only", "--diff-filter=U"])?;
    Ok(
      output
        .stdout
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect(),
    )
  }

  fn stash_top(&self) -> ReleaseResult<Option<String>> {
    let output = self.run(&["rev-parse", "--verify", "--quiet", "refs/stash"])?;
    Ok(if output.success { Some(output.text().to_string()) } else { None })
  }
}

/// Parse `rev-list --left-right --count` output ("<left>\t<right>")
fn parse_left_right(text: &str) -> (u32, u32) {
  let mut parts = text.split_whitespace().map(|p| p.parse::<u32>().unwrap_or(0));
  let left = parts.next().unwrap_or(0);
  let right = parts.next().unwrap_or(0);
  (left, right)
}

fn is_nothing_to_commit(output: &GitOutput) -> bool {
  let text = output.combined();
  text.contains("nothing to commit") || text.contains("nothing added to commit") || text.contains("no changes added to commit")
}
