//! System git backend
//!
//! Every repository interaction goes through [`GitRepo::run`]: one blocking
//! subprocess per call, captured output, no implicit timeout. A non-zero exit
//! is returned to the caller as data; [`GitRepo::run_checked`] is for calls
//! that are expected to always succeed.

use crate::core::error::{GitError, ReleaseError, ReleaseResult, ResultExt};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Captured result of a git invocation
#[derive(Debug, Clone)]
pub struct GitOutput {
  pub success: bool,
  pub code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl GitOutput {
  /// Trimmed stdout
  pub fn text(&self) -> &str {
    self.stdout.trim()
  }

  /// stderr followed by stdout, for error reports
  pub fn combined(&self) -> String {
    match (self.stderr.trim(), self.stdout.trim()) {
      ("", out) => out.to_string(),
      (err, "") => err.to_string(),
      (err, out) => format!("{}\n{}", err, out),
    }
  }
}

/// Git repository handle using system git
#[derive(Debug, Clone)]
pub struct GitRepo {
  /// Repository working directory
  pub(crate) repo_path: PathBuf,
}

impl GitRepo {
  /// Open a git repository
  ///
  /// This performs ONE subprocess call to confirm the path is the top of a
  /// work tree (a package nested inside another checkout does not count).
  pub fn open(path: &Path) -> ReleaseResult<Self> {
    let repo = Self {
      repo_path: path.to_path_buf(),
    };

    let output = repo.run(&["rev-parse", "--show-toplevel"])?;
    let is_toplevel = output.success
      && std::fs::canonicalize(output.text()).ok() == std::fs::canonicalize(path).ok();
    if !is_toplevel {
      return Err(ReleaseError::Git(GitError::RepoNotFound {
        path: path.to_path_buf(),
      }));
    }

    Ok(repo)
  }

  /// Repository path
  pub fn path(&self) -> &Path {
    &self.repo_path
  }

  /// Directory name, used in log lines
  pub fn name(&self) -> String {
    self
      .repo_path
      .file_name()
      .map(|n| n.to_string_lossy().to_string())
      .unwrap_or_else(|| self.repo_path.display().to_string())
  }

  /// Run git with captured output; a non-zero exit is not an error here
  pub fn run(&self, args: &[&str]) -> ReleaseResult<GitOutput> {
    tracing::debug!(repo = %self.repo_path.display(), "git {}", args.join(" "));

    let output = self
      .git_cmd()
      .args(args)
      .output()
      .with_context(|| format!("Failed to execute git {}", args.first().unwrap_or(&"")))?;

    let result = GitOutput {
      success: output.status.success(),
      code: output.status.code(),
      stdout: String::from_utf8_lossy(&output.stdout).to_string(),
      stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    };

    if !result.success {
      tracing::debug!(code = ?result.code, "git {} failed: {}", args.join(" "), result.combined());
    }

    Ok(result)
  }

  /// Run git and fail with [`GitError::CommandFailed`] on a non-zero exit
  pub fn run_checked(&self, args: &[&str]) -> ReleaseResult<GitOutput> {
    let output = self.run(args)?;
    if !output.success {
      return Err(ReleaseError::Git(GitError::CommandFailed {
        command: format!("git {}", args.join(" ")),
        output: output.combined(),
      }));
    }
    Ok(output)
  }

  /// Run git and return trimmed stdout, failing on a non-zero exit
  pub fn read(&self, args: &[&str]) -> ReleaseResult<String> {
    Ok(self.run_checked(args)?.text().to_string())
  }

  /// Create a git command bound to this repository
  ///
  /// - Sets working directory to repo path
  /// - Forces the C locale so messages can be matched
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.repo_path);
    cmd.env("LC_ALL", "C");
    cmd.env("GIT_TERMINAL_PROMPT", "0");

    cmd.arg("-c").arg("advice.detachedHead=false");
    cmd.arg("-c").arg("core.quotePath=false"); // Don't escape non-ASCII

    cmd
  }
}
