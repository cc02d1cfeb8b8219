//! Per-package artifact files under `<changes_output_dir>/<package>/`
//!
//! Generated files (`changes_uncommitted`, `changes_since_tag`,
//! `release_version`) are overwritten on every run. Human-authored files
//! (`commit_message`, `tag_message`) are only created when absent and never
//! overwritten afterwards.

use crate::core::config::ReleaseConfig;
use crate::core::error::{ReleaseResult, ResultExt};
use crate::core::packages::Package;
use crate::core::vcs::GitRepo;
use crate::ui::say;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Seed content of `tag_message`; a message still equal to this is unreviewed
pub const TAG_MESSAGE_TEMPLATE: &str = "## Release {VERSION}

_Changes since {PREV_VERSION}_

<!-- Describe the main changes here -->
";

/// Whether a tag message is still the unedited template
pub fn is_placeholder(text: &str) -> bool {
  text.trim() == TAG_MESSAGE_TEMPLATE.trim()
}

/// Substitute `{VERSION}` and `{PREV_VERSION}`
pub fn substitute_placeholders(text: &str, version: &str, prev_version: &str) -> String {
  text.replace("{PREV_VERSION}", prev_version).replace("{VERSION}", version)
}

/// Snapshot of a working tree's uncommitted changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UncommittedSnapshot {
  pub status: String,
  pub diff_stat: String,
  pub full_diff: Option<String>,
}

impl UncommittedSnapshot {
  /// Capture status, diff stat and (optionally) the full diff
  pub fn capture(git: &GitRepo, full_diff: bool) -> ReleaseResult<Self> {
    Ok(Self {
      status: git.status_porcelain()?,
      diff_stat: git.diff_stat()?,
      full_diff: if full_diff { Some(git.diff()?).filter(|d| !d.is_empty()) } else { None },
    })
  }

  pub fn is_empty(&self) -> bool {
    self.status.trim().is_empty()
  }

  /// Render the artifact text; identical snapshots render identical bytes
  pub fn render(&self) -> String {
    let mut sections = vec![
      format!("# Uncommitted changes (git status --porcelain)\n{}", self.status),
      format!("# Diff stat (git diff --stat)\n{}", self.diff_stat),
    ];
    if let Some(diff) = &self.full_diff {
      sections.push(format!("# Full diff (git diff)\n{}", diff));
    }
    let mut text = sections.join("\n\n");
    text.push('\n');
    text
  }
}

/// Reads and writes artifact files, honoring dry-run
#[derive(Debug, Clone)]
pub struct ArtifactStore {
  config: Arc<ReleaseConfig>,
  dry_run: bool,
}

impl ArtifactStore {
  pub fn new(config: Arc<ReleaseConfig>, dry_run: bool) -> Self {
    Self { config, dry_run }
  }

  pub fn uncommitted_path(&self, pkg: &Package) -> PathBuf {
    pkg.changes_dir.join(&self.config.changes_uncommitted_filename)
  }

  pub fn commit_message_path(&self, pkg: &Package) -> PathBuf {
    pkg.changes_dir.join(&self.config.commit_message_filename)
  }

  pub fn since_tag_path(&self, pkg: &Package) -> PathBuf {
    pkg.changes_dir.join(&self.config.changes_since_tag_filename)
  }

  pub fn tag_message_path(&self, pkg: &Package) -> PathBuf {
    pkg.changes_dir.join(&self.config.tag_message_filename)
  }

  pub fn release_version_path(&self, pkg: &Package) -> PathBuf {
    pkg.changes_dir.join(&self.config.release_version_filename)
  }

  /// Write `changes_uncommitted` and seed an empty `commit_message`
  pub fn write_uncommitted(&self, pkg: &Package, snapshot: &UncommittedSnapshot) -> ReleaseResult<()> {
    self.write(&self.uncommitted_path(pkg), &snapshot.render())?;
    self.write_if_absent(&self.commit_message_path(pkg), "")?;
    Ok(())
  }

  /// Write `changes_since_tag` and seed `tag_message` with the template
  pub fn write_since_tag(&self, pkg: &Package, diff: &str) -> ReleaseResult<()> {
    let mut content = diff.to_string();
    if !content.ends_with('\n') {
      content.push('\n');
    }
    self.write(&self.since_tag_path(pkg), &content)?;
    self.write_if_absent(&self.tag_message_path(pkg), TAG_MESSAGE_TEMPLATE)?;
    Ok(())
  }

  /// Record the version stage 4 bumped the package to
  pub fn write_release_version(&self, pkg: &Package, version: &str) -> ReleaseResult<()> {
    self.write(&self.release_version_path(pkg), &format!("{}\n", version))
  }

  /// Trimmed commit message (None = absent or empty)
  pub fn commit_message(&self, pkg: &Package) -> ReleaseResult<Option<String>> {
    read_non_empty(&self.commit_message_path(pkg))
  }

  /// Raw tag message (None = absent or empty)
  pub fn tag_message(&self, pkg: &Package) -> ReleaseResult<Option<String>> {
    read_non_empty(&self.tag_message_path(pkg))
  }

  /// Version recorded by stage 4 in this cycle
  pub fn release_version(&self, pkg: &Package) -> ReleaseResult<Option<String>> {
    read_non_empty(&self.release_version_path(pkg))
  }

  fn write(&self, path: &Path, content: &str) -> ReleaseResult<()> {
    if self.dry_run {
      say!("     [dry-run] write {} ({} bytes)", path.display(), content.len());
      return Ok(());
    }
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "wrote artifact");
    Ok(())
  }

  /// Returns whether the file was (or would be) created
  fn write_if_absent(&self, path: &Path, content: &str) -> ReleaseResult<bool> {
    if path.exists() {
      return Ok(false);
    }
    self.write(path, content)?;
    Ok(true)
  }
}

fn read_non_empty(path: &Path) -> ReleaseResult<Option<String>> {
  if !path.exists() {
    return Ok(None);
  }
  let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
  Ok(if text.trim().is_empty() { None } else { Some(text.trim().to_string()) })
}

/// Every file below `root`, sorted (used by `clear --dry-run`)
pub fn list_files(root: &Path) -> ReleaseResult<Vec<PathBuf>> {
  let mut files = Vec::new();
  let mut pending = vec![root.to_path_buf()];

  while let Some(dir) = pending.pop() {
    for entry in fs::read_dir(&dir).with_context(|| format!("Failed to read {}", dir.display()))? {
      let path = entry?.path();
      if path.is_dir() {
        pending.push(path);
      } else {
        files.push(path);
      }
    }
  }

  files.sort();
  Ok(files)
}
