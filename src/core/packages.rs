//! Package discovery under the packages root
//!
//! Every directory directly under `packages_dir` is a package. Its name is the
//! directory name; that name also keys its artifact directory and its entry in
//! a tags file.

use crate::core::config::ReleaseConfig;
use crate::core::error::{ConfigError, ReleaseResult, ResultExt};
use crate::core::vcs::GitRepo;
use std::fs;
use std::path::{Path, PathBuf};

/// One independently versioned package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
  pub name: String,
  /// Package repository directory
  pub path: PathBuf,
  /// `<changes_output_dir>/<name>`
  pub changes_dir: PathBuf,
  /// `<path>/<manifest_filename>`
  pub manifest_path: PathBuf,
}

impl Package {
  /// Whether the package takes part in the current release cycle
  pub fn in_current_cycle(&self) -> bool {
    self.changes_dir.is_dir()
  }

  /// Open the package's git repository
  pub fn repo(&self) -> ReleaseResult<GitRepo> {
    GitRepo::open(&self.path)
  }
}

/// Sorted set of packages for one invocation
#[derive(Debug, Clone)]
pub struct PackageRegistry {
  pub root: PathBuf,
  packages: Vec<Package>,
}

impl PackageRegistry {
  /// Enumerate packages, sorted by name
  pub fn discover(workspace_root: &Path, config: &ReleaseConfig) -> ReleaseResult<Self> {
    let root = config.packages_root(workspace_root);
    if !root.is_dir() {
      return Err(ConfigError::PackagesDirMissing { path: root }.into());
    }

    let changes_root = config.changes_root(workspace_root);
    let mut packages = Vec::new();

    for entry in fs::read_dir(&root).with_context(|| format!("Failed to read {}", root.display()))? {
      let entry = entry?;
      let path = entry.path();
      if !path.is_dir() {
        continue;
      }

      let name = entry.file_name().to_string_lossy().to_string();
      packages.push(Package {
        changes_dir: changes_root.join(&name),
        manifest_path: path.join(&config.manifest_filename),
        name,
        path,
      });
    }

    packages.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::debug!(count = packages.len(), root = %root.display(), "discovered packages");

    Ok(Self { root, packages })
  }

  /// All packages, sorted by name
  pub fn all(&self) -> &[Package] {
    &self.packages
  }

  /// Packages whose artifact directory exists
  pub fn current_cycle(&self) -> Vec<&Package> {
    self.packages.iter().filter(|p| p.in_current_cycle()).collect()
  }

  pub fn is_empty(&self) -> bool {
    self.packages.is_empty()
  }
}
