//! Stage context: build once in main.rs, pass to every stage
//!
//! Holds everything that is workspace-wide and immutable for one invocation:
//! the workspace root, the loaded configuration and the effective dry-run
//! flag. Per-package state is never stored here.

use crate::core::artifacts::ArtifactStore;
use crate::core::config::ReleaseConfig;
use crate::core::error::ReleaseResult;
use crate::core::packages::PackageRegistry;
use crate::core::vcs::GitRepo;
use crate::ui::say;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shared state for one stage invocation
#[derive(Debug, Clone)]
pub struct StageContext {
  /// Workspace root directory (where packages_dir and the root manifests live)
  pub root: PathBuf,

  /// Loaded configuration
  pub config: Arc<ReleaseConfig>,

  /// `--dry-run` or `dry_run = true` in the configuration
  pub dry_run: bool,
}

impl StageContext {
  /// Build the context for a workspace root
  pub fn build(workspace_root: &Path, config_path: Option<&Path>) -> ReleaseResult<Self> {
    let config = ReleaseConfig::load(workspace_root, config_path)?;
    Ok(Self::from_config(workspace_root, config))
  }

  pub fn from_config(workspace_root: &Path, config: ReleaseConfig) -> Self {
    let dry_run = config.dry_run;
    Self {
      root: workspace_root.to_path_buf(),
      config: Arc::new(config),
      dry_run,
    }
  }

  /// Apply a stage's `--dry-run` flag (config `dry_run = true` cannot be overridden)
  pub fn with_dry_run(mut self, flag: bool) -> Self {
    self.dry_run = self.config.dry_run || flag;
    self
  }

  /// Discover packages; a missing packages root is a configuration error
  pub fn packages(&self) -> ReleaseResult<PackageRegistry> {
    let registry = PackageRegistry::discover(&self.root, &self.config)?;
    if registry.is_empty() {
      tracing::warn!(root = %registry.root.display(), "no packages found");
      say!("⚠️  no package directories under {}", registry.root.display());
    }
    Ok(registry)
  }

  /// Artifact store bound to this context's dry-run mode
  pub fn artifacts(&self) -> ArtifactStore {
    ArtifactStore::new(self.config.clone(), self.dry_run)
  }

  /// Workspace root repository, if the root is itself a git checkout
  pub fn root_repo(&self) -> Option<GitRepo> {
    GitRepo::open(&self.root).ok()
  }

  /// Absolute path of the staging root manifest
  pub fn staging_manifest(&self) -> PathBuf {
    self.root.join(&self.config.staging_manifest_path)
  }

  /// Absolute path of the prod root manifest
  pub fn prod_manifest(&self) -> PathBuf {
    self.root.join(&self.config.prod_manifest_path)
  }

  /// Remote name from configuration
  pub fn remote(&self) -> &str {
    &self.config.git_remote
  }
}
