use crate::core::error::{ConfigError, ReleaseResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Table name used when the settings live inside a larger TOML file
const NESTED_TABLE: [&str; 2] = ["tool", "release-train"];

/// Configuration for release-train
/// Searched in order: release-train.toml, .release-train.toml, .config/release-train.toml
///
/// Every key is optional; missing keys fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
  /// Directory holding one git repository per package
  pub packages_dir: PathBuf,

  /// Root of the per-cycle artifact tree
  pub changes_output_dir: PathBuf,

  pub changes_uncommitted_filename: String,
  pub commit_message_filename: String,
  pub changes_since_tag_filename: String,
  pub tag_message_filename: String,

  /// Records the version a package was bumped to during stage 4
  pub release_version_filename: String,

  /// Root manifest pinning release candidates
  pub staging_manifest_path: PathBuf,

  /// Root manifest pinning released tags
  pub prod_manifest_path: PathBuf,

  /// Manifest file inside each package
  pub manifest_filename: String,

  /// Dotted key of the package name in its manifest
  pub manifest_name_key: String,

  /// Dotted key of the package version in its manifest
  pub manifest_version_key: String,

  /// Dotted key of the dependency source table (`<key>.<package>.<ref field>`)
  pub dependency_sources_key: String,

  /// Field inside a dependency source entry that pins the reference
  pub dependency_ref_field: String,

  pub git_remote: String,
  pub tag_prefix: String,
  pub dry_run: bool,

  /// File the configuration was loaded from (None = defaults)
  #[serde(skip)]
  pub source: Option<PathBuf>,
}

impl Default for ReleaseConfig {
  fn default() -> Self {
    Self {
      packages_dir: PathBuf::from("packages"),
      changes_output_dir: PathBuf::from("release/changes"),
      changes_uncommitted_filename: "changes_uncommitted.txt".to_string(),
      commit_message_filename: "commit_message.txt".to_string(),
      changes_since_tag_filename: "changes_since_tag.txt".to_string(),
      tag_message_filename: "tag_message.md".to_string(),
      release_version_filename: "release_version.txt".to_string(),
      staging_manifest_path: PathBuf::from("staging/pyproject.toml"),
      prod_manifest_path: PathBuf::from("prod/pyproject.toml"),
      manifest_filename: "pyproject.toml".to_string(),
      manifest_name_key: "project.name".to_string(),
      manifest_version_key: "project.version".to_string(),
      dependency_sources_key: "tool.uv.sources".to_string(),
      dependency_ref_field: "tag".to_string(),
      git_remote: "origin".to_string(),
      tag_prefix: String::new(),
      dry_run: false,
      source: None,
    }
  }
}

impl ReleaseConfig {
  /// Find config file in search order: release-train.toml, .release-train.toml, .config/release-train.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("release-train.toml"),
      path.join(".release-train.toml"),
      path.join(".config").join("release-train.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load configuration
  ///
  /// An explicit path must exist. Without one, the search order above is used
  /// and a missing file means "all defaults".
  pub fn load(root: &Path, explicit: Option<&Path>) -> ReleaseResult<Self> {
    let config_path = match explicit {
      Some(path) => {
        let path = if path.is_absolute() { path.to_path_buf() } else { root.join(path) };
        if !path.exists() {
          return Err(ConfigError::NotFound { path }.into());
        }
        path
      }
      None => match Self::find_config_path(root) {
        Some(path) => path,
        None => {
          tracing::debug!("no configuration file found, using defaults");
          return Ok(Self::default());
        }
      },
    };

    let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Invalid {
      path: config_path.clone(),
      reason: e.to_string(),
    })?;

    let mut config = Self::parse(&content).map_err(|reason| ConfigError::Invalid {
      path: config_path.clone(),
      reason,
    })?;
    tracing::debug!(path = %config_path.display(), "loaded configuration");
    config.source = Some(config_path);
    Ok(config)
  }

  /// Parse configuration text, accepting top-level keys or a `[tool.release-train]` table
  pub fn parse(content: &str) -> Result<Self, String> {
    let doc: toml_edit::DocumentMut = content.parse().map_err(|e: toml_edit::TomlError| e.to_string())?;

    let nested = doc
      .get(NESTED_TABLE[0])
      .and_then(|tool| tool.get(NESTED_TABLE[1]))
      .and_then(|item| item.as_table_like());

    match nested {
      Some(table) => {
        let mut inner = toml_edit::DocumentMut::new();
        for (key, item) in table.iter() {
          inner.insert(key, item.clone());
        }
        toml_edit::de::from_str(&inner.to_string()).map_err(|e| e.to_string())
      }
      None => toml_edit::de::from_str(content).map_err(|e| e.to_string()),
    }
  }

  /// Absolute artifact root for a workspace
  pub fn changes_root(&self, root: &Path) -> PathBuf {
    root.join(&self.changes_output_dir)
  }

  /// Absolute packages root for a workspace
  pub fn packages_root(&self, root: &Path) -> PathBuf {
    root.join(&self.packages_dir)
  }

  /// Tag name for a version (`tag_prefix` + version)
  pub fn tag_name(&self, version: &str) -> String {
    format!("{}{}", self.tag_prefix, version)
  }

  /// Human-readable origin of the configuration
  pub fn source_display(&self) -> String {
    self
      .source
      .as_ref()
      .map(|p| p.display().to_string())
      .unwrap_or_else(|| "<defaults>".to_string())
  }
}
