//! Tag resolution for "changes since the last release"
//!
//! The starting point for a package is chosen in this order:
//! 1. an explicit tag from `--tags-file` (always wins, even if older tags exist)
//! 2. the most recent tag reachable from HEAD
//! 3. the start of the repository
//!
//! An explicit tag that does not resolve is never silently replaced by the
//! fallback; the package is skipped instead.

use crate::core::error::{ConfigError, ReleaseResult};
use crate::core::vcs::GitRepo;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Where a since-tag diff starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagBase {
  /// Tag given for this package in the tags file
  Explicit(String),
  /// Most recent reachable tag
  LastTag(String),
  /// No tag at all: everything since the first commit
  RepositoryStart,
}

impl TagBase {
  /// Revision to diff against (None = empty tree)
  pub fn as_rev(&self) -> Option<&str> {
    match self {
      TagBase::Explicit(tag) | TagBase::LastTag(tag) => Some(tag),
      TagBase::RepositoryStart => None,
    }
  }

  pub fn describe(&self) -> String {
    match self {
      TagBase::Explicit(tag) => format!("{} (from tags file)", tag),
      TagBase::LastTag(tag) => tag.clone(),
      TagBase::RepositoryStart => "repository start".to_string(),
    }
  }
}

/// Pick the base given what exists
///
/// Returns `None` when an explicit tag was requested but does not exist.
pub fn choose_base(explicit: Option<&str>, explicit_exists: bool, last_tag: Option<String>) -> Option<TagBase> {
  match explicit {
    Some(tag) if explicit_exists => Some(TagBase::Explicit(tag.to_string())),
    Some(_) => None,
    None => Some(last_tag.map(TagBase::LastTag).unwrap_or(TagBase::RepositoryStart)),
  }
}

/// Resolve the base for one repository
pub fn resolve_base(git: &GitRepo, explicit: Option<&str>) -> ReleaseResult<Option<TagBase>> {
  match explicit {
    Some(tag) => {
      let exists = git.resolves_to_commit(tag)?;
      Ok(choose_base(Some(tag), exists, None))
    }
    None => Ok(choose_base(None, false, git.last_tag()?)),
  }
}

/// Load a `{package: tag}` JSON map
///
/// Non-string values are stringified. Anything other than a JSON object is
/// a configuration error.
pub fn load_tags_file(path: &Path) -> ReleaseResult<BTreeMap<String, String>> {
  let invalid = |reason: String| ConfigError::InvalidTagsFile {
    path: path.to_path_buf(),
    reason,
  };

  let content = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
  let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?;

  let object = value
    .as_object()
    .ok_or_else(|| invalid("expected a JSON object {package: tag}".to_string()))?;

  Ok(
    object
      .iter()
      .map(|(name, tag)| {
        let tag = match tag {
          serde_json::Value::String(s) => s.clone(),
          other => other.to_string(),
        };
        (name.clone(), tag)
      })
      .collect(),
  )
}

/// Version encoded in a tag (`tag_prefix` stripped)
pub fn version_from_tag<'a>(tag: &'a str, prefix: &str) -> &'a str {
  tag.strip_prefix(prefix).unwrap_or(tag)
}
