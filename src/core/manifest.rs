//! Format-preserving manifest editing
//!
//! Package manifests and the staging/prod root manifests are hand-edited
//! between runs, so every change goes through `toml_edit::DocumentMut`:
//! only the touched values change, comments and layout survive.
//!
//! Keys are addressed with dotted paths (`project.version`,
//! `tool.uv.sources`) taken from the configuration.

use crate::core::error::{ManifestError, ReleaseResult, ResultExt};
use std::fs;
use std::path::{Path, PathBuf};
use toml_edit::{DocumentMut, Item};

/// A parsed manifest bound to its file
#[derive(Debug, Clone)]
pub struct Manifest {
  path: PathBuf,
  doc: DocumentMut,
}

impl Manifest {
  /// Read and parse a manifest
  pub fn load(path: &Path) -> ReleaseResult<Self> {
    if !path.exists() {
      return Err(ManifestError::NotFound {
        path: path.to_path_buf(),
      }
      .into());
    }
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Self::parse(path, &content)
  }

  pub fn parse(path: &Path, content: &str) -> ReleaseResult<Self> {
    let doc = content.parse::<DocumentMut>().map_err(|e| ManifestError::Parse {
      path: path.to_path_buf(),
      reason: e.to_string(),
    })?;
    Ok(Self {
      path: path.to_path_buf(),
      doc,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// String value at a dotted key
  pub fn get_str(&self, key: &str) -> Option<&str> {
    let mut item = self.doc.as_item();
    for segment in key.split('.') {
      item = item.get(segment)?;
    }
    item.as_str()
  }

  /// String value at a dotted key, or [`ManifestError::MissingField`]
  pub fn require_str(&self, key: &str) -> ReleaseResult<String> {
    self.get_str(key).map(str::to_string).ok_or_else(|| {
      ManifestError::MissingField {
        path: self.path.clone(),
        field: key.to_string(),
      }
      .into()
    })
  }

  /// Replace an existing string value; returns whether it changed
  pub fn set_str(&mut self, key: &str, value: &str) -> ReleaseResult<bool> {
    let segments: Vec<&str> = key.split('.').collect();
    let path = self.path.clone();
    let item = self
      .item_mut(&segments)
      .filter(|item| item.is_str())
      .ok_or_else(|| ManifestError::MissingField {
        path,
        field: key.to_string(),
      })?;

    if item.as_str() == Some(value) {
      return Ok(false);
    }
    replace_str(item, value);
    Ok(true)
  }

  /// Remove `workspace = true` from every entry of the sources table
  ///
  /// Entries left empty are removed, then the table itself and any parent
  /// tables that became empty. Returns whether anything changed.
  pub fn strip_workspace_sources(&mut self, sources_key: &str) -> bool {
    let segments: Vec<&str> = sources_key.split('.').collect();
    let Some(sources) = self.item_mut(&segments).and_then(Item::as_table_like_mut) else {
      return false;
    };

    let names: Vec<String> = sources.iter().map(|(name, _)| name.to_string()).collect();
    let mut changed = false;

    for name in names {
      let emptied = match sources.get_mut(&name).and_then(Item::as_table_like_mut) {
        Some(entry) if entry.get("workspace").and_then(Item::as_bool) == Some(true) => {
          entry.remove("workspace");
          changed = true;
          entry.is_empty()
        }
        _ => false,
      };
      if emptied {
        sources.remove(&name);
      }
    }

    if changed {
      self.prune_empty_tables(&segments);
    }
    changed
  }

  /// Set `<sources_key>.<dependency>.<field> = value` on an existing entry
  ///
  /// Manifests that do not list the dependency are left alone. Returns
  /// whether the value changed.
  pub fn set_dependency_ref(&mut self, sources_key: &str, dependency: &str, field: &str, value: &str) -> bool {
    let segments: Vec<&str> = sources_key.split('.').collect();
    let Some(entry) = self
      .item_mut(&segments)
      .and_then(|sources| sources.get_mut(dependency))
      .and_then(Item::as_table_like_mut)
    else {
      return false;
    };

    if entry.get(field).and_then(Item::as_str) == Some(value) {
      return false;
    }

    match entry.get_mut(field) {
      Some(item) => replace_str(item, value),
      None => {
        entry.insert(field, toml_edit::value(value));
      }
    }
    true
  }

  /// Write the document back to its file
  pub fn save(&self) -> ReleaseResult<()> {
    fs::write(&self.path, self.doc.to_string()).with_context(|| format!("Failed to write {}", self.path.display()))?;
    tracing::debug!(path = %self.path.display(), "saved manifest");
    Ok(())
  }

  fn item_mut(&mut self, segments: &[&str]) -> Option<&mut Item> {
    let mut item = self.doc.as_item_mut();
    for segment in segments {
      item = item.get_mut(*segment)?;
    }
    Some(item)
  }

  /// Remove the table at `segments` and its ancestors while they are empty
  fn prune_empty_tables(&mut self, segments: &[&str]) {
    for depth in (1..=segments.len()).rev() {
      let (parent_path, key) = (&segments[..depth - 1], segments[depth - 1]);
      let Some(parent) = self.item_mut(parent_path).and_then(Item::as_table_like_mut) else {
        return;
      };
      let empty = parent
        .get(key)
        .and_then(Item::as_table_like)
        .is_some_and(|table| table.is_empty());
      if !empty {
        return;
      }
      parent.remove(key);
    }
  }
}

/// Replace a string value, keeping its surrounding whitespace and comment
fn replace_str(item: &mut Item, value: &str) {
  let decor = item.as_value().map(|v| v.decor().clone());
  *item = toml_edit::value(value);
  if let (Some(decor), Some(new_value)) = (decor, item.as_value_mut()) {
    *new_value.decor_mut() = decor;
  }
}

impl std::fmt::Display for Manifest {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.doc)
  }
}
