//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A workspace root repository with package repositories under `packages/`
///
/// Every package has its own bare remote (`origin`) outside the workspace.
pub struct TestWorkspace {
  _root: TempDir,
  pub path: PathBuf,
  remotes: PathBuf,
}

impl TestWorkspace {
  /// Create a workspace with the given `(name, version)` packages
  ///
  /// The staging and prod root manifests pin every package to `v<version>`.
  pub fn new(packages: &[(&str, &str)]) -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().join("workspace");
    let remotes = root.path().join("remotes");
    std::fs::create_dir_all(path.join("packages"))?;
    std::fs::create_dir_all(&remotes)?;

    init_repo(&path)?;
    std::fs::write(path.join(".gitignore"), "packages/\nrelease/\n")?;
    std::fs::write(path.join("release-train.toml"), "tag_prefix = \"v\"\n")?;

    for dir in ["staging", "prod"] {
      std::fs::create_dir_all(path.join(dir))?;
      std::fs::write(path.join(dir).join("pyproject.toml"), root_manifest(dir, packages))?;
    }

    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "Initial workspace setup"])?;

    let ws = Self {
      _root: root,
      path,
      remotes,
    };
    for (name, version) in packages {
      ws.add_package(name, version)?;
    }
    Ok(ws)
  }

  /// Create a package repository with one commit pushed to its bare remote
  fn add_package(&self, name: &str, version: &str) -> Result<PathBuf> {
    let remote = self.remote_path(name);
    git(&self.remotes, &["init", "--bare", "--initial-branch=main", &path_str(&remote)])?;

    let pkg = self.package_path(name);
    std::fs::create_dir_all(&pkg)?;
    init_repo(&pkg)?;

    std::fs::write(
      pkg.join("pyproject.toml"),
      format!(
        r#"[project]
name = "{name}"
version = "{version}"  # bumped by release-train
dependencies = []

[tool.uv.sources]
shared = {{ workspace = true }}
"#
      ),
    )?;
    std::fs::write(pkg.join("module.py"), "VALUE = 1\n")?;

    git(&pkg, &["add", "."])?;
    git(&pkg, &["commit", "-m", "Initial commit"])?;
    git(&pkg, &["remote", "add", "origin", &path_str(&remote)])?;
    git(&pkg, &["push", "-u", "origin", "main"])?;
    Ok(pkg)
  }

  pub fn package_path(&self, name: &str) -> PathBuf {
    self.path.join("packages").join(name)
  }

  pub fn remote_path(&self, name: &str) -> PathBuf {
    self.remotes.join(format!("{}.git", name))
  }

  /// Artifact directory of a package
  pub fn changes_dir(&self, name: &str) -> PathBuf {
    self.path.join("release/changes").join(name)
  }

  /// Write a file inside a package without committing
  pub fn write_package_file(&self, name: &str, file: &str, content: &str) -> Result<()> {
    std::fs::write(self.package_path(name).join(file), content)?;
    Ok(())
  }

  /// Write a file inside a package and commit it
  pub fn commit_package_file(&self, name: &str, file: &str, content: &str, message: &str) -> Result<()> {
    let pkg = self.package_path(name);
    std::fs::write(pkg.join(file), content)?;
    git(&pkg, &["add", "."])?;
    git(&pkg, &["commit", "-m", message])?;
    Ok(())
  }

  /// Push a commit to `branch` of a package's remote from a second clone
  pub fn push_from_other_clone(&self, name: &str, branch: &str, file: &str, content: &str, message: &str) -> Result<()> {
    let other = self.remotes.join(format!("{}-other-{}", name, branch));
    git(&self.remotes, &["clone", &path_str(&self.remote_path(name)), &path_str(&other)])?;
    git(&other, &["config", "user.name", "Other User"])?;
    git(&other, &["config", "user.email", "other@example.com"])?;
    git(&other, &["config", "commit.gpgsign", "false"])?;
    git(&other, &["checkout", branch])?;
    std::fs::write(other.join(file), content)?;
    git(&other, &["add", "."])?;
    git(&other, &["commit", "-m", message])?;
    git(&other, &["push", "origin", branch])?;
    Ok(())
  }

  /// Run git in a package and return trimmed stdout
  pub fn package_git(&self, name: &str, args: &[&str]) -> Result<String> {
    let output = git(&self.package_path(name), args)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Run git in the workspace root and return trimmed stdout
  pub fn root_git(&self, args: &[&str]) -> Result<String> {
    let output = git(&self.path, args)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Run git against a package's bare remote and return trimmed stdout
  pub fn remote_git(&self, name: &str, args: &[&str]) -> Result<String> {
    let mut full = vec!["--git-dir".to_string(), path_str(&self.remote_path(name))];
    full.extend(args.iter().map(|a| a.to_string()));
    let full: Vec<&str> = full.iter().map(String::as_str).collect();
    let output = git(&self.remotes, &full)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Read a file relative to the workspace root
  pub fn read_file(&self, path: &str) -> Result<String> {
    std::fs::read_to_string(self.path.join(path)).with_context(|| format!("Failed to read {}", path))
  }

  /// Write a file relative to the workspace root
  pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
    let full = self.path.join(path);
    if let Some(parent) = full.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(full, content)?;
    Ok(())
  }

  pub fn file_exists(&self, path: &str) -> bool {
    self.path.join(path).exists()
  }

  /// Run a command that must succeed, returning stdout
  pub fn run(&self, args: &[&str]) -> Result<String> {
    let output = run_release_train(&self.path, args)?;
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
  }

  /// Run a command with `--json` and parse the summary
  pub fn run_json(&self, args: &[&str]) -> Result<serde_json::Value> {
    let mut full = vec!["--json"];
    full.extend_from_slice(args);
    let stdout = self.run(&full)?;
    serde_json::from_str(&stdout).with_context(|| format!("stdout is not JSON:\n{}", stdout))
  }
}

/// Outcome string of a package in a JSON summary
pub fn outcome_of<'a>(summary: &'a serde_json::Value, package: &str) -> Option<&'a str> {
  summary["packages"]
    .as_array()?
    .iter()
    .find(|row| row["package"] == package)?["outcome"]
    .as_str()
}

fn root_manifest(kind: &str, packages: &[(&str, &str)]) -> String {
  let mut content = format!(
    r#"[project]
name = "app-{kind}"
version = "0.1.0"
dependencies = []

[tool.uv.sources]
# pinned package releases
"#
  );
  for (name, version) in packages {
    content.push_str(&format!(
      "{name} = {{ git = \"https://example.com/{name}.git\", tag = \"v{version}\" }}\n"
    ));
  }
  content
}

fn init_repo(path: &Path) -> Result<()> {
  git(path, &["init", "--initial-branch=main"])?;
  git(path, &["config", "user.name", "Test User"])?;
  git(path, &["config", "user.email", "test@example.com"])?;
  git(path, &["config", "commit.gpgsign", "false"])?;
  git(path, &["config", "tag.gpgsign", "false"])?;
  Ok(())
}

fn path_str(path: &Path) -> String {
  path.to_string_lossy().to_string()
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run the release-train binary, returning its output whatever the exit status
pub fn run_release_train_raw(cwd: &Path, args: &[&str]) -> Result<Output> {
  Command::new(env!("CARGO_BIN_EXE_release-train"))
    .current_dir(cwd)
    .args(args)
    .env_remove("RUST_LOG")
    .output()
    .context("Failed to run release-train")
}

/// Run the release-train binary; a non-zero exit is an error
pub fn run_release_train(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_release_train_raw(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "release-train command failed: release-train {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}
