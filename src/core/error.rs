//! Error types for release-train with contextual messages and exit codes
//!
//! Errors are split into categories so a stage can tell a run-wide
//! configuration problem (abort before touching any repository) from a
//! per-package failure (log, record in the summary, continue).

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for release-train
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// Configuration error (missing packages dir, bad config or tags-file)
  User = 1,
  /// System error (git, I/O outside a package boundary)
  System = 2,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for release-train
#[derive(Debug)]
pub enum ReleaseError {
  /// Configuration errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// Unparseable or malformed version strings
  Version(VersionError),

  /// Required manifest field or file missing
  Manifest(ManifestError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl ReleaseError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    ReleaseError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      ReleaseError::Message { message, context, help } => ReleaseError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      ReleaseError::Io(err) => ReleaseError::Message {
        message: format!("{}: {}", ctx_str, err),
        context: None,
        help: None,
      },
      _ => self,
    }
  }

  /// Whether this error must abort the whole invocation
  pub fn is_fatal(&self) -> bool {
    matches!(self, ReleaseError::Config(_))
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    if self.is_fatal() {
      return ExitCode::User;
    }
    match self {
      ReleaseError::Version(_) | ReleaseError::Manifest(_) => ExitCode::User,
      _ => ExitCode::System,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      ReleaseError::Config(e) => e.help_message(),
      ReleaseError::Git(e) => e.help_message(),
      ReleaseError::Version(e) => e.help_message(),
      ReleaseError::Manifest(e) => e.help_message(),
      ReleaseError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for ReleaseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReleaseError::Config(e) => write!(f, "{}", e),
      ReleaseError::Git(e) => write!(f, "{}", e),
      ReleaseError::Version(e) => write!(f, "{}", e),
      ReleaseError::Manifest(e) => write!(f, "{}", e),
      ReleaseError::Io(e) => write!(f, "I/O error: {}", e),
      ReleaseError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for ReleaseError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ReleaseError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for ReleaseError {
  fn from(err: io::Error) -> Self {
    ReleaseError::Io(err)
  }
}

impl From<ConfigError> for ReleaseError {
  fn from(err: ConfigError) -> Self {
    ReleaseError::Config(err)
  }
}

impl From<GitError> for ReleaseError {
  fn from(err: GitError) -> Self {
    ReleaseError::Git(err)
  }
}

impl From<VersionError> for ReleaseError {
  fn from(err: VersionError) -> Self {
    ReleaseError::Version(err)
  }
}

impl From<ManifestError> for ReleaseError {
  fn from(err: ManifestError) -> Self {
    ReleaseError::Manifest(err)
  }
}

impl From<serde_json::Error> for ReleaseError {
  fn from(err: serde_json::Error) -> Self {
    ReleaseError::message(format!("JSON error: {}", err))
  }
}

/// Configuration-related errors (always fatal for the invocation)
#[derive(Debug)]
pub enum ConfigError {
  /// Explicit --config file does not exist
  NotFound { path: PathBuf },

  /// Config file exists but cannot be parsed
  Invalid { path: PathBuf, reason: String },

  /// Packages root directory does not exist
  PackagesDirMissing { path: PathBuf },

  /// --tags-file missing or malformed
  InvalidTagsFile { path: PathBuf, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => {
        Some("Create release-train.toml in the workspace root or drop --config to use defaults.".to_string())
      }
      ConfigError::PackagesDirMissing { .. } => Some(
        "Run from the workspace root or set `packages_dir` in release-train.toml.".to_string(),
      ),
      ConfigError::InvalidTagsFile { .. } => {
        Some("The tags file must be a JSON object mapping package name to tag, e.g. {\"pkg-a\": \"v1.2.0\"}.".to_string())
      }
      ConfigError::Invalid { .. } => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { path } => write!(f, "Configuration file not found: {}", path.display()),
      ConfigError::Invalid { path, reason } => {
        write!(f, "Invalid configuration in {}: {}", path.display(), reason)
      }
      ConfigError::PackagesDirMissing { path } => {
        write!(f, "Packages directory not found: {}", path.display())
      }
      ConfigError::InvalidTagsFile { path, reason } => {
        write!(f, "Failed to load tags file {}: {}", path.display(), reason)
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command that was expected to succeed failed
  CommandFailed { command: String, output: String },

  /// Path is not inside a git work tree
  RepoNotFound { path: PathBuf },

  /// Local branch has diverged from its remote counterpart
  FastForwardRejected { target: String, output: String },

  /// Working tree is dirty and stashing was not allowed
  DirtyWorkingTree { path: PathBuf },

  /// No usable start point for a new branch
  NoStartPoint { branch: String, base: String },

  /// Push failed
  PushFailed { remote: String, refspec: String, reason: String },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::PushFailed { reason, .. } => {
        if reason.contains("non-fast-forward") || reason.contains("rejected") {
          Some("The remote has commits you don't have. Pull or rebase, then re-run the stage.".to_string())
        } else if reason.contains("Permission denied") || reason.contains("403") {
          Some("Check your SSH key or token permissions for this remote.".to_string())
        } else {
          None
        }
      }
      GitError::FastForwardRejected { .. } => {
        Some("Rebase or merge manually, push, then re-run the stage.".to_string())
      }
      GitError::DirtyWorkingTree { .. } => {
        Some("Commit or stash the changes, or re-run without --no-stash.".to_string())
      }
      GitError::NoStartPoint { base, .. } => Some(format!(
        "Fetch the remote or create a local '{}' branch first.",
        base
      )),
      GitError::RepoNotFound { path } => Some(format!(
        "Initialize the repository first or check the path: {}",
        path.display()
      )),
      GitError::CommandFailed { .. } => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, output } => {
        write!(f, "Git command failed: {}\n{}", command, output.trim_end())
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      GitError::FastForwardRejected { target, output } => {
        write!(f, "Cannot fast-forward to {}: {}", target, output.trim_end())
      }
      GitError::DirtyWorkingTree { path } => {
        write!(f, "Uncommitted changes in {} and stashing is disabled", path.display())
      }
      GitError::NoStartPoint { branch, base } => {
        write!(f, "No start point found for branch '{}' (base '{}' is missing)", branch, base)
      }
      GitError::PushFailed { remote, refspec, reason } => {
        write!(f, "Push of {} to {} failed: {}", refspec, remote, reason.trim_end())
      }
    }
  }
}

/// Version parsing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
  /// Not `major.minor.patch[.devN]`
  Unparseable { version: String },

  /// A dev bump was requested for a version without `.devN`
  NoDevSuffix { version: String },

  /// Bumping would overflow a numeric component
  Overflow { version: String },
}

impl VersionError {
  fn help_message(&self) -> Option<String> {
    match self {
      VersionError::Unparseable { .. } => {
        Some("Versions must look like 1.2.3 or 1.2.3.dev0.".to_string())
      }
      VersionError::NoDevSuffix { .. } => {
        Some("Use --bump patch/minor/major for release versions; run stage6 to start a dev cycle.".to_string())
      }
      VersionError::Overflow { .. } => None,
    }
  }
}

impl fmt::Display for VersionError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      VersionError::Unparseable { version } => write!(f, "Invalid version: '{}'", version),
      VersionError::NoDevSuffix { version } => {
        write!(f, "Version '{}' has no .devN suffix to bump", version)
      }
      VersionError::Overflow { version } => write!(f, "Version '{}' cannot be bumped further", version),
    }
  }
}

/// Manifest errors
#[derive(Debug)]
pub enum ManifestError {
  /// Manifest file does not exist
  NotFound { path: PathBuf },

  /// Required field absent (e.g. `project.version`)
  MissingField { path: PathBuf, field: String },

  /// Manifest is not valid TOML
  Parse { path: PathBuf, reason: String },
}

impl ManifestError {
  fn help_message(&self) -> Option<String> {
    match self {
      ManifestError::MissingField { field, .. } => Some(format!(
        "Add `{}` to the manifest or adjust the manifest key settings in release-train.toml.",
        field
      )),
      _ => None,
    }
  }
}

impl fmt::Display for ManifestError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ManifestError::NotFound { path } => write!(f, "Manifest not found: {}", path.display()),
      ManifestError::MissingField { path, field } => {
        write!(f, "Missing required field '{}' in {}", field, path.display())
      }
      ManifestError::Parse { path, reason } => {
        write!(f, "Failed to parse {}: {}", path.display(), reason)
      }
    }
  }
}

/// Result type alias for release-train
pub type ReleaseResult<T> = Result<T, ReleaseError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> ReleaseResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<ReleaseError>,
{
  fn with_context<F>(self, f: F) -> ReleaseResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &ReleaseError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
