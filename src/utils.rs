//! Utility functions for remote URLs and paths

use std::path::Path;

/// Check if a remote URL is a local filesystem path
///
/// Returns true for:
/// - Absolute paths on Unix: /path/to/repo
/// - Absolute paths on Windows: C:\path\to\repo or C:/path/to/repo
/// - Relative paths: ./path or ../path
/// - `file://` URLs
///
/// Returns false for:
/// - SSH URLs: git@github.com:user/repo.git
/// - HTTPS URLs: <https://github.com/user/repo.git>
pub fn is_local_path(path: &str) -> bool {
  if path.starts_with("./") || path.starts_with("../") || path.starts_with("file://") {
    return true;
  }

  // Windows drive letter (C:\ or C:/), checked before the URL rules since it contains ':'
  let bytes = path.as_bytes();
  if bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && (bytes[2] == b'\\' || bytes[2] == b'/') {
    return true;
  }

  if path.starts_with('/') && !path.contains("://") && !path.contains('@') {
    return true;
  }

  if path.contains("://") || path.contains('@') {
    return false;
  }

  Path::new(path).is_absolute()
}

/// Browser URL of a hosted repository, derived from its git remote URL
///
/// `git@host:org/repo.git` and `https://host/org/repo.git` both become
/// `https://host/org/repo`. Local paths and unknown schemes yield `None`.
pub fn remote_web_url(remote_url: &str) -> Option<String> {
  let url = remote_url.trim();
  if url.is_empty() || is_local_path(url) {
    return None;
  }

  let web = if let Some(rest) = url.strip_prefix("ssh://") {
    // ssh://git@host[:port]/org/repo.git
    let rest = rest.split_once('@').map(|(_, r)| r).unwrap_or(rest);
    let (host, path) = rest.split_once('/')?;
    let host = host.split(':').next().unwrap_or(host);
    format!("https://{}/{}", host, path)
  } else if let Some(rest) = url.strip_prefix("git@") {
    let (host, path) = rest.split_once(':')?;
    format!("https://{}/{}", host, path)
  } else if url.starts_with("https://") || url.starts_with("http://") {
    url.to_string()
  } else {
    return None;
  };

  Some(web.trim_end_matches('/').trim_end_matches(".git").to_string())
}

/// Link that opens a pull request for `branch`
pub fn compare_link(remote_url: &str, branch: &str) -> Option<String> {
  remote_web_url(remote_url).map(|base| format!("{}/compare/{}?expand=1", base, branch))
}

/// Link to the release page of `tag`
pub fn release_link(remote_url: &str, tag: &str) -> Option<String> {
  remote_web_url(remote_url).map(|base| format!("{}/releases/tag/{}", base, tag))
}

/// Convert a path to Git format (always forward slashes)
///
/// Git expects paths with forward slashes, even on Windows.
pub fn path_to_git_format(path: &Path) -> String {
  #[cfg(target_os = "windows")]
  {
    path.to_string_lossy().replace('\\', "/")
  }
  #[cfg(not(target_os = "windows"))]
  {
    path.to_string_lossy().to_string()
  }
}
