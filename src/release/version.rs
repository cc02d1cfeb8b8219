//! Version arithmetic for `major.minor.patch[.devN]` versions
//!
//! Everything here is pure: no I/O, no git. The release triple is validated
//! with `semver`; the `.devN` marker is handled on top of it because it is
//! not a semver pre-release (`1.2.3.dev0` sorts before `1.2.3`).

use crate::core::error::VersionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const DEV_MARKER: &str = ".dev";

/// Which part of a version to bump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BumpPart {
  Patch,
  Minor,
  Major,
  Dev,
}

impl fmt::Display for BumpPart {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      BumpPart::Patch => "patch",
      BumpPart::Minor => "minor",
      BumpPart::Major => "major",
      BumpPart::Dev => "dev",
    };
    f.write_str(name)
  }
}

/// A release triple with an optional `.devN` marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageVersion {
  pub release: semver::Version,
  pub dev: Option<u64>,
}

impl PackageVersion {
  /// Whether this is an in-progress dev version
  pub fn is_dev(&self) -> bool {
    self.dev.is_some()
  }

  /// Compute the next version for `part`
  ///
  /// `patch` on a dev version finalizes it: `1.2.3.dev4` becomes `1.2.3`,
  /// the planned release, rather than skipping ahead to `1.2.4`.
  pub fn bump(&self, part: BumpPart) -> Result<Self, VersionError> {
    let semver::Version {
      major, minor, patch, ..
    } = self.release;
    let inc = |n: u64| n.checked_add(1).ok_or_else(|| self.overflow());

    let next = match part {
      BumpPart::Dev => {
        let n = self.dev.ok_or_else(|| VersionError::NoDevSuffix {
          version: self.to_string(),
        })?;
        return Ok(Self {
          release: self.release.clone(),
          dev: Some(inc(n)?),
        });
      }
      BumpPart::Patch if self.is_dev() => semver::Version::new(major, minor, patch),
      BumpPart::Patch => semver::Version::new(major, minor, inc(patch)?),
      BumpPart::Minor => semver::Version::new(major, inc(minor)?, 0),
      BumpPart::Major => semver::Version::new(inc(major)?, 0, 0),
    };

    Ok(Self { release: next, dev: None })
  }

  /// First dev version of the next cycle
  ///
  /// `1.2.3` becomes `1.2.4.dev0`; a dev version just increments `N`.
  pub fn next_dev(&self) -> Result<Self, VersionError> {
    let next = match self.dev {
      Some(n) => Self {
        release: self.release.clone(),
        dev: Some(n.checked_add(1).ok_or_else(|| self.overflow())?),
      },
      None => {
        let patch = self.release.patch.checked_add(1).ok_or_else(|| self.overflow())?;
        Self {
          release: semver::Version::new(self.release.major, self.release.minor, patch),
          dev: Some(0),
        }
      }
    };
    Ok(next)
  }

  fn overflow(&self) -> VersionError {
    VersionError::Overflow {
      version: self.to_string(),
    }
  }
}

impl FromStr for PackageVersion {
  type Err = VersionError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || VersionError::Unparseable { version: s.to_string() };
    let trimmed = s.trim();

    let (triple, dev) = match trimmed.rsplit_once(DEV_MARKER) {
      Some((triple, n)) => {
        if n.is_empty() || !n.chars().all(|c| c.is_ascii_digit()) {
          return Err(invalid());
        }
        (triple, Some(n.parse::<u64>().map_err(|_| invalid())?))
      }
      None => (trimmed, None),
    };

    let release = semver::Version::parse(triple).map_err(|_| invalid())?;
    if !release.pre.is_empty() || !release.build.is_empty() {
      return Err(invalid());
    }

    Ok(Self { release, dev })
  }
}

impl fmt::Display for PackageVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.release)?;
    if let Some(n) = self.dev {
      write!(f, "{}{}", DEV_MARKER, n)?;
    }
    Ok(())
  }
}

/// Bump a version string
pub fn bump(version: &str, part: BumpPart) -> Result<String, VersionError> {
  Ok(version.parse::<PackageVersion>()?.bump(part)?.to_string())
}

/// Next dev-cycle version for a version string
pub fn next_dev(version: &str) -> Result<String, VersionError> {
  Ok(version.parse::<PackageVersion>()?.next_dev()?.to_string())
}
