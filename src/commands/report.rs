//! Per-stage summary
//!
//! Every stage records one [`PackageOutcome`] per package it looked at. The
//! per-package error boundary lives here: [`StageReport::record`] turns a
//! failed package into a `failed` row and lets the stage continue.

use crate::core::error::ReleaseResult;
use crate::core::packages::Package;
use crate::core::stash::StashOutcome;
use crate::core::status::RepoStatus;
use crate::ui::{self, say};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What happened to a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
  /// The stage did its work
  Done,
  /// Already in the target state, nothing to do
  NoOp,
  /// A gate was not met
  Skipped,
  /// A per-package error occurred
  Failed,
}

impl Outcome {
  fn label(self) -> &'static str {
    match self {
      Outcome::Done => "done",
      Outcome::NoOp => "no-op",
      Outcome::Skipped => "skipped",
      Outcome::Failed => "failed",
    }
  }
}

/// Summary row for one package
#[derive(Debug, Clone, Serialize)]
pub struct PackageOutcome {
  pub package: String,
  pub outcome: Outcome,
  pub detail: String,
  pub pushed: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<RepoStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub stash: Option<StashOutcome>,
}

impl PackageOutcome {
  fn new(package: &str, outcome: Outcome, detail: impl Into<String>) -> Self {
    Self {
      package: package.to_string(),
      outcome,
      detail: detail.into(),
      pushed: false,
      status: None,
      stash: None,
    }
  }

  pub fn done(pkg: &Package, detail: impl Into<String>) -> Self {
    Self::new(&pkg.name, Outcome::Done, detail)
  }

  pub fn no_op(pkg: &Package, detail: impl Into<String>) -> Self {
    Self::new(&pkg.name, Outcome::NoOp, detail)
  }

  pub fn skipped(pkg: &Package, detail: impl Into<String>) -> Self {
    Self::new(&pkg.name, Outcome::Skipped, detail)
  }

  pub fn pushed(mut self, pushed: bool) -> Self {
    self.pushed = pushed;
    self
  }

  pub fn with_status(mut self, status: RepoStatus) -> Self {
    self.status = Some(status);
    self
  }

  pub fn with_stash(mut self, stash: StashOutcome) -> Self {
    self.stash = Some(stash);
    self
  }
}

/// Summary of one stage invocation
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
  pub stage: String,
  pub dry_run: bool,
  pub started_at: DateTime<Utc>,
  pub packages: Vec<PackageOutcome>,
}

impl StageReport {
  pub fn new(stage: &str, dry_run: bool) -> Self {
    Self {
      stage: stage.to_string(),
      dry_run,
      started_at: Utc::now(),
      packages: Vec::new(),
    }
  }

  /// Run one package's work inside the per-package error boundary
  ///
  /// Skips and no-ops are announced here so every stage reports them the
  /// same way.
  pub fn record<F>(&mut self, pkg: &Package, work: F)
  where
    F: FnOnce() -> ReleaseResult<PackageOutcome>,
  {
    let outcome = match work() {
      Ok(outcome) => {
        match outcome.outcome {
          Outcome::Skipped => say!("   ⏩ {}: {}", pkg.name, outcome.detail),
          Outcome::NoOp => say!("   ✅ {}: {}", pkg.name, outcome.detail),
          Outcome::Done | Outcome::Failed => {}
        }
        outcome
      }
      Err(err) => {
        tracing::error!(package = %pkg.name, "{}", err);
        say!("   ❌ {}: {}", pkg.name, err);
        if let Some(help) = err.help_message() {
          say!("      💡 {}", help);
        }
        PackageOutcome::new(&pkg.name, Outcome::Failed, first_line(&err.to_string()))
      }
    };
    self.packages.push(outcome);
  }

  pub fn count(&self, outcome: Outcome) -> usize {
    self.packages.iter().filter(|p| p.outcome == outcome).count()
  }

  /// Print the summary as a table, or as JSON on stdout
  pub fn print(&self) -> ReleaseResult<()> {
    if ui::machine_output() {
      println!("{}", serde_json::to_string_pretty(self)?);
      return Ok(());
    }

    if self.packages.is_empty() {
      say!("\n📊 {}: no packages processed\n", self.stage);
      return Ok(());
    }

    say!("\n📊 {} summary{}\n", self.stage, if self.dry_run { " (dry-run)" } else { "" });
    say!(
      "{:<24} {:<8} {:<7} {:<6} {:<7} {:<12} {:<6} DETAIL",
      "PACKAGE",
      "RESULT",
      "PUSHED",
      "AHEAD",
      "BEHIND",
      "UNCOMMITTED",
      "STASH"
    );
    say!("{:-<100}", "");

    for row in &self.packages {
      let (ahead, behind, uncommitted) = match row.status {
        Some(s) => (s.ahead.to_string(), s.behind.to_string(), if s.uncommitted { "yes" } else { "no" }),
        None => ("-".to_string(), "-".to_string(), "-"),
      };
      let stash = match row.stash {
        Some(StashOutcome { kept: true, .. }) => "kept",
        Some(_) => "-",
        None => "-",
      };
      say!(
        "{:<24} {:<8} {:<7} {:<6} {:<7} {:<12} {:<6} {}",
        row.package,
        row.outcome.label(),
        if row.pushed { "yes" } else { "no" },
        ahead,
        behind,
        uncommitted,
        stash,
        row.detail
      );
    }

    say!(
      "\n{} done, {} no-op, {} skipped, {} failed\n",
      self.count(Outcome::Done),
      self.count(Outcome::NoOp),
      self.count(Outcome::Skipped),
      self.count(Outcome::Failed)
    );
    Ok(())
  }
}

fn first_line(text: &str) -> String {
  text.lines().next().unwrap_or_default().to_string()
}
