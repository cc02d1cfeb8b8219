//! Core engine for release-train
//!
//! Building blocks shared by every stage:
//!
//! - **config**: release-train.toml parsing with defaults
//! - **context**: per-invocation stage context (root, config, dry-run)
//! - **error**: error types with contextual help messages and exit codes
//! - **packages**: package discovery and release-cycle membership
//! - **artifacts**: per-package artifact files (diff snapshots, messages)
//! - **manifest**: format-preserving manifest edits
//! - **branch**: dev branch preparation
//! - **stash**: scoped stash guard used during branch switching
//! - **status**: ahead/behind/uncommitted snapshot
//! - **vcs**: git operations (system git)

pub mod artifacts;
pub mod branch;
pub mod config;
pub mod context;
pub mod error;
pub mod manifest;
pub mod packages;
pub mod stash;
pub mod status;
pub mod vcs;
