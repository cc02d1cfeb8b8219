//! Release arithmetic: version bumps and tag resolution
//!
//! Both modules are independent of stage orchestration so they can be unit
//! tested without a workspace:
//!
//! - **version**: `major.minor.patch[.devN]` parsing and bump rules
//! - **tags**: tags-file loading and the explicit → last tag → repository start chain

pub mod tags;
pub mod version;

pub use version::BumpPart;
