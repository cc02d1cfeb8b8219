//! Terminal output routing
//!
//! Progress lines go to stdout. With `--json` stdout carries only the stage
//! summary document, so progress is moved to stderr.

use std::sync::atomic::{AtomicBool, Ordering};

static MACHINE_OUTPUT: AtomicBool = AtomicBool::new(false);

/// Reserve stdout for machine-readable output
pub fn set_machine_output(enabled: bool) {
  MACHINE_OUTPUT.store(enabled, Ordering::Relaxed);
}

pub fn machine_output() -> bool {
  MACHINE_OUTPUT.load(Ordering::Relaxed)
}

/// Print a progress line (stdout, or stderr under `--json`)
macro_rules! say {
  () => {
    $crate::ui::say!("")
  };
  ($($arg:tt)*) => {
    if $crate::ui::machine_output() {
      eprintln!($($arg)*);
    } else {
      println!($($arg)*);
    }
  };
}

pub(crate) use say;
