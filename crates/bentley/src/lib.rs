//! ## Features
//!
//! - Standard logging levels (verbose, debug, info, warn, error, success)
//! - Multi-line message support with consistent prefixes
//! - Timestamped event lines for request handling
//! - Banner output for CLI headlines
//! - Tracing integration: once a `tracing` subscriber is installed every line
//!   is routed through it instead of being printed directly
//!
//! ## Usage
//!
//! Macros accept `format!` arguments: `bentley::info!("loaded {count} products")`.
//!
//! Binaries call [`init_tracing`] once at startup; libraries only log.

use chrono::Local;
use colored::*;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Severity of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Verbose,
  Debug,
  Info,
  Warn,
  Error,
  Success,
}

impl Level {
  fn tag(self) -> &'static str {
    match self {
      Level::Verbose => "verb",
      Level::Debug => "debug",
      Level::Info => "info",
      Level::Warn => "warn",
      Level::Error => "error",
      Level::Success => "sccs",
    }
  }

  fn color(self) -> Color {
    match self {
      Level::Verbose => Color::Cyan,
      Level::Debug => Color::Magenta,
      Level::Info => Color::Blue,
      Level::Warn => Color::Yellow,
      Level::Error => Color::Red,
      Level::Success => Color::Green,
    }
  }

  /// Verbose and debug lines are suppressed unless verbose output is on
  fn is_enabled(self) -> bool {
    match self {
      Level::Verbose | Level::Debug => is_verbose(),
      _ => true,
    }
  }
}

/// Turn verbose/debug output on or off
pub fn set_verbose(enabled: bool) {
  VERBOSE.store(enabled, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
  VERBOSE.load(Ordering::Relaxed)
}

/// Install the global tracing subscriber.
///
/// Verbose mode logs the quill crates at debug and everything else at info;
/// normal mode keeps quill at info and quiets noisy HTTP internals. Returns
/// `false` if a subscriber was already installed.
pub fn init_tracing(verbose: bool) -> bool {
  set_verbose(verbose);

  let filter = if verbose {
    EnvFilter::new("quill=debug,bentley=debug,info,hyper=warn,reqwest=warn")
  } else {
    EnvFilter::try_from_default_env()
      .unwrap_or_else(|_| EnvFilter::new("quill=info,bentley=info,tower_http=info,warn"))
  };

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(filter)
    .try_init()
    .is_ok()
}

/// Core output function; every line goes to stderr
pub fn log(message: &str) {
  for line in message.lines() {
    eprintln!("{line}");
  }
}

/// Format a colored prefix for log messages
fn format_prefix(level: Level) -> String {
  let tag = level.tag();
  format!("[{}]{:<width$}", tag.color(level.color()).bold(), "", width = 7 - tag.len() - 2)
}

/// Emit one message at the given level, line by line
pub fn emit(level: Level, message: &str) {
  if !level.is_enabled() {
    return;
  }

  if tracing::dispatcher::has_been_set() {
    for line in message.lines() {
      forward_to_tracing(level, line);
    }
    return;
  }

  let prefix = format_prefix(level);
  for line in message.lines() {
    log(&format!("{prefix} {line}"));
  }
}

fn forward_to_tracing(level: Level, line: &str) {
  match level {
    Level::Verbose => tracing::trace!(target: "bentley", "{line}"),
    Level::Debug => tracing::debug!(target: "bentley", "{line}"),
    Level::Info | Level::Success => tracing::info!(target: "bentley", "{line}"),
    Level::Warn => tracing::warn!(target: "bentley", "{line}"),
    Level::Error => tracing::error!(target: "bentley", "{line}"),
  }
}

pub fn verbose(message: &str) {
  emit(Level::Verbose, message);
}

/// Debug level logging - detailed diagnostic information
pub fn debug(message: &str) {
  emit(Level::Debug, message);
}

/// Info level logging - general information
pub fn info(message: &str) {
  emit(Level::Info, message);
}

/// Warning level logging - something needs attention
pub fn warn(message: &str) {
  emit(Level::Warn, message);
}

/// Error level logging - something went wrong
pub fn error(message: &str) {
  emit(Level::Error, message);
}

/// Success level logging - something completed successfully
pub fn success(message: &str) {
  emit(Level::Success, message);
}

/// Timestamped event line, used for per-request logging
pub fn event(level: Level, message: &str) {
  if !level.is_enabled() {
    return;
  }

  let timestamp = Local::now().format("%H:%M:%S").to_string();
  let stamped: String =
    message.lines().map(|line| format!("[{}] {line}", timestamp)).collect::<Vec<_>>().join("\n");

  if tracing::dispatcher::has_been_set() {
    emit(level, &stamped);
    return;
  }

  let prefix = format!("[{}]", "event".color(level.color()).bold());
  for line in stamped.lines() {
    log(&format!("{prefix} {}", line.cyan()));
  }
}

/// Create a banner line of the specified length and character
pub fn banner_line(length: usize, char: char) -> String {
  char.to_string().repeat(length)
}

/// Theatrical announcement - a message between two banner lines
pub fn announce(message: &str) {
  let banner = banner_line(50, '-');
  log(&banner.blue().bold().to_string());
  for line in message.lines() {
    log(&line.blue().bold().to_string());
  }
  log(&banner.blue().bold().to_string());
}

/// Macros for coverage-excluded logging - these expand with LCOV_EXCL_LINE at call sites
#[macro_export]
macro_rules! verbose {
  ($($arg:tt)*) => {
    $crate::verbose(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! debug {
  ($($arg:tt)*) => {
    $crate::debug(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => {
    $crate::info(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! warn {
  ($($arg:tt)*) => {
    $crate::warn(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => {
    $crate::error(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => {
    $crate::success(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! event_info {
  ($($arg:tt)*) => {
    $crate::event($crate::Level::Info, &format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! event_warn {
  ($($arg:tt)*) => {
    $crate::event($crate::Level::Warn, &format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! event_error {
  ($($arg:tt)*) => {
    $crate::event($crate::Level::Error, &format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn prefix_pads_short_tags() {
    colored::control::set_override(false);
    assert_eq!(format_prefix(Level::Info), "[info] ");
    assert_eq!(format_prefix(Level::Error), "[error]");
    colored::control::unset_override();
  }

  #[test]
  fn banner_line_repeats_character() {
    assert_eq!(banner_line(4, '='), "====");
    assert_eq!(banner_line(0, '-'), "");
  }

  #[test]
  fn verbose_levels_follow_flag() {
    set_verbose(false);
    assert!(!Level::Verbose.is_enabled());
    assert!(!Level::Debug.is_enabled());
    assert!(Level::Warn.is_enabled());

    set_verbose(true);
    assert!(Level::Verbose.is_enabled());
    set_verbose(false);
  }
}
