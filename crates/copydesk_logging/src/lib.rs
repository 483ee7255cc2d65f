#![deny(missing_docs)]
//! Shared logging utilities for the copydesk workspace.
//!
//! This crate provides the `desk_*` logging macros used across the codebase,
//! the logger setup used by the application shell, and a minimal test
//! initializer for the global logger.

use std::fs::File;
use std::path::Path;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

#[doc(hidden)]
pub use log as __log;

/// Log target shared by every `desk_*` macro.
pub const TARGET: &str = "copydesk";

/// Logs a trace-level message under the `copydesk` target.
#[macro_export]
macro_rules! desk_trace {
    ($($arg:tt)*) => {{
        $crate::__log::trace!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs a debug-level message under the `copydesk` target.
#[macro_export]
macro_rules! desk_debug {
    ($($arg:tt)*) => {{
        $crate::__log::debug!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs an info-level message under the `copydesk` target.
#[macro_export]
macro_rules! desk_info {
    ($($arg:tt)*) => {{
        $crate::__log::info!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs a warn-level message under the `copydesk` target.
#[macro_export]
macro_rules! desk_warn {
    ($($arg:tt)*) => {{
        $crate::__log::warn!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs an error-level message under the `copydesk` target.
#[macro_export]
macro_rules! desk_error {
    ($($arg:tt)*) => {{
        $crate::__log::error!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Destination for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to the given file, truncating it.
    File(std::path::PathBuf),
    /// Write to the terminal (stderr for warnings and errors).
    Terminal,
    /// Write to both the terminal and the given file.
    Both(std::path::PathBuf),
}

/// Initializes the global logger.
///
/// A file that cannot be created is reported on stderr and skipped; the
/// remaining loggers are still installed. Calling this twice is a no-op.
pub fn initialize(destination: LogDestination, level: LevelFilter) {
    let config = build_config();

    let loggers: Vec<Box<dyn SharedLogger>> = match destination {
        LogDestination::File(path) => match create_file_logger(&path, level, config) {
            Some(file_logger) => vec![file_logger],
            None => return,
        },
        LogDestination::Terminal => vec![terminal_logger(level, config)],
        LogDestination::Both(path) => {
            let mut loggers = vec![terminal_logger(level, config.clone())];
            if let Some(file_logger) = create_file_logger(&path, level, config) {
                loggers.push(file_logger);
            }
            loggers
        }
    };

    let _ = CombinedLogger::init(loggers);
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn terminal_logger(level: LevelFilter, config: Config) -> Box<dyn SharedLogger> {
    TermLogger::new(level, config, TerminalMode::Mixed, ColorChoice::Auto)
}

fn create_file_logger(
    path: &Path,
    level: LevelFilter,
    config: Config,
) -> Option<Box<dyn SharedLogger>> {
    match File::create(path) {
        Ok(file) => Some(WriteLogger::new(level, config, file) as Box<dyn SharedLogger>),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", path, err);
            None
        }
    }
}
