//! Structured tagged logging for quillgate
//!
//! This module provides a small, ergonomic logging API with:
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-component debug control via --debug-<tag> flags
//! - Colored console output plus optional plain-text file persistence
//!
//! ## Usage
//!
//! ```rust
//! use quillgate::logger::{self, LogTag};
//!
//! logger::error(LogTag::Auth, "Auth service unreachable");
//! logger::warning(LogTag::RateLimit, "Client throttled");
//! logger::info(LogTag::Webserver, "Listening on 0.0.0.0:8080");
//! logger::debug(LogTag::Hub, "Fan-out details: ..."); // Only with --debug-hub
//! logger::verbose(LogTag::Websocket, "Frame dump: ..."); // Only with --verbose
//! ```
//!
//! ## Initialization
//!
//! Call once at startup, after command-line arguments are available:
//! ```rust
//! quillgate::logger::init();
//! ```

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{
    get_logger_config, init_from_args, set_logger_config, update_logger_config, LoggerConfig,
};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// Reads debug/verbosity flags from the argument store and opens the log file
/// when `--log-file <path>` was given.
pub fn init() {
    config::init_from_args();
    file::init_file_logging();
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (shown unless --quiet raises the threshold further)
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operations)
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level
///
/// Only shown when the matching `--debug-<tag>` flag is present, e.g.
/// `--debug-hub` for [`LogTag::Hub`].
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (only with --verbose or --verbose-<tag>)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Force flush all pending log writes
///
/// Call this during shutdown to ensure all logs are written to disk.
pub fn flush() {
    file::flush_file_logging();
}
