/// Logger configuration derived from command-line flags
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::PathBuf;

use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Minimum level shown (Error is always shown)
    pub min_level: LogLevel,

    /// Tags allowed to log; empty means all tags
    pub enabled_tags: HashSet<String>,

    /// Tags with --debug-<tag> enabled
    pub debug_tags: HashSet<String>,

    /// Tags with --verbose-<tag> enabled
    pub verbose_tags: HashSet<String>,

    /// Optional plain-text log file
    pub file_path: Option<PathBuf>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            enabled_tags: HashSet::new(),
            debug_tags: HashSet::new(),
            verbose_tags: HashSet::new(),
            file_path: None,
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write() = config;
}

pub fn update_logger_config<F: FnOnce(&mut LoggerConfig)>(update: F) {
    update(&mut LOGGER_CONFIG.write());
}

/// Build the logger configuration from the global argument store
pub fn init_from_args() {
    let mut config = LoggerConfig::default();

    if arguments::patterns::is_verbose_mode() {
        config.min_level = LogLevel::Verbose;
    } else if arguments::patterns::is_quiet_mode() {
        config.min_level = LogLevel::Warning;
    } else if let Some(level) =
        arguments::get_arg_value("--log-level").and_then(|v| LogLevel::parse(&v))
    {
        config.min_level = level;
    }

    let debug_all = arguments::has_arg("--debug-all");
    for tag in LogTag::all() {
        let key = tag.to_debug_key();
        if debug_all || arguments::has_arg(&format!("--debug-{}", key)) {
            config.debug_tags.insert(key.clone());
        }
        if arguments::has_arg(&format!("--verbose-{}", key)) {
            config.verbose_tags.insert(key);
        }
    }

    if let Some(tags) = arguments::get_arg_value("--log-tags") {
        config.enabled_tags = tags
            .split(',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
    }

    config.file_path = arguments::get_arg_value("--log-file").map(PathBuf::from);

    set_logger_config(config);
}

pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    LOGGER_CONFIG.read().debug_tags.contains(&tag.to_debug_key())
}

pub fn is_verbose_enabled_for_tag(tag: &LogTag) -> bool {
    LOGGER_CONFIG.read().verbose_tags.contains(&tag.to_debug_key())
}
