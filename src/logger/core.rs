/// Filtering rules applied before a message is formatted
use super::config::{get_logger_config, is_debug_enabled_for_tag, is_verbose_enabled_for_tag};
use super::levels::LogLevel;
use super::tags::LogTag;

/// Check if a log message should be displayed
///
/// Filtering rules:
/// 1. Errors are always shown
/// 2. Anything above the minimum level is dropped
/// 3. Debug requires --debug-<tag> for that tag
/// 4. Verbose requires --verbose or --verbose-<tag>
/// 5. A non-empty enabled tag set restricts the remaining levels
pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    if level == LogLevel::Error {
        return true;
    }

    let config = get_logger_config();

    match level {
        LogLevel::Debug => return is_debug_enabled_for_tag(tag),
        LogLevel::Verbose => {
            return config.min_level == LogLevel::Verbose || is_verbose_enabled_for_tag(tag)
        }
        _ => {}
    }

    if level > config.min_level {
        return false;
    }

    config.enabled_tags.is_empty() || config.enabled_tags.contains(&tag.to_debug_key())
}

pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }

    super::format::format_and_log(tag, level, message);
}
