//! Log formatting and output
//!
//! Handles colorized console output with aligned tag and level columns,
//! word wrapping of long messages, and mirroring to the log file.

use super::file::write_to_file;
use super::levels::LogLevel;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stdout, ErrorKind, Write};

const TAG_WIDTH: usize = 10;
const LEVEL_WIDTH: usize = 8;

/// Maximum line length before wrapping
const MAX_LINE_LENGTH: usize = 145;

pub fn format_and_log(tag: LogTag, level: LogLevel, message: &str) {
    let now = Local::now();
    let time = now.format("%H:%M:%S").to_string();

    let base_line = format!(
        "{} [{}] [{}] ",
        time.dimmed(),
        format_tag(&tag),
        format_level(level)
    );

    // time + two bracketed columns + separators
    let prefix_width = time.len() + TAG_WIDTH + LEVEL_WIDTH + 7;
    let available = MAX_LINE_LENGTH.saturating_sub(prefix_width).max(50);
    let chunks = wrap_text(message, available);

    let timestamp = now.format("%Y-%m-%d %H:%M:%S").to_string();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            print_stdout_safe(&format!("{}{}", base_line, chunk));
        } else {
            print_stdout_safe(&format!("{}{}", " ".repeat(prefix_width), chunk));
        }
        write_to_file(&format!(
            "{} [{}] [{}] {}",
            timestamp,
            tag.to_plain_string(),
            level.as_str(),
            chunk
        ));
    }
}

fn format_tag(tag: &LogTag) -> ColoredString {
    let label = format!("{:<width$}", tag.to_plain_string(), width = TAG_WIDTH);
    match tag {
        LogTag::System => label.bright_yellow().bold(),
        LogTag::Config => label.bright_white().bold(),
        LogTag::Webserver => label.bright_purple().bold(),
        LogTag::Websocket => label.bright_cyan().bold(),
        LogTag::Hub => label.bright_blue().bold(),
        LogTag::RateLimit => label.bright_red().bold(),
        LogTag::Auth => label.bright_magenta().bold(),
        LogTag::Notify => label.bright_green().bold(),
    }
}

fn format_level(level: LogLevel) -> ColoredString {
    let label = format!("{:<width$}", level.as_str(), width = LEVEL_WIDTH);
    match level {
        LogLevel::Error => label.bright_red().bold(),
        LogLevel::Warning => label.bright_yellow().bold(),
        LogLevel::Info => label.white().bold(),
        LogLevel::Debug | LogLevel::Verbose => label.dimmed(),
    }
}

/// Print to stdout but ignore broken pipe errors
fn print_stdout_safe(message: &str) {
    let mut out = stdout();
    if let Err(e) = writeln!(out, "{}", message).and_then(|_| out.flush()) {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        let _ = writeln!(std::io::stderr(), "Logger stdout error: {}", e);
    }
}

/// Wrap text at word boundaries, respecting existing newlines
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut result = Vec::new();

    for line in text.split('\n') {
        if line.chars().count() <= max_width {
            result.push(line.to_string());
            continue;
        }

        let mut current = String::new();
        for word in line.split_whitespace() {
            let word_len = word.chars().count();
            let current_len = current.chars().count();

            if word_len > max_width {
                if !current.is_empty() {
                    result.push(std::mem::take(&mut current));
                }
                let chars: Vec<char> = word.chars().collect();
                for piece in chars.chunks(max_width) {
                    result.push(piece.iter().collect());
                }
            } else if current.is_empty() {
                current = word.to_string();
            } else if current_len + word_len + 1 <= max_width {
                current.push(' ');
                current.push_str(word);
            } else {
                result.push(std::mem::replace(&mut current, word.to_string()));
            }
        }

        if !current.is_empty() {
            result.push(current);
        }
    }

    if result.is_empty() {
        result.push(String::new());
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text_short_line_untouched() {
        assert_eq!(wrap_text("hello world", 50), vec!["hello world".to_string()]);
    }

    #[test]
    fn test_wrap_text_breaks_on_words_and_long_tokens() {
        let wrapped = wrap_text("aaaa bbbb cccc", 9);
        assert_eq!(wrapped, vec!["aaaa bbbb", "cccc"]);

        let wrapped = wrap_text("0123456789abc", 5);
        assert_eq!(wrapped, vec!["01234", "56789", "abc"]);
    }

    #[test]
    fn test_wrap_text_keeps_newlines() {
        let wrapped = wrap_text("first\nsecond", 50);
        assert_eq!(wrapped, vec!["first", "second"]);
    }
}
