/// Centralized command-line argument handling for quillgate
///
/// Arguments are captured once into a global store so any module (logger,
/// config loader, webserver) can query flags without threading them through.
/// Tests override the store with `set_cmd_args`.
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value following a flag (`--port 9000`) or attached to it
/// (`--port=9000`)
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    let prefix = format!("{}=", flag);
    for (i, arg) in args.iter().enumerate() {
        if arg == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        if let Some(value) = arg.strip_prefix(&prefix) {
            return Some(value.to_string());
        }
    }
    None
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// =============================================================================

/// Webserver routes and middleware debug mode
pub fn is_debug_webserver_enabled() -> bool {
    has_arg("--debug-webserver") || has_arg("--debug-all")
}

/// Per-connection WebSocket pump debug mode
pub fn is_debug_websocket_enabled() -> bool {
    has_arg("--debug-websocket") || has_arg("--debug-all")
}

/// Hub control loop debug mode
pub fn is_debug_hub_enabled() -> bool {
    has_arg("--debug-hub") || has_arg("--debug-all")
}

/// Rate limiter debug mode
pub fn is_debug_rate_limit_enabled() -> bool {
    has_arg("--debug-rate-limit") || has_arg("--debug-all")
}

/// Auth client debug mode
pub fn is_debug_auth_enabled() -> bool {
    has_arg("--debug-auth") || has_arg("--debug-all")
}

/// Gets a list of all enabled debug modes
pub fn get_enabled_debug_modes() -> Vec<&'static str> {
    let mut modes = Vec::new();

    if is_debug_webserver_enabled() {
        modes.push("webserver");
    }
    if is_debug_websocket_enabled() {
        modes.push("websocket");
    }
    if is_debug_hub_enabled() {
        modes.push("hub");
    }
    if is_debug_rate_limit_enabled() {
        modes.push("rate-limit");
    }
    if is_debug_auth_enabled() {
        modes.push("auth");
    }

    modes
}

pub fn print_help() {
    println!("quillgate - real-time notification gateway");
    println!();
    println!("USAGE:");
    println!("    quillgate [FLAGS]");
    println!();
    println!("FLAGS:");
    println!("    --config <path>           Config file (default: data/config.toml)");
    println!("    --host <addr>             Override bind host");
    println!("    --port <port>             Override bind port");
    println!("    --log-file <path>         Mirror logs to a file");
    println!("    --log-level <level>       Minimum level (error|warn|info)");
    println!("    --verbose, -v             Show verbose logs");
    println!("    --quiet, -q               Only warnings and errors");
    println!("    --help, -h                Show this help message");
    println!("    --version, -V             Print version");
    println!();
    println!("DEBUG FLAGS:");
    println!("    --debug-all               Enable every debug mode");
    println!("    --debug-webserver         Routes and middleware");
    println!("    --debug-websocket         Per-connection reader/writer pumps");
    println!("    --debug-hub               Hub control loop");
    println!("    --debug-rate-limit        Rate limiter decisions and sweeps");
    println!("    --debug-auth              Auth service calls");
}

/// Common argument parsing patterns
pub mod patterns {
    use super::*;

    pub fn is_help_requested() -> bool {
        has_arg("--help") || has_arg("-h")
    }

    pub fn is_version_requested() -> bool {
        has_arg("--version") || has_arg("-V")
    }

    pub fn is_quiet_mode() -> bool {
        has_arg("--quiet") || has_arg("-q")
    }

    pub fn is_verbose_mode() -> bool {
        has_arg("--verbose") || has_arg("-v")
    }

    pub fn get_config_path() -> Option<String> {
        get_arg_value("--config")
    }

    pub fn get_host() -> Option<String> {
        get_arg_value("--host")
    }

    pub fn get_port() -> Option<u16> {
        get_arg_value("--port").and_then(|s| s.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test: the argument store is process-global.
    #[test]
    fn test_argument_store() {
        let args = vec![
            "quillgate".to_string(),
            "--debug-hub".to_string(),
            "--port".to_string(),
            "9000".to_string(),
            "--config=/etc/quillgate.toml".to_string(),
            "-q".to_string(),
        ];
        set_cmd_args(args.clone());

        assert_eq!(get_cmd_args(), args);
        assert!(has_arg("--debug-hub"));
        assert!(!has_arg("--debug-auth"));

        assert!(is_debug_hub_enabled());
        assert!(!is_debug_rate_limit_enabled());
        assert_eq!(get_enabled_debug_modes(), vec!["hub"]);

        assert_eq!(patterns::get_port(), Some(9000));
        assert_eq!(
            patterns::get_config_path(),
            Some("/etc/quillgate.toml".to_string())
        );
        assert_eq!(patterns::get_host(), None);
        assert!(patterns::is_quiet_mode());
        assert!(!patterns::is_help_requested());

        set_cmd_args(vec!["quillgate".to_string()]);
    }
}
