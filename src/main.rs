use std::sync::Arc;

use quillgate::{
    arguments::{get_enabled_debug_modes, patterns, print_help},
    auth::HttpAuthClient,
    config,
    logger::{self as logger, LogTag},
    webserver::{self, state::AppState},
};

/// Main entry point for quillgate
///
/// Loads `.env`, the TOML config and CLI overrides, then serves HTTP and
/// WebSocket traffic until Ctrl-C.
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    if patterns::is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    if patterns::is_version_requested() {
        println!("quillgate {}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    logger::init();
    logger::info(LogTag::System, "quillgate starting up...");

    let debug_modes = get_enabled_debug_modes();
    if !debug_modes.is_empty() {
        logger::info(
            LogTag::System,
            &format!("Debug modes enabled: {}", debug_modes.join(", ")),
        );
    }

    let code = match run().await {
        Ok(()) => {
            logger::info(LogTag::System, "quillgate stopped");
            0
        }
        Err(e) => {
            logger::error(LogTag::System, &format!("Fatal: {:#}", e));
            1
        }
    };

    logger::flush();
    std::process::exit(code);
}

async fn run() -> anyhow::Result<()> {
    let mut config = config::load_config(patterns::get_config_path().as_deref())?;

    if let Some(host) = patterns::get_host() {
        config.webserver.host = host;
    }
    if let Some(port) = patterns::get_port() {
        config.webserver.port = port;
    }

    let auth = HttpAuthClient::new(&config.auth)?;
    let state = Arc::new(AppState::new(config, Arc::new(auth)));

    webserver::start_server(state).await?;
    Ok(())
}
