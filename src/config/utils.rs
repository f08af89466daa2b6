/// Configuration loading
///
/// Order of precedence, lowest first: schema defaults, `config.toml`,
/// environment (including `.env`), command-line flags.
use anyhow::{Context, Result};
use std::path::Path;

use super::schemas::Config;
use crate::errors::ConfigurationError;
use crate::logger::{self, LogTag};

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "data/config.toml";

/// Parse a TOML document into a `Config`, defaulting missing fields
pub fn parse_config(contents: &str, path: &str) -> Result<Config, ConfigurationError> {
    toml::from_str::<Config>(contents).map_err(|e| ConfigurationError::Parse {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// Read a config file; a missing file yields the defaults
pub fn load_config_file(path: &str) -> Result<Config, ConfigurationError> {
    if !Path::new(path).exists() {
        logger::warning(
            LogTag::Config,
            &format!("Config file '{}' not found, using default values", path),
        );
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigurationError::FileRead {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    parse_config(&contents, path)
}

/// Load the full runtime configuration
///
/// `path` defaults to [`CONFIG_FILE_PATH`]. Environment overrides are applied
/// on top of the file, then the result is validated.
pub fn load_config(path: Option<&str>) -> Result<Config> {
    let path = path.unwrap_or(CONFIG_FILE_PATH);

    let mut config =
        load_config_file(path).with_context(|| format!("Failed to load config from '{}'", path))?;

    config
        .apply_overrides(|key| std::env::var(key).ok())
        .context("Invalid environment override")?;

    config.validate().context("Invalid configuration")?;

    logger::info(
        LogTag::Config,
        &format!(
            "Configuration loaded (listen={}:{}, auth={})",
            config.webserver.host, config.webserver.port, config.auth.service_url
        ),
    );

    Ok(config)
}

/// Write a configuration to disk as pretty TOML
pub fn save_config(config: &Config, path: &str) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write config file '{}'", path))?;

    Ok(())
}
