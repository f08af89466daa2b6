//! Gateway configuration
//!
//! Schemas are declared with the `config_struct!` macro (see `macros.rs`),
//! loaded from TOML and overridden from the environment.

#[macro_use]
pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::{AuthConfig, Config, RateLimitConfig, WebSocketConfig, WebserverConfig};
pub use utils::{load_config, load_config_file, parse_config, save_config, CONFIG_FILE_PATH};
