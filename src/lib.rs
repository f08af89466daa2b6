pub mod arguments;
pub mod auth;
#[macro_use]
pub mod config;
pub mod errors; // Structured gateway errors
pub mod logger;
pub mod notifications;
pub mod ratelimit;
pub mod webserver; // HTTP routes, middleware and the real-time hub
