mod server;

pub mod middleware;
pub mod routes;
pub mod state;
pub mod utils;
pub mod ws;

// Public API for starting/stopping the webserver
pub use server::{cors_layer, serve, shutdown, start_server};
