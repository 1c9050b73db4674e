mod admin_routes;
pub mod config;
mod http_layers;
pub mod server;
pub mod state;
mod survey_routes;

pub use config::ServerConfig;
pub use http_layers::*;
#[allow(unused_imports)] // Used by main.rs
pub use server::run_server;
