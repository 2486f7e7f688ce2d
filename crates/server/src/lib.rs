//! HTTP front end for the used car price estimator

pub mod api;
pub mod config;

pub use api::{create_router, serve, AppState};
pub use config::ServerConfig;
