//! Library entrypoint for the price alert service.
//!
//! The binary only wires things together; the monitor, stores and sinks
//! live here so integration tests under `tests/` can drive them directly.

pub mod config;
pub mod error;
pub mod models;

pub mod services;

#[path = "views/templates.rs"]
pub mod templates;

pub mod controllers;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub db: mongodb::Database,
    pub settings: config::Settings,
    pub events_tx: tokio::sync::broadcast::Sender<String>,
}
