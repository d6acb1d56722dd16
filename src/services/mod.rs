pub mod finnhub;
pub mod db_init;
pub mod alert_monitor;

pub mod alert_store;
pub mod memory_store;
pub mod quote_cache;
pub mod trigger;
pub mod notifier;
pub mod alerts_service;
