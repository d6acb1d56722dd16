use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    pub finnhub_api_key: String,

    // alert monitor
    pub alert_interval_secs: u64,
    pub quote_timeout_secs: u64,
    pub dispatch_timeout_secs: u64,
    pub quote_concurrency: usize,

    // outbound mail; empty url => log-only delivery
    pub mail_api_url: String,
    pub mail_api_key: String,
    pub mail_from: String,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|s| s.trim().parse::<T>().ok()).unwrap_or(default)
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let quote_concurrency = parse_or(env::var("QUOTE_CONCURRENCY").ok(), 8usize).max(1);

    Settings {
        mongodb_uri: var_or("MONGODB_URI", "mongodb://localhost:27017"),
        mongodb_db: var_or("MONGODB_DB", "pricealerts"),
        host: var_or("HOST", "127.0.0.1"),
        port: parse_or(env::var("PORT").ok(), 3000),
        finnhub_api_key: var_or("FINNHUB_API_KEY", ""),
        alert_interval_secs: parse_or(env::var("ALERT_INTERVAL_SECS").ok(), 60u64).max(1),
        quote_timeout_secs: parse_or(env::var("QUOTE_TIMEOUT_SECS").ok(), 10),
        dispatch_timeout_secs: parse_or(env::var("DISPATCH_TIMEOUT_SECS").ok(), 15),
        quote_concurrency,
        mail_api_url: var_or("MAIL_API_URL", ""),
        mail_api_key: var_or("MAIL_API_KEY", ""),
        mail_from: var_or("MAIL_FROM", "\"Price Alerts\" <alerts@pricealerts.local>"),
    }
}
