use std::{net::SocketAddr, sync::Arc, time::Duration};

use mongodb::Client;
use tracing_subscriber::EnvFilter;

use pricealerts::{
    config, routes,
    services::{
        alert_monitor::{self, AlertMonitor, MonitorOptions},
        alert_store::MongoAlertStore,
        db_init,
        finnhub::FinnhubClient,
        notifier::MailerSink,
    },
    templates, AppState,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = config::load();

    if settings.finnhub_api_key.trim().is_empty() {
        tracing::warn!("FINNHUB_API_KEY is empty; every quote will be unavailable");
    }

    // Mongo connection
    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("Failed to connect to MongoDB");
    let db = client.database(&settings.mongodb_db);

    if let Err(e) = db_init::ensure_indexes(&db).await {
        tracing::warn!("index setup failed: {}", e);
    }

    let hbs = templates::build_handlebars().expect("email templates");
    let (events_tx, _events_rx) = tokio::sync::broadcast::channel::<String>(64);

    let store = Arc::new(MongoAlertStore::new(db.clone()));
    let quotes = Arc::new(FinnhubClient::new(settings.finnhub_api_key.clone()));
    let sink = Arc::new(MailerSink::new(
        hbs,
        settings.mail_api_url.clone(),
        settings.mail_api_key.clone(),
        settings.mail_from.clone(),
    ));

    let monitor = AlertMonitor::new(
        store.clone(),
        store,
        quotes,
        sink,
        MonitorOptions::from_settings(&settings),
    )
    .with_events(events_tx.clone());

    alert_monitor::spawn_price_alert_monitor(
        Arc::new(monitor),
        Duration::from_secs(settings.alert_interval_secs),
    );
    tracing::info!("alert monitor running every {}s", settings.alert_interval_secs);

    let state = AppState {
        db,
        settings: settings.clone(),
        events_tx,
    };
    let app = routes::app(state);

    let ip = settings
        .host
        .parse::<std::net::IpAddr>()
        .expect("HOST must be an IP address");
    let addr = SocketAddr::from((ip, settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("bind");
    axum::serve(listener, app).await.expect("server error");
}
