use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{http::StatusCode, routing::{get, post}, Router};
use mongodb::bson::oid::ObjectId;
use pricealerts::{
    error::{DispatchError, QuoteError},
    models::{Alert, Condition, Frequency, User},
    services::{
        alert_monitor::{AlertMonitor, MonitorOptions},
        finnhub::FinnhubClient,
        memory_store::MemoryAlertStore,
        notifier::{self, AlertNotice, MailerSink},
        quote_cache::QuoteSource,
    },
    templates,
};

const NOW: i64 = 1_700_000_000;

/// Local provider that is always down.
async fn spawn_unavailable_provider() -> SocketAddr {
    let app = Router::new()
        .route("/quote", get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "rate limited") }))
        .route("/send", post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "mail down") }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

fn mailer(addr: SocketAddr) -> MailerSink {
    MailerSink::new(
        templates::build_handlebars().unwrap(),
        format!("http://{addr}/send"),
        "test-key".into(),
        "alerts@test".into(),
    )
}

struct FixedPrice(f64);

#[async_trait::async_trait]
impl QuoteSource for FixedPrice {
    async fn current_price(&self, _symbol: &str) -> Result<f64, QuoteError> {
        Ok(self.0)
    }
}

#[tokio::test]
async fn finnhub_error_status_is_reported() {
    let addr = spawn_unavailable_provider().await;
    let client = FinnhubClient::new("key".into()).with_base_url(format!("http://{addr}/quote"));

    let err = client.current_price("AAPL").await.unwrap_err();
    match err {
        QuoteError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "rate limited");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn mail_provider_error_is_a_dispatch_failure() {
    let addr = spawn_unavailable_provider().await;
    let notice = AlertNotice {
        owner_email: "jane@example.com".into(),
        symbol: "AAPL".into(),
        company_name: "Apple Inc".into(),
        current_price: 151.0,
        target_price: 150.0,
        timestamp: notifier::format_timestamp(NOW),
    };

    let err = notifier::dispatch(&mailer(addr), Condition::Above, &notice)
        .await
        .unwrap_err();
    match err {
        DispatchError::Provider { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "mail down");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn mail_outage_leaves_alert_untouched() {
    let addr = spawn_unavailable_provider().await;

    let owner = User {
        id: ObjectId::new(),
        email: "jane@example.com".into(),
        name: None,
    };
    let alert = Alert {
        id: ObjectId::new(),
        user_id: owner.id,
        symbol: "AAPL".into(),
        company_name: Some("Apple Inc".into()),
        condition: Condition::Above,
        target_price: 150.0,
        frequency: Frequency::Once,
        is_active: true,
        is_triggered: false,
        last_triggered_at: None,
        created_at: NOW - 60,
    };

    let store = Arc::new(MemoryAlertStore::new());
    store.insert_user(owner).await;
    store.insert_alert(alert.clone()).await;

    let m = AlertMonitor::new(
        store.clone(),
        store.clone(),
        Arc::new(FixedPrice(151.0)),
        Arc::new(mailer(addr)),
        MonitorOptions {
            quote_timeout: Duration::from_secs(2),
            dispatch_timeout: Duration::from_secs(5),
            concurrency: 1,
        },
    );

    let summary = m.run_cycle(NOW).await.unwrap();
    assert_eq!(summary.dispatch_failures, 1);
    assert_eq!(summary.fired, 0);

    let stored = store.get(alert.id).await.unwrap();
    assert!(stored.is_active);
    assert!(!stored.is_triggered);
    assert_eq!(stored.last_triggered_at, None);
}
