use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;

use crate::{
    error::DispatchError,
    models::{Alert, Condition},
    templates::{self, Hbs},
};

/// Everything a price alert message needs.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AlertNotice {
    pub owner_email: String,
    pub symbol: String,
    pub company_name: String,
    pub current_price: f64,
    pub target_price: f64,
    pub timestamp: String,
}

impl AlertNotice {
    pub fn new(alert: &Alert, owner_email: &str, current_price: f64, now: i64) -> Self {
        Self {
            owner_email: owner_email.to_string(),
            symbol: alert.symbol.clone(),
            company_name: alert.display_name().to_string(),
            current_price,
            target_price: alert.target_price,
            timestamp: format_timestamp(now),
        }
    }
}

pub fn format_timestamp(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_above(&self, notice: &AlertNotice) -> Result<(), DispatchError>;
    async fn send_below(&self, notice: &AlertNotice) -> Result<(), DispatchError>;
}

/// Sends the directional message matching the alert's condition.
pub async fn dispatch(
    sink: &dyn NotificationSink,
    condition: Condition,
    notice: &AlertNotice,
) -> Result<(), DispatchError> {
    match condition {
        Condition::Above => sink.send_above(notice).await,
        Condition::Below => sink.send_below(notice).await,
    }
}

pub fn subject_for(condition: Condition, symbol: &str) -> String {
    match condition {
        Condition::Above => format!("Price Alert: {symbol} Hit Upper Target!"),
        Condition::Below => format!("Price Alert: {symbol} Hit Lower Target!"),
    }
}

/// Renders alert emails and hands them to an HTTP mail API.
#[derive(Clone)]
pub struct MailerSink {
    http: Client,
    hbs: Hbs,
    api_url: String,
    api_key: String,
    from: String,
}

impl MailerSink {
    pub fn new(hbs: Hbs, api_url: String, api_key: String, from: String) -> Self {
        Self {
            http: Client::new(),
            hbs,
            api_url,
            api_key,
            from,
        }
    }

    fn is_configured(&self) -> bool {
        !self.api_url.trim().is_empty()
    }

    async fn send(&self, condition: Condition, notice: &AlertNotice) -> Result<(), DispatchError> {
        let template = match condition {
            Condition::Above => templates::ALERT_ABOVE,
            Condition::Below => templates::ALERT_BELOW,
        };
        let html = self.hbs.render(template, notice)?;
        let subject = subject_for(condition, &notice.symbol);

        if !self.is_configured() {
            tracing::info!(
                to = %notice.owner_email,
                subject = %subject,
                "MAIL_API_URL not set; alert email logged only"
            );
            return Ok(());
        }

        let body = json!({
            "from": self.from,
            "to": notice.owner_email,
            "subject": subject,
            "html": html,
        });

        let res = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(DispatchError::Provider { status, body });
        }

        Ok(())
    }
}

#[async_trait]
impl NotificationSink for MailerSink {
    async fn send_above(&self, notice: &AlertNotice) -> Result<(), DispatchError> {
        self.send(Condition::Above, notice).await
    }

    async fn send_below(&self, notice: &AlertNotice) -> Result<(), DispatchError> {
        self.send(Condition::Below, notice).await
    }
}
