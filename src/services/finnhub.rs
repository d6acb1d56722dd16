use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::QuoteError;

use super::quote_cache::QuoteSource;

const QUOTE_URL: &str = "https://finnhub.io/api/v1/quote";

#[derive(Clone)]
pub struct FinnhubClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl FinnhubClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: Client::new(),
            api_key,
            base_url: QUOTE_URL.to_string(),
        }
    }

    /// Point the client at another quote endpoint (same response shape).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub async fn quote(&self, symbol: &str) -> Result<QuoteResponse, QuoteError> {
        if !self.has_key() {
            return Err(QuoteError::MissingApiKey);
        }

        let res = self
            .http
            .get(&self.base_url)
            .query(&[("symbol", symbol), ("token", &self.api_key)])
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(QuoteError::Status { status, body });
        }

        Ok(res.json::<QuoteResponse>().await?)
    }
}

#[async_trait]
impl QuoteSource for FinnhubClient {
    async fn current_price(&self, symbol: &str) -> Result<f64, QuoteError> {
        let q = self.quote(symbol).await?;
        q.current_price()
            .ok_or_else(|| QuoteError::NoPrice(symbol.to_string()))
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct QuoteResponse {
    // current
    pub c: f64,
    // change
    #[serde(default)]
    pub d: Option<f64>,
    // percent change
    #[serde(default)]
    pub dp: Option<f64>,
    // previous close
    #[serde(default)]
    pub pc: Option<f64>,
    // timestamp
    #[serde(default)]
    pub t: i64,
}

impl QuoteResponse {
    /// Finnhub answers unknown symbols with an all-zero quote.
    pub fn current_price(&self) -> Option<f64> {
        (self.c.is_finite() && self.c > 0.0).then_some(self.c)
    }
}
