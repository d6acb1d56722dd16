//! Per-cycle quote memoization.
//!
//! A `QuoteCache` lives for exactly one monitor cycle. Every symbol is
//! fetched at most once; concurrent callers for the same symbol wait on the
//! same in-flight lookup and all observe the same value.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::error::QuoteError;

#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn current_price(&self, symbol: &str) -> Result<f64, QuoteError>;
}

pub struct QuoteCache {
    source: Arc<dyn QuoteSource>,
    timeout: Duration,
    prices: Mutex<HashMap<String, Arc<OnceCell<Option<f64>>>>>,
}

impl QuoteCache {
    pub fn new(source: Arc<dyn QuoteSource>, timeout: Duration) -> Self {
        Self {
            source,
            timeout,
            prices: Mutex::new(HashMap::new()),
        }
    }

    /// Price for `symbol` this cycle, or `None` when the source failed,
    /// timed out, or had nothing usable.
    pub async fn resolve(&self, symbol: &str) -> Option<f64> {
        let key = symbol.trim().to_uppercase();

        let cell = {
            let mut prices = match self.prices.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            prices.entry(key.clone()).or_default().clone()
        };

        *cell
            .get_or_init(|| async {
                match self.fetch(&key).await {
                    Ok(price) => Some(price),
                    Err(e) => {
                        tracing::warn!(symbol = %key, error = %e, "quote unavailable");
                        None
                    }
                }
            })
            .await
    }

    async fn fetch(&self, symbol: &str) -> Result<f64, QuoteError> {
        let price = tokio::time::timeout(self.timeout, self.source.current_price(symbol))
            .await
            .map_err(|_| QuoteError::Timeout)??;

        if !price.is_finite() || price <= 0.0 {
            return Err(QuoteError::NoPrice(symbol.to_string()));
        }

        Ok(price)
    }

    /// Number of distinct symbols looked up so far.
    pub fn len(&self) -> usize {
        match self.prices.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
