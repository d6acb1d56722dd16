use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::Utc;
use futures_util::{stream, StreamExt};
use tokio::{sync::broadcast, task::JoinHandle, time};

use crate::{
    config::Settings,
    error::{CycleError, DispatchError},
    models::{Alert, FirePatch},
};

use super::{
    alert_store::{AlertStore, OwnerDirectory},
    notifier::{self, AlertNotice, NotificationSink},
    quote_cache::{QuoteCache, QuoteSource},
    trigger,
};

pub const ALERTS_UPDATED: &str = "alertsUpdated";

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub quote_timeout: Duration,
    pub dispatch_timeout: Duration,
    pub concurrency: usize,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            quote_timeout: Duration::from_secs(10),
            dispatch_timeout: Duration::from_secs(15),
            concurrency: 8,
        }
    }
}

impl MonitorOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            quote_timeout: Duration::from_secs(settings.quote_timeout_secs),
            dispatch_timeout: Duration::from_secs(settings.dispatch_timeout_secs),
            concurrency: settings.quote_concurrency.max(1),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    /// distinct symbols looked up this cycle
    pub symbols: usize,
    pub alerts_evaluated: usize,
    pub fired: usize,
    /// fired alerts whose state update was applied
    pub applied: usize,
    pub dispatch_failures: usize,
    pub quotes_unavailable: usize,
    pub owners_missing: usize,
    /// notifications sent whose state update matched nothing
    pub updates_skipped: usize,
}

impl CycleSummary {
    fn absorb(&mut self, other: CycleSummary) {
        self.alerts_evaluated += other.alerts_evaluated;
        self.fired += other.fired;
        self.applied += other.applied;
        self.dispatch_failures += other.dispatch_failures;
        self.quotes_unavailable += other.quotes_unavailable;
        self.owners_missing += other.owners_missing;
        self.updates_skipped += other.updates_skipped;
    }
}

enum FireOutcome {
    Applied,
    NotApplied,
    DispatchFailed,
    OwnerMissing,
}

/// Groups alerts by normalized ticker. The key set is the exact set of
/// quote lookups a cycle needs.
pub fn group_by_symbol(alerts: Vec<Alert>) -> BTreeMap<String, Vec<Alert>> {
    let mut by_symbol: BTreeMap<String, Vec<Alert>> = BTreeMap::new();
    for a in alerts {
        by_symbol
            .entry(a.symbol.trim().to_uppercase())
            .or_default()
            .push(a);
    }
    by_symbol
}

pub struct AlertMonitor {
    store: Arc<dyn AlertStore>,
    owners: Arc<dyn OwnerDirectory>,
    quotes: Arc<dyn QuoteSource>,
    sink: Arc<dyn NotificationSink>,
    options: MonitorOptions,
    events_tx: Option<broadcast::Sender<String>>,
    in_flight: AtomicBool,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AlertMonitor {
    pub fn new(
        store: Arc<dyn AlertStore>,
        owners: Arc<dyn OwnerDirectory>,
        quotes: Arc<dyn QuoteSource>,
        sink: Arc<dyn NotificationSink>,
        options: MonitorOptions,
    ) -> Self {
        Self {
            store,
            owners,
            quotes,
            sink,
            options,
            events_tx: None,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Publish `alertsUpdated` whenever a cycle changes alert state.
    pub fn with_events(mut self, tx: broadcast::Sender<String>) -> Self {
        self.events_tx = Some(tx);
        self
    }

    /// Runs one cycle unless another one is still in flight, in which case
    /// the tick is dropped and `None` is returned.
    pub async fn tick(&self, now: i64) -> Option<Result<CycleSummary, CycleError>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("[alert-monitor] previous cycle still running, tick dropped");
            return None;
        }
        let _guard = InFlight(&self.in_flight);

        Some(self.run_cycle(now).await)
    }

    pub async fn run_cycle(&self, now: i64) -> Result<CycleSummary, CycleError> {
        let alerts = self.store.find_active().await.map_err(CycleError::LoadActive)?;

        if alerts.is_empty() {
            tracing::debug!("[alert-monitor] no active alerts");
            return Ok(CycleSummary::default());
        }

        let by_symbol = group_by_symbol(alerts);
        let mut summary = CycleSummary {
            symbols: by_symbol.len(),
            ..Default::default()
        };

        // dropped at the end of this call; prices never outlive the cycle
        let cache = QuoteCache::new(self.quotes.clone(), self.options.quote_timeout);

        let jobs: Vec<_> = by_symbol
            .into_iter()
            .map(|(sym, group)| self.process_symbol(&cache, sym, group, now))
            .collect();

        let per_symbol: Vec<CycleSummary> = stream::iter(jobs)
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;

        for s in per_symbol {
            summary.absorb(s);
        }

        if summary.applied > 0 {
            if let Some(tx) = &self.events_tx {
                let _ = tx.send(ALERTS_UPDATED.to_string());
            }
        }

        tracing::info!(
            symbols = summary.symbols,
            evaluated = summary.alerts_evaluated,
            fired = summary.fired,
            applied = summary.applied,
            dispatch_failures = summary.dispatch_failures,
            quotes_unavailable = summary.quotes_unavailable,
            "[alert-monitor] cycle done"
        );

        Ok(summary)
    }

    async fn process_symbol(
        &self,
        cache: &QuoteCache,
        symbol: String,
        group: Vec<Alert>,
        now: i64,
    ) -> CycleSummary {
        let mut out = CycleSummary::default();

        let Some(price) = cache.resolve(&symbol).await else {
            tracing::warn!(
                symbol = %symbol,
                alerts = group.len(),
                "[alert-monitor] skipping symbol this cycle"
            );
            out.quotes_unavailable = 1;
            return out;
        };

        for alert in group {
            out.alerts_evaluated += 1;

            if !trigger::evaluate(&alert, price, now).fire {
                continue;
            }

            match self.fire(&alert, price, now).await {
                FireOutcome::Applied => {
                    out.fired += 1;
                    out.applied += 1;
                }
                FireOutcome::NotApplied => {
                    out.fired += 1;
                    out.updates_skipped += 1;
                }
                FireOutcome::DispatchFailed => out.dispatch_failures += 1,
                FireOutcome::OwnerMissing => out.owners_missing += 1,
            }
        }

        out
    }

    async fn fire(&self, alert: &Alert, price: f64, now: i64) -> FireOutcome {
        let owner = match self.owners.find_owner(alert.user_id).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                tracing::warn!(alert_id = %alert.id, owner_id = %alert.user_id, "[alert-monitor] owner not found");
                return FireOutcome::OwnerMissing;
            }
            Err(e) => {
                tracing::warn!(alert_id = %alert.id, error = %e, "[alert-monitor] owner lookup failed");
                return FireOutcome::OwnerMissing;
            }
        };

        let notice = AlertNotice::new(alert, &owner.email, price, now);
        let sent = time::timeout(
            self.options.dispatch_timeout,
            notifier::dispatch(self.sink.as_ref(), alert.condition, &notice),
        )
        .await
        .unwrap_or(Err(DispatchError::Timeout));

        if let Err(e) = sent {
            // state untouched so the alert is retried next eligible cycle
            tracing::warn!(alert_id = %alert.id, symbol = %alert.symbol, error = %e, "[alert-monitor] dispatch failed");
            return FireOutcome::DispatchFailed;
        }

        let patch = FirePatch::for_alert(alert, now);
        match self
            .store
            .conditional_update(alert.id, alert.user_id, &patch)
            .await
        {
            Ok(true) => {
                tracing::info!(
                    alert_id = %alert.id,
                    symbol = %alert.symbol,
                    condition = alert.condition.as_str(),
                    price,
                    target = alert.target_price,
                    "[alert-monitor] alert fired"
                );
                FireOutcome::Applied
            }
            Ok(false) => {
                tracing::debug!(alert_id = %alert.id, "[alert-monitor] alert changed or removed mid-cycle");
                FireOutcome::NotApplied
            }
            Err(e) => {
                tracing::warn!(alert_id = %alert.id, error = %e, "[alert-monitor] post-fire update failed");
                FireOutcome::NotApplied
            }
        }
    }
}

/// Drives the monitor on a fixed cadence until the runtime shuts down.
pub fn spawn_price_alert_monitor(monitor: Arc<AlertMonitor>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            match monitor.tick(Utc::now().timestamp()).await {
                Some(Err(e)) => tracing::error!("[alert-monitor] cycle aborted: {}", e),
                Some(Ok(_)) | None => {}
            }
        }
    })
}
