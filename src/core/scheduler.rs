//! Polling loop
//!
//! Drives periodic evaluation of the watch list: resolve the symbol
//! universe on a coarse timer, then cycle through it in bounded batches
//! with a capped number of concurrent per-symbol checks, sleep, repeat.
//!
//! Failure containment is layered:
//! - a provider error for one symbol never aborts its batch or the cycle;
//! - classified provider errors (transient outages, delistings) are logged
//!   and handled without bothering the operator;
//! - anything unexpected escaping the per-symbol boundary fails the cycle,
//!   notifies the operator, and backs off with a bounded exponential
//!   cooldown. The loop itself never terminates on an error.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::config::{constants, BotConfig, SharedConfig};
use crate::core::audit::AuditLog;
use crate::core::cache::MaCache;
use crate::core::touch;
use crate::core::universe::UniverseResolver;
use crate::error::AppError;
use crate::messaging::traits::Messenger;
use crate::provider::errors::ProviderError;
use crate::provider::traits::MarketDataProvider;

// =============================================================================
// Backoff
// =============================================================================

/// Bounded exponential cooldown for repeated cycle failures
#[derive(Debug, Clone)]
pub struct CycleBackoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl CycleBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            current: base,
        }
    }

    /// Delay to apply after the latest failure; doubles up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// A successful cycle resets the cooldown.
    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

// =============================================================================
// Cycle Evaluation
// =============================================================================

/// Outcome of one per-symbol evaluation
enum SymbolOutcome {
    Checked { alerts: usize },
    Insufficient,
    TransientSkip,
    Delisted(String),
}

/// Aggregated result of one watch-list pass
#[derive(Debug, Default)]
pub struct CycleStats {
    pub checked: usize,
    pub alerts: usize,
    pub insufficient: usize,
    pub transient_skips: usize,
    /// Symbols the provider no longer knows; dropped at the next refresh
    pub delisted: Vec<String>,
}

/// Evaluate the whole watch list once.
///
/// Batches execute in watch-list order and batch k+1 does not start until
/// batch k has completed, bounding peak concurrency alongside the
/// per-batch semaphore. Per-symbol failures are contained; a panicking
/// check task is the one thing treated as an unexpected cycle failure.
pub async fn run_cycle(
    provider: Arc<dyn MarketDataProvider>,
    messenger: Arc<dyn Messenger>,
    config: SharedConfig,
    windows: Arc<Vec<usize>>,
    cache: Arc<MaCache>,
    audit: Arc<AuditLog>,
    watch_list: &[String],
) -> Result<CycleStats, AppError> {
    let mut stats = CycleStats::default();
    let semaphore = Arc::new(Semaphore::new(constants::max_concurrent_checks()));
    let mut panicked: Option<String> = None;

    for batch in watch_list.chunks(constants::batch_size()) {
        let mut tasks: JoinSet<SymbolOutcome> = JoinSet::new();

        for symbol in batch {
            let provider = provider.clone();
            let messenger = messenger.clone();
            let config = config.clone();
            let windows = windows.clone();
            let cache = cache.clone();
            let audit = audit.clone();
            let semaphore = semaphore.clone();
            let symbol = symbol.clone();

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return SymbolOutcome::TransientSkip;
                };
                check_symbol(provider, messenger, config, &windows, cache, audit, symbol).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(SymbolOutcome::Checked { alerts }) => {
                    stats.checked += 1;
                    stats.alerts += alerts;
                }
                Ok(SymbolOutcome::Insufficient) => stats.insufficient += 1,
                Ok(SymbolOutcome::TransientSkip) => stats.transient_skips += 1,
                Ok(SymbolOutcome::Delisted(symbol)) => stats.delisted.push(symbol),
                Err(e) => {
                    error!(error = ?e, "symbol check task panicked");
                    panicked = Some(e.to_string());
                }
            }
        }
    }

    // Entries older than one cycle are advisory only; drop them here
    cache.prune_expired().await;

    if let Some(reason) = panicked {
        return Err(AppError::Cycle(reason));
    }
    Ok(stats)
}

/// Evaluate one symbol: moving averages through the cache, spot price,
/// touch detection, alert dispatch.
async fn check_symbol(
    provider: Arc<dyn MarketDataProvider>,
    messenger: Arc<dyn Messenger>,
    config: SharedConfig,
    windows: &[usize],
    cache: Arc<MaCache>,
    audit: Arc<AuditLog>,
    symbol: String,
) -> SymbolOutcome {
    // Threshold and interval observed at invocation time; a concurrent
    // command takes effect on the next invocation
    let (tolerance, interval) = {
        let cfg = config.read().await;
        (cfg.touch_precision, cfg.interval)
    };

    let mut averages: Vec<(usize, Option<f64>)> = Vec::with_capacity(windows.len());
    for &window in windows {
        match cache
            .get_or_compute(provider.as_ref(), &symbol, interval, window)
            .await
        {
            Ok(value) => averages.push((window, value)),
            Err(ProviderError::NotFound(_)) => {
                warn!(symbol = %symbol, "symbol unknown or delisted");
                audit.error(&format!("symbol {} unknown or delisted", symbol));
                return SymbolOutcome::Delisted(symbol);
            }
            Err(e) => {
                warn!(symbol = %symbol, error = ?e, "series fetch failed, skipping this cycle");
                audit.error(&format!("series fetch failed for {}: {}", symbol, e));
                return SymbolOutcome::TransientSkip;
            }
        }
    }

    if averages.iter().all(|(_, ma)| ma.is_none()) {
        debug!(symbol = %symbol, "no moving average available yet");
        return SymbolOutcome::Insufficient;
    }

    let current_price = match provider.fetch_spot_price(&symbol).await {
        Ok(price) => price,
        Err(ProviderError::NotFound(_)) => {
            warn!(symbol = %symbol, "symbol unknown or delisted");
            audit.error(&format!("symbol {} unknown or delisted", symbol));
            return SymbolOutcome::Delisted(symbol);
        }
        Err(e) => {
            warn!(symbol = %symbol, error = ?e, "spot fetch failed, skipping this cycle");
            audit.error(&format!("spot fetch failed for {}: {}", symbol, e));
            return SymbolOutcome::TransientSkip;
        }
    };

    let events = touch::evaluate(&symbol, current_price, &averages, tolerance);
    let alerts = events.len();

    for event in events {
        let text = event.alert_text();
        match messenger.send_message(&text).await {
            Ok(()) => {
                info!(
                    symbol = %event.symbol,
                    level = %event.ma_label,
                    price = event.current_price,
                    "touch alert sent"
                );
                audit.alert(&text);
            }
            Err(e) => {
                error!(symbol = %event.symbol, error = ?e, "failed to deliver alert");
                audit.error(&format!("alert delivery failed for {}: {}", event.symbol, e));
            }
        }
    }

    SymbolOutcome::Checked { alerts }
}

// =============================================================================
// Polling Task
// =============================================================================

/// Long-lived polling loop
///
/// Refreshes the watch list on the configured coarse cadence (or once at
/// startup when `refresh_hours` is zero), evaluates it every
/// `poll_interval_secs`, and survives every classified failure. Terminates
/// only on the shutdown signal.
pub async fn polling_task(
    provider: Arc<dyn MarketDataProvider>,
    messenger: Arc<dyn Messenger>,
    config: SharedConfig,
    bot_config: BotConfig,
    cache: Arc<MaCache>,
    audit: Arc<AuditLog>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    info!(provider = provider.name(), "polling loop started");

    let resolver = UniverseResolver::new(bot_config.universe.clone());
    let windows = Arc::new(bot_config.windows.clone());
    let refresh_interval = Duration::from_secs(bot_config.universe.refresh_hours * 3600);
    let mut backoff = CycleBackoff::new(constants::cycle_cooldown(), constants::cycle_cooldown_max());

    let mut watch_list: Vec<String> = Vec::new();
    let mut last_refresh: Option<Instant> = None;
    let mut delisted: HashSet<String> = HashSet::new();

    loop {
        // ---- universe refresh (coarse cadence) ----
        let refresh_due = watch_list.is_empty()
            || (!refresh_interval.is_zero()
                && last_refresh.map_or(true, |t| t.elapsed() >= refresh_interval));
        if refresh_due {
            match resolver.resolve(provider.as_ref()).await {
                Ok(mut list) => {
                    list.retain(|symbol| !delisted.contains(symbol));
                    delisted.clear();
                    info!(size = list.len(), "watch list refreshed");
                    watch_list = list;
                    last_refresh = Some(Instant::now());
                }
                Err(e) if watch_list.is_empty() => {
                    // Nothing to check yet; classified provider failure, so
                    // no operator notification
                    warn!(error = ?e, "universe resolution failed with no watch list, backing off");
                    audit.error(&format!("universe resolution failed: {}", e));
                    let delay = backoff.next_delay();
                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        _ = sleep(delay) => {}
                    }
                    continue;
                }
                Err(e) => {
                    warn!(error = ?e, "universe refresh failed, keeping previous watch list");
                    audit.error(&format!("universe refresh failed: {}", e));
                }
            }
        }

        // ---- one watch-list pass ----
        let sleep_for = tokio::select! {
            _ = shutdown_rx.recv() => break,
            result = run_cycle(
                provider.clone(),
                messenger.clone(),
                config.clone(),
                windows.clone(),
                cache.clone(),
                audit.clone(),
                &watch_list,
            ) => match result {
                Ok(stats) => {
                    backoff.reset();
                    if !stats.delisted.is_empty() {
                        delisted.extend(stats.delisted.iter().cloned());
                    }
                    info!(
                        checked = stats.checked,
                        alerts = stats.alerts,
                        insufficient = stats.insufficient,
                        skipped = stats.transient_skips,
                        delisted = stats.delisted.len(),
                        "cycle complete"
                    );
                    Duration::from_secs(config.read().await.poll_interval_secs)
                }
                Err(e) => {
                    error!(error = %e, "cycle failed unexpectedly");
                    audit.error(&format!("cycle failed: {}", e));
                    if let Err(send_err) = messenger
                        .send_message(&format!("Bot cycle failed: {}", e))
                        .await
                    {
                        error!(error = ?send_err, "failed to notify operator of cycle failure");
                    }
                    backoff.next_delay()
                }
            }
        };

        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = sleep(sleep_for) => {}
        }
    }

    info!("polling loop stopped");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlertConfig;
    use crate::messaging::traits::tests::MockMessenger;
    use crate::provider::traits::tests::MockProvider;
    use crate::provider::types::MarketSymbol;
    use tempfile::tempdir;

    fn test_audit() -> (tempfile::TempDir, Arc<AuditLog>) {
        let dir = tempdir().unwrap();
        let audit = Arc::new(AuditLog::new(dir.path().join("audit.log"), 1024 * 1024, 3));
        (dir, audit)
    }

    /// 99 closes at `level` so MA 99 is exactly `level`
    fn flat_series(level: f64) -> Vec<f64> {
        vec![level; 99]
    }

    #[test]
    fn test_backoff_doubles_to_cap() {
        let mut backoff = CycleBackoff::new(Duration::from_secs(60), Duration::from_secs(300));
        assert_eq!(backoff.next_delay(), Duration::from_secs(60));
        assert_eq!(backoff.next_delay(), Duration::from_secs(120));
        assert_eq!(backoff.next_delay(), Duration::from_secs(240));
        assert_eq!(backoff.next_delay(), Duration::from_secs(300));
        assert_eq!(backoff.next_delay(), Duration::from_secs(300));
    }

    #[test]
    fn test_backoff_reset_restores_base() {
        let mut backoff = CycleBackoff::new(Duration::from_secs(60), Duration::from_secs(300));
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_cycle_alerts_on_touch() {
        let provider: Arc<dyn MarketDataProvider> = Arc::new(
            MockProvider::new()
                .with_series("bitcoin", &flat_series(100.0))
                .with_spot("bitcoin", 100.9),
        );
        let messenger = Arc::new(MockMessenger::new());
        let (_dir, audit) = test_audit();
        let cache = Arc::new(MaCache::new(Duration::from_secs(60)));
        let config = AlertConfig::default().into_shared();

        let stats = run_cycle(
            provider,
            messenger.clone() as Arc<dyn Messenger>,
            config,
            Arc::new(vec![99]),
            cache,
            audit,
            &["bitcoin".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(stats.checked, 1);
        assert_eq!(stats.alerts, 1);
        let sent = messenger.sent_messages();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("MA 99"));
    }

    #[tokio::test]
    async fn test_transient_failure_is_isolated_per_symbol() {
        let provider: Arc<dyn MarketDataProvider> = Arc::new(
            MockProvider::new()
                .with_series("alpha", &flat_series(100.0))
                .with_spot("alpha", 100.0)
                .with_series("beta", &flat_series(50.0))
                .with_spot_failure("beta")
                .with_series("gamma", &flat_series(200.0))
                .with_spot("gamma", 200.0),
        );
        let messenger = Arc::new(MockMessenger::new());
        let (_dir, audit) = test_audit();
        let cache = Arc::new(MaCache::new(Duration::from_secs(60)));
        let config = AlertConfig::default().into_shared();

        let watch_list = vec![
            "alpha".to_string(),
            "beta".to_string(),
            "gamma".to_string(),
        ];
        let stats = run_cycle(
            provider,
            messenger.clone() as Arc<dyn Messenger>,
            config,
            Arc::new(vec![99]),
            cache,
            audit,
            &watch_list,
        )
        .await
        .unwrap();

        assert_eq!(stats.checked, 2);
        assert_eq!(stats.transient_skips, 1);
        // Both healthy symbols still alerted
        assert_eq!(messenger.sent_messages().len(), 2);
    }

    #[tokio::test]
    async fn test_delisted_symbol_is_collected() {
        let provider: Arc<dyn MarketDataProvider> =
            Arc::new(MockProvider::new().with_not_found("luna"));
        let messenger = Arc::new(MockMessenger::new());
        let (_dir, audit) = test_audit();
        let cache = Arc::new(MaCache::new(Duration::from_secs(60)));
        let config = AlertConfig::default().into_shared();

        let stats = run_cycle(
            provider,
            messenger as Arc<dyn Messenger>,
            config,
            Arc::new(vec![99]),
            cache,
            audit,
            &["luna".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(stats.delisted, vec!["luna".to_string()]);
        assert_eq!(stats.checked, 0);
    }

    #[tokio::test]
    async fn test_insufficient_history_is_not_an_error() {
        let provider: Arc<dyn MarketDataProvider> = Arc::new(
            MockProvider::new()
                .with_series("newcoin", &[1.0, 2.0, 3.0])
                .with_spot("newcoin", 3.0),
        );
        let messenger = Arc::new(MockMessenger::new());
        let (_dir, audit) = test_audit();
        let cache = Arc::new(MaCache::new(Duration::from_secs(60)));
        let config = AlertConfig::default().into_shared();

        let stats = run_cycle(
            provider,
            messenger.clone() as Arc<dyn Messenger>,
            config,
            Arc::new(vec![99, 200]),
            cache,
            audit,
            &["newcoin".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(stats.insufficient, 1);
        assert_eq!(stats.alerts, 0);
        assert!(messenger.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn test_polling_task_stops_on_shutdown() {
        let provider: Arc<dyn MarketDataProvider> = Arc::new(
            MockProvider::new()
                .with_listing(vec![MarketSymbol {
                    id: "bitcoin".to_string(),
                    price: 50000.0,
                    market_cap: Some(1e12),
                }])
                .with_series("bitcoin", &flat_series(100.0))
                .with_spot("bitcoin", 500.0),
        );
        let messenger = Arc::new(MockMessenger::new());
        let (_dir, audit) = test_audit();
        let cache = Arc::new(MaCache::new(Duration::from_secs(60)));
        let config = AlertConfig::default().into_shared();

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(polling_task(
            provider,
            messenger as Arc<dyn Messenger>,
            config,
            BotConfig::default(),
            cache,
            audit,
            shutdown_rx,
        ));

        sleep(Duration::from_millis(200)).await;
        let _ = shutdown_tx.send(());

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("polling task did not stop on shutdown")
            .unwrap();
    }
}
