//! Background polling for the selected symbol.
//!
//! [`SymbolTracker`] runs the full analysis cycle on a loop and publishes the
//! latest report on a `watch` channel. [`PricePoller`] is the lighter task that
//! only refreshes the last price. Both own their task handle: re-targeting or
//! dropping them aborts the old task.

use super::analyzer::{AnalysisReport, Analyzer};
use crate::config::AnalysisConfig;
use crate::exchange::{ExchangeResult, MarketDataProvider};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Published state of the analysis loop.
#[derive(Debug, Clone, Default)]
pub struct TrackerState {
    pub symbol: String,
    pub interval: String,
    /// Latest successful report. Kept when a later cycle fails.
    pub report: Option<AnalysisReport>,
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub cycles: u64,
    generation: u64,
}

/// Fetch candles and ticker, then run the pipeline once.
pub async fn analysis_cycle<P: MarketDataProvider + ?Sized>(
    provider: &P,
    analyzer: &Analyzer,
    symbol: &str,
    interval: &str,
    limit: u32,
) -> ExchangeResult<AnalysisReport> {
    let (candles, ticker) = tokio::join!(
        provider.klines(symbol, interval, limit),
        provider.ticker(symbol)
    );
    let candles = candles?;
    let ticker = ticker?;
    Ok(analyzer.analyze(symbol, &candles, ticker.last_price))
}

/// What one analysis loop polls and how often.
#[derive(Debug, Clone)]
struct LoopTarget {
    symbol: String,
    interval: String,
    limit: u32,
    period: Duration,
    generation: u64,
}

async fn analysis_loop<P: MarketDataProvider + ?Sized>(
    provider: Arc<P>,
    analyzer: Analyzer,
    target: LoopTarget,
    state: Arc<watch::Sender<TrackerState>>,
) {
    let LoopTarget {
        symbol,
        interval,
        limit,
        period,
        generation,
    } = target;
    loop {
        let result = analysis_cycle(provider.as_ref(), &analyzer, &symbol, &interval, limit).await;
        match &result {
            Ok(report) => debug!(%symbol, trend = %report.verdict.trend, setup = %report.setup, "Analysis cycle complete"),
            Err(e) => warn!(%symbol, error = %e, transient = e.is_transient(), "Analysis cycle failed"),
        }

        // A replaced loop may finish one last poll after abort; its result is dropped.
        state.send_if_modified(|s| {
            if s.generation != generation {
                return false;
            }
            match result {
                Ok(report) => {
                    s.report = Some(report);
                    s.last_error = None;
                }
                Err(e) => s.last_error = Some(e.to_string()),
            }
            s.updated_at = Some(Utc::now());
            s.cycles += 1;
            true
        });

        tokio::time::sleep(period).await;
    }
}

/// Owns the single active analysis loop.
pub struct SymbolTracker<P: MarketDataProvider + ?Sized + 'static> {
    provider: Arc<P>,
    analyzer: Analyzer,
    kline_limit: u32,
    period: Duration,
    state: Arc<watch::Sender<TrackerState>>,
    handle: Option<JoinHandle<()>>,
}

impl<P: MarketDataProvider + ?Sized + 'static> SymbolTracker<P> {
    pub fn new(provider: Arc<P>, analyzer: Analyzer, config: &AnalysisConfig) -> Self {
        let (tx, _) = watch::channel(TrackerState::default());
        Self {
            provider,
            analyzer,
            kline_limit: config.kline_limit,
            period: config.poll_interval(),
            state: Arc::new(tx),
            handle: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackerState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> TrackerState {
        self.state.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Start tracking `symbol` on `interval`, replacing any running loop.
    /// The published state is reset so no report of the old pair survives.
    pub fn track(&mut self, symbol: &str, interval: &str) {
        self.stop();

        let mut generation = 0;
        self.state.send_modify(|s| {
            generation = s.generation + 1;
            *s = TrackerState {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
                generation,
                ..Default::default()
            };
        });

        info!(%symbol, %interval, period_ms = self.period.as_millis() as u64, "Starting analysis loop");
        let target = LoopTarget {
            symbol: symbol.to_string(),
            interval: interval.to_string(),
            limit: self.kline_limit,
            period: self.period,
            generation,
        };
        self.handle = Some(tokio::spawn(analysis_loop(
            Arc::clone(&self.provider),
            self.analyzer,
            target,
            Arc::clone(&self.state),
        )));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            self.state.send_modify(|s| s.generation += 1);
            debug!("Analysis loop stopped");
        }
    }
}

impl<P: MarketDataProvider + ?Sized + 'static> Drop for SymbolTracker<P> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Latest price of the polled symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceTick {
    pub symbol: String,
    pub price: Decimal,
    pub at: DateTime<Utc>,
}

/// Publish `tick` unless `generation` has been superseded by a newer `track`.
fn publish_tick(
    latest: &watch::Sender<Option<PriceTick>>,
    current: &AtomicU64,
    generation: u64,
    tick: PriceTick,
) -> bool {
    latest.send_if_modified(|slot| {
        if current.load(Ordering::Acquire) != generation {
            return false;
        }
        *slot = Some(tick);
        true
    })
}

/// Always-on price-only poller. Last write wins.
pub struct PricePoller<P: MarketDataProvider + ?Sized + 'static> {
    provider: Arc<P>,
    period: Duration,
    latest: Arc<watch::Sender<Option<PriceTick>>>,
    generation: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl<P: MarketDataProvider + ?Sized + 'static> PricePoller<P> {
    pub fn new(provider: Arc<P>, period: Duration) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            provider,
            period,
            latest: Arc::new(tx),
            generation: Arc::new(AtomicU64::new(0)),
            handle: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<PriceTick>> {
        self.latest.subscribe()
    }

    pub fn latest(&self) -> Option<PriceTick> {
        self.latest.borrow().clone()
    }

    /// Poll `symbol` from now on, replacing the previous task.
    pub fn track(&mut self, symbol: &str) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        // Bump before the reset so a write from the aborted task is refused.
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.latest.send_replace(None);

        let provider = Arc::clone(&self.provider);
        let latest = Arc::clone(&self.latest);
        let current = Arc::clone(&self.generation);
        let period = self.period;
        let symbol = symbol.to_string();
        self.handle = Some(tokio::spawn(async move {
            loop {
                match provider.ticker(&symbol).await {
                    Ok(ticker) => {
                        let tick = PriceTick {
                            symbol: symbol.clone(),
                            price: ticker.last_price,
                            at: Utc::now(),
                        };
                        publish_tick(&latest, &current, generation, tick);
                    }
                    Err(e) => debug!(%symbol, error = %e, "Price poll failed"),
                }
                tokio::time::sleep(period).await;
            }
        }));
    }
}

impl<P: MarketDataProvider + ?Sized + 'static> Drop for PricePoller<P> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{ExchangeError, MockMarketDataProvider, Ticker};
    use crate::market::Candle;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn candles(n: i64) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let close = dec!(100) + Decimal::from(i % 7);
                Candle::new(i * 60_000, close - dec!(1), close + dec!(1), close - dec!(2), close, dec!(10))
            })
            .collect()
    }

    fn ticker(symbol: &str, price: Decimal) -> Ticker {
        Ticker {
            symbol: symbol.to_string(),
            last_price: price,
            high_price: None,
            low_price: None,
            volume: None,
        }
    }

    fn fast_config() -> AnalysisConfig {
        AnalysisConfig {
            poll_interval_ms: 10,
            ..Default::default()
        }
    }

    async fn wait_for(
        rx: &mut watch::Receiver<TrackerState>,
        pred: impl Fn(&TrackerState) -> bool,
    ) -> TrackerState {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                {
                    let state = rx.borrow_and_update();
                    if pred(&state) {
                        return state.clone();
                    }
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("tracker did not publish in time")
    }

    #[tokio::test]
    async fn test_cycle_uses_ticker_price() {
        let mut provider = MockMarketDataProvider::new();
        provider.expect_klines().returning(|_, _, _| Ok(candles(80)));
        provider
            .expect_ticker()
            .returning(|s| Ok(ticker(s, dec!(104.25))));

        let report = analysis_cycle(&provider, &Analyzer::default(), "BTC-USDT", "1h", 100)
            .await
            .unwrap();
        assert_eq!(report.symbol, "BTC-USDT");
        assert_eq!(report.price, dec!(104.25));
        assert_eq!(report.candle_count, 80);
    }

    #[tokio::test]
    async fn test_tracker_publishes_reports() {
        let mut provider = MockMarketDataProvider::new();
        provider.expect_klines().returning(|_, _, _| Ok(candles(80)));
        provider.expect_ticker().returning(|s| Ok(ticker(s, dec!(101))));

        let mut tracker = SymbolTracker::new(Arc::new(provider), Analyzer::default(), &fast_config());
        let mut rx = tracker.subscribe();
        tracker.track("ETH-USDT", "1h");

        let state = wait_for(&mut rx, |s| s.cycles >= 2).await;
        assert_eq!(state.symbol, "ETH-USDT");
        assert!(state.report.is_some());
        assert!(state.last_error.is_none());
        assert!(tracker.is_active());

        tracker.stop();
        assert!(!tracker.is_active());
    }

    #[tokio::test]
    async fn test_failed_cycle_keeps_last_report() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut provider = MockMarketDataProvider::new();
        provider.expect_klines().returning(move |_, _, _| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(candles(80))
            } else {
                Err(ExchangeError::Http {
                    status: 503,
                    body: "busy".to_string(),
                })
            }
        });
        provider.expect_ticker().returning(|s| Ok(ticker(s, dec!(101))));

        let mut tracker = SymbolTracker::new(Arc::new(provider), Analyzer::default(), &fast_config());
        let mut rx = tracker.subscribe();
        tracker.track("SOL-USDT", "15m");

        let state = wait_for(&mut rx, |s| s.last_error.is_some()).await;
        assert!(state.report.is_some());
        assert!(state.last_error.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_switching_symbol_resets_state() {
        let mut provider = MockMarketDataProvider::new();
        provider.expect_klines().returning(|_, _, _| Ok(candles(80)));
        provider.expect_ticker().returning(|s| Ok(ticker(s, dec!(101))));

        let mut tracker = SymbolTracker::new(Arc::new(provider), Analyzer::default(), &fast_config());
        let mut rx = tracker.subscribe();
        tracker.track("BTC-USDT", "1h");
        wait_for(&mut rx, |s| s.report.is_some()).await;

        tracker.track("XRP-USDT", "4h");
        let state = tracker.state();
        assert_eq!(state.symbol, "XRP-USDT");
        assert_eq!(state.interval, "4h");
        assert!(state.report.is_none());

        let state = wait_for(&mut rx, |s| s.report.is_some()).await;
        assert_eq!(state.report.unwrap().symbol, "XRP-USDT");
    }

    #[tokio::test]
    async fn test_late_write_from_replaced_poll_is_dropped() {
        let mut provider = MockMarketDataProvider::new();
        provider.expect_ticker().returning(|s| Ok(ticker(s, dec!(7))));

        let mut poller = PricePoller::new(Arc::new(provider), Duration::from_millis(10));
        poller.track("OLD-USDT");
        let stale_generation = poller.generation.load(Ordering::Acquire);
        poller.track("NEW-USDT");

        // the aborted task finishing one last poll
        let stale = PriceTick {
            symbol: "OLD-USDT".to_string(),
            price: dec!(1),
            at: Utc::now(),
        };
        assert!(!publish_tick(&poller.latest, &poller.generation, stale_generation, stale));
        assert_ne!(poller.latest().map(|t| t.symbol).as_deref(), Some("OLD-USDT"));

        let mut rx = poller.subscribe();
        tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|t| t.as_ref().is_some_and(|t| t.symbol == "NEW-USDT")),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(poller.latest().unwrap().price, dec!(7));
    }

    #[tokio::test]
    async fn test_price_poller_publishes_latest() {
        let mut provider = MockMarketDataProvider::new();
        provider.expect_ticker().returning(|s| Ok(ticker(s, dec!(2.5))));

        let mut poller = PricePoller::new(Arc::new(provider), Duration::from_millis(10));
        let mut rx = poller.subscribe();
        poller.track("DOGE-USDT");

        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|t| t.is_some()))
            .await
            .unwrap()
            .unwrap();
        let tick = poller.latest().unwrap();
        assert_eq!(tick.symbol, "DOGE-USDT");
        assert_eq!(tick.price, dec!(2.5));
    }
}
