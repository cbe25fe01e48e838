//! Market scanner: rank top movers, then batch-analyse them for setups.

use super::analyzer::Analyzer;
use super::consensus::TrendLabel;
use super::setup::{SetupOutcome, TradeSide};
use super::smc::SMC_WINDOW;
use crate::config::ScanConfig;
use crate::exchange::{ExchangeError, MarketDataProvider, MarketTicker};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("a market scan is already running")]
    AlreadyRunning,

    #[error("failed to fetch market tickers: {0}")]
    Exchange(#[from] ExchangeError),
}

/// Top gainers and losers of one ticker batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Movers {
    pub gainers: Vec<MarketTicker>,
    pub losers: Vec<MarketTicker>,
}

impl Movers {
    /// Gainers then losers, each symbol once.
    pub fn candidates(&self) -> Vec<&MarketTicker> {
        let mut seen = HashSet::new();
        self.gainers
            .iter()
            .chain(self.losers.iter())
            .filter(|t| seen.insert(t.symbol.as_str()))
            .collect()
    }
}

/// Filter to the settlement currency and take the `top_n` biggest moves each way.
///
/// Rows whose percent change cannot be parsed are dropped rather than sorted
/// to either end.
pub fn rank_movers(tickers: &[MarketTicker], quote_suffix: &str, top_n: usize) -> Movers {
    let mut ranked: Vec<(Decimal, &MarketTicker)> = tickers
        .iter()
        .filter(|t| t.symbol.ends_with(quote_suffix))
        .filter_map(|t| t.percent_change().map(|pct| (pct, t)))
        .collect();

    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    let gainers = ranked.iter().take(top_n).map(|(_, t)| (*t).clone()).collect();
    let losers = ranked.iter().rev().take(top_n).map(|(_, t)| (*t).clone()).collect();

    Movers { gainers, losers }
}

/// A candidate whose pipeline produced a complete setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeOpportunity {
    pub symbol: String,
    pub side: TradeSide,
    pub entry_price: Decimal,
    pub take_profit: Decimal,
    pub stop_loss: Decimal,
    pub trend: TrendLabel,
    /// Consensus votes agreeing with `side` (0-6)
    pub score: usize,
}

/// Clears the running flag when a scan ends, including on early return.
struct ScanGuard<'a>(&'a AtomicBool);

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sequential batch analyser. At most one scan runs at a time per scanner.
pub struct OpportunityScanner {
    config: ScanConfig,
    analyzer: Analyzer,
    running: AtomicBool,
}

impl OpportunityScanner {
    pub fn new(config: ScanConfig, analyzer: Analyzer) -> Self {
        Self {
            config,
            analyzer,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<ScanGuard<'_>, ScanError> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ScanError::AlreadyRunning)?;
        Ok(ScanGuard(&self.running))
    }

    /// Fetch all tickers and rank them.
    pub async fn movers<P: MarketDataProvider + ?Sized>(&self, provider: &P) -> Result<Movers, ScanError> {
        let tickers = provider.market_tickers().await?;
        Ok(rank_movers(&tickers, &self.config.quote_suffix, self.config.top_n))
    }

    /// Rank movers and run the full analysis on each liquid candidate, one at a
    /// time, pausing between requests. Per-candidate failures are logged and
    /// skipped.
    #[instrument(skip(self, provider))]
    pub async fn scan<P: MarketDataProvider + ?Sized>(&self, provider: &P) -> Result<Vec<TradeOpportunity>, ScanError> {
        let _guard = self.begin()?;

        let movers = self.movers(provider).await?;
        let candidates = movers.candidates();
        info!(
            gainers = movers.gainers.len(),
            losers = movers.losers.len(),
            candidates = candidates.len(),
            "Ranked market movers"
        );

        let mut found = Vec::new();
        let mut skipped_illiquid = 0usize;
        let mut failed = 0usize;

        for (i, ticker) in candidates.iter().enumerate() {
            let symbol = ticker.symbol.as_str();
            let volume = ticker.quote_volume();
            if volume < self.config.min_quote_volume {
                debug!(%symbol, %volume, "Skipping illiquid symbol");
                skipped_illiquid += 1;
                continue;
            }

            if i > 0 {
                tokio::time::sleep(self.config.request_delay()).await;
            }

            let candles = match provider
                .klines(symbol, &self.config.interval, self.config.kline_limit)
                .await
            {
                Ok(c) => c,
                Err(e) => {
                    warn!(%symbol, error = %e, "Failed to fetch candles");
                    failed += 1;
                    continue;
                }
            };
            if candles.len() <= SMC_WINDOW {
                debug!(%symbol, candles = candles.len(), "Not enough history");
                continue;
            }

            let price = match ticker.last_price().or_else(|| candles.last().map(|c| c.close)) {
                Some(p) if p > Decimal::ZERO => p,
                _ => continue,
            };

            let report = self.analyzer.analyze(symbol, &candles, price);
            if let SetupOutcome::Ready(setup) = report.setup {
                if !setup.has_valid_levels() {
                    continue;
                }
                let score = match setup.side {
                    TradeSide::Long => report.verdict.long_votes,
                    TradeSide::Short => report.verdict.short_votes,
                };
                info!(%symbol, side = %setup.side, score, "Opportunity found");
                found.push(TradeOpportunity {
                    symbol: symbol.to_string(),
                    side: setup.side,
                    entry_price: setup.entry_price,
                    take_profit: setup.take_profit,
                    stop_loss: setup.stop_loss,
                    trend: report.verdict.trend,
                    score,
                });
            }
        }

        found.sort_by(|a, b| b.score.cmp(&a.score));
        info!(
            opportunities = found.len(),
            skipped_illiquid,
            failed,
            "Market scan complete"
        );
        Ok(found)
    }
}
