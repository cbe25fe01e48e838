//! One analysis cycle: indicators, consensus, SMC levels and a setup.

use super::consensus::{evaluate, ConsensusVerdict};
use super::setup::{atr_ladder_setup, hybrid_setup, SetupOutcome, SetupStrategy, LADDER_TARGET_ATR};
use super::smc::{find_fair_value_gap, find_order_block, SmcScan};
use crate::config::AnalysisConfig;
use crate::indicators::IndicatorSnapshot;
use crate::market::Candle;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Everything published for a symbol after one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub symbol: String,
    pub price: Decimal,
    pub candle_count: usize,
    pub snapshot: IndicatorSnapshot,
    pub verdict: ConsensusVerdict,
    pub order_blocks: SmcScan,
    pub fair_value_gaps: SmcScan,
    pub setup: SetupOutcome,
    pub generated_at: DateTime<Utc>,
}

impl AnalysisReport {
    /// Coarse RSI reading for display.
    pub fn rsi_status(&self) -> String {
        match self.snapshot.rsi {
            Some(rsi) if rsi >= dec!(70) => format!("{} (overbought)", rsi.round_dp(2)),
            Some(rsi) if rsi <= dec!(30) => format!("{} (oversold)", rsi.round_dp(2)),
            Some(rsi) => format!("{} (neutral)", rsi.round_dp(2)),
            None => "n/a".to_string(),
        }
    }
}

/// Stateless pipeline from an oldest-first candle series to a report.
#[derive(Debug, Clone, Copy)]
pub struct Analyzer {
    strategy: SetupStrategy,
    target_atr_multiple: Decimal,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self {
            strategy: SetupStrategy::Ladder,
            target_atr_multiple: LADDER_TARGET_ATR,
        }
    }
}

impl Analyzer {
    pub fn new(strategy: SetupStrategy, target_atr_multiple: Decimal) -> Self {
        Self {
            strategy,
            target_atr_multiple,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.strategy, config.target_atr_multiple)
    }

    pub fn with_strategy(mut self, strategy: SetupStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> SetupStrategy {
        self.strategy
    }

    /// Run the full pipeline. `price` is the live ticker price, which may
    /// differ from the last close.
    pub fn analyze(&self, symbol: &str, candles: &[Candle], price: Decimal) -> AnalysisReport {
        let snapshot = IndicatorSnapshot::compute(candles);
        let verdict = evaluate(&snapshot);
        let order_blocks = find_order_block(candles);
        let fair_value_gaps = find_fair_value_gap(candles);

        let setup = match self.strategy {
            SetupStrategy::Ladder => atr_ladder_setup(
                price,
                snapshot.atr,
                &verdict,
                &order_blocks,
                self.target_atr_multiple,
            ),
            SetupStrategy::Hybrid => hybrid_setup(candles.len(), price, &snapshot),
        };

        AnalysisReport {
            symbol: symbol.to_string(),
            price,
            candle_count: candles.len(),
            snapshot,
            verdict,
            order_blocks,
            fair_value_gaps,
            setup,
            generated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::consensus::TrendLabel;
    use crate::strategy::setup::TradeSide;

    fn trend(n: usize, step: i64) -> Vec<Candle> {
        (0..n as i64)
            .map(|i| {
                let close = dec!(1000) + Decimal::from(i * step);
                let open = close - Decimal::from(step);
                Candle::new(
                    i * 60_000,
                    open,
                    open.max(close) + dec!(0.5),
                    open.min(close) - dec!(0.5),
                    close,
                    dec!(100) + Decimal::from(i),
                )
            })
            .collect()
    }

    #[test]
    fn test_short_history_reports_insufficient_data() {
        let candles = trend(10, 1);
        let report = Analyzer::default().analyze("BTC-USDT", &candles, dec!(1010));
        assert_eq!(report.order_blocks, SmcScan::InsufficientData);
        assert_eq!(report.fair_value_gaps, SmcScan::InsufficientData);
        assert_eq!(report.setup, SetupOutcome::InsufficientData);
        assert_eq!(report.rsi_status(), "n/a");
    }

    #[test]
    fn test_uptrend_produces_long_ladder() {
        let candles = trend(300, 2);
        let price = candles[299].close;
        let report = Analyzer::default().analyze("ETH-USDT", &candles, price);
        assert_eq!(report.verdict.trend, TrendLabel::StrongUp);
        let setup = report.setup.setup().copied().unwrap();
        assert_eq!(setup.side, TradeSide::Long);
        assert!(setup.has_valid_levels());
        assert!(setup.take_profit > price && setup.stop_loss < setup.entry_price);
        assert!(report.rsi_status().ends_with("(overbought)"));
    }

    #[test]
    fn test_hybrid_strategy_is_selectable() {
        let candles = trend(150, 1);
        let analyzer = Analyzer::default().with_strategy(SetupStrategy::Hybrid);
        let report = analyzer.analyze("SOL-USDT", &candles, dec!(1149));
        assert_eq!(report.setup, SetupOutcome::InsufficientData);
    }
}
