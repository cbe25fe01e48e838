//! OHLCV candles and chronological series handling.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A single OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time in epoch milliseconds
    pub open_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    pub fn new(
        open_time: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// `high >= max(open, close)` and `low <= min(open, close)`.
    pub fn is_well_formed(&self) -> bool {
        self.high >= self.open.max(self.close) && self.low <= self.open.min(self.close)
    }

    /// Absolute body size.
    pub fn body(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Reorder a raw feed oldest-first.
///
/// Feeds may arrive newest-first or unordered. Bars are sorted by open time,
/// duplicate open times keep the last occurrence, and bars violating the
/// high/low invariant are dropped.
pub fn into_chronological(mut candles: Vec<Candle>) -> Vec<Candle> {
    let before = candles.len();
    candles.retain(Candle::is_well_formed);
    if candles.len() != before {
        warn!(
            dropped = before - candles.len(),
            "Dropped malformed candles from feed"
        );
    }

    // Stable sort keeps feed order among equal timestamps, so the later
    // duplicate survives the dedup below.
    candles.sort_by_key(|c| c.open_time);
    let mut ordered: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        match ordered.last_mut() {
            Some(last) if last.open_time == candle.open_time => *last = candle,
            _ => ordered.push(candle),
        }
    }
    ordered
}

/// Column views over an oldest-first candle slice.
#[derive(Debug, Clone, Default)]
pub struct SeriesColumns {
    pub opens: Vec<Decimal>,
    pub highs: Vec<Decimal>,
    pub lows: Vec<Decimal>,
    pub closes: Vec<Decimal>,
    pub volumes: Vec<Decimal>,
}

impl SeriesColumns {
    pub fn from_candles(candles: &[Candle]) -> Self {
        let mut cols = Self {
            opens: Vec::with_capacity(candles.len()),
            highs: Vec::with_capacity(candles.len()),
            lows: Vec::with_capacity(candles.len()),
            closes: Vec::with_capacity(candles.len()),
            volumes: Vec::with_capacity(candles.len()),
        };
        for c in candles {
            cols.opens.push(c.open);
            cols.highs.push(c.high);
            cols.lows.push(c.low);
            cols.closes.push(c.close);
            cols.volumes.push(c.volume);
        }
        cols
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}
