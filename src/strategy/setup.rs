//! Entry / take-profit / stop-loss calculators.
//!
//! Levels stay typed decimals all the way through; formatting happens only at
//! the display and order-payload boundaries.

use super::consensus::{ConsensusVerdict, TrendLabel};
use super::smc::SmcScan;
use crate::indicators::IndicatorSnapshot;
use crate::utils::decimal::format_price;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Candles the hybrid strategy needs for a stable EMA200.
pub const HYBRID_MIN_CANDLES: usize = 200;

/// Stop distance of the ATR ladder, in ATRs.
pub const LADDER_STOP_ATR: Decimal = dec!(2);
/// Default target distance of the ATR ladder, in ATRs.
pub const LADDER_TARGET_ATR: Decimal = dec!(4);

const HYBRID_STOP_ATR: Decimal = dec!(1.5);
const HYBRID_TARGET_ATR: Decimal = dec!(4);
/// Max distance from EMA200 that still counts as a pullback entry.
const PULLBACK_BAND: Decimal = dec!(0.02);
const RSI_OVERSOLD: Decimal = dec!(40);
const RSI_OVERBOUGHT: Decimal = dec!(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeSide {
    Long,
    Short,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Long => write!(f, "LONG"),
            TradeSide::Short => write!(f, "SHORT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryReason {
    /// Enter at the current price.
    Market,
    /// Rest a limit at an unmitigated order block.
    OrderBlock,
    /// Price pulled back close to EMA200 within the trend.
    TrendPullback,
    /// RSI stretched against the prevailing trend.
    RsiExtreme,
}

impl fmt::Display for EntryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryReason::Market => write!(f, "market"),
            EntryReason::OrderBlock => write!(f, "order block"),
            EntryReason::TrendPullback => write!(f, "EMA200 pullback"),
            EntryReason::RsiExtreme => write!(f, "RSI extreme"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TradeSetup {
    pub side: TradeSide,
    pub entry_price: Decimal,
    pub entry_reason: EntryReason,
    pub take_profit: Decimal,
    pub stop_loss: Decimal,
}

impl TradeSetup {
    fn around(side: TradeSide, entry: Decimal, reason: EntryReason, stop: Decimal, target: Decimal) -> Self {
        let (take_profit, stop_loss) = match side {
            TradeSide::Long => (entry + target, entry - stop),
            TradeSide::Short => (entry - target, entry + stop),
        };
        Self {
            side,
            entry_price: entry,
            entry_reason: reason,
            take_profit,
            stop_loss,
        }
    }

    /// Both protective levels strictly positive and on the correct side of
    /// the entry.
    pub fn has_valid_levels(&self) -> bool {
        if self.take_profit <= Decimal::ZERO || self.stop_loss <= Decimal::ZERO {
            return false;
        }
        match self.side {
            TradeSide::Long => self.stop_loss < self.entry_price && self.entry_price < self.take_profit,
            TradeSide::Short => self.take_profit < self.entry_price && self.entry_price < self.stop_loss,
        }
    }
}

impl fmt::Display for TradeSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entry {} ({}) TP {} SL {}",
            self.side,
            format_price(self.entry_price),
            self.entry_reason,
            format_price(self.take_profit),
            format_price(self.stop_loss)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SetupOutcome {
    Ready(TradeSetup),
    NoTrade,
    InsufficientData,
}

impl SetupOutcome {
    pub fn setup(&self) -> Option<&TradeSetup> {
        match self {
            SetupOutcome::Ready(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for SetupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupOutcome::Ready(s) => write!(f, "{}", s),
            SetupOutcome::NoTrade => write!(f, "no trade"),
            SetupOutcome::InsufficientData => write!(f, "insufficient data"),
        }
    }
}

/// Which setup calculator the analyzer runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetupStrategy {
    #[default]
    Ladder,
    Hybrid,
}

/// ATR ladder following the consensus direction.
///
/// Long entries snap to the active bullish order block when it sits below the
/// current price, shorts to the active bearish block above it. Stops and
/// targets are measured from the entry.
pub fn atr_ladder_setup(
    price: Decimal,
    atr: Option<Decimal>,
    verdict: &ConsensusVerdict,
    order_blocks: &SmcScan,
    target_atr_multiple: Decimal,
) -> SetupOutcome {
    let Some(atr) = atr else {
        return SetupOutcome::InsufficientData;
    };
    if price <= Decimal::ZERO {
        return SetupOutcome::NoTrade;
    }

    let side = match verdict.trend {
        TrendLabel::StrongUp => TradeSide::Long,
        TrendLabel::StrongDown => TradeSide::Short,
        TrendLabel::Sideways => return SetupOutcome::NoTrade,
    };

    let snapped = match side {
        TradeSide::Long => order_blocks
            .bullish()
            .map(|ob| ob.entry_price())
            .filter(|entry| *entry < price),
        TradeSide::Short => order_blocks
            .bearish()
            .map(|ob| ob.entry_price())
            .filter(|entry| *entry > price),
    };
    let (entry, reason) = match snapped {
        Some(level) => (level, EntryReason::OrderBlock),
        None => (price, EntryReason::Market),
    };

    SetupOutcome::Ready(TradeSetup::around(
        side,
        entry,
        reason,
        atr * LADDER_STOP_ATR,
        atr * target_atr_multiple,
    ))
}

/// Trend-filtered setup: only trade with the EMA200 side.
///
/// In an uptrend a long is proposed when price sits within 2% above EMA200 or
/// RSI is below 40; downtrends mirror that with RSI above 60. Price exactly on
/// EMA200 is neither trend.
pub fn hybrid_setup(candle_count: usize, price: Decimal, snapshot: &IndicatorSnapshot) -> SetupOutcome {
    if candle_count < HYBRID_MIN_CANDLES {
        return SetupOutcome::InsufficientData;
    }
    let (Some(ema200), Some(rsi), Some(atr)) = (snapshot.ema200, snapshot.rsi, snapshot.atr) else {
        return SetupOutcome::InsufficientData;
    };

    let (side, reason) = if price > ema200 {
        if price <= ema200 * (Decimal::ONE + PULLBACK_BAND) {
            (TradeSide::Long, EntryReason::TrendPullback)
        } else if rsi < RSI_OVERSOLD {
            (TradeSide::Long, EntryReason::RsiExtreme)
        } else {
            return SetupOutcome::NoTrade;
        }
    } else if price < ema200 {
        if price >= ema200 * (Decimal::ONE - PULLBACK_BAND) {
            (TradeSide::Short, EntryReason::TrendPullback)
        } else if rsi > RSI_OVERBOUGHT {
            (TradeSide::Short, EntryReason::RsiExtreme)
        } else {
            return SetupOutcome::NoTrade;
        }
    } else {
        return SetupOutcome::NoTrade;
    };

    SetupOutcome::Ready(TradeSetup::around(
        side,
        price,
        reason,
        atr * HYBRID_STOP_ATR,
        atr * HYBRID_TARGET_ATR,
    ))
}
