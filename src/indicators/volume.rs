//! Volume-weighted indicators: MFI, CMF and OBV.

use super::common_len;
use super::moving_average::sma;
use crate::utils::decimal::div;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Period of the OBV signal line.
pub const OBV_SIGNAL_PERIOD: usize = 20;

/// On-balance volume and its moving-average signal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Obv {
    pub value: Decimal,
    pub signal: Decimal,
}

fn typical_price(high: Decimal, low: Decimal, close: Decimal) -> Decimal {
    div(high + low + close, dec!(3))
}

/// Money Flow Index over the last `period` bars.
///
/// Returns 100 when there is no negative flow in the window.
pub fn mfi(
    highs: &[Decimal],
    lows: &[Decimal],
    closes: &[Decimal],
    volumes: &[Decimal],
    period: usize,
) -> Option<Decimal> {
    let n = common_len(&[highs, lows, closes, volumes])?;
    if period == 0 || n < period + 1 {
        return None;
    }

    let mut positive = Decimal::ZERO;
    let mut negative = Decimal::ZERO;
    for i in n - period..n {
        let tp = typical_price(highs[i], lows[i], closes[i]);
        let prev_tp = typical_price(highs[i - 1], lows[i - 1], closes[i - 1]);
        let raw_flow = tp * volumes[i];
        if tp > prev_tp {
            positive += raw_flow;
        } else if tp < prev_tp {
            negative += raw_flow;
        }
    }

    if negative.is_zero() {
        return Some(dec!(100));
    }
    let ratio = div(positive, negative);
    Some(dec!(100) - div(dec!(100), Decimal::ONE + ratio))
}

/// Chaikin Money Flow over the last `period` bars.
///
/// Bars with `high == low` carry no multiplier and are skipped entirely.
pub fn cmf(
    highs: &[Decimal],
    lows: &[Decimal],
    closes: &[Decimal],
    volumes: &[Decimal],
    period: usize,
) -> Option<Decimal> {
    let n = common_len(&[highs, lows, closes, volumes])?;
    if period == 0 || n < period {
        return None;
    }

    let mut flow = Decimal::ZERO;
    let mut volume = Decimal::ZERO;
    for i in n - period..n {
        let range = highs[i] - lows[i];
        if range.is_zero() {
            continue;
        }
        let multiplier = div((closes[i] - lows[i]) - (highs[i] - closes[i]), range);
        flow += multiplier * volumes[i];
        volume += volumes[i];
    }

    if volume.is_zero() {
        return Some(Decimal::ZERO);
    }
    Some(div(flow, volume))
}

/// On-balance volume with a 20-bar SMA signal line.
///
/// While fewer than 20 OBV points exist the signal equals the OBV itself.
pub fn obv(closes: &[Decimal], volumes: &[Decimal]) -> Option<Obv> {
    let n = common_len(&[closes, volumes])?;
    if n == 0 {
        return None;
    }

    let mut series = Vec::with_capacity(n);
    let mut running = Decimal::ZERO;
    series.push(running);
    for i in 1..n {
        if closes[i] > closes[i - 1] {
            running += volumes[i];
        } else if closes[i] < closes[i - 1] {
            running -= volumes[i];
        }
        series.push(running);
    }

    let value = running;
    let signal = sma(&series, OBV_SIGNAL_PERIOD).unwrap_or(value);
    Some(Obv { value, signal })
}
