//! Simple, exponential and Wilder-smoothed moving averages.

use crate::utils::decimal::{div, mean};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Simple moving average of the last `period` values.
pub fn sma(series: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || series.len() < period {
        return None;
    }
    mean(&series[series.len() - period..])
}

/// Exponential moving average, seeded with the SMA of the first `period` values.
///
/// `ema[i] = ema[i-1] + (price[i] - ema[i-1]) * 2 / (period + 1)`
pub fn ema(series: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || series.len() < period {
        return None;
    }

    let mut value = mean(&series[..period])?;
    let denominator = Decimal::from(period as u64 + 1);
    for price in &series[period..] {
        value += div((*price - value) * dec!(2), denominator);
    }
    Some(value)
}

/// Wilder / SMMA smoothing over the whole input.
///
/// The first output is the plain average of the first `period` values, every
/// following one is `(prev * (period - 1) + x) / period`. The result has
/// `data.len() - period + 1` entries, or none when the input is too short.
pub fn smoothed_series(data: &[Decimal], period: usize) -> Vec<Decimal> {
    if period == 0 || data.len() < period {
        return Vec::new();
    }

    let len = Decimal::from(period as u64);
    let carry = Decimal::from(period as u64 - 1);

    let mut out = Vec::with_capacity(data.len() - period + 1);
    let mut prev = div(data[..period].iter().copied().sum(), len);
    out.push(prev);
    for x in &data[period..] {
        prev = div(prev * carry + *x, len);
        out.push(prev);
    }
    out
}
