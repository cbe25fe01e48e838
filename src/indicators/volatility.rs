//! Range-based indicators: ATR and ADX/DMI.

use super::common_len;
use super::moving_average::smoothed_series;
use crate::utils::decimal::{div, mean};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Directional movement readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dmi {
    pub adx: Decimal,
    pub plus_di: Decimal,
    pub minus_di: Decimal,
}

/// True range of every bar after the first.
fn true_ranges(highs: &[Decimal], lows: &[Decimal], closes: &[Decimal]) -> Vec<Decimal> {
    (1..closes.len())
        .map(|i| {
            let prev_close = closes[i - 1];
            (highs[i] - lows[i])
                .max((highs[i] - prev_close).abs())
                .max((lows[i] - prev_close).abs())
        })
        .collect()
}

/// Average True Range: simple mean of the last `period` true ranges.
pub fn atr(highs: &[Decimal], lows: &[Decimal], closes: &[Decimal], period: usize) -> Option<Decimal> {
    let n = common_len(&[highs, lows, closes])?;
    if period == 0 || n < period + 1 {
        return None;
    }

    let trs = true_ranges(highs, lows, closes);
    mean(&trs[trs.len() - period..])
}

/// ADX with +DI / -DI, all Wilder-smoothed.
///
/// Needs `2 * period` bars. Returns `None` when the range is flat for so long
/// that no DX value can be formed.
pub fn dmi(highs: &[Decimal], lows: &[Decimal], closes: &[Decimal], period: usize) -> Option<Dmi> {
    let n = common_len(&[highs, lows, closes])?;
    if period == 0 || n < period * 2 {
        return None;
    }

    let trs = true_ranges(highs, lows, closes);
    let mut plus_dm = Vec::with_capacity(n - 1);
    let mut minus_dm = Vec::with_capacity(n - 1);
    for i in 1..n {
        let up_move = highs[i] - highs[i - 1];
        let down_move = lows[i - 1] - lows[i];
        plus_dm.push(if up_move > down_move && up_move > Decimal::ZERO {
            up_move
        } else {
            Decimal::ZERO
        });
        minus_dm.push(if down_move > up_move && down_move > Decimal::ZERO {
            down_move
        } else {
            Decimal::ZERO
        });
    }

    let smoothed_tr = smoothed_series(&trs, period);
    let smoothed_plus = smoothed_series(&plus_dm, period);
    let smoothed_minus = smoothed_series(&minus_dm, period);

    let mut dx = Vec::with_capacity(smoothed_tr.len());
    let mut last_di = None;
    for ((tr, p), m) in smoothed_tr.iter().zip(&smoothed_plus).zip(&smoothed_minus) {
        if tr.is_zero() {
            continue;
        }
        let plus_di = div(*p, *tr) * dec!(100);
        let minus_di = div(*m, *tr) * dec!(100);
        last_di = Some((plus_di, minus_di));

        let di_sum = plus_di + minus_di;
        if di_sum > Decimal::ZERO {
            dx.push(div((plus_di - minus_di).abs(), di_sum) * dec!(100));
        }
    }

    let adx = *smoothed_series(&dx, period).last()?;
    let (plus_di, minus_di) = last_di?;
    Some(Dmi {
        adx,
        plus_di,
        minus_di,
    })
}
