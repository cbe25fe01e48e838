//! Momentum oscillators: RSI and Aroon.

use super::common_len;
use crate::utils::decimal::div;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Aroon up/down pair, both in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Aroon {
    pub up: Decimal,
    pub down: Decimal,
}

/// Relative Strength Index with Wilder smoothing.
///
/// Needs `period + 1` closes. Returns exactly 100 when the smoothed loss is zero.
pub fn rsi(closes: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let len = Decimal::from(period as u64);
    let carry = Decimal::from(period as u64 - 1);

    let mut gain = Decimal::ZERO;
    let mut loss = Decimal::ZERO;
    for w in closes[..=period].windows(2) {
        let change = w[1] - w[0];
        if change > Decimal::ZERO {
            gain += change;
        } else {
            loss += change.abs();
        }
    }

    let mut avg_gain = div(gain, len);
    let mut avg_loss = div(loss, len);

    for w in closes[period..].windows(2) {
        let change = w[1] - w[0];
        let up = change.max(Decimal::ZERO);
        let down = (-change).max(Decimal::ZERO);
        avg_gain = div(avg_gain * carry + up, len);
        avg_loss = div(avg_loss * carry + down, len);
    }

    if avg_loss.is_zero() {
        return Some(dec!(100));
    }

    let rs = div(avg_gain, avg_loss);
    Some(dec!(100) - div(dec!(100), Decimal::ONE + rs))
}

/// Aroon over the last `period + 1` bars.
///
/// Ties resolve to the oldest bar holding the extreme.
pub fn aroon(highs: &[Decimal], lows: &[Decimal], period: usize) -> Option<Aroon> {
    let n = common_len(&[highs, lows])?;
    if period == 0 || n < period + 1 {
        return None;
    }

    let start = n - period - 1;
    let mut high_idx = 0usize;
    let mut low_idx = 0usize;
    for i in 1..=period {
        if highs[start + i] > highs[start + high_idx] {
            high_idx = i;
        }
        if lows[start + i] < lows[start + low_idx] {
            low_idx = i;
        }
    }

    // `idx` bars from the window start means `period - idx` bars since the extreme.
    let len = Decimal::from(period as u64);
    Some(Aroon {
        up: div(Decimal::from(high_idx as u64), len) * dec!(100),
        down: div(Decimal::from(low_idx as u64), len) * dec!(100),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize, step: i64) -> Vec<Decimal> {
        (0..n as i64).map(|i| dec!(1000) + Decimal::from(i * step)).collect()
    }

    #[test]
    fn test_rsi_insufficient_data() {
        assert_eq!(rsi(&ramp(14, 1), 14), None);
        assert!(rsi(&ramp(15, 1), 14).is_some());
    }

    #[test]
    fn test_rsi_is_100_without_losses() {
        assert_eq!(rsi(&ramp(60, 1), 14), Some(dec!(100)));
        // flat series has no loss either
        assert_eq!(rsi(&vec![dec!(5); 30], 14), Some(dec!(100)));
    }

    #[test]
    fn test_rsi_is_zero_without_gains() {
        assert_eq!(rsi(&ramp(60, -1), 14), Some(Decimal::ZERO));
    }

    #[test]
    fn test_rsi_stays_within_bounds() {
        let closes: Vec<Decimal> = (0..200)
            .map(|i| dec!(100) + Decimal::from((i * 37) % 11) - Decimal::from((i * 13) % 7))
            .collect();
        for end in 15..=closes.len() {
            let value = rsi(&closes[..end], 14).unwrap();
            assert!(value >= Decimal::ZERO && value <= dec!(100), "rsi {} out of bounds", value);
        }
    }

    #[test]
    fn test_rsi_balanced_moves_near_fifty() {
        let closes: Vec<Decimal> = (0..40)
            .map(|i| if i % 2 == 0 { dec!(100) } else { dec!(101) })
            .collect();
        let value = rsi(&closes, 14).unwrap();
        assert!(value > dec!(40) && value < dec!(60));
    }

    #[test]
    fn test_aroon_uptrend() {
        let highs = ramp(30, 1);
        let lows = ramp(30, 1);
        let a = aroon(&highs, &lows, 14).unwrap();
        assert_eq!(a.up, dec!(100));
        assert_eq!(a.down, Decimal::ZERO);
    }

    #[test]
    fn test_aroon_downtrend() {
        let highs = ramp(30, -1);
        let lows = ramp(30, -1);
        let a = aroon(&highs, &lows, 14).unwrap();
        assert_eq!(a.up, Decimal::ZERO);
        assert_eq!(a.down, dec!(100));
    }

    #[test]
    fn test_aroon_requires_window_and_aligned_inputs() {
        assert!(aroon(&ramp(14, 1), &ramp(14, 1), 14).is_none());
        assert!(aroon(&ramp(20, 1), &ramp(19, 1), 14).is_none());
    }
}
