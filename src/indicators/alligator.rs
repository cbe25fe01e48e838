//! Williams Alligator.

use super::moving_average::smoothed_series;
use rust_decimal::Decimal;
use serde::Serialize;

const JAW_PERIOD: usize = 13;
const TEETH_PERIOD: usize = 8;
const LIPS_PERIOD: usize = 5;

const JAW_SHIFT: usize = 8;
const TEETH_SHIFT: usize = 5;
const LIPS_SHIFT: usize = 3;

/// Minimum closes for a reading.
pub const ALLIGATOR_MIN_BARS: usize = 25;

/// The three Alligator lines as seen on the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlligatorLines {
    pub jaw: Decimal,
    pub teeth: Decimal,
    pub lips: Decimal,
}

impl AlligatorLines {
    /// Mouth open upward: lips above teeth above jaw.
    pub fn is_bullish(&self) -> bool {
        self.lips > self.teeth && self.teeth > self.jaw
    }

    /// Mouth open downward: jaw above teeth above lips.
    pub fn is_bearish(&self) -> bool {
        self.jaw > self.teeth && self.teeth > self.lips
    }
}

/// SMMA lines of period 13/8/5, each read 8/5/3 bars back to mimic the
/// forward-plotted chart lines.
pub fn alligator(closes: &[Decimal]) -> Option<AlligatorLines> {
    if closes.len() < ALLIGATOR_MIN_BARS {
        return None;
    }

    let shifted = |period: usize, shift: usize| -> Option<Decimal> {
        let series = smoothed_series(closes, period);
        series.len().checked_sub(shift + 1).map(|i| series[i])
    };

    Some(AlligatorLines {
        jaw: shifted(JAW_PERIOD, JAW_SHIFT)?,
        teeth: shifted(TEETH_PERIOD, TEETH_SHIFT)?,
        lips: shifted(LIPS_PERIOD, LIPS_SHIFT)?,
    })
}
