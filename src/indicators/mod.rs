//! Technical indicator library.
//!
//! Stateless functions over oldest-first decimal series. Every function
//! returns `None` when its input is shorter than the required lookback (or
//! the input columns have different lengths); nothing here panics or errors.
//!
//! - `moving_average`: SMA, EMA, Wilder/SMMA smoothing
//! - `momentum`: RSI, Aroon
//! - `volatility`: ATR, ADX/DMI
//! - `alligator`: Williams Alligator
//! - `volume`: MFI, CMF, OBV
//! - `snapshot`: all of the above computed for one analysis cycle

mod alligator;
mod momentum;
mod moving_average;
mod snapshot;
mod volatility;
mod volume;

pub use alligator::{alligator, AlligatorLines, ALLIGATOR_MIN_BARS};
pub use momentum::{aroon, rsi, Aroon};
pub use moving_average::{ema, sma, smoothed_series};
pub use snapshot::IndicatorSnapshot;
pub use volatility::{atr, dmi, Dmi};
pub use volume::{cmf, mfi, obv, Obv, OBV_SIGNAL_PERIOD};

use rust_decimal::Decimal;

pub const RSI_PERIOD: usize = 14;
pub const ATR_PERIOD: usize = 14;
pub const ADX_PERIOD: usize = 14;
pub const AROON_PERIOD: usize = 14;
pub const MFI_PERIOD: usize = 14;
pub const CMF_PERIOD: usize = 20;

/// Shared length of the given columns, `None` if they disagree.
fn common_len(columns: &[&[Decimal]]) -> Option<usize> {
    let first = columns.first()?.len();
    columns.iter().all(|c| c.len() == first).then_some(first)
}
