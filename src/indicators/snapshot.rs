//! Per-cycle indicator snapshot.

use super::*;
use crate::market::{Candle, SeriesColumns};
use rust_decimal::Decimal;
use serde::Serialize;

/// Every indicator the consensus and setup logic reads, computed once per
/// analysis cycle. A `None` field means the series was too short for it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndicatorSnapshot {
    pub ema21: Option<Decimal>,
    pub ema50: Option<Decimal>,
    pub ema200: Option<Decimal>,
    pub rsi: Option<Decimal>,
    pub atr: Option<Decimal>,
    pub dmi: Option<Dmi>,
    pub alligator: Option<AlligatorLines>,
    pub aroon: Option<Aroon>,
    pub mfi: Option<Decimal>,
    pub cmf: Option<Decimal>,
    pub obv: Option<Obv>,
}

impl IndicatorSnapshot {
    /// Compute from an oldest-first candle series.
    pub fn compute(candles: &[Candle]) -> Self {
        let cols = SeriesColumns::from_candles(candles);
        Self::from_columns(&cols)
    }

    pub fn from_columns(cols: &SeriesColumns) -> Self {
        let (h, l, c, v) = (&cols.highs, &cols.lows, &cols.closes, &cols.volumes);
        Self {
            ema21: ema(c, 21),
            ema50: ema(c, 50),
            ema200: ema(c, 200),
            rsi: rsi(c, RSI_PERIOD),
            atr: atr(h, l, c, ATR_PERIOD),
            dmi: dmi(h, l, c, ADX_PERIOD),
            alligator: alligator(c),
            aroon: aroon(h, l, AROON_PERIOD),
            mfi: mfi(h, l, c, v, MFI_PERIOD),
            cmf: cmf(h, l, c, v, CMF_PERIOD),
            obv: obv(c, v),
        }
    }
}
