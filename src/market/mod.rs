//! Market data value types shared by the indicator library and strategies.

mod candle;

pub use candle::{into_chronological, Candle, SeriesColumns};
