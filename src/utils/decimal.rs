//! Decimal arithmetic utilities for indicator math and price formatting.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Fractional digits kept after every division in the indicator library.
pub const WORKING_SCALE: u32 = 10;

/// Divide and round half-up to [`WORKING_SCALE`] digits.
///
/// Returns zero when the divisor is zero; callers that need to distinguish
/// that case check the divisor first.
pub fn div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    (numerator / denominator).round_dp_with_strategy(WORKING_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Simple arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum: Decimal = values.iter().copied().sum();
    Some(div(sum, Decimal::from(values.len() as u64)))
}

/// Round half-up to a fixed number of decimal places.
pub fn round_half_up(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}

/// Round toward zero to a fixed number of decimal places (quantity precision).
pub fn round_down(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::ToZero)
}

/// Display precision for a price, scaled by its magnitude.
///
/// Large caps need one or two decimals, meme coins need eight.
pub fn price_precision(price: Decimal) -> u32 {
    let p = price.abs();
    if p >= dec!(10000) {
        1
    } else if p >= dec!(1000) {
        2
    } else if p >= dec!(10) {
        3
    } else if p >= dec!(1) {
        4
    } else if p >= dec!(0.1) {
        5
    } else if p >= dec!(0.01) {
        6
    } else if p >= dec!(0.001) {
        7
    } else {
        8
    }
}

/// Format a price with magnitude-scaled precision, rounding half-up.
///
/// The output always carries exactly [`price_precision`] fractional digits.
pub fn format_price(price: Decimal) -> String {
    let decimals = price_precision(price);
    let mut rounded = round_half_up(price, decimals);
    rounded.rescale(decimals);
    rounded.to_string()
}

/// Count digits after the decimal point of an already formatted number.
pub fn decimal_places(formatted: &str) -> u32 {
    formatted
        .split_once('.')
        .map(|(_, frac)| frac.chars().take_while(|c| c.is_ascii_digit()).count() as u32)
        .unwrap_or(0)
}

/// Calculate percentage difference of `a` relative to `b` (signed).
pub fn percentage_diff(a: Decimal, b: Decimal) -> Decimal {
    if b == Decimal::ZERO {
        return Decimal::ZERO;
    }
    div(a - b, b) * dec!(100)
}
