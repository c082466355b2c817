use super::american::to_decimal;
use super::{OddsError, OddsResult};

/// Convert a decimal price back to American odds.
///
/// Prices at or above evens come out positive, prices under evens negative.
/// A decimal price of exactly 1.0 (no return) has no American equivalent, and
/// prices whose American form does not fit in an `i32` are rejected rather
/// than saturated.
pub fn from_decimal(decimal: f64) -> OddsResult<i32> {
    let net = decimal - 1.0;
    if !net.is_finite() || net <= 0.0 {
        return Err(OddsError::Degenerate { decimal });
    }
    let american = if decimal >= 2.0 {
        (net * 100.0).round()
    } else {
        (-100.0 / net).round()
    };
    if american > f64::from(i32::MAX) || american < f64::from(i32::MIN) {
        return Err(OddsError::Overflow { decimal });
    }
    Ok(american as i32)
}

/// Combined American price for a parlay of `legs`.
///
/// Every leg is converted to decimal, the decimals are multiplied and the
/// product converted back. Called once at placement with the locked leg odds.
pub fn combine(legs: &[i32]) -> OddsResult<i32> {
    if legs.is_empty() {
        return Err(OddsError::EmptyParlay);
    }
    let product: f64 = legs.iter().copied().map(to_decimal).product();
    from_decimal(product)
}
