use crate::wager::{Proposition, Side};

/// Price points of movement per one unit of line.
pub const POINTS_PER_LINE_UNIT: f64 = 6.0;
pub const MIN_ADJUSTED_ODDS: i32 = -500;
pub const MAX_ADJUSTED_ODDS: i32 = 1000;

/// Odds for a user-requested line that differs from the published one.
///
/// Moving the line up improves the over price and worsens the under price at a
/// fixed six points per unit. The result is rounded and clamped to
/// `[-500, +1000]`.
pub fn adjust_for_line(base_odds: i32, base_line: f64, custom_line: f64, side: Side) -> i32 {
    let delta = custom_line - base_line;
    let adjustment = match side {
        Side::Over => delta * POINTS_PER_LINE_UNIT,
        Side::Under => -delta * POINTS_PER_LINE_UNIT,
    };
    let adjusted = (f64::from(base_odds) + adjustment).round();
    (adjusted as i32).clamp(MIN_ADJUSTED_ODDS, MAX_ADJUSTED_ODDS)
}

/// Price a leg on `prop`: catalog odds for the published line, adjusted odds
/// for a custom one.
pub fn quote(prop: &Proposition, side: Side, custom_line: Option<f64>) -> i32 {
    let base = prop.odds_for(side);
    match custom_line {
        Some(line) if line != prop.line_value => adjust_for_line(base, prop.line_value, line, side),
        _ => base,
    }
}
