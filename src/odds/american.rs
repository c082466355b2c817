/// Decimal (total-return-per-unit) odds for an American price.
///
/// Negative prices map to `1 + 100/|odds|`, everything else (including 0) to
/// `1 + odds/100`.
pub fn to_decimal(american_odds: i32) -> f64 {
    let odds = f64::from(american_odds);
    if american_odds < 0 {
        1.0 + 100.0 / odds.abs()
    } else {
        1.0 + odds / 100.0
    }
}

/// Total return (stake + profit) for `stake` placed at `american_odds`.
pub fn payout(stake: f64, american_odds: i32) -> f64 {
    let odds = f64::from(american_odds);
    if american_odds < 0 {
        stake + stake * 100.0 / odds.abs()
    } else {
        stake + stake * odds / 100.0
    }
}

/// Profit alone for a winning `stake` at `american_odds`.
pub fn profit(stake: f64, american_odds: i32) -> f64 {
    payout(stake, american_odds) - stake
}

/// Round a money amount to whole cents.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
