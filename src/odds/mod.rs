use thiserror::Error;

pub mod american;
pub mod line;
pub mod parlay;

pub use american::{payout, profit, round_cents, to_decimal};
pub use line::{adjust_for_line, quote};
pub use parlay::{combine, from_decimal};

#[derive(Debug, Error, PartialEq)]
pub enum OddsError {
    #[error("parlay has no legs")]
    EmptyParlay,

    #[error("decimal price {decimal} has no american equivalent")]
    Degenerate { decimal: f64 },

    #[error("decimal price {decimal} is outside the representable american range")]
    Overflow { decimal: f64 },
}

pub type OddsResult<T> = Result<T, OddsError>;
