//! Records the settlement core reads and writes: the catalog lines it grades
//! against, bets with their legs, the legacy direct bets, and user ledgers.

use thiserror::Error;

/// Unknown textual value for one of the stored enums.
#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// `as_str`/`FromStr` pair for enums persisted as TEXT columns.
macro_rules! str_enum {
    ($ty:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $s,)+
                }
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::wager::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok($ty::$variant),)+
                    other => Err($crate::wager::ParseEnumError {
                        kind: stringify!($ty),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub mod bet;
pub mod catalog;
pub mod user;

pub use bet::{
    Bet, BetId, BetLeg, BetStatus, BetType, DirectBet, DirectBetId, DirectResult, LegId, LegResult,
    Outcome, Side,
};
pub use catalog::{Game, GameId, GameStatus, GradeResult, PropId, PropResult, PropType, Proposition};
pub use user::{User, UserDelta, UserId};
