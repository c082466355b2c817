pub mod engine;
pub mod monitoring;
pub mod odds;
pub mod storage;
pub mod types;
pub mod wager;

pub use crate::engine::{ErrorKind, Sportsbook, WagerError, WagerResult};
pub use crate::types::*;
