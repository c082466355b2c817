use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{WagerError, WagerResult};
use crate::storage::StoreTx;
use crate::wager::{Bet, BetLeg, Game, GameId, PropId, PropType, Proposition, UserId};

/// A leg joined to its proposition and game.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LegView {
    pub leg: BetLeg,
    pub player_name: String,
    pub prop_type: PropType,
    pub matchup: String,
    /// The custom line when one was taken, else the published line.
    pub line_value: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BetView {
    pub bet: Bet,
    pub legs: Vec<LegView>,
}

/// Resolves BetLeg → Proposition → Game, caching lookups for one request.
struct Joiner<'a, T> {
    tx: &'a mut T,
    props: HashMap<PropId, Proposition>,
    games: HashMap<GameId, Game>,
}

impl<'a, T: StoreTx> Joiner<'a, T> {
    fn new(tx: &'a mut T) -> Self {
        Self {
            tx,
            props: HashMap::new(),
            games: HashMap::new(),
        }
    }

    async fn proposition(&mut self, id: PropId) -> WagerResult<Proposition> {
        if let Some(prop) = self.props.get(&id) {
            return Ok(prop.clone());
        }
        let prop = self.tx.get_proposition(id).await?.ok_or_else(|| {
            WagerError::Consistency(format!("bet leg references missing proposition {id}"))
        })?;
        self.props.insert(id, prop.clone());
        Ok(prop)
    }

    async fn game(&mut self, id: GameId) -> WagerResult<Game> {
        if let Some(game) = self.games.get(&id) {
            return Ok(game.clone());
        }
        let game = self.tx.get_game(id).await?.ok_or_else(|| {
            WagerError::Consistency(format!("proposition references missing game {id}"))
        })?;
        self.games.insert(id, game.clone());
        Ok(game)
    }

    async fn leg(&mut self, leg: BetLeg) -> WagerResult<LegView> {
        let prop = self.proposition(leg.prop_id).await?;
        let game = self.game(prop.game_id).await?;
        Ok(LegView {
            line_value: leg.custom_line.unwrap_or(prop.line_value),
            player_name: prop.player_name,
            prop_type: prop.prop_type,
            matchup: game.matchup(),
            leg,
        })
    }
}

/// A user's bets, newest first, with every leg fully joined.
///
/// Fails with a consistency error if any leg points at a proposition or game
/// that no longer exists.
pub async fn bets_for_user<T: StoreTx>(tx: &mut T, user_id: UserId) -> WagerResult<Vec<BetView>> {
    if tx.get_user(user_id).await?.is_none() {
        return Err(WagerError::NotFound {
            entity: "user",
            id: user_id,
        });
    }
    let bets = tx.bets_by_user(user_id).await?;
    let mut legs_by_bet = Vec::with_capacity(bets.len());
    for bet in &bets {
        legs_by_bet.push(tx.legs_by_bet(bet.id).await?);
    }

    let mut joiner = Joiner::new(tx);
    let mut views = Vec::with_capacity(bets.len());
    for (bet, legs) in bets.into_iter().zip(legs_by_bet) {
        let mut joined = Vec::with_capacity(legs.len());
        for leg in legs {
            joined.push(joiner.leg(leg).await?);
        }
        views.push(BetView { bet, legs: joined });
    }
    Ok(views)
}
