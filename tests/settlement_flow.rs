use chrono::Utc;
use uuid::Uuid;

use paper_sportsbook::engine::{BetRequest, DirectBetRequest, LegRequest};
use paper_sportsbook::storage::MemoryStore;
use paper_sportsbook::types::BookConfig;
use paper_sportsbook::wager::{
    BetStatus, BetType, DirectResult, Game, GradeResult, Outcome, PropId, PropResult, PropType,
    Proposition, Side, User, UserId,
};
use paper_sportsbook::{ErrorKind, Sportsbook, WagerError};

type Book = Sportsbook<MemoryStore>;

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 0.005,
        "expected {expected}, got {actual}"
    );
}

fn book() -> Book {
    Sportsbook::new(MemoryStore::new(), BookConfig::default())
}

async fn user(book: &Book, name: &str) -> UserId {
    book.ensure_user(Uuid::new_v4(), name).await.unwrap().id
}

async fn game(book: &Book) -> Game {
    let game = Game::new("KC", "BUF", Utc::now());
    book.add_game(&game).await.unwrap();
    game
}

async fn prop(book: &Book, game: &Game, player: &str, over: i32, under: i32) -> PropId {
    let prop = Proposition::new(game.id, player, PropType::PassingYards, 250.5, over, under);
    book.add_proposition(&prop).await.unwrap();
    prop.id
}

fn leg(prop_id: PropId, side: Side, odds: i32) -> LegRequest {
    LegRequest {
        prop_id,
        side,
        odds,
        custom_line: None,
    }
}

fn single(user_id: UserId, stake: f64, legs: Vec<LegRequest>) -> BetRequest {
    BetRequest {
        user_id,
        legs,
        stake,
        bet_type: BetType::Single,
    }
}

fn parlay(user_id: UserId, stake: f64, legs: Vec<LegRequest>) -> BetRequest {
    BetRequest {
        user_id,
        legs,
        stake,
        bet_type: BetType::Parlay,
    }
}

fn assert_totals(user: &User) {
    assert_eq!(user.total_bets, user.wins + user.losses + user.pushes);
}

async fn bet_status(book: &Book, user_id: UserId, bet_id: Uuid) -> BetStatus {
    book.bet_history(user_id)
        .await
        .unwrap()
        .into_iter()
        .find(|v| v.bet.id == bet_id)
        .map(|v| v.bet.status)
        .unwrap()
}

#[tokio::test]
async fn first_contact_creates_user_once() {
    let book = book();
    let id = Uuid::new_v4();
    let created = book.ensure_user(id, "alice").await.unwrap();
    assert_eq!(created.virtual_balance, 100.0);
    assert_eq!(created.total_bets, 0);

    let again = book.ensure_user(id, "renamed").await.unwrap();
    assert_eq!(again.username, "alice");

    let err = book.ensure_user(Uuid::new_v4(), "  ").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn single_minus_110_win() {
    let book = book();
    let alice = user(&book, "alice").await;
    let g = game(&book).await;
    let p = prop(&book, &g, "Mahomes", -110, -110).await;

    let ids = book
        .place_bet(&single(alice, 10.0, vec![leg(p, Side::Over, -110)]))
        .await
        .unwrap();
    assert_eq!(ids.len(), 1);
    assert_close(book.user(alice).await.unwrap().virtual_balance, 90.0);

    let report = book.grade_proposition(p, GradeResult::OverWin).await.unwrap();
    assert_eq!(report.legs_updated, 1);
    assert_eq!(report.settlements.len(), 1);
    let resolution = report.settlements[0].resolution;
    assert_eq!(resolution.outcome, Outcome::Won);
    assert_close(resolution.payout, 19.09);
    assert_close(resolution.profit, 9.09);

    let u = book.user(alice).await.unwrap();
    assert_close(u.virtual_balance, 109.09);
    assert_close(u.lifetime_profit, 9.09);
    assert_eq!((u.total_bets, u.wins, u.losses, u.pushes), (1, 1, 0, 0));
    assert_eq!(bet_status(&book, alice, ids[0]).await, BetStatus::Won);
}

#[tokio::test]
async fn single_loss_keeps_balance_and_books_loss() {
    let book = book();
    let alice = user(&book, "alice").await;
    let g = game(&book).await;
    let p = prop(&book, &g, "Allen", -110, -110).await;

    let ids = book
        .place_bet(&single(alice, 10.0, vec![leg(p, Side::Over, -110)]))
        .await
        .unwrap();
    book.grade_proposition(p, GradeResult::UnderWin).await.unwrap();

    let u = book.user(alice).await.unwrap();
    assert_close(u.virtual_balance, 90.0);
    assert_close(u.lifetime_profit, -10.0);
    assert_eq!((u.total_bets, u.wins, u.losses, u.pushes), (1, 0, 1, 0));
    assert_eq!(bet_status(&book, alice, ids[0]).await, BetStatus::Lost);
}

#[tokio::test]
async fn single_push_refunds_stake() {
    let book = book();
    let alice = user(&book, "alice").await;
    let g = game(&book).await;
    let p = prop(&book, &g, "Kelce", -110, -110).await;

    book.place_bet(&single(alice, 10.0, vec![leg(p, Side::Under, -110)]))
        .await
        .unwrap();
    let report = book.grade_proposition(p, GradeResult::Push).await.unwrap();
    let resolution = report.settlements[0].resolution;
    assert_eq!(resolution.outcome, Outcome::Push);
    assert_close(resolution.payout, 10.0);

    let u = book.user(alice).await.unwrap();
    assert_close(u.virtual_balance, 100.0);
    assert_close(u.lifetime_profit, 0.0);
    assert_eq!((u.total_bets, u.wins, u.losses, u.pushes), (1, 0, 0, 1));
}

#[tokio::test]
async fn three_leg_parlay_pays_combined_price() {
    let book = book();
    let alice = user(&book, "alice").await;
    let g = game(&book).await;
    let a = prop(&book, &g, "Mahomes", -110, -110).await;
    let b = prop(&book, &g, "Pacheco", 150, -180).await;
    let c = prop(&book, &g, "Rice", -200, 160).await;

    let ids = book
        .place_bet(&parlay(
            alice,
            10.0,
            vec![
                leg(a, Side::Over, -110),
                leg(b, Side::Over, 150),
                leg(c, Side::Over, -200),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(ids.len(), 1);

    let history = book.bet_history(alice).await.unwrap();
    assert_eq!(history[0].bet.combined_odds, 616);
    assert!((history[0].bet.potential_payout - 71.59).abs() < 0.02);
    assert_eq!(history[0].legs.len(), 3);

    let first = book.grade_proposition(a, GradeResult::OverWin).await.unwrap();
    assert_eq!(first.still_pending, ids);
    assert!(first.settlements.is_empty());
    book.grade_proposition(b, GradeResult::OverWin).await.unwrap();
    let last = book.grade_proposition(c, GradeResult::OverWin).await.unwrap();
    assert_eq!(last.settlements.len(), 1);

    let u = book.user(alice).await.unwrap();
    assert!((u.virtual_balance - 161.59).abs() < 0.02);
    assert!((u.lifetime_profit - 61.59).abs() < 0.02);
    assert_eq!((u.total_bets, u.wins), (1, 1));
}

#[tokio::test]
async fn parlay_with_push_and_wins_is_refunded() {
    let book = book();
    let alice = user(&book, "alice").await;
    let g = game(&book).await;
    let a = prop(&book, &g, "Mahomes", -110, -110).await;
    let b = prop(&book, &g, "Kelce", 120, -140).await;

    let ids = book
        .place_bet(&parlay(
            alice,
            10.0,
            vec![leg(a, Side::Over, -110), leg(b, Side::Over, 120)],
        ))
        .await
        .unwrap();
    book.grade_proposition(a, GradeResult::OverWin).await.unwrap();
    book.grade_proposition(b, GradeResult::Push).await.unwrap();

    assert_eq!(bet_status(&book, alice, ids[0]).await, BetStatus::Push);
    let u = book.user(alice).await.unwrap();
    assert_close(u.virtual_balance, 100.0);
    assert_close(u.lifetime_profit, 0.0);
    assert_eq!((u.total_bets, u.wins, u.losses, u.pushes), (1, 0, 0, 1));
}

#[tokio::test]
async fn parlay_with_lost_leg_settles_only_when_complete() {
    let book = book();
    let alice = user(&book, "alice").await;
    let g = game(&book).await;
    let a = prop(&book, &g, "Mahomes", -110, -110).await;
    let b = prop(&book, &g, "Kelce", 120, -140).await;

    let ids = book
        .place_bet(&parlay(
            alice,
            10.0,
            vec![leg(a, Side::Over, -110), leg(b, Side::Over, 120)],
        ))
        .await
        .unwrap();
    book.grade_proposition(a, GradeResult::UnderWin).await.unwrap();
    assert_eq!(bet_status(&book, alice, ids[0]).await, BetStatus::Pending);

    book.grade_proposition(b, GradeResult::OverWin).await.unwrap();
    assert_eq!(bet_status(&book, alice, ids[0]).await, BetStatus::Lost);
    let u = book.user(alice).await.unwrap();
    assert_close(u.lifetime_profit, -10.0);
    assert_eq!(u.losses, 1);
}

#[tokio::test]
async fn regrading_is_a_noop() {
    let book = book();
    let alice = user(&book, "alice").await;
    let g = game(&book).await;
    let p = prop(&book, &g, "Mahomes", -110, -110).await;

    book.place_bet(&single(alice, 10.0, vec![leg(p, Side::Over, -110)]))
        .await
        .unwrap();
    book.grade_proposition(p, GradeResult::OverWin).await.unwrap();
    let once = book.user(alice).await.unwrap();

    let again = book.grade_proposition(p, GradeResult::OverWin).await.unwrap();
    assert!(again.already_graded);
    assert!(again.settlements.is_empty());

    let different = book.grade_proposition(p, GradeResult::UnderWin).await.unwrap();
    assert!(different.already_graded);

    assert_eq!(book.user(alice).await.unwrap(), once);
    assert_eq!(book.proposition(p).await.unwrap().result, PropResult::OverWin);
}

#[tokio::test]
async fn concurrent_grading_pays_parlay_once() {
    let book = book();
    let alice = user(&book, "alice").await;
    let g = game(&book).await;
    let a = prop(&book, &g, "Mahomes", -110, -110).await;
    let b = prop(&book, &g, "Kelce", 120, -140).await;

    book.place_bet(&parlay(
        alice,
        10.0,
        vec![leg(a, Side::Over, -110), leg(b, Side::Over, 120)],
    ))
    .await
    .unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let book = book.clone();
        let prop_id = if i % 2 == 0 { a } else { b };
        handles.push(tokio::spawn(async move {
            book.grade_proposition(prop_id, GradeResult::OverWin).await
        }));
    }

    let mut settlements = 0;
    for handle in handles {
        settlements += handle.await.unwrap().unwrap().settlements.len();
    }
    assert_eq!(settlements, 1);

    let u = book.user(alice).await.unwrap();
    assert_eq!((u.total_bets, u.wins), (1, 1));
    // -110 x +120 = 1.909 * 2.2 = 4.2 → +320
    assert_close(u.virtual_balance, 132.0);
}

#[tokio::test]
async fn singles_debit_per_leg_and_settle_independently() {
    let book = book();
    let alice = user(&book, "alice").await;
    let g = game(&book).await;
    let a = prop(&book, &g, "Mahomes", -110, -110).await;
    let b = prop(&book, &g, "Kelce", 100, -120).await;

    let ids = book
        .place_bet(&single(
            alice,
            10.0,
            vec![leg(a, Side::Over, -110), leg(b, Side::Under, -120)],
        ))
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert_close(book.user(alice).await.unwrap().virtual_balance, 80.0);

    book.grade_proposition(a, GradeResult::UnderWin).await.unwrap();
    book.grade_proposition(b, GradeResult::UnderWin).await.unwrap();

    let u = book.user(alice).await.unwrap();
    assert_eq!((u.total_bets, u.wins, u.losses), (2, 1, 1));
    assert_totals(&u);
}

#[tokio::test]
async fn totals_stay_consistent_across_mixed_activity() {
    let book = book();
    let alice = user(&book, "alice").await;
    let bob = user(&book, "bob").await;
    let g = game(&book).await;
    let props = [
        prop(&book, &g, "Mahomes", -110, -110).await,
        prop(&book, &g, "Kelce", 120, -140).await,
        prop(&book, &g, "Allen", -105, -115).await,
        prop(&book, &g, "Cook", 140, -160).await,
    ];

    book.place_bet(&single(alice, 5.0, vec![leg(props[0], Side::Over, -110)]))
        .await
        .unwrap();
    book.place_bet(&parlay(
        alice,
        5.0,
        vec![leg(props[1], Side::Over, 120), leg(props[2], Side::Under, -115)],
    ))
    .await
    .unwrap();
    book.place_bet(&single(
        bob,
        4.0,
        vec![leg(props[2], Side::Over, -105), leg(props[3], Side::Over, 140)],
    ))
    .await
    .unwrap();
    book.place_direct_bet(&DirectBetRequest {
        user_id: bob,
        game_ref: "BUF@KC".to_string(),
        prop_ref: "coin toss".to_string(),
        amount: 3.0,
        prediction: "heads".to_string(),
        odds: 2.0,
    })
    .await
    .unwrap();

    let grades = [
        GradeResult::OverWin,
        GradeResult::Push,
        GradeResult::UnderWin,
        GradeResult::OverWin,
    ];
    for (p, g) in props.iter().zip(grades) {
        book.grade_proposition(*p, g).await.unwrap();
        book.grade_proposition(*p, g).await.unwrap();
        for id in [alice, bob] {
            assert_totals(&book.user(id).await.unwrap());
        }
    }

    let a = book.user(alice).await.unwrap();
    assert_eq!((a.total_bets, a.wins, a.pushes), (2, 1, 1));
    let b = book.user(bob).await.unwrap();
    assert_eq!((b.total_bets, b.wins, b.losses), (2, 1, 1));
}

#[tokio::test]
async fn validation_rejects_without_side_effects() {
    let book = book();
    let alice = user(&book, "alice").await;
    let g = game(&book).await;
    let p = prop(&book, &g, "Mahomes", -110, -110).await;

    let cases = vec![
        single(alice, 0.0, vec![leg(p, Side::Over, -110)]),
        single(alice, -5.0, vec![leg(p, Side::Over, -110)]),
        single(alice, 10.0, vec![]),
        parlay(alice, 10.0, vec![leg(p, Side::Over, -110)]),
        single(alice, 500.0, vec![leg(p, Side::Over, -110)]),
        single(alice, 60.0, vec![leg(p, Side::Over, -110), leg(p, Side::Under, -110)]),
        single(alice, 10.0, vec![leg(p, Side::Over, 0)]),
    ];
    for req in cases {
        let err = book.place_bet(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{err}");
    }

    let err = book
        .place_bet(&single(Uuid::new_v4(), 10.0, vec![leg(p, Side::Over, -110)]))
        .await
        .unwrap_err();
    assert!(matches!(err, WagerError::NotFound { entity: "user", .. }));

    let err = book
        .place_bet(&single(alice, 10.0, vec![leg(Uuid::new_v4(), Side::Over, -110)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let u = book.user(alice).await.unwrap();
    assert_close(u.virtual_balance, 100.0);
    assert!(book.bet_history(alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn graded_proposition_is_closed_for_new_bets() {
    let book = book();
    let alice = user(&book, "alice").await;
    let g = game(&book).await;
    let p = prop(&book, &g, "Mahomes", -110, -110).await;
    book.grade_proposition(p, GradeResult::OverWin).await.unwrap();

    let err = book
        .place_bet(&single(alice, 10.0, vec![leg(p, Side::Over, -110)]))
        .await
        .unwrap_err();
    assert!(matches!(err, WagerError::PropositionClosed(id) if id == p));
}

#[tokio::test]
async fn grading_unknown_targets_is_not_found() {
    let book = book();
    let err = book
        .grade_proposition(Uuid::new_v4(), GradeResult::OverWin)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = book
        .grade_bet_direct(Uuid::new_v4(), DirectResult::Win)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn direct_bet_lifecycle() {
    let book = book();
    let alice = user(&book, "alice").await;

    let req = DirectBetRequest {
        user_id: alice,
        game_ref: "BUF@KC".to_string(),
        prop_ref: "Mahomes passing yards".to_string(),
        amount: 20.0,
        prediction: "over 250.5".to_string(),
        odds: 1.91,
    };
    let bet_id = book.place_direct_bet(&req).await.unwrap();
    let u = book.user(alice).await.unwrap();
    assert_close(u.virtual_balance, 80.0);
    assert_eq!(u.total_bets, 0);

    let report = book.grade_bet_direct(bet_id, DirectResult::Win).await.unwrap();
    assert_eq!(report.settlements.len(), 1);
    let u = book.user(alice).await.unwrap();
    assert_close(u.virtual_balance, 118.2);
    assert_close(u.lifetime_profit, 18.2);
    assert_eq!((u.total_bets, u.wins), (1, 1));

    let again = book.grade_bet_direct(bet_id, DirectResult::Loss).await.unwrap();
    assert!(again.already_graded);
    assert_eq!(book.user(alice).await.unwrap(), u);

    let bad_odds = DirectBetRequest { odds: 0.5, ..req };
    let err = book.place_direct_bet(&bad_odds).await.unwrap_err();
    assert!(matches!(err, WagerError::InvalidDecimalOdds(_)));
}

#[tokio::test]
async fn leaderboard_ranks_by_lifetime_profit() {
    let book = book();
    let alice = user(&book, "alice").await;
    let bob = user(&book, "bob").await;
    let carol = user(&book, "carol").await;
    let g = game(&book).await;
    let p = prop(&book, &g, "Mahomes", -110, -110).await;

    book.place_bet(&single(alice, 10.0, vec![leg(p, Side::Over, -110)]))
        .await
        .unwrap();
    book.place_bet(&single(bob, 10.0, vec![leg(p, Side::Under, -110)]))
        .await
        .unwrap();
    book.grade_proposition(p, GradeResult::OverWin).await.unwrap();

    let board = book.leaderboard(10).await.unwrap();
    assert_eq!(board.len(), 3);
    assert_eq!(
        board.iter().map(|e| e.user_id).collect::<Vec<_>>(),
        vec![alice, carol, bob]
    );
    assert_eq!(board.iter().map(|e| e.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_close(board[0].win_rate, 100.0);
    assert_close(board[1].win_rate, 0.0);
    assert_close(board[2].win_rate, 0.0);

    assert_eq!(book.leaderboard(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn history_joins_proposition_and_game() {
    let book = book();
    let alice = user(&book, "alice").await;
    let g = game(&book).await;
    let p = prop(&book, &g, "Mahomes", -110, -110).await;

    let quoted = book.quote_leg(p, Side::Over, Some(256.5)).await.unwrap();
    assert!(quoted > -110);
    let custom = LegRequest {
        custom_line: Some(256.5),
        ..leg(p, Side::Over, quoted)
    };
    book.place_bet(&single(alice, 5.0, vec![leg(p, Side::Under, -110)]))
        .await
        .unwrap();
    let newest = book.place_bet(&single(alice, 5.0, vec![custom])).await.unwrap();

    let history = book.bet_history(alice).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].bet.id, newest[0]);
    let view = &history[0].legs[0];
    assert_eq!(view.player_name, "Mahomes");
    assert_eq!(view.prop_type, PropType::PassingYards);
    assert_eq!(view.matchup, "BUF @ KC");
    assert_eq!(view.line_value, 256.5);
    assert_eq!(view.leg.odds, quoted);
    assert_eq!(history[1].legs[0].line_value, 250.5);

    let err = book.bet_history(Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn parlay_priced_beyond_american_range_is_rejected() {
    let book = book();
    let alice = user(&book, "alice").await;
    let g = game(&book).await;
    let mut legs = Vec::new();
    for i in 0..8 {
        let p = prop(&book, &g, &format!("Longshot {i}"), 1000, -2000).await;
        legs.push(leg(p, Side::Over, 1000));
    }

    let err = book.place_bet(&parlay(alice, 1.0, legs.clone())).await.unwrap_err();
    assert!(matches!(err, WagerError::Odds(_)), "{err}");
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_close(book.user(alice).await.unwrap().virtual_balance, 100.0);
    assert!(book.bet_history(alice).await.unwrap().is_empty());

    // Seven legs still fit and are paid at the full price.
    legs.pop();
    book.place_bet(&parlay(alice, 1.0, legs)).await.unwrap();
    let history = book.bet_history(alice).await.unwrap();
    assert_eq!(history[0].bet.combined_odds, 1_948_717_000);
    assert_close(history[0].bet.potential_payout, 19_487_171.0);
}

#[tokio::test]
async fn non_finite_custom_line_is_rejected() {
    let book = book();
    let alice = user(&book, "alice").await;
    let g = game(&book).await;
    let p = prop(&book, &g, "Mahomes", -110, -110).await;

    for line in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let err = book.quote_leg(p, Side::Over, Some(line)).await.unwrap_err();
        assert!(matches!(err, WagerError::InvalidLine(_)));
        assert_eq!(err.kind(), ErrorKind::Validation);

        let custom = LegRequest {
            custom_line: Some(line),
            ..leg(p, Side::Over, -110)
        };
        let err = book.place_bet(&single(alice, 5.0, vec![custom])).await.unwrap_err();
        assert!(matches!(err, WagerError::InvalidLine(_)));
    }

    assert_close(book.user(alice).await.unwrap().virtual_balance, 100.0);
    assert!(book.bet_history(alice).await.unwrap().is_empty());
}
