use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use paper_sportsbook::{
    engine::{BetRequest, DirectBetRequest, LegRequest},
    monitoring,
    storage::{self, state::LeaderboardCache, PgStore},
    types::AppConfig,
    wager::{BetType, DirectResult, Game, GradeResult, PropType, Proposition, Side},
    Sportsbook,
};

fn redact_host(url: &str) -> String {
    url.split('@')
        .nth(1)
        .and_then(|s| s.split('/').next())
        .unwrap_or("?")
        .to_string()
}

/// Parse `PROP_ID:SIDE:ODDS[:LINE]`.
fn parse_leg(raw: &str) -> anyhow::Result<LegRequest> {
    let parts: Vec<&str> = raw.split(':').collect();
    if !(3..=4).contains(&parts.len()) {
        bail!("leg must look like PROP_ID:SIDE:ODDS[:LINE], got {raw}");
    }
    let prop_id = Uuid::parse_str(parts[0]).with_context(|| format!("bad proposition id in {raw}"))?;
    let side: Side = parts[1].parse()?;
    let odds: i32 = parts[2]
        .parse()
        .with_context(|| format!("bad odds in {raw}"))?;
    let custom_line = parts
        .get(3)
        .map(|s| s.parse::<f64>())
        .transpose()
        .with_context(|| format!("bad line in {raw}"))?;
    Ok(LegRequest {
        prop_id,
        side,
        odds,
        custom_line,
    })
}

#[derive(Parser, Debug)]
#[command(name = "sportsbook")]
#[command(about = "Paper sports betting settlement engine", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/sportsbook.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create tables and indices
    Migrate,
    /// Create a user with the starting balance, or show the existing one
    AddUser {
        #[arg(long)]
        id: Option<Uuid>,
        #[arg(long)]
        username: String,
    },
    /// Insert a game into the catalog
    AddGame {
        #[arg(long)]
        home: String,
        #[arg(long)]
        away: String,
        /// RFC 3339 kickoff time
        #[arg(long)]
        start: DateTime<Utc>,
    },
    /// Insert an over/under proposition for a game
    AddProp {
        #[arg(long)]
        game: Uuid,
        #[arg(long)]
        player: String,
        /// passing_yards, rushing_yards, receiving_yards, receptions or anytime_td
        #[arg(long)]
        prop_type: String,
        #[arg(long)]
        line: f64,
        #[arg(long, allow_hyphen_values = true)]
        over: i32,
        #[arg(long, allow_hyphen_values = true)]
        under: i32,
    },
    /// Price a leg, optionally at a custom line
    Quote {
        #[arg(long)]
        prop: Uuid,
        #[arg(long, value_enum)]
        side: Side,
        #[arg(long, allow_hyphen_values = true)]
        line: Option<f64>,
    },
    /// Place a single or parlay bet
    Place {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        stake: f64,
        #[arg(long = "type", value_enum, default_value = "single")]
        bet_type: BetType,
        /// PROP_ID:SIDE:ODDS[:LINE], repeat for each leg
        #[arg(long = "leg", required = true, allow_hyphen_values = true)]
        legs: Vec<String>,
    },
    /// Place a legacy direct bet at decimal odds
    PlaceDirect {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        game_ref: String,
        #[arg(long)]
        prop_ref: String,
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        prediction: String,
        #[arg(long)]
        odds: f64,
    },
    /// Grade a proposition and settle every bet it completes
    GradeProp {
        #[arg(long)]
        prop: Uuid,
        #[arg(long, value_enum)]
        result: GradeResult,
    },
    /// Settle one legacy direct bet
    SettleBet {
        #[arg(long)]
        bet: Uuid,
        #[arg(long, value_enum)]
        result: DirectResult,
    },
    /// Show users ranked by lifetime profit
    Leaderboard {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show a user's bets with their legs
    History {
        #[arg(long)]
        user: Uuid,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Migrate => "migrate",
            Commands::AddUser { .. } => "add-user",
            Commands::AddGame { .. } => "add-game",
            Commands::AddProp { .. } => "add-prop",
            Commands::Quote { .. } => "quote",
            Commands::Place { .. } => "place",
            Commands::PlaceDirect { .. } => "place-direct",
            Commands::GradeProp { .. } => "grade-prop",
            Commands::SettleBet { .. } => "settle-bet",
            Commands::Leaderboard { .. } => "leaderboard",
            Commands::History { .. } => "history",
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn connect_cache(settings: &AppConfig) -> Option<LeaderboardCache> {
    let redis = settings.redis.as_ref()?;
    match LeaderboardCache::connect(redis, settings.book.leaderboard_cache_ttl_secs).await {
        Ok(cache) => Some(cache),
        Err(err) => {
            tracing::warn!(target: "sportsbook", error = %err, "leaderboard cache unavailable");
            None
        }
    }
}

async fn invalidate_cache(settings: &AppConfig) {
    if let Some(mut cache) = connect_cache(settings).await {
        if let Err(err) = cache.invalidate().await {
            tracing::warn!(target: "sportsbook", error = %err, "failed to invalidate leaderboard cache");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "paper_sportsbook=debug,sportsbook=debug,info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();
    tracing::debug!(target: "sportsbook", config = %cli.config, "loading config");

    let settings = AppConfig::from_file(&cli.config)?;
    tracing::info!(
        target: "sportsbook",
        config = %cli.config,
        postgres_host = redact_host(&settings.postgres.url),
        "config loaded"
    );
    monitoring::logger::log_startup(&settings, cli.command.name());

    let pool = storage::create_pg_pool(&settings.postgres).await?;
    let store = PgStore::new(pool);

    if let Commands::Migrate = cli.command {
        store.migrate().await?;
        tracing::info!(target: "sportsbook", "schema applied");
        return Ok(());
    }

    let book = Sportsbook::new(store, settings.book.clone());

    match cli.command {
        Commands::Migrate => {}
        Commands::AddUser { id, username } => {
            let user = book
                .ensure_user(id.unwrap_or_else(Uuid::new_v4), &username)
                .await?;
            print_json(&user)?;
        }
        Commands::AddGame { home, away, start } => {
            let game = Game::new(&home, &away, start);
            book.add_game(&game).await?;
            print_json(&game)?;
        }
        Commands::AddProp {
            game,
            player,
            prop_type,
            line,
            over,
            under,
        } => {
            let prop_type: PropType = prop_type.parse()?;
            let prop = Proposition::new(game, &player, prop_type, line, over, under);
            book.add_proposition(&prop).await?;
            print_json(&prop)?;
        }
        Commands::Quote { prop, side, line } => {
            let odds = book.quote_leg(prop, side, line).await?;
            println!("{odds}");
        }
        Commands::Place {
            user,
            stake,
            bet_type,
            legs,
        } => {
            let legs = legs
                .iter()
                .map(|raw| parse_leg(raw))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let req = BetRequest {
                user_id: user,
                legs,
                stake,
                bet_type,
            };
            let bet_ids = book.place_bet(&req).await?;
            print_json(&bet_ids)?;
        }
        Commands::PlaceDirect {
            user,
            game_ref,
            prop_ref,
            amount,
            prediction,
            odds,
        } => {
            let req = DirectBetRequest {
                user_id: user,
                game_ref,
                prop_ref,
                amount,
                prediction,
                odds,
            };
            let bet_id = book.place_direct_bet(&req).await?;
            println!("{bet_id}");
        }
        Commands::GradeProp { prop, result } => {
            let report = book.grade_proposition(prop, result).await?;
            invalidate_cache(&settings).await;
            print_json(&report)?;
        }
        Commands::SettleBet { bet, result } => {
            let report = book.grade_bet_direct(bet, result).await?;
            invalidate_cache(&settings).await;
            print_json(&report)?;
        }
        Commands::Leaderboard { limit } => {
            let limit = limit.unwrap_or(settings.book.leaderboard_limit);
            let mut cache = connect_cache(&settings).await;
            if let Some(cache) = cache.as_mut() {
                match cache.load(limit).await {
                    Ok(Some(entries)) => {
                        tracing::debug!(target: "sportsbook", limit, "leaderboard served from cache");
                        return print_json(&entries);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        tracing::warn!(target: "sportsbook", error = %err, "leaderboard cache read failed")
                    }
                }
            }
            let entries = book.leaderboard(limit).await?;
            if let Some(cache) = cache.as_mut() {
                if let Err(err) = cache.save(limit, &entries).await {
                    tracing::warn!(target: "sportsbook", error = %err, "leaderboard cache write failed");
                }
            }
            print_json(&entries)?;
        }
        Commands::History { user } => {
            let history = book.bet_history(user).await?;
            print_json(&history)?;
        }
    }

    monitoring::metrics::log_metrics_snapshot(&monitoring::metrics::METRICS.snapshot());
    Ok(())
}
