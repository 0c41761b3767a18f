//! Simulate a complete darts tournament from the command line.
//!
//! Players are registered, drawn into groups, and every match is played with
//! random results until the final is decided. Placements are printed as JSON.

use std::sync::Arc;

use anyhow::{Context, Error, anyhow};
use darts_engine::{
    MatchResult, TournamentManager,
    config::EngineConfig,
    db::{Database, DatabaseConfig, MemoryStore, PlayerRepository, Store},
    roster::PlayerId,
    tournament::{Match, MatchFilter, MatchStatus, TournamentId},
};
use log::{debug, info};
use pico_args::Arguments;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::json;

const HELP: &str = "\
Simulate a darts tournament from group stage to final

USAGE:
  darts_cli [OPTIONS]

OPTIONS:
  --players    N           Number of generated players     [default: 8]
  --roster     PATH        File with one player name per line, overrides --players
  --boards     N           Number of boards                [default: 2]
  --seed       N           Seed for the draw and the simulated results
  --name       NAME        Tournament name                 [default: Darts Open]
  --db-url     URL         Store everything in PostgreSQL  [default: env DATABASE_URL, in-memory if unset]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  DATABASE_URL             PostgreSQL connection string
  DB_MAX_CONNECTIONS       Connection pool size
  SCHEDULE_ATTEMPTS        Shuffles tried per group schedule
  MAX_CONSECUTIVE_MATCHES  Longest allowed run of back-to-back matches
  POINTS_PER_WIN           Standing points for a match win
  RUST_LOG                 Log filter [default: info]
";

struct Args {
    players: usize,
    roster: Option<String>,
    boards: u32,
    seed: Option<u64>,
    name: String,
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        players: pargs.opt_value_from_str("--players")?.unwrap_or(8),
        roster: pargs.opt_value_from_str("--roster")?,
        boards: pargs.opt_value_from_str("--boards")?.unwrap_or(2),
        seed: pargs.opt_value_from_str("--seed")?,
        name: pargs
            .opt_value_from_str("--name")?
            .unwrap_or_else(|| "Darts Open".to_string()),
        database_url: pargs
            .opt_value_from_str("--db-url")?
            .or_else(|| std::env::var("DATABASE_URL").ok()),
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    let mut config = EngineConfig::from_env();
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    let names = match &args.roster {
        Some(path) => read_roster(path)?,
        None => (1..=args.players).map(|i| format!("Player {i}")).collect(),
    };

    match &args.database_url {
        Some(url) => {
            info!("Connecting to database");
            let db = Database::new(&DatabaseConfig::with_url(url.as_str())?)
                .await
                .map_err(|e| anyhow!("Failed to connect to database: {}", e))?;
            let store = db.store();
            store.migrate().await?;
            info!("Database connected successfully");

            let manager = TournamentManager::new(Arc::new(store), config);
            run(&manager, &args, &names).await?;
            db.close().await;
        }
        None => {
            info!("Using in-memory store");
            let manager = TournamentManager::new(Arc::new(MemoryStore::new()), config);
            run(&manager, &args, &names).await?;
        }
    }

    Ok(())
}

fn read_roster(path: &str) -> Result<Vec<String>, Error> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read roster {path}"))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

async fn run<S: Store>(
    manager: &TournamentManager<S>,
    args: &Args,
    names: &[String],
) -> Result<(), Error> {
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut players = Vec::with_capacity(names.len());
    for name in names {
        let player = match manager.store().find_player_by_name(name).await? {
            Some(player) => player,
            None => manager.store().create_player(name).await?,
        };
        players.push(player);
    }
    let ids: Vec<PlayerId> = players.iter().map(|p| p.id).collect();

    let tournament = manager
        .create_tournament(&args.name, &ids, args.boards)
        .await?;
    info!(
        "Created tournament {} with {} players on {} boards",
        tournament.id,
        ids.len(),
        args.boards
    );

    let group_matches = manager.generate_group_schedule(tournament.id).await?;
    info!("Scheduled {} group matches", group_matches.len());
    for m in &group_matches {
        play(manager, m, &mut rng).await?;
    }

    let knockout = manager.generate_knockout(tournament.id).await?;
    info!(
        "{} players qualified, {} eliminated",
        knockout.qualifying,
        knockout.eliminated.len()
    );
    play_knockout(manager, tournament.id, &mut rng).await?;

    let finalization = manager.finish_tournament(tournament.id).await?;
    let placements: Vec<_> = finalization
        .placements
        .iter()
        .map(|p| {
            let name = players
                .iter()
                .find(|player| player.id == p.player_id)
                .map(|player| player.name.as_str())
                .unwrap_or_default();
            json!({ "placement": p.placement, "player_id": p.player_id, "name": name })
        })
        .collect();

    let report = json!({
        "tournament": tournament.id,
        "name": args.name,
        "placements": placements,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

async fn play_knockout<S: Store>(
    manager: &TournamentManager<S>,
    tournament_id: TournamentId,
    rng: &mut StdRng,
) -> Result<(), Error> {
    let filter = MatchFilter::tournament(tournament_id)
        .knockout(true)
        .with_status(MatchStatus::Pending);

    loop {
        let pending = manager.matches(&filter).await?;
        if pending.is_empty() {
            return Ok(());
        }
        for m in &pending {
            play(manager, m, rng).await?;
        }
    }
}

async fn play<S: Store>(
    manager: &TournamentManager<S>,
    m: &Match,
    rng: &mut StdRng,
) -> Result<(), Error> {
    manager.start_match(m.id).await?;
    let result = random_result(m, rng);
    debug!(
        "Match {}: {} beats {}",
        m.id,
        result.winner,
        if result.winner == m.player1 {
            m.player2
        } else {
            m.player1
        }
    );
    let outcome = manager.commit_match_result(m.id, result).await?;
    if let Some(next) = outcome.spawned {
        debug!("Spawned match {} in round {}", next.id, next.round);
    }
    Ok(())
}

/// First to three legs, with plausible averages and checkouts
fn random_result(m: &Match, rng: &mut StdRng) -> MatchResult {
    let first_wins = rng.random_bool(0.5);
    let loser_legs = rng.random_range(0..3);
    let (winner, p1_legs, p2_legs) = if first_wins {
        (m.player1, 3, loser_legs)
    } else {
        (m.player2, loser_legs, 3)
    };

    let mut result = MatchResult::with_legs(winner, p1_legs, p2_legs);
    for stats in [&mut result.player1, &mut result.player2] {
        let legs = 3 + loser_legs;
        stats.darts_thrown = legs * rng.random_range(15..30);
        stats.average = rng.random_range(45.0..100.0);
        stats.checkout_attempts = stats.legs_won + rng.random_range(0..6);
        if stats.legs_won > 0 {
            stats.highest_checkout = rng.random_range(20..=170);
        }
    }
    result
}
