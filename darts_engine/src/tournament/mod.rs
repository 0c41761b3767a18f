//! Tournament module: group stage, qualification and knockout progression.
//!
//! This module implements:
//! - Round-robin group schedules with fair ordering and scorer rotation
//! - Group standings with head-to-head tie-breaks and competition ranks
//! - Qualification of a power-of-two field with cross-group seeding
//! - The knockout bracket and its winner propagation
//! - Idempotent result commits, including corrections of finished matches
//! - Final placements and per-player statistics
//!
//! ## Example
//!
//! ```no_run
//! use darts_engine::config::EngineConfig;
//! use darts_engine::db::{MemoryStore, PlayerRepository};
//! use darts_engine::tournament::{MatchResult, TournamentManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let mut players = Vec::new();
//!     for name in ["Ada", "Bea", "Cal", "Dee"] {
//!         players.push(store.create_player(name).await?.id);
//!     }
//!
//!     let manager = TournamentManager::new(store, EngineConfig::default());
//!     let tournament = manager.create_tournament("Monday Open", &players, 2).await?;
//!     let matches = manager.generate_group_schedule(tournament.id).await?;
//!
//!     let first = &matches[0];
//!     manager
//!         .commit_match_result(first.id, MatchResult::with_legs(first.player1, 3, 1))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod bracket;
pub mod commit;
pub mod errors;
pub mod manager;
pub mod models;
pub mod placement;
pub mod qualification;
pub mod schedule;
pub mod standings;

pub use errors::{ErrorKind, TournamentError, TournamentResult};
pub use manager::{CommitOutcome, KnockoutOutcome, TournamentManager};
pub use models::{
    Board, BoardId, BoardStatus, BracketSlot, EliminatedPlayer, Group, GroupMember, Knockout,
    LegResult, LegStats, Match, MatchFilter, MatchId, MatchResult, MatchStats, MatchStatus,
    NewMatch, NewTournament, Placement, PlayerMatchStats, Round, SlotState, Standing, Tournament,
    TournamentId, TournamentStatus,
};
pub use placement::Finalization;
