//! Repository trait definitions for the storage collaborator.
//!
//! The engine reads tournaments, matches, boards and roster entries through
//! these traits. Every state change of a running tournament is handed over as
//! one [`WriteBatch`], which a store applies completely or not at all.
//! [`MemoryStore`](super::MemoryStore) and [`PgStore`](super::PgStore)
//! implement all of them.

use async_trait::async_trait;

use crate::roster::{Player, PlayerId, PlayerTournamentRecord};
use crate::tournament::{
    Board, Match, MatchFilter, MatchId, NewTournament, Tournament, TournamentId, TournamentResult,
};

/// Writes that must land together
///
/// Applied in field order: deletes, inserts, match updates, the tournament,
/// boards, tournament results, players.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub delete_matches: Vec<MatchId>,
    /// New matches carrying ids from [`MatchRepository::reserve_match_ids`]
    pub insert_matches: Vec<Match>,
    pub save_matches: Vec<Match>,
    pub tournament: Option<Tournament>,
    pub boards: Vec<Board>,
    /// Upserted per player and tournament
    pub results: Vec<PlayerTournamentRecord>,
    pub players: Vec<Player>,
}

impl WriteBatch {
    pub fn is_empty(&self) -> bool {
        self.delete_matches.is_empty()
            && self.insert_matches.is_empty()
            && self.save_matches.is_empty()
            && self.tournament.is_none()
            && self.boards.is_empty()
            && self.results.is_empty()
            && self.players.is_empty()
    }
}

/// Trait for tournament repository operations
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Insert a tournament in status `created` with empty groups and bracket,
    /// together with its idle boards `1..=board_count`
    async fn create_tournament(&self, new: NewTournament) -> TournamentResult<Tournament>;

    /// Find tournament by ID
    async fn find_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>>;
}

/// Trait for match repository operations
#[async_trait]
pub trait MatchRepository: Send + Sync {
    /// Matches satisfying `filter`, ordered by id
    async fn find_matches(&self, filter: &MatchFilter) -> TournamentResult<Vec<Match>>;

    /// Find match by ID
    async fn find_match(&self, id: MatchId) -> TournamentResult<Option<Match>>;

    /// Hand out `count` fresh ascending match ids; unused ids are simply skipped
    async fn reserve_match_ids(&self, count: usize) -> TournamentResult<Vec<MatchId>>;
}

/// Trait for board repository operations
#[async_trait]
pub trait BoardRepository: Send + Sync {
    /// All boards of a tournament, ordered by board id
    async fn find_boards(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Board>>;
}

/// Trait for roster operations
#[async_trait]
pub trait PlayerRepository: Send + Sync {
    /// Register a player with empty lifetime statistics
    async fn create_player(&self, name: &str) -> TournamentResult<Player>;

    /// Find player by ID
    async fn find_player(&self, id: PlayerId) -> TournamentResult<Option<Player>>;

    /// Find player by name
    async fn find_player_by_name(&self, name: &str) -> TournamentResult<Option<Player>>;

    /// Every stored tournament result of a player, ordered by tournament id
    async fn find_tournament_results(
        &self,
        player_id: PlayerId,
    ) -> TournamentResult<Vec<PlayerTournamentRecord>>;
}

/// Trait for all-or-nothing writes
#[async_trait]
pub trait BatchRepository: Send + Sync {
    /// Apply every write of `batch` or none of them.
    ///
    /// Updating a match, tournament, board or player that is not stored is an
    /// error and aborts the batch. Deleting an unknown match is not.
    async fn apply_batch(&self, batch: WriteBatch) -> TournamentResult<()>;
}

/// Everything the tournament manager needs from storage
pub trait Store:
    TournamentRepository + MatchRepository + BoardRepository + PlayerRepository + BatchRepository
{
}

impl<T> Store for T where
    T: TournamentRepository
        + MatchRepository
        + BoardRepository
        + PlayerRepository
        + BatchRepository
{
}
