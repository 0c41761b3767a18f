//! In-memory store used by tests and by the CLI when no database is configured.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use super::repository::{
    BatchRepository, BoardRepository, MatchRepository, PlayerRepository, TournamentRepository,
    WriteBatch,
};
use crate::roster::{Player, PlayerId, PlayerTournamentRecord};
use crate::tournament::{
    Board, BoardId, Knockout, Match, MatchFilter, MatchId, NewTournament, Tournament,
    TournamentError, TournamentId, TournamentResult, TournamentStatus,
};

#[derive(Debug, Default)]
struct Inner {
    next_tournament_id: TournamentId,
    next_match_id: MatchId,
    next_player_id: PlayerId,
    tournaments: HashMap<TournamentId, Tournament>,
    // Ordered so that lookups come back sorted by id
    matches: BTreeMap<MatchId, Match>,
    boards: BTreeMap<(TournamentId, BoardId), Board>,
    players: BTreeMap<PlayerId, Player>,
    results: BTreeMap<(PlayerId, TournamentId), PlayerTournamentRecord>,
}

/// Mutex-guarded maps implementing every repository trait
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic in another test thread must not hide the stored state
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TournamentRepository for MemoryStore {
    async fn create_tournament(&self, new: NewTournament) -> TournamentResult<Tournament> {
        let board_count = BoardId::try_from(new.board_count).map_err(|_| {
            TournamentError::InsufficientBoards {
                needed: new.board_count as usize,
                available: BoardId::MAX as usize,
            }
        })?;

        let mut inner = self.lock();
        inner.next_tournament_id += 1;

        let tournament = Tournament {
            id: inner.next_tournament_id,
            name: new.name,
            players: new.players,
            board_count: new.board_count,
            status: TournamentStatus::Created,
            groups: Vec::new(),
            knockout: Knockout::default(),
            placements: Vec::new(),
            created_at: Utc::now(),
        };
        for board_id in 1..=board_count {
            inner
                .boards
                .insert((tournament.id, board_id), Board::idle(tournament.id, board_id));
        }
        inner.tournaments.insert(tournament.id, tournament.clone());
        Ok(tournament)
    }

    async fn find_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        Ok(self.lock().tournaments.get(&id).cloned())
    }
}

#[async_trait]
impl MatchRepository for MemoryStore {
    async fn find_matches(&self, filter: &MatchFilter) -> TournamentResult<Vec<Match>> {
        Ok(self
            .lock()
            .matches
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    async fn find_match(&self, id: MatchId) -> TournamentResult<Option<Match>> {
        Ok(self.lock().matches.get(&id).cloned())
    }

    async fn reserve_match_ids(&self, count: usize) -> TournamentResult<Vec<MatchId>> {
        let mut inner = self.lock();
        let first = inner.next_match_id + 1;
        inner.next_match_id += count as MatchId;
        Ok((first..=inner.next_match_id).collect())
    }
}

#[async_trait]
impl BoardRepository for MemoryStore {
    async fn find_boards(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Board>> {
        Ok(self
            .lock()
            .boards
            .range((tournament_id, BoardId::MIN)..=(tournament_id, BoardId::MAX))
            .map(|(_, board)| board.clone())
            .collect())
    }
}

impl Inner {
    /// Reject a batch that would fail halfway, before anything is written
    fn check(&self, batch: &WriteBatch) -> TournamentResult<()> {
        for m in &batch.insert_matches {
            if !self.tournaments.contains_key(&m.tournament_id) {
                return Err(TournamentError::TournamentNotFound(m.tournament_id));
            }
            if self.matches.contains_key(&m.id) {
                return Err(TournamentError::MalformedRecord(format!(
                    "match {} already exists",
                    m.id
                )));
            }
        }
        for m in &batch.save_matches {
            let inserted = batch.insert_matches.iter().any(|i| i.id == m.id);
            let deleted = batch.delete_matches.contains(&m.id);
            if deleted || !(inserted || self.matches.contains_key(&m.id)) {
                return Err(TournamentError::MatchNotFound(m.id));
            }
        }
        if let Some(tournament) = &batch.tournament {
            if !self.tournaments.contains_key(&tournament.id) {
                return Err(TournamentError::TournamentNotFound(tournament.id));
            }
        }
        for board in &batch.boards {
            if !self.boards.contains_key(&(board.tournament_id, board.board_id)) {
                return Err(TournamentError::BoardNotFound {
                    tournament_id: board.tournament_id,
                    board_id: board.board_id,
                });
            }
        }
        for player in &batch.players {
            if !self.players.contains_key(&player.id) {
                return Err(TournamentError::PlayerNotFound(player.id.to_string()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BatchRepository for MemoryStore {
    async fn apply_batch(&self, batch: WriteBatch) -> TournamentResult<()> {
        let mut inner = self.lock();
        inner.check(&batch)?;

        for id in &batch.delete_matches {
            inner.matches.remove(id);
        }
        for m in batch.insert_matches.into_iter().chain(batch.save_matches) {
            inner.matches.insert(m.id, m);
        }
        if let Some(tournament) = batch.tournament {
            inner.tournaments.insert(tournament.id, tournament);
        }
        for board in batch.boards {
            inner.boards.insert((board.tournament_id, board.board_id), board);
        }
        for record in batch.results {
            inner
                .results
                .insert((record.player_id, record.tournament_id), record);
        }
        for player in batch.players {
            inner.players.insert(player.id, player);
        }
        Ok(())
    }
}

#[async_trait]
impl PlayerRepository for MemoryStore {
    async fn create_player(&self, name: &str) -> TournamentResult<Player> {
        let mut inner = self.lock();
        inner.next_player_id += 1;
        let player = Player::new(inner.next_player_id, name);
        inner.players.insert(player.id, player.clone());
        Ok(player)
    }

    async fn find_player(&self, id: PlayerId) -> TournamentResult<Option<Player>> {
        Ok(self.lock().players.get(&id).cloned())
    }

    async fn find_player_by_name(&self, name: &str) -> TournamentResult<Option<Player>> {
        Ok(self
            .lock()
            .players
            .values()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn find_tournament_results(
        &self,
        player_id: PlayerId,
    ) -> TournamentResult<Vec<PlayerTournamentRecord>> {
        Ok(self
            .lock()
            .results
            .range((player_id, TournamentId::MIN)..=(player_id, TournamentId::MAX))
            .map(|(_, record)| record.clone())
            .collect())
    }
}
