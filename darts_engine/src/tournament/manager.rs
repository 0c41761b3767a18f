//! Tournament manager driving a tournament from registration to placements.
//!
//! Every mutating operation takes the tournament's lock, loads the current
//! state from the store, computes the complete effect in memory and only then
//! writes it back as a single [`WriteBatch`]. A rejected operation or a failed
//! write therefore leaves storage untouched.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError};

use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tokio::sync::{Mutex, RwLock};

use super::commit::{self, CommitPlan};
use super::errors::{TournamentError, TournamentResult};
use super::models::{
    Board, BoardId, BoardStatus, Group, Match, MatchFilter, MatchId, MatchResult, MatchStatus,
    NewMatch, NewTournament, Standing, Tournament, TournamentId, TournamentStatus,
};
use super::placement::{self, Finalization};
use super::{bracket, qualification, schedule, standings};
use crate::config::EngineConfig;
use crate::db::{Store, WriteBatch};
use crate::roster::{PlayerId, PlayerStats};

/// What a result commit changed
#[derive(Debug, Clone, PartialEq)]
pub struct CommitOutcome {
    /// The match as stored after the commit
    pub finished: Match,
    /// Knockout match created because its slot became ready
    pub spawned: Option<Match>,
    /// Downstream matches removed by a corrected knockout result
    pub deleted: Vec<MatchId>,
    /// True when an earlier result was replaced
    pub corrected: bool,
    /// True when this result decided the final
    pub tournament_finished: bool,
}

/// Result of closing the group stage
#[derive(Debug, Clone, PartialEq)]
pub struct KnockoutOutcome {
    pub qualifying: usize,
    /// Players knocked out at the group stage
    pub eliminated: Vec<PlayerId>,
    /// First-round matches in slot order
    pub matches: Vec<Match>,
}

/// Tournament manager
pub struct TournamentManager<S: Store> {
    store: Arc<S>,
    config: EngineConfig,
    /// Random source for group draws and schedules
    rng: Arc<std::sync::Mutex<StdRng>>,
    /// One lock per tournament, serialising its mutations. An entry is
    /// dropped when its tournament finishes and nobody is waiting on it.
    locks: Arc<RwLock<HashMap<TournamentId, Arc<Mutex<()>>>>>,
}

impl<S: Store> Clone for TournamentManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            rng: Arc::clone(&self.rng),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<S: Store> TournamentManager<S> {
    /// Create a new tournament manager
    ///
    /// Scheduling is deterministic when `config.schedule_seed` is set.
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        let rng = match config.schedule_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            store,
            config,
            rng: Arc::new(std::sync::Mutex::new(rng)),
            locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn lock_for(&self, tournament_id: TournamentId) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(&tournament_id) {
            return Arc::clone(lock);
        }

        let mut locks = self.locks.write().await;
        Arc::clone(locks.entry(tournament_id).or_default())
    }

    /// Drop the lock entry of `tournament_id` unless another task holds a
    /// handle to it. The caller's own handle is the one expected besides the
    /// map's.
    async fn forget_lock(&self, tournament_id: TournamentId) {
        let mut locks = self.locks.write().await;
        let idle = locks
            .get(&tournament_id)
            .is_some_and(|lock| Arc::strong_count(lock) <= 2);
        if idle {
            locks.remove(&tournament_id);
        }
    }

    async fn load(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.store
            .find_tournament(tournament_id)
            .await?
            .ok_or(TournamentError::TournamentNotFound(tournament_id))
    }

    async fn load_match(&self, match_id: MatchId) -> TournamentResult<Match> {
        self.store
            .find_match(match_id)
            .await?
            .ok_or(TournamentError::MatchNotFound(match_id))
    }

    async fn reserve_ids(&self, count: usize) -> TournamentResult<Vec<MatchId>> {
        let ids = self.store.reserve_match_ids(count).await?;
        if ids.len() != count {
            return Err(TournamentError::MalformedRecord(format!(
                "asked for {count} match ids, store handed out {}",
                ids.len()
            )));
        }
        Ok(ids)
    }

    /// Register a tournament over existing roster players.
    pub async fn create_tournament(
        &self,
        name: &str,
        player_ids: &[PlayerId],
        board_count: u32,
    ) -> TournamentResult<Tournament> {
        let mut seen = HashSet::new();
        if let Some(&duplicate) = player_ids.iter().find(|&&id| !seen.insert(id)) {
            return Err(TournamentError::DuplicatePlayer(duplicate));
        }
        if player_ids.len() < 2 {
            return Err(TournamentError::InsufficientPlayers {
                needed: 2,
                current: player_ids.len(),
            });
        }
        if board_count == 0 {
            return Err(TournamentError::InsufficientBoards {
                needed: 1,
                available: 0,
            });
        }
        for &id in player_ids {
            if self.store.find_player(id).await?.is_none() {
                return Err(TournamentError::PlayerNotFound(id.to_string()));
            }
        }

        let tournament = self
            .store
            .create_tournament(NewTournament {
                name: name.to_string(),
                players: player_ids.to_vec(),
                board_count,
            })
            .await?;

        info!(
            "Created tournament {} '{}' with {} players on {} boards",
            tournament.id,
            tournament.name,
            player_ids.len(),
            board_count
        );
        Ok(tournament)
    }

    /// Draw the groups and create every group match.
    pub async fn generate_group_schedule(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Match>> {
        let lock = self.lock_for(tournament_id).await;
        let _guard = lock.lock().await;

        let mut tournament = self.load(tournament_id).await?;
        if tournament.status != TournamentStatus::Created {
            return Err(TournamentError::InvalidState {
                expected: vec![TournamentStatus::Created],
                actual: tournament.status,
            });
        }

        let total = tournament.players.len();
        if total < 2 {
            return Err(TournamentError::InsufficientPlayers {
                needed: 2,
                current: total,
            });
        }
        let group_count = (tournament.board_count as usize).min(total / 2);
        if group_count == 0 {
            return Err(TournamentError::InsufficientBoards {
                needed: 1,
                available: 0,
            });
        }

        // The random source is only held for the draw, never across storage calls
        let (groups, schedules) = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

            let mut drawn = tournament.players.clone();
            drawn.shuffle(&mut *rng);

            let mut dealt = vec![Vec::new(); group_count];
            for (i, player) in drawn.into_iter().enumerate() {
                dealt[i % group_count].push(player);
            }

            let groups: Vec<Group> = dealt
                .iter()
                .enumerate()
                .map(|(index, players)| Group::new(index, players))
                .collect();
            let schedules = groups
                .iter()
                .map(|g| schedule::generate_schedule(g.size(), &self.config, &mut *rng))
                .collect::<TournamentResult<Vec<_>>>()?;
            (groups, schedules)
        };

        let total_matches = schedules.iter().map(|s| s.matches.len()).sum();
        let mut ids = self.reserve_ids(total_matches).await?.into_iter();

        let mut created = Vec::with_capacity(total_matches);
        tournament.groups = groups;
        for (group, plan) in tournament.groups.iter_mut().zip(&schedules) {
            let players = group.player_ids();
            let board_id = BoardId::try_from(group.index % tournament.board_count as usize + 1)
                .map_err(|_| {
                    TournamentError::BracketInconsistent(format!(
                        "no board for group {}",
                        group.index
                    ))
                })?;

            for (scheduled, id) in plan.matches.iter().zip(ids.by_ref()) {
                let m = NewMatch {
                    tournament_id,
                    board_id,
                    player1: players[scheduled.player1],
                    player2: players[scheduled.player2],
                    scorer: Some(players[scheduled.scorer]),
                    round: group.index,
                    is_knockout: false,
                }
                .into_match(id);
                group.matches.push(m.id);
                created.push(m);
            }
            debug!(
                "Group {} of tournament {}: players {:?}, {} matches on board {}",
                group.index,
                tournament_id,
                players,
                plan.matches.len(),
                board_id
            );
        }

        tournament.status = TournamentStatus::Group;
        self.write(
            tournament_id,
            WriteBatch {
                insert_matches: created.clone(),
                tournament: Some(tournament),
                ..Default::default()
            },
        )
        .await?;

        info!(
            "Tournament {} group stage: {} groups, {} matches",
            tournament_id,
            group_count,
            created.len()
        );
        Ok(created)
    }

    /// Put a pending match on its board.
    pub async fn start_match(&self, match_id: MatchId) -> TournamentResult<Match> {
        let tournament_id = self.load_match(match_id).await?.tournament_id;
        let lock = self.lock_for(tournament_id).await;
        let _guard = lock.lock().await;

        let mut m = self.load_match(match_id).await?;
        let tournament = self.load(tournament_id).await?;
        if !matches!(
            tournament.status,
            TournamentStatus::Group | TournamentStatus::Knockout
        ) {
            return Err(TournamentError::InvalidState {
                expected: vec![TournamentStatus::Group, TournamentStatus::Knockout],
                actual: tournament.status,
            });
        }
        if m.status != MatchStatus::Pending {
            return Err(TournamentError::InvalidMatchState {
                match_id,
                expected: MatchStatus::Pending,
                actual: m.status,
            });
        }

        let mut board = self
            .store
            .find_boards(tournament_id)
            .await?
            .into_iter()
            .find(|b| b.board_id == m.board_id)
            .ok_or(TournamentError::BoardNotFound {
                tournament_id,
                board_id: m.board_id,
            })?;

        m.status = MatchStatus::Ongoing;
        board.status = BoardStatus::Playing;
        board.waiting_players.clear();
        board.current_match = Some(match_id);

        self.store
            .apply_batch(WriteBatch {
                save_matches: vec![m.clone()],
                boards: vec![board.clone()],
                ..Default::default()
            })
            .await?;

        debug!("Match {} started on board {}", match_id, board.board_id);
        Ok(m)
    }

    /// Record or correct the result of a match.
    ///
    /// Committing an already finished match reverts its previous effect
    /// first, so re-submitting the same payload leaves the tournament as it
    /// was.
    pub async fn commit_match_result(
        &self,
        match_id: MatchId,
        result: MatchResult,
    ) -> TournamentResult<CommitOutcome> {
        let tournament_id = self.load_match(match_id).await?.tournament_id;
        let lock = self.lock_for(tournament_id).await;
        let _guard = lock.lock().await;

        let m = self.load_match(match_id).await?;
        let tournament = self.load(tournament_id).await?;

        let group_matches = if m.is_knockout {
            Vec::new()
        } else {
            let filter = MatchFilter {
                round: Some(m.round),
                ..MatchFilter::tournament(tournament_id).knockout(false)
            };
            self.store.find_matches(&filter).await?
        };

        let downstream = match bracket::downstream_of(&tournament.knockout, match_id) {
            Some(id) if m.is_knockout => self.store.find_match(id).await?,
            _ => None,
        };

        let boards: Vec<BoardId> = self
            .store
            .find_boards(tournament_id)
            .await?
            .iter()
            .map(|b| b.board_id)
            .collect();

        let plan = commit::plan_commit(
            &tournament,
            &m,
            result,
            &group_matches,
            downstream.as_ref(),
            &boards,
            &self.config,
        )?;

        self.persist(plan).await
    }

    async fn persist(&self, plan: CommitPlan) -> TournamentResult<CommitOutcome> {
        let CommitPlan {
            mut tournament,
            finished,
            delete,
            spawn,
            reverted,
            completed,
        } = plan;

        let mut batch = WriteBatch {
            delete_matches: delete.clone(),
            save_matches: vec![finished.clone()],
            ..Default::default()
        };

        let spawned = match spawn {
            Some(request) => {
                let id = self.reserve_ids(1).await?[0];
                let m = NewMatch {
                    tournament_id: tournament.id,
                    board_id: request.board_id,
                    player1: request.player1,
                    player2: request.player2,
                    scorer: None,
                    round: request.round,
                    is_knockout: true,
                }
                .into_match(id);
                bracket::attach_match(&mut tournament.knockout, request.round, request.slot, m.id)?;
                batch.insert_matches.push(m.clone());
                Some(m)
            }
            None => None,
        };

        let tournament_id = tournament.id;
        batch.tournament = Some(tournament);
        self.write(tournament_id, batch).await?;

        for id in &delete {
            info!("Removed match {} spawned from a corrected result", id);
        }
        if let Some(m) = &spawned {
            debug!(
                "Spawned match {} ({} vs {}) for round {} on board {}",
                m.id, m.player1, m.player2, m.round, m.board_id
            );
        }

        Ok(CommitOutcome {
            finished,
            spawned,
            deleted: delete,
            corrected: reverted,
            tournament_finished: completed,
        })
    }

    /// Add the board changes `batch` causes and apply it in one go.
    async fn write(
        &self,
        tournament_id: TournamentId,
        mut batch: WriteBatch,
    ) -> TournamentResult<()> {
        let mut matches: Vec<Match> = self
            .store
            .find_matches(&MatchFilter::tournament(tournament_id))
            .await?
            .into_iter()
            .filter(|m| !batch.delete_matches.contains(&m.id))
            .collect();
        for m in batch.insert_matches.iter().chain(&batch.save_matches) {
            match matches.iter_mut().find(|stored| stored.id == m.id) {
                Some(stored) => *stored = m.clone(),
                None => matches.push(m.clone()),
            }
        }

        let mut boards = self.store.find_boards(tournament_id).await?;
        for board in &batch.boards {
            if let Some(stored) = boards.iter_mut().find(|b| b.board_id == board.board_id) {
                *stored = board.clone();
            }
        }
        for board in commit::settle_boards(&boards, &matches) {
            match batch.boards.iter_mut().find(|b| b.board_id == board.board_id) {
                Some(queued) => *queued = board,
                None => batch.boards.push(board),
            }
        }

        self.store.apply_batch(batch).await
    }

    /// Close the group stage and seed the bracket.
    pub async fn generate_knockout(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<KnockoutOutcome> {
        let lock = self.lock_for(tournament_id).await;
        let _guard = lock.lock().await;

        let mut tournament = self.load(tournament_id).await?;
        if tournament.status != TournamentStatus::Group {
            return Err(TournamentError::InvalidState {
                expected: vec![TournamentStatus::Group],
                actual: tournament.status,
            });
        }

        let group_matches = self
            .store
            .find_matches(&MatchFilter::tournament(tournament_id).knockout(false))
            .await?;
        let pending = group_matches
            .iter()
            .filter(|m| m.status != MatchStatus::Finished)
            .count();
        if pending > 0 {
            return Err(TournamentError::GroupStageIncomplete { pending });
        }

        for group in &mut tournament.groups {
            for player in group.player_ids() {
                if group.standing(player).is_none() {
                    group.standings.push(Standing::new(player));
                }
            }
            let finished: Vec<Match> = group_matches
                .iter()
                .filter(|m| m.round == group.index)
                .cloned()
                .collect();
            standings::sort_and_rank(&mut group.standings, &finished);
        }

        let cut = qualification::qualify(&tournament.groups)?;
        let mut knockout = qualification::build_bracket(&cut.pairings);
        knockout.eliminated = cut.eliminated.clone();
        bracket::verify_shape(&knockout)?;

        let boards: Vec<BoardId> = self
            .store
            .find_boards(tournament_id)
            .await?
            .iter()
            .map(|b| b.board_id)
            .collect();
        if boards.is_empty() {
            return Err(TournamentError::InsufficientBoards {
                needed: 1,
                available: 0,
            });
        }

        let ids = self.reserve_ids(cut.pairings.len()).await?;
        let mut created = Vec::with_capacity(cut.pairings.len());
        for (slot, (&(player1, player2), id)) in cut.pairings.iter().zip(ids).enumerate() {
            let m = NewMatch {
                tournament_id,
                board_id: boards[slot % boards.len()],
                player1,
                player2,
                scorer: None,
                round: 0,
                is_knockout: true,
            }
            .into_match(id);
            bracket::attach_match(&mut knockout, 0, slot, m.id)?;
            created.push(m);
        }

        tournament.knockout = knockout;
        tournament.status = TournamentStatus::Knockout;
        self.write(
            tournament_id,
            WriteBatch {
                insert_matches: created.clone(),
                tournament: Some(tournament),
                ..Default::default()
            },
        )
        .await?;

        info!(
            "Tournament {} knockout: {} qualified, {} eliminated, {} first-round matches",
            tournament_id,
            cut.qualifying,
            cut.eliminated.len(),
            created.len()
        );

        Ok(KnockoutOutcome {
            qualifying: cut.qualifying,
            eliminated: cut.eliminated.iter().map(|e| e.player_id).collect(),
            matches: created,
        })
    }

    /// Compute final placements and write player statistics.
    ///
    /// Running it again after a corrected final replaces the earlier records.
    pub async fn finish_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Finalization> {
        let lock = self.lock_for(tournament_id).await;
        let _guard = lock.lock().await;

        let mut tournament = self.load(tournament_id).await?;
        let matches = self
            .store
            .find_matches(&MatchFilter::tournament(tournament_id))
            .await?;
        let finalization = placement::finalize(&tournament, &matches)?;

        let mut players = Vec::with_capacity(finalization.records.len());
        for record in &finalization.records {
            let mut player = self
                .store
                .find_player(record.player_id)
                .await?
                .ok_or_else(|| TournamentError::PlayerNotFound(record.player_id.to_string()))?;

            // Lifetime figures are rebuilt from every tournament result,
            // this one replacing an earlier run
            let mut history = self.store.find_tournament_results(player.id).await?;
            history.retain(|r| r.tournament_id != tournament_id);
            history.push(record.clone());
            history.sort_by_key(|r| r.tournament_id);
            player.lifetime = history.iter().fold(PlayerStats::default(), |mut acc, r| {
                acc.merge(&r.stats);
                acc
            });
            players.push(player);
        }

        tournament.placements = finalization.placements.clone();
        tournament.status = TournamentStatus::Finished;
        self.store
            .apply_batch(WriteBatch {
                tournament: Some(tournament),
                results: finalization.records.clone(),
                players,
                ..Default::default()
            })
            .await?;
        self.forget_lock(tournament_id).await;

        info!(
            "Tournament {} finished, winner {:?}",
            tournament_id,
            finalization.placements.first().map(|p| p.player_id)
        );
        Ok(finalization)
    }

    pub async fn tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.load(tournament_id).await
    }

    /// Current standings of one group, best first
    pub async fn standings(
        &self,
        tournament_id: TournamentId,
        group_index: usize,
    ) -> TournamentResult<Vec<Standing>> {
        let tournament = self.load(tournament_id).await?;
        tournament
            .groups
            .get(group_index)
            .map(|g| g.standings.clone())
            .ok_or(TournamentError::GroupNotFound {
                tournament_id,
                group: group_index,
            })
    }

    pub async fn matches(&self, filter: &MatchFilter) -> TournamentResult<Vec<Match>> {
        self.store.find_matches(filter).await
    }

    pub async fn boards(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Board>> {
        self.store.find_boards(tournament_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, PlayerRepository};
    use crate::tournament::errors::ErrorKind;

    async fn setup(players: usize, boards: u32) -> (TournamentManager<MemoryStore>, Tournament) {
        let store = Arc::new(MemoryStore::new());
        let mut ids = Vec::new();
        for i in 0..players {
            ids.push(store.create_player(&format!("Player {i}")).await.unwrap().id);
        }
        let manager = TournamentManager::new(store, EngineConfig::default().with_seed(7));
        let tournament = manager
            .create_tournament("Test Cup", &ids, boards)
            .await
            .unwrap();
        (manager, tournament)
    }

    #[tokio::test]
    async fn test_create_validates_roster() {
        let (manager, _) = setup(3, 1).await;

        let err = manager.create_tournament("Dup", &[1, 1, 2], 1).await.unwrap_err();
        assert!(matches!(err, TournamentError::DuplicatePlayer(1)));

        let err = manager.create_tournament("Solo", &[1], 1).await.unwrap_err();
        assert!(matches!(err, TournamentError::InsufficientPlayers { .. }));

        let err = manager.create_tournament("Dark", &[1, 2], 0).await.unwrap_err();
        assert!(matches!(err, TournamentError::InsufficientBoards { .. }));

        let err = manager.create_tournament("Ghost", &[1, 99], 1).await.unwrap_err();
        assert!(matches!(err, TournamentError::PlayerNotFound(_)));
    }

    #[tokio::test]
    async fn test_group_schedule_creates_boards_and_groups() {
        let (manager, tournament) = setup(6, 2).await;
        let matches = manager.generate_group_schedule(tournament.id).await.unwrap();

        // Two groups of three: three matches each
        assert_eq!(matches.len(), 6);
        let t = manager.tournament(tournament.id).await.unwrap();
        assert_eq!(t.status, TournamentStatus::Group);
        assert_eq!(t.groups.len(), 2);
        assert!(t.groups.iter().all(|g| g.size() == 3 && g.matches.len() == 3));
        for m in &matches {
            assert_eq!(m.board_id as usize, m.round + 1);
            let scorer = m.scorer.unwrap();
            assert!(!m.has_player(scorer));
        }

        let boards = manager.boards(tournament.id).await.unwrap();
        assert!(boards.iter().all(|b| b.status == BoardStatus::Waiting));

        let err = manager
            .generate_group_schedule(tournament.id)
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_more_boards_than_pairs() {
        let (manager, tournament) = setup(5, 4).await;
        manager.generate_group_schedule(tournament.id).await.unwrap();
        let t = manager.tournament(tournament.id).await.unwrap();
        assert_eq!(t.groups.len(), 2);
        assert!(t.groups.iter().all(|g| g.size() >= 2));
    }

    #[tokio::test]
    async fn test_start_match_occupies_board() {
        let (manager, tournament) = setup(4, 1).await;
        let matches = manager.generate_group_schedule(tournament.id).await.unwrap();

        let started = manager.start_match(matches[0].id).await.unwrap();
        assert_eq!(started.status, MatchStatus::Ongoing);
        let board = &manager.boards(tournament.id).await.unwrap()[0];
        assert_eq!(board.status, BoardStatus::Playing);
        assert_eq!(board.current_match, Some(matches[0].id));

        assert!(manager.start_match(matches[0].id).await.is_err());

        let winner = started.player1;
        manager
            .commit_match_result(started.id, MatchResult::with_legs(winner, 3, 1))
            .await
            .unwrap();
        let board = &manager.boards(tournament.id).await.unwrap()[0];
        assert_eq!(board.status, BoardStatus::Waiting);
        assert_eq!(board.current_match, None);
    }

    #[tokio::test]
    async fn test_knockout_requires_finished_groups() {
        let (manager, tournament) = setup(4, 1).await;
        manager.generate_group_schedule(tournament.id).await.unwrap();

        let err = manager.generate_knockout(tournament.id).await.unwrap_err();
        assert!(matches!(
            err,
            TournamentError::GroupStageIncomplete { pending: 6 }
        ));
    }

    #[tokio::test]
    async fn test_rejected_commit_leaves_match_untouched() {
        let (manager, tournament) = setup(4, 1).await;
        let matches = manager.generate_group_schedule(tournament.id).await.unwrap();
        let m = &matches[0];

        let outsider = (1..=4).find(|p| !m.has_player(*p)).unwrap();
        let err = manager
            .commit_match_result(m.id, MatchResult::with_legs(outsider, 3, 0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let stored = manager
            .matches(&MatchFilter::tournament(tournament.id))
            .await
            .unwrap();
        assert!(stored.iter().all(|m| m.status == MatchStatus::Pending));
    }

    #[tokio::test]
    async fn test_finished_tournament_releases_its_lock() {
        let (manager, tournament) = setup(2, 1).await;
        let group = manager.generate_group_schedule(tournament.id).await.unwrap();
        manager
            .commit_match_result(group[0].id, MatchResult::with_legs(group[0].player1, 3, 0))
            .await
            .unwrap();

        let knockout = manager.generate_knockout(tournament.id).await.unwrap();
        let final_match = &knockout.matches[0];
        let outcome = manager
            .commit_match_result(
                final_match.id,
                MatchResult::with_legs(final_match.player2, 2, 3),
            )
            .await
            .unwrap();
        assert!(outcome.tournament_finished);
        assert!(manager.locks.read().await.contains_key(&tournament.id));

        manager.finish_tournament(tournament.id).await.unwrap();
        assert!(manager.locks.read().await.is_empty());

        // A later correction simply takes a fresh lock
        let corrected = manager
            .commit_match_result(
                final_match.id,
                MatchResult::with_legs(final_match.player1, 3, 2),
            )
            .await
            .unwrap();
        assert!(corrected.corrected);
        let placements = manager.finish_tournament(tournament.id).await.unwrap().placements;
        assert_eq!(placements[0].player_id, final_match.player1);
        assert!(manager.locks.read().await.is_empty());
    }
}
