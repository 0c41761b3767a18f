//! Tournament data models: groups, standings, matches, bracket and boards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::roster::PlayerId;

/// Tournament ID type
pub type TournamentId = i64;

/// Match ID type
pub type MatchId = i64;

/// Board number within a tournament (1-based)
pub type BoardId = i32;

/// Tournament lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentStatus {
    /// Players registered, no schedule yet
    Created,
    /// Round-robin group play
    Group,
    /// Single-elimination bracket
    Knockout,
    /// Final resolved
    Finished,
}

impl TournamentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Created => "created",
            TournamentStatus::Group => "group",
            TournamentStatus::Knockout => "knockout",
            TournamentStatus::Finished => "finished",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(TournamentStatus::Created),
            "group" => Some(TournamentStatus::Group),
            "knockout" => Some(TournamentStatus::Knockout),
            "finished" => Some(TournamentStatus::Finished),
            _ => None,
        }
    }
}

/// A player's seat in a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub player_id: PlayerId,
    /// Within-group seat number (1-based), stable for the group's lifetime
    pub number: u32,
}

/// A player's accumulated group record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub player_id: PlayerId,
    pub points: i32,
    pub legs_won: u32,
    pub legs_lost: u32,
    /// Always `legs_won - legs_lost`
    pub leg_difference: i32,
    /// Competition rank, 1-based, ties share a rank
    pub rank: usize,
}

impl Standing {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            points: 0,
            legs_won: 0,
            legs_lost: 0,
            leg_difference: 0,
            rank: 0,
        }
    }
}

/// A round-robin group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Position of the group in the tournament (0-based)
    pub index: usize,
    pub members: Vec<GroupMember>,
    pub matches: Vec<MatchId>,
    /// One row per player, created on the player's first result
    pub standings: Vec<Standing>,
}

impl Group {
    pub fn new(index: usize, players: &[PlayerId]) -> Self {
        let members = players
            .iter()
            .zip(1..)
            .map(|(&player_id, number)| GroupMember { player_id, number })
            .collect();

        Self {
            index,
            members,
            matches: Vec::new(),
            standings: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.members.iter().map(|m| m.player_id).collect()
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.members.iter().any(|m| m.player_id == player_id)
    }

    pub fn standing(&self, player_id: PlayerId) -> Option<&Standing> {
        self.standings.iter().find(|s| s.player_id == player_id)
    }
}

/// Lifecycle of a single bracket slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    /// One or both players known
    Seeded,
    MatchCreated,
    /// Winner known
    Resolved,
}

/// One position in the knockout tree, eventually hosting one match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketSlot {
    pub player1: Option<PlayerId>,
    pub player2: Option<PlayerId>,
    pub match_reference: Option<MatchId>,
    pub winner: Option<PlayerId>,
}

impl BracketSlot {
    pub fn seeded(player1: PlayerId, player2: PlayerId) -> Self {
        Self {
            player1: Some(player1),
            player2: Some(player2),
            match_reference: None,
            winner: None,
        }
    }

    pub fn state(&self) -> SlotState {
        if self.winner.is_some() {
            SlotState::Resolved
        } else if self.match_reference.is_some() {
            SlotState::MatchCreated
        } else if self.player1.is_some() || self.player2.is_some() {
            SlotState::Seeded
        } else {
            SlotState::Empty
        }
    }

    /// Both players known
    pub fn is_ready(&self) -> bool {
        self.player1.is_some() && self.player2.is_some()
    }

    /// The player knocked out in this slot, once resolved
    pub fn loser(&self) -> Option<PlayerId> {
        let winner = self.winner?;
        if self.player1 == Some(winner) {
            self.player2
        } else {
            self.player1
        }
    }
}

/// One knockout round
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub slots: Vec<BracketSlot>,
}

/// A player knocked out at the group stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EliminatedPlayer {
    pub player_id: PlayerId,
    pub group: usize,
    pub rank: usize,
    pub points: i32,
    pub leg_difference: i32,
}

/// The knockout bracket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Knockout {
    pub rounds: Vec<Round>,
    pub qualified: Vec<PlayerId>,
    pub eliminated: Vec<EliminatedPlayer>,
}

impl Knockout {
    pub fn is_generated(&self) -> bool {
        !self.rounds.is_empty()
    }

    pub fn final_slot(&self) -> Option<&BracketSlot> {
        self.rounds.last().and_then(|round| round.slots.first())
    }

    /// Locate the slot hosting a match as `(round, slot_index)`
    pub fn locate(&self, match_id: MatchId) -> Option<(usize, usize)> {
        self.rounds.iter().enumerate().find_map(|(r, round)| {
            round
                .slots
                .iter()
                .position(|slot| slot.match_reference == Some(match_id))
                .map(|s| (r, s))
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.final_slot().is_some_and(|slot| slot.winner.is_some())
    }
}

/// Final placement of one player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub player_id: PlayerId,
    pub placement: usize,
}

/// A tournament and all of its group and bracket state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub players: Vec<PlayerId>,
    pub board_count: u32,
    pub status: TournamentStatus,
    pub groups: Vec<Group>,
    pub knockout: Knockout,
    pub placements: Vec<Placement>,
    pub created_at: DateTime<Utc>,
}

impl Tournament {
    pub fn group_of(&self, player_id: PlayerId) -> Option<&Group> {
        self.groups.iter().find(|g| g.contains(player_id))
    }
}

/// Data needed to insert a tournament
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTournament {
    pub name: String,
    pub players: Vec<PlayerId>,
    pub board_count: u32,
}

/// Match lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    Pending,
    Ongoing,
    Finished,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Ongoing => "ongoing",
            MatchStatus::Finished => "finished",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(MatchStatus::Pending),
            "ongoing" => Some(MatchStatus::Ongoing),
            "finished" => Some(MatchStatus::Finished),
            _ => None,
        }
    }
}

/// One player's statistics for a single leg
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegStats {
    pub darts_thrown: u32,
    pub points_scored: u32,
    pub checkout_attempts: u32,
}

impl LegStats {
    /// Three-dart average for the leg
    pub fn average(&self) -> f64 {
        if self.darts_thrown == 0 {
            0.0
        } else {
            f64::from(self.points_scored) / f64::from(self.darts_thrown) * 3.0
        }
    }
}

/// One finished leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegResult {
    pub winner: PlayerId,
    pub player1: LegStats,
    pub player2: LegStats,
}

/// One player's statistics for a whole match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerMatchStats {
    pub legs_won: u32,
    pub darts_thrown: u32,
    /// Three-dart average
    pub average: f64,
    pub checkout_attempts: u32,
    pub highest_checkout: i64,
    /// Dart count at which each 180 was thrown
    pub one_eighties: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchStats {
    pub player1: PlayerMatchStats,
    pub player2: PlayerMatchStats,
}

/// A scheduled or played match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub board_id: BoardId,
    pub player1: PlayerId,
    pub player2: PlayerId,
    pub scorer: Option<PlayerId>,
    pub status: MatchStatus,
    /// Group index for group matches, 0-based bracket round for knockout matches
    pub round: usize,
    pub is_knockout: bool,
    pub winner: Option<PlayerId>,
    pub stats: MatchStats,
    pub legs: Vec<LegResult>,
}

impl Match {
    pub fn has_player(&self, player_id: PlayerId) -> bool {
        self.player1 == player_id || self.player2 == player_id
    }

    pub fn is_between(&self, a: PlayerId, b: PlayerId) -> bool {
        (self.player1 == a && self.player2 == b) || (self.player1 == b && self.player2 == a)
    }

    pub fn loser(&self) -> Option<PlayerId> {
        let winner = self.winner?;
        Some(if winner == self.player1 {
            self.player2
        } else {
            self.player1
        })
    }

    /// Legs won by `player_id` and by the opponent, in that order
    pub fn legs_for(&self, player_id: PlayerId) -> (u32, u32) {
        if player_id == self.player1 {
            (self.stats.player1.legs_won, self.stats.player2.legs_won)
        } else {
            (self.stats.player2.legs_won, self.stats.player1.legs_won)
        }
    }

    pub fn stats_for(&self, player_id: PlayerId) -> &PlayerMatchStats {
        if player_id == self.player1 {
            &self.stats.player1
        } else {
            &self.stats.player2
        }
    }
}

/// Data needed to insert a match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatch {
    pub tournament_id: TournamentId,
    pub board_id: BoardId,
    pub player1: PlayerId,
    pub player2: PlayerId,
    pub scorer: Option<PlayerId>,
    pub round: usize,
    pub is_knockout: bool,
}

impl NewMatch {
    /// Pending match stored under a reserved `id`
    pub fn into_match(self, id: MatchId) -> Match {
        Match {
            id,
            tournament_id: self.tournament_id,
            board_id: self.board_id,
            player1: self.player1,
            player2: self.player2,
            scorer: self.scorer,
            status: MatchStatus::Pending,
            round: self.round,
            is_knockout: self.is_knockout,
            winner: None,
            stats: MatchStats::default(),
            legs: Vec::new(),
        }
    }
}

/// Finished-match payload submitted by a moderator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub winner: PlayerId,
    pub player1: PlayerMatchStats,
    pub player2: PlayerMatchStats,
    #[serde(default)]
    pub legs: Vec<LegResult>,
}

impl MatchResult {
    /// Result with only leg counts, no throwing statistics
    pub fn with_legs(winner: PlayerId, player1_legs: u32, player2_legs: u32) -> Self {
        Self {
            winner,
            player1: PlayerMatchStats {
                legs_won: player1_legs,
                ..Default::default()
            },
            player2: PlayerMatchStats {
                legs_won: player2_legs,
                ..Default::default()
            },
            legs: Vec::new(),
        }
    }
}

/// Board occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardStatus {
    Idle,
    /// Next match known, players called to the board
    Waiting,
    Playing,
}

impl BoardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardStatus::Idle => "idle",
            BoardStatus::Waiting => "waiting",
            BoardStatus::Playing => "playing",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "idle" => Some(BoardStatus::Idle),
            "waiting" => Some(BoardStatus::Waiting),
            "playing" => Some(BoardStatus::Playing),
            _ => None,
        }
    }
}

/// A physical dartboard assigned to a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub tournament_id: TournamentId,
    pub board_id: BoardId,
    pub status: BoardStatus,
    pub waiting_players: Vec<PlayerId>,
    pub current_match: Option<MatchId>,
}

impl Board {
    pub fn idle(tournament_id: TournamentId, board_id: BoardId) -> Self {
        Self {
            tournament_id,
            board_id,
            status: BoardStatus::Idle,
            waiting_players: Vec::new(),
            current_match: None,
        }
    }
}

/// Criteria for match lookups; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchFilter {
    pub tournament_id: Option<TournamentId>,
    pub board_id: Option<BoardId>,
    pub status: Option<MatchStatus>,
    pub is_knockout: Option<bool>,
    pub round: Option<usize>,
}

impl MatchFilter {
    pub fn tournament(tournament_id: TournamentId) -> Self {
        Self {
            tournament_id: Some(tournament_id),
            ..Default::default()
        }
    }

    pub fn with_board(mut self, board_id: BoardId) -> Self {
        self.board_id = Some(board_id);
        self
    }

    pub fn with_status(mut self, status: MatchStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn knockout(mut self, is_knockout: bool) -> Self {
        self.is_knockout = Some(is_knockout);
        self
    }

    pub fn matches(&self, m: &Match) -> bool {
        self.tournament_id.is_none_or(|id| m.tournament_id == id)
            && self.board_id.is_none_or(|id| m.board_id == id)
            && self.status.is_none_or(|status| m.status == status)
            && self.is_knockout.is_none_or(|k| m.is_knockout == k)
            && self.round.is_none_or(|round| m.round == round)
    }
}
