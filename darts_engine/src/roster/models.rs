//! Player roster data models and aggregated statistics.

use serde::{Deserialize, Serialize};

use crate::tournament::models::TournamentId;

/// Player ID type
pub type PlayerId = i64;

/// Aggregated playing statistics, either per tournament or over a career.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub matches_played: u32,
    pub matches_won: u32,
    pub legs_played: u32,
    pub legs_won: u32,
    /// Three-dart average, weighted by legs played
    pub average: f64,
    pub checkout_attempts: u32,
    pub checkouts_hit: u32,
    pub highest_checkout: i64,
    pub one_eighties: u32,
}

impl PlayerStats {
    /// Fold `legs` legs played at `leg_average` into the running average.
    pub fn fold_average(&mut self, leg_average: f64, legs: u32) {
        if legs == 0 {
            return;
        }
        let so_far = f64::from(self.legs_played);
        let added = f64::from(legs);
        self.average = (self.average * so_far + leg_average * added) / (so_far + added);
        self.legs_played += legs;
    }

    /// Share of checkout attempts that were hit, 0.0 when nothing was attempted
    pub fn checkout_rate(&self) -> f64 {
        if self.checkout_attempts == 0 {
            0.0
        } else {
            f64::from(self.checkouts_hit) / f64::from(self.checkout_attempts)
        }
    }

    /// Merge another record into this one, keeping the average weighted by legs.
    pub fn merge(&mut self, other: &PlayerStats) {
        self.fold_average(other.average, other.legs_played);
        self.matches_played += other.matches_played;
        self.matches_won += other.matches_won;
        self.legs_won += other.legs_won;
        self.checkout_attempts += other.checkout_attempts;
        self.checkouts_hit += other.checkouts_hit;
        self.highest_checkout = self.highest_checkout.max(other.highest_checkout);
        self.one_eighties += other.one_eighties;
    }
}

/// A registered player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Career statistics over every finished tournament
    pub lifetime: PlayerStats,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            lifetime: PlayerStats::default(),
        }
    }
}

/// A player's result in one finished tournament
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerTournamentRecord {
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    /// Final placement, 1 is the winner
    pub placement: usize,
    pub stats: PlayerStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_average_weights_by_legs() {
        let mut stats = PlayerStats::default();
        stats.fold_average(60.0, 3);
        assert_eq!(stats.legs_played, 3);
        assert!((stats.average - 60.0).abs() < f64::EPSILON);

        stats.fold_average(90.0, 1);
        assert_eq!(stats.legs_played, 4);
        assert!((stats.average - 67.5).abs() < 1e-9);
    }

    #[test]
    fn test_fold_average_ignores_empty() {
        let mut stats = PlayerStats::default();
        stats.fold_average(100.0, 0);
        assert_eq!(stats.legs_played, 0);
        assert_eq!(stats.average, 0.0);
    }

    #[test]
    fn test_checkout_rate() {
        let stats = PlayerStats {
            checkout_attempts: 8,
            checkouts_hit: 2,
            ..Default::default()
        };
        assert!((stats.checkout_rate() - 0.25).abs() < f64::EPSILON);
        assert_eq!(PlayerStats::default().checkout_rate(), 0.0);
    }

    #[test]
    fn test_merge_keeps_maxima_and_sums() {
        let mut career = PlayerStats {
            matches_played: 2,
            matches_won: 1,
            legs_played: 6,
            legs_won: 3,
            average: 50.0,
            checkout_attempts: 6,
            checkouts_hit: 3,
            highest_checkout: 100,
            one_eighties: 1,
        };
        let tournament = PlayerStats {
            matches_played: 1,
            matches_won: 1,
            legs_played: 2,
            legs_won: 2,
            average: 90.0,
            checkout_attempts: 2,
            checkouts_hit: 2,
            highest_checkout: 121,
            one_eighties: 2,
        };
        career.merge(&tournament);
        assert_eq!(career.matches_played, 3);
        assert_eq!(career.legs_played, 8);
        assert_eq!(career.legs_won, 5);
        assert_eq!(career.highest_checkout, 121);
        assert_eq!(career.one_eighties, 3);
        assert!((career.average - 60.0).abs() < 1e-9);
    }
}
