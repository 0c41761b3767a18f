//! Engine configuration.

use std::env;

/// Tunables for scheduling and scoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Shuffles tried before accepting an unfair group schedule
    pub schedule_attempts: usize,

    /// Longest run of back-to-back matches a player may have
    pub max_consecutive_matches: usize,

    /// Standing points awarded for a match win
    pub points_per_win: i32,

    /// Fixed seed for the scheduling random source
    pub schedule_seed: Option<u64>,
}

impl EngineConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `SCHEDULE_ATTEMPTS`: Shuffle budget per group (default: 1000)
    /// - `MAX_CONSECUTIVE_MATCHES`: Fairness bound (default: 2)
    /// - `POINTS_PER_WIN`: Points for a win (default: 2)
    /// - `SCHEDULE_SEED`: Seed for deterministic schedules (default: unset)
    ///
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            schedule_attempts: env::var("SCHEDULE_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.schedule_attempts),
            max_consecutive_matches: env::var("MAX_CONSECUTIVE_MATCHES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_consecutive_matches),
            points_per_win: env::var("POINTS_PER_WIN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.points_per_win),
            schedule_seed: env::var("SCHEDULE_SEED")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.schedule_seed = Some(seed);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schedule_attempts: 1000,
            max_consecutive_matches: 2,
            points_per_win: 2,
            schedule_seed: None,
        }
    }
}
