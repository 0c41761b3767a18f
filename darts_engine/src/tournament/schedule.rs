//! Round-robin group scheduling with scorer rotation.
//!
//! The schedule is produced by shuffling the list of all pairings until no
//! player has to play more than `max_consecutive_matches` matches in a row.
//! Scorers are then handed out so that the scoring duty is spread as evenly as
//! the pairing order allows.

use log::{debug, warn};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

use super::errors::{TournamentError, TournamentResult};
use crate::config::EngineConfig;

/// One scheduled match, expressed as indices into the group's player list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledMatch {
    pub player1: usize,
    pub player2: usize,
    pub scorer: usize,
}

/// Complete group schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSchedule {
    pub matches: Vec<ScheduledMatch>,
    /// Shuffles used to find the accepted order
    pub attempts: usize,
    /// False when the attempt budget ran out and the last shuffle was kept
    pub fair: bool,
}

impl GroupSchedule {
    /// Scoring assignments per player index
    pub fn scorer_counts(&self, players: usize) -> Vec<usize> {
        let mut counts = vec![0; players];
        for m in &self.matches {
            counts[m.scorer] += 1;
        }
        counts
    }
}

/// Every unordered pair of `n` players, lower index first
pub fn pairings(n: usize) -> Vec<(usize, usize)> {
    (0..n)
        .flat_map(|a| (a + 1..n).map(move |b| (a, b)))
        .collect()
}

/// Longest run of back-to-back matches any single player has in `order`
pub fn longest_streak(order: &[(usize, usize)], players: usize) -> usize {
    let mut current = vec![0usize; players];
    let mut longest = 0;

    for &(a, b) in order {
        for (player, streak) in current.iter_mut().enumerate() {
            if player == a || player == b {
                *streak += 1;
                longest = longest.max(*streak);
            } else {
                *streak = 0;
            }
        }
    }

    longest
}

/// Generate the match order and scorer assignments for a group of `players`.
pub fn generate_schedule<R: Rng + ?Sized>(
    players: usize,
    config: &EngineConfig,
    rng: &mut R,
) -> TournamentResult<GroupSchedule> {
    if players < 2 {
        return Err(TournamentError::InsufficientPlayers {
            needed: 2,
            current: players,
        });
    }

    let mut order = pairings(players);
    let budget = config.schedule_attempts.max(1);
    let mut attempts = 0;
    let mut fair = false;

    while attempts < budget {
        attempts += 1;
        order.shuffle(rng);
        if longest_streak(&order, players) <= config.max_consecutive_matches {
            fair = true;
            break;
        }
    }

    if fair {
        debug!("Found fair order for {players} players after {attempts} shuffles");
    } else {
        warn!(
            "No order with at most {} consecutive matches for {} players after {} shuffles, keeping the last one",
            config.max_consecutive_matches, players, attempts
        );
    }

    let matches = assign_scorers(&order, players, rng)?;

    Ok(GroupSchedule {
        matches,
        attempts,
        fair,
    })
}

/// Hand out scorers in schedule order, preferring players who scored least.
fn assign_scorers<R: Rng + ?Sized>(
    order: &[(usize, usize)],
    players: usize,
    rng: &mut R,
) -> TournamentResult<Vec<ScheduledMatch>> {
    let mut counts = vec![0usize; players];
    let mut matches = Vec::with_capacity(order.len());

    for &(player1, player2) in order {
        // Two-player groups score their own matches
        let eligible: Vec<usize> = if players < 3 {
            vec![player1, player2]
        } else {
            (0..players)
                .filter(|&p| p != player1 && p != player2)
                .collect()
        };

        let fewest = eligible
            .iter()
            .map(|&p| counts[p])
            .min()
            .ok_or(TournamentError::InsufficientPlayers {
                needed: 3,
                current: players,
            })?;
        let candidates: Vec<usize> = eligible
            .into_iter()
            .filter(|&p| counts[p] == fewest)
            .collect();

        let &scorer = candidates
            .choose(rng)
            .ok_or(TournamentError::InsufficientPlayers {
                needed: 3,
                current: players,
            })?;
        counts[scorer] += 1;

        matches.push(ScheduledMatch {
            player1,
            player2,
            scorer,
        });
    }

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn schedule(players: usize, seed: u64) -> GroupSchedule {
        let mut rng = StdRng::seed_from_u64(seed);
        generate_schedule(players, &EngineConfig::default(), &mut rng).unwrap()
    }

    #[test]
    fn test_pairings_count() {
        assert_eq!(pairings(2), vec![(0, 1)]);
        assert_eq!(pairings(4).len(), 6);
        assert_eq!(pairings(7).len(), 21);
    }

    #[test]
    fn test_longest_streak() {
        assert_eq!(longest_streak(&[(0, 1), (0, 2), (0, 3)], 4), 3);
        assert_eq!(longest_streak(&[(0, 1), (2, 3), (0, 2)], 4), 2);
        assert_eq!(longest_streak(&[], 4), 0);
    }

    #[test]
    fn test_four_player_group() {
        let s = schedule(4, 7);
        assert_eq!(s.matches.len(), 6);
        assert!(s.fair);

        let pairs: HashSet<(usize, usize)> = s
            .matches
            .iter()
            .map(|m| (m.player1.min(m.player2), m.player1.max(m.player2)))
            .collect();
        assert_eq!(pairs.len(), 6);

        for m in &s.matches {
            assert_ne!(m.scorer, m.player1);
            assert_ne!(m.scorer, m.player2);
        }
    }

    #[test]
    fn test_two_player_group_self_scores() {
        let s = schedule(2, 1);
        assert_eq!(s.matches.len(), 1);
        let m = s.matches[0];
        assert!(m.scorer == m.player1 || m.scorer == m.player2);
    }

    #[test]
    fn test_single_player_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = generate_schedule(1, &EngineConfig::default(), &mut rng);
        assert!(matches!(
            result,
            Err(TournamentError::InsufficientPlayers { needed: 2, current: 1 })
        ));
    }

    #[test]
    fn test_fallback_keeps_last_shuffle() {
        // Every order of 3 players has someone playing twice in a row
        let config = EngineConfig {
            schedule_attempts: 5,
            max_consecutive_matches: 1,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let s = generate_schedule(3, &config, &mut rng).unwrap();
        assert!(!s.fair);
        assert_eq!(s.attempts, 5);
        assert_eq!(s.matches.len(), 3);
    }

    #[test]
    fn test_same_seed_same_schedule() {
        assert_eq!(schedule(6, 99), schedule(6, 99));
    }

    #[test]
    fn test_every_assignment_counted() {
        let s = schedule(5, 11);
        let counts = s.scorer_counts(5);
        assert_eq!(counts.iter().sum::<usize>(), 10);
    }
}
