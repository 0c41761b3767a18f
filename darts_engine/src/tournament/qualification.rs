//! Group-to-knockout qualification and cross-group seeding.
//!
//! The bracket always holds a power of two players so no byes are needed. The
//! surplus is knocked out at the group stage, spread over the groups in
//! proportion to their size.

use log::debug;

use super::errors::{TournamentError, TournamentResult};
use super::models::{BracketSlot, EliminatedPlayer, Group, Knockout, Round};
use crate::roster::PlayerId;

/// Outcome of the cut after group play
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Qualification {
    pub qualifying: usize,
    pub eliminated: Vec<EliminatedPlayer>,
    /// Qualifiers per group, best rank first
    pub qualified: Vec<Vec<PlayerId>>,
    /// First-round pairings in bracket order
    pub pairings: Vec<(PlayerId, PlayerId)>,
}

/// Largest power of two not above `total`
pub fn qualifying_count(total: usize) -> usize {
    if total == 0 {
        0
    } else {
        1 << total.ilog2()
    }
}

/// Split `eliminated` group-stage eliminations over groups of the given sizes.
pub fn distribute_eliminations(sizes: &[usize], eliminated: usize) -> TournamentResult<Vec<usize>> {
    let total: usize = sizes.iter().sum();
    if total == 0 {
        return Err(TournamentError::InsufficientPlayers {
            needed: 2,
            current: 0,
        });
    }

    let target = eliminated as i64;
    let mut shares: Vec<i64> = sizes
        .iter()
        .map(|&size| (size as f64 / total as f64 * eliminated as f64).round() as i64)
        .collect();
    let mut sum: i64 = shares.iter().sum();

    while sum > target {
        let (idx, _) = shares
            .iter()
            .enumerate()
            .filter(|&(_, &share)| share > 0)
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
            .ok_or(TournamentError::InsufficientQualifiers {
                needed: eliminated,
                available: 0,
            })?;
        shares[idx] -= 1;
        sum -= 1;
    }

    while sum < target {
        let (idx, _) = shares
            .iter()
            .zip(sizes)
            .map(|(&share, &size)| size as i64 - share)
            .enumerate()
            .filter(|&(_, room)| room > 0)
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
            .ok_or(TournamentError::InsufficientQualifiers {
                needed: eliminated,
                available: sum as usize,
            })?;
        shares[idx] += 1;
        sum += 1;
    }

    shares
        .into_iter()
        .enumerate()
        .map(|(group, share)| {
            usize::try_from(share).map_err(|_| TournamentError::NegativeEliminations {
                group,
                eliminations: share,
            })
        })
        .collect()
}

/// Cross-group first-round pairings.
///
/// Qualifiers are interleaved by seed (every group's number one, then every
/// number two, ...) and the best remaining seed meets the worst. Each pair is
/// written with the lower group index first and pairs are ordered by that
/// player's group and seed. With two groups this gives A1-B4, A2-B3, A3-B2,
/// A4-B1.
pub fn pair(qualified: &[Vec<PlayerId>]) -> Vec<(PlayerId, PlayerId)> {
    let deepest = qualified.iter().map(Vec::len).max().unwrap_or(0);

    // (group, seed, player)
    let mut seeds = Vec::new();
    for seed in 0..deepest {
        for (group, players) in qualified.iter().enumerate() {
            if let Some(&player) = players.get(seed) {
                seeds.push((group, seed, player));
            }
        }
    }

    let count = seeds.len();
    let mut pairs: Vec<_> = (0..count / 2)
        .map(|i| {
            let (high, low) = (seeds[i], seeds[count - 1 - i]);
            if (low.0, low.1) < (high.0, high.1) {
                (low, high)
            } else {
                (high, low)
            }
        })
        .collect();
    pairs.sort_by_key(|(first, _)| (first.0, first.1));

    pairs
        .into_iter()
        .map(|(first, second)| (first.2, second.2))
        .collect()
}

/// Build the full bracket: seeded round 0 plus empty later rounds.
pub fn build_bracket(pairings: &[(PlayerId, PlayerId)]) -> Knockout {
    let mut rounds = vec![Round {
        slots: pairings
            .iter()
            .map(|&(a, b)| BracketSlot::seeded(a, b))
            .collect(),
    }];

    let mut width = pairings.len();
    while width > 1 {
        width = width.div_ceil(2);
        rounds.push(Round {
            slots: vec![BracketSlot::default(); width],
        });
    }

    Knockout {
        rounds,
        qualified: pairings.iter().flat_map(|&(a, b)| [a, b]).collect(),
        eliminated: Vec::new(),
    }
}

/// Decide who advances from ranked groups and pair them.
///
/// Group standings must already be sorted and ranked.
pub fn qualify(groups: &[Group]) -> TournamentResult<Qualification> {
    let sizes: Vec<usize> = groups.iter().map(Group::size).collect();
    let total: usize = sizes.iter().sum();
    if total < 2 {
        return Err(TournamentError::InsufficientPlayers {
            needed: 2,
            current: total,
        });
    }

    let qualifying = qualifying_count(total);
    let ranked: usize = groups.iter().map(|g| g.standings.len()).sum();
    if ranked < qualifying {
        return Err(TournamentError::InsufficientQualifiers {
            needed: qualifying,
            available: ranked,
        });
    }

    let shares = distribute_eliminations(&sizes, total - qualifying)?;
    debug!("Qualifying {qualifying} of {total} players, eliminations per group {shares:?}");

    let mut eliminated = Vec::new();
    let mut qualified = Vec::with_capacity(groups.len());

    for (group, &share) in groups.iter().zip(&shares) {
        let keep = group.standings.len().checked_sub(share).ok_or(
            TournamentError::InsufficientQualifiers {
                needed: share,
                available: group.standings.len(),
            },
        )?;

        qualified.push(group.standings[..keep].iter().map(|s| s.player_id).collect());
        eliminated.extend(group.standings[keep..].iter().map(|s| EliminatedPlayer {
            player_id: s.player_id,
            group: group.index,
            rank: s.rank,
            points: s.points,
            leg_difference: s.leg_difference,
        }));
    }

    let seeded: usize = qualified.iter().map(Vec::len).sum();
    if seeded != qualifying {
        return Err(TournamentError::InsufficientQualifiers {
            needed: qualifying,
            available: seeded,
        });
    }

    let pairings = pair(&qualified);

    Ok(Qualification {
        qualifying,
        eliminated,
        qualified,
        pairings,
    })
}
