//! Final placements and per-player tournament statistics.

use std::collections::HashMap;

use super::errors::{TournamentError, TournamentResult};
use super::models::{Match, MatchId, MatchStatus, Placement, Tournament, TournamentStatus};
use crate::roster::{PlayerId, PlayerStats, PlayerTournamentRecord};

/// Everything written back when a tournament is finalised
#[derive(Debug, Clone, PartialEq)]
pub struct Finalization {
    /// Sorted by placement
    pub placements: Vec<Placement>,
    pub records: Vec<PlayerTournamentRecord>,
}

/// Fold every finished match `player_id` took part in into one record.
pub fn aggregate_stats(player_id: PlayerId, matches: &[Match]) -> PlayerStats {
    let mut stats = PlayerStats::default();

    for m in matches
        .iter()
        .filter(|m| m.status == MatchStatus::Finished && m.has_player(player_id))
    {
        let own = m.stats_for(player_id);
        let (won, lost) = m.legs_for(player_id);

        stats.matches_played += 1;
        if m.winner == Some(player_id) {
            stats.matches_won += 1;
        }
        stats.legs_won += won;
        stats.highest_checkout = stats.highest_checkout.max(own.highest_checkout);
        stats.one_eighties += own.one_eighties.len() as u32;

        if m.legs.is_empty() {
            stats.fold_average(own.average, won + lost);
            stats.checkout_attempts += own.checkout_attempts;
            stats.checkouts_hit += won;
        } else {
            for leg in &m.legs {
                let side = if player_id == m.player1 {
                    &leg.player1
                } else {
                    &leg.player2
                };
                stats.fold_average(side.average(), 1);
                stats.checkout_attempts += side.checkout_attempts;
                if leg.winner == player_id {
                    stats.checkouts_hit += 1;
                }
            }
        }
    }

    stats
}

/// Placement for every player of a tournament whose final is decided.
pub fn compute_placements(
    tournament: &Tournament,
    knockout_matches: &[Match],
) -> TournamentResult<Vec<Placement>> {
    if !matches!(
        tournament.status,
        TournamentStatus::Knockout | TournamentStatus::Finished
    ) {
        return Err(TournamentError::InvalidState {
            expected: vec![TournamentStatus::Knockout, TournamentStatus::Finished],
            actual: tournament.status,
        });
    }

    let knockout = &tournament.knockout;
    if !knockout.is_resolved() {
        return Err(TournamentError::BracketUnresolved);
    }

    let by_id: HashMap<MatchId, &Match> = knockout_matches.iter().map(|m| (m.id, m)).collect();
    let qualifying = knockout.qualified.len();
    let mut placements = Vec::with_capacity(tournament.players.len());

    // Group-stage exits fill the bottom places, the worst rank last
    let mut eliminated = knockout.eliminated.clone();
    eliminated.sort_by(|a, b| {
        a.rank
            .cmp(&b.rank)
            .then(b.points.cmp(&a.points))
            .then(b.leg_difference.cmp(&a.leg_difference))
            .then(a.group.cmp(&b.group))
            .then(a.player_id.cmp(&b.player_id))
    });
    placements.extend(eliminated.iter().enumerate().map(|(i, e)| Placement {
        player_id: e.player_id,
        placement: qualifying + 1 + i,
    }));

    let last_round = knockout.rounds.len() - 1;
    for (r, round) in knockout.rounds.iter().enumerate() {
        let players_in_round = round.slots.len() * 2;
        let mut next_place = if r == last_round {
            2
        } else {
            players_in_round / 2 + 1
        };

        for (s, slot) in round.slots.iter().enumerate() {
            if slot.player1.is_none() && slot.player2.is_none() {
                return Err(TournamentError::BracketInconsistent(format!(
                    "round {r} slot {s} has no players"
                )));
            }

            let winner = slot
                .match_reference
                .and_then(|id| by_id.get(&id))
                .filter(|m| m.status == MatchStatus::Finished)
                .and_then(|m| m.winner)
                .ok_or(TournamentError::BracketUnresolved)?;
            if slot.winner != Some(winner) {
                return Err(TournamentError::BracketInconsistent(format!(
                    "round {r} slot {s} records winner {:?}, match says {winner}",
                    slot.winner
                )));
            }
            let loser = slot.loser().ok_or_else(|| {
                TournamentError::BracketInconsistent(format!("round {r} slot {s} has no loser"))
            })?;

            placements.push(Placement {
                player_id: loser,
                placement: next_place,
            });
            next_place += 1;

            if r == last_round {
                placements.push(Placement {
                    player_id: winner,
                    placement: 1,
                });
            }
        }
    }

    if placements.len() != tournament.players.len() {
        return Err(TournamentError::BracketInconsistent(format!(
            "placed {} of {} players",
            placements.len(),
            tournament.players.len()
        )));
    }

    placements.sort_by_key(|p| p.placement);
    Ok(placements)
}

/// Placements plus one statistics record per player.
pub fn finalize(tournament: &Tournament, matches: &[Match]) -> TournamentResult<Finalization> {
    let knockout_matches: Vec<Match> = matches.iter().filter(|m| m.is_knockout).cloned().collect();
    let placements = compute_placements(tournament, &knockout_matches)?;

    let records = placements
        .iter()
        .map(|p| PlayerTournamentRecord {
            tournament_id: tournament.id,
            player_id: p.player_id,
            placement: p.placement,
            stats: aggregate_stats(p.player_id, matches),
        })
        .collect();

    Ok(Finalization {
        placements,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::bracket;
    use crate::tournament::models::{
        EliminatedPlayer, Group, LegResult, LegStats, MatchStats, PlayerMatchStats,
    };
    use crate::tournament::qualification::build_bracket;
    use chrono::Utc;

    fn finished(id: MatchId, p1: PlayerId, p2: PlayerId, winner: PlayerId, round: usize) -> Match {
        let mut stats = MatchStats::default();
        if winner == p1 {
            stats.player1.legs_won = 3;
            stats.player2.legs_won = 1;
        } else {
            stats.player1.legs_won = 1;
            stats.player2.legs_won = 3;
        }
        Match {
            id,
            tournament_id: 1,
            board_id: 1,
            player1: p1,
            player2: p2,
            scorer: None,
            status: MatchStatus::Finished,
            round,
            is_knockout: true,
            winner: Some(winner),
            stats,
            legs: Vec::new(),
        }
    }

    /// Six players: 5 and 6 out in the groups, 1 beats 4, 3 beats 2, 1 wins the final
    fn decided() -> (Tournament, Vec<Match>) {
        let mut knockout = build_bracket(&[(1, 4), (2, 3)]);
        knockout.eliminated = vec![
            EliminatedPlayer {
                player_id: 6,
                group: 1,
                rank: 3,
                points: 0,
                leg_difference: -6,
            },
            EliminatedPlayer {
                player_id: 5,
                group: 0,
                rank: 3,
                points: 0,
                leg_difference: -4,
            },
        ];
        let matches = vec![
            finished(10, 1, 4, 1, 0),
            finished(11, 2, 3, 3, 0),
            finished(12, 1, 3, 1, 1),
        ];
        bracket::attach_match(&mut knockout, 0, 0, 10).unwrap();
        bracket::attach_match(&mut knockout, 0, 1, 11).unwrap();
        bracket::resolve(&mut knockout, 10, 1).unwrap();
        bracket::resolve(&mut knockout, 11, 3).unwrap();
        bracket::attach_match(&mut knockout, 1, 0, 12).unwrap();
        bracket::resolve(&mut knockout, 12, 1).unwrap();

        let tournament = Tournament {
            id: 1,
            name: "Club Night".to_string(),
            players: vec![1, 2, 3, 4, 5, 6],
            board_count: 2,
            status: TournamentStatus::Finished,
            groups: vec![Group::new(0, &[1, 2, 5]), Group::new(1, &[3, 4, 6])],
            knockout,
            placements: Vec::new(),
            created_at: Utc::now(),
        };
        (tournament, matches)
    }

    #[test]
    fn test_placements_total_order() {
        let (tournament, matches) = decided();
        let placements = compute_placements(&tournament, &matches).unwrap();

        let order: Vec<(PlayerId, usize)> =
            placements.iter().map(|p| (p.player_id, p.placement)).collect();
        assert_eq!(order, vec![(1, 1), (3, 2), (4, 3), (2, 4), (5, 5), (6, 6)]);
    }

    #[test]
    fn test_unresolved_bracket_rejected() {
        let (mut tournament, matches) = decided();
        tournament.knockout.rounds[1].slots[0].winner = None;
        assert!(matches!(
            compute_placements(&tournament, &matches),
            Err(TournamentError::BracketUnresolved)
        ));
    }

    #[test]
    fn test_missing_match_winner_rejected() {
        let (tournament, mut matches) = decided();
        matches[1].winner = None;
        assert!(compute_placements(&tournament, &matches).is_err());
    }

    #[test]
    fn test_wrong_status_rejected() {
        let (mut tournament, matches) = decided();
        tournament.status = TournamentStatus::Group;
        assert!(matches!(
            compute_placements(&tournament, &matches),
            Err(TournamentError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_aggregate_from_match_totals() {
        let mut m = finished(1, 1, 2, 1, 0);
        m.stats.player1 = PlayerMatchStats {
            legs_won: 3,
            darts_thrown: 60,
            average: 75.0,
            checkout_attempts: 6,
            highest_checkout: 96,
            one_eighties: vec![4, 17],
        };
        let mut other = finished(2, 3, 1, 3, 0);
        other.stats.player2.average = 55.0;
        other.stats.player2.checkout_attempts = 2;

        let stats = aggregate_stats(1, &[m, other]);
        assert_eq!(stats.matches_played, 2);
        assert_eq!(stats.matches_won, 1);
        assert_eq!(stats.legs_played, 8);
        assert_eq!(stats.legs_won, 4);
        assert_eq!(stats.checkouts_hit, 4);
        assert_eq!(stats.checkout_attempts, 8);
        assert_eq!(stats.highest_checkout, 96);
        assert_eq!(stats.one_eighties, 2);
        assert!((stats.average - 65.0).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_from_legs() {
        let mut m = finished(1, 1, 2, 1, 0);
        m.stats.player1.legs_won = 2;
        m.stats.player2.legs_won = 0;
        m.legs = vec![
            LegResult {
                winner: 1,
                player1: LegStats {
                    darts_thrown: 15,
                    points_scored: 501,
                    checkout_attempts: 1,
                },
                player2: LegStats {
                    darts_thrown: 15,
                    points_scored: 400,
                    checkout_attempts: 0,
                },
            },
            LegResult {
                winner: 1,
                player1: LegStats {
                    darts_thrown: 21,
                    points_scored: 501,
                    checkout_attempts: 3,
                },
                player2: LegStats {
                    darts_thrown: 21,
                    points_scored: 350,
                    checkout_attempts: 2,
                },
            },
        ];

        let stats = aggregate_stats(1, std::slice::from_ref(&m));
        assert_eq!(stats.legs_played, 2);
        assert_eq!(stats.checkouts_hit, 2);
        assert_eq!(stats.checkout_attempts, 4);
        let expected = (100.2 + 501.0 / 21.0 * 3.0) / 2.0;
        assert!((stats.average - expected).abs() < 1e-9);

        let loser = aggregate_stats(2, &[m]);
        assert_eq!(loser.legs_won, 0);
        assert_eq!(loser.checkouts_hit, 0);
        assert_eq!(loser.checkout_attempts, 2);
    }

    #[test]
    fn test_finalize_records_every_player() {
        let (tournament, matches) = decided();
        let finalization = finalize(&tournament, &matches).unwrap();
        assert_eq!(finalization.records.len(), 6);
        let champion = finalization
            .records
            .iter()
            .find(|r| r.placement == 1)
            .unwrap();
        assert_eq!(champion.player_id, 1);
        assert_eq!(champion.stats.matches_won, 2);
    }
}
