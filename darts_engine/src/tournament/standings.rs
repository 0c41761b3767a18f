//! Group standings: result folding, ordering and competition ranking.
//!
//! Order is points, then leg difference, then the head-to-head result between
//! the two players being compared. Ranks are recomputed from a full re-sort on
//! every change; groups are small and a full pass is easy to verify.

use std::cmp::Ordering;

use super::errors::{TournamentError, TournamentResult};
use super::models::{Match, MatchStatus, Standing};
use crate::roster::PlayerId;

/// Head-to-head comparison of `a` against `b` using finished matches.
///
/// `Less` means `a` beat `b` and sorts first. Without a decided match between
/// exactly these two players the pair is equal.
pub fn head_to_head(a: PlayerId, b: PlayerId, finished: &[Match]) -> Ordering {
    let decided = finished
        .iter()
        .filter(|m| m.status == MatchStatus::Finished && m.is_between(a, b))
        .find_map(|m| m.winner);

    match decided {
        Some(winner) if winner == a => Ordering::Less,
        Some(winner) if winner == b => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Full comparison used for ranking and qualification
pub fn compare(a: &Standing, b: &Standing, finished: &[Match]) -> Ordering {
    b.points
        .cmp(&a.points)
        .then(b.leg_difference.cmp(&a.leg_difference))
        .then_with(|| head_to_head(a.player_id, b.player_id, finished))
}

/// Sort standings and assign competition ranks.
///
/// Rows are first put in player-id order so that the result only depends on
/// the set of rows and matches, never on the order results were applied in.
/// Head-to-head results can be cyclic, so an insertion sort is used: it is
/// well defined for any pairwise comparator.
pub fn sort_and_rank(standings: &mut [Standing], finished: &[Match]) {
    standings.sort_by_key(|s| s.player_id);

    for i in 1..standings.len() {
        let mut j = i;
        while j > 0 && compare(&standings[j], &standings[j - 1], finished) == Ordering::Less {
            standings.swap(j, j - 1);
            j -= 1;
        }
    }

    for i in 0..standings.len() {
        let tied = i > 0 && compare(&standings[i], &standings[i - 1], finished) == Ordering::Equal;
        let rank = if tied { standings[i - 1].rank } else { i + 1 };
        standings[i].rank = rank;
    }
}

fn finished_winner(m: &Match) -> TournamentResult<PlayerId> {
    match (m.status, m.winner) {
        (MatchStatus::Finished, Some(winner)) => Ok(winner),
        (status, _) => Err(TournamentError::InvalidMatchState {
            match_id: m.id,
            expected: MatchStatus::Finished,
            actual: status,
        }),
    }
}

fn row_mut(standings: &mut Vec<Standing>, player_id: PlayerId) -> &mut Standing {
    let idx = match standings.iter().position(|s| s.player_id == player_id) {
        Some(idx) => idx,
        None => {
            standings.push(Standing::new(player_id));
            standings.len() - 1
        }
    };
    &mut standings[idx]
}

/// Fold one finished match into the standings, creating rows on first use.
///
/// Ranks are left untouched; call [`sort_and_rank`] afterwards.
pub fn apply_result(
    standings: &mut Vec<Standing>,
    m: &Match,
    points_per_win: i32,
) -> TournamentResult<()> {
    let winner = finished_winner(m)?;

    for player in [m.player1, m.player2] {
        let (won, lost) = m.legs_for(player);
        let row = row_mut(standings, player);
        if player == winner {
            row.points += points_per_win;
        }
        row.legs_won += won;
        row.legs_lost += lost;
        row.leg_difference = row.legs_won as i32 - row.legs_lost as i32;
    }

    Ok(())
}

/// Undo a previously applied match.
pub fn revert_result(
    standings: &mut [Standing],
    group: usize,
    m: &Match,
    points_per_win: i32,
) -> TournamentResult<()> {
    let winner = finished_winner(m)?;

    for player in [m.player1, m.player2] {
        let (won, lost) = m.legs_for(player);
        let row = standings
            .iter_mut()
            .find(|s| s.player_id == player)
            .ok_or(TournamentError::MissingStanding { group, player })?;

        let underflow = TournamentError::StandingUnderflow { group, player };
        if player == winner {
            if row.points < points_per_win {
                return Err(underflow);
            }
            row.points -= points_per_win;
        }
        row.legs_won = row.legs_won.checked_sub(won).ok_or(underflow)?;
        row.legs_lost = row
            .legs_lost
            .checked_sub(lost)
            .ok_or(TournamentError::StandingUnderflow { group, player })?;
        row.leg_difference = row.legs_won as i32 - row.legs_lost as i32;
    }

    Ok(())
}

/// Rebuild a group's standings from scratch out of its finished matches.
pub fn derive(matches: &[Match], points_per_win: i32) -> TournamentResult<Vec<Standing>> {
    let finished: Vec<Match> = matches
        .iter()
        .filter(|m| m.status == MatchStatus::Finished)
        .cloned()
        .collect();

    let mut standings = Vec::new();
    for m in &finished {
        apply_result(&mut standings, m, points_per_win)?;
    }
    sort_and_rank(&mut standings, &finished);

    Ok(standings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::MatchStats;

    fn finished(id: i64, p1: PlayerId, p2: PlayerId, winner: PlayerId, legs: (u32, u32)) -> Match {
        let mut stats = MatchStats::default();
        stats.player1.legs_won = legs.0;
        stats.player2.legs_won = legs.1;
        Match {
            id,
            tournament_id: 1,
            board_id: 1,
            player1: p1,
            player2: p2,
            scorer: None,
            status: MatchStatus::Finished,
            round: 0,
            is_knockout: false,
            winner: Some(winner),
            stats,
            legs: Vec::new(),
        }
    }

    fn rank_of(standings: &[Standing], player: PlayerId) -> usize {
        standings.iter().find(|s| s.player_id == player).unwrap().rank
    }

    #[test]
    fn test_apply_result_updates_rows() {
        let m = finished(1, 1, 2, 1, (3, 1));
        let mut standings = Vec::new();
        apply_result(&mut standings, &m, 2).unwrap();

        let a = standings.iter().find(|s| s.player_id == 1).unwrap();
        assert_eq!(a.points, 2);
        assert_eq!(a.legs_won, 3);
        assert_eq!(a.legs_lost, 1);
        assert_eq!(a.leg_difference, 2);

        let b = standings.iter().find(|s| s.player_id == 2).unwrap();
        assert_eq!(b.points, 0);
        assert_eq!(b.leg_difference, -2);
    }

    #[test]
    fn test_four_player_group_ranking() {
        // A=1 beats everyone, B=2 beats C and D, C and D have not met
        let matches = vec![
            finished(1, 1, 2, 1, (3, 0)),
            finished(2, 1, 3, 1, (3, 0)),
            finished(3, 1, 4, 1, (3, 0)),
            finished(4, 2, 3, 2, (3, 0)),
            finished(5, 2, 4, 2, (3, 0)),
        ];
        let standings = derive(&matches, 2).unwrap();

        assert_eq!(rank_of(&standings, 1), 1);
        assert_eq!(rank_of(&standings, 2), 2);
        assert_eq!(rank_of(&standings, 3), 3);
        assert_eq!(rank_of(&standings, 4), 3);
    }

    #[test]
    fn test_head_to_head_breaks_tie() {
        // 1 and 2 finish level on points and legs, 2 won their meeting
        let matches = vec![
            finished(1, 1, 2, 2, (2, 3)),
            finished(2, 1, 3, 1, (3, 2)),
            finished(3, 2, 3, 3, (2, 3)),
        ];
        let standings = derive(&matches, 2).unwrap();

        // Everyone has 2 points and a leg difference of 0: a head-to-head cycle
        assert!(standings.iter().all(|s| s.points == 2 && s.leg_difference == 0));
        let ranks: Vec<usize> = standings.iter().map(|s| s.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_competition_ranking_gaps() {
        let matches = vec![
            finished(1, 1, 4, 1, (3, 0)),
            finished(2, 2, 5, 2, (3, 0)),
            finished(3, 3, 6, 3, (1, 0)),
        ];
        let standings = derive(&matches, 2).unwrap();

        assert_eq!(rank_of(&standings, 1), 1);
        assert_eq!(rank_of(&standings, 2), 1);
        assert_eq!(rank_of(&standings, 3), 3);
        assert_eq!(rank_of(&standings, 6), 4);
        assert_eq!(rank_of(&standings, 4), 5);
        assert_eq!(rank_of(&standings, 5), 5);
    }

    #[test]
    fn test_revert_restores_previous_rows() {
        let first = finished(1, 1, 2, 1, (3, 1));
        let second = finished(2, 1, 3, 3, (0, 3));

        let mut standings = Vec::new();
        apply_result(&mut standings, &first, 2).unwrap();
        let snapshot = standings.clone();

        apply_result(&mut standings, &second, 2).unwrap();
        revert_result(&mut standings, 0, &second, 2).unwrap();
        standings.retain(|s| s.player_id != 3);

        assert_eq!(standings, snapshot);
    }

    #[test]
    fn test_revert_without_row_is_consistency_error() {
        let m = finished(1, 1, 2, 1, (3, 1));
        let mut standings = vec![Standing::new(1)];
        let err = revert_result(&mut standings, 4, &m, 2).unwrap_err();
        assert!(matches!(
            err,
            TournamentError::MissingStanding { group: 4, player: 1 }
                | TournamentError::StandingUnderflow { group: 4, player: 1 }
        ));
    }

    #[test]
    fn test_unfinished_match_rejected() {
        let mut m = finished(1, 1, 2, 1, (3, 1));
        m.status = MatchStatus::Ongoing;
        let mut standings = Vec::new();
        assert!(apply_result(&mut standings, &m, 2).is_err());
    }
}
