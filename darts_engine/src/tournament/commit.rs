//! Result commit and correction.
//!
//! A commit is planned entirely in memory: validation, the revert of a
//! previously committed result, and the forward update of standings or bracket
//! all happen on copies. Only a fully computed [`CommitPlan`] is handed back
//! for persistence, so a failed check never leaves partial writes behind.

use log::{debug, info};

use super::bracket::{self, Advance};
use super::errors::{TournamentError, TournamentResult};
use super::models::{
    Board, BoardId, BoardStatus, Match, MatchId, MatchResult, MatchStatus, Tournament,
    TournamentStatus,
};
use super::standings;
use crate::config::EngineConfig;
use crate::roster::PlayerId;

/// Knockout match to create once the plan is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnRequest {
    pub round: usize,
    pub slot: usize,
    pub player1: PlayerId,
    pub player2: PlayerId,
    pub board_id: BoardId,
}

/// Every write produced by one commit
#[derive(Debug, Clone, PartialEq)]
pub struct CommitPlan {
    pub tournament: Tournament,
    pub finished: Match,
    /// Matches invalidated by a correction
    pub delete: Vec<MatchId>,
    pub spawn: Option<SpawnRequest>,
    /// An earlier result was undone first
    pub reverted: bool,
    /// The final was decided by this commit
    pub completed: bool,
}

/// Check a submitted result against the match it is for.
pub fn validate(m: &Match, result: &MatchResult) -> TournamentResult<()> {
    if !m.has_player(result.winner) {
        return Err(TournamentError::WinnerNotInMatch {
            match_id: m.id,
            winner: result.winner,
        });
    }

    for stats in [&result.player1, &result.player2] {
        if stats.highest_checkout < 0 {
            return Err(TournamentError::InvalidCheckout(stats.highest_checkout));
        }
        if let Some(&bad) = stats.one_eighties.iter().find(|&&darts| darts <= 0) {
            return Err(TournamentError::InvalidOneEighty(bad));
        }
    }

    if !result.legs.is_empty() {
        if let Some(leg) = result.legs.iter().find(|leg| !m.has_player(leg.winner)) {
            return Err(TournamentError::LegWinnerNotInMatch {
                match_id: m.id,
                winner: leg.winner,
            });
        }

        for (player, reported) in [
            (m.player1, result.player1.legs_won),
            (m.player2, result.player2.legs_won),
        ] {
            let counted = result.legs.iter().filter(|leg| leg.winner == player).count() as u32;
            if counted != reported {
                return Err(TournamentError::LegCountMismatch {
                    player,
                    reported,
                    counted,
                });
            }
        }
    }

    Ok(())
}

fn expect_status(tournament: &Tournament, allowed: &[TournamentStatus]) -> TournamentResult<()> {
    if allowed.contains(&tournament.status) {
        Ok(())
    } else {
        Err(TournamentError::InvalidState {
            expected: allowed.to_vec(),
            actual: tournament.status,
        })
    }
}

/// Plan the commit of `result` for `m`.
///
/// `group_matches` holds the stored matches of the match's group (group
/// matches only, the stored version of `m` included). `downstream` is the
/// knockout match spawned from the slot `m` feeds, when one exists. `boards`
/// lists the tournament's board ids in ascending order.
pub fn plan_commit(
    tournament: &Tournament,
    m: &Match,
    result: MatchResult,
    group_matches: &[Match],
    downstream: Option<&Match>,
    boards: &[BoardId],
    config: &EngineConfig,
) -> TournamentResult<CommitPlan> {
    validate(m, &result)?;

    let mut updated = m.clone();
    updated.status = MatchStatus::Finished;
    updated.winner = Some(result.winner);
    updated.stats.player1 = result.player1;
    updated.stats.player2 = result.player2;
    updated.legs = result.legs;

    let reverted = m.status == MatchStatus::Finished;
    if reverted {
        info!(
            "Correcting match {} of tournament {}: winner {:?} -> {}",
            m.id, tournament.id, m.winner, result.winner
        );
    }

    if m.is_knockout {
        plan_knockout(tournament, m, updated, downstream, boards, reverted)
    } else {
        plan_group(tournament, m, updated, group_matches, config, reverted)
    }
}

fn plan_group(
    tournament: &Tournament,
    previous: &Match,
    updated: Match,
    group_matches: &[Match],
    config: &EngineConfig,
    reverted: bool,
) -> TournamentResult<CommitPlan> {
    expect_status(tournament, &[TournamentStatus::Group])?;

    let mut next = tournament.clone();
    let group_index = previous.round;
    let group = next
        .groups
        .get_mut(group_index)
        .ok_or(TournamentError::GroupNotFound {
            tournament_id: tournament.id,
            group: group_index,
        })?;
    for player in [previous.player1, previous.player2] {
        if !group.contains(player) {
            return Err(TournamentError::MissingStanding {
                group: group_index,
                player,
            });
        }
    }

    let mut finished: Vec<Match> = group_matches
        .iter()
        .filter(|gm| gm.id != previous.id && gm.status == MatchStatus::Finished)
        .cloned()
        .collect();

    if reverted {
        standings::revert_result(
            &mut group.standings,
            group_index,
            previous,
            config.points_per_win,
        )?;
        standings::sort_and_rank(&mut group.standings, &finished);
    }

    standings::apply_result(&mut group.standings, &updated, config.points_per_win)?;
    finished.push(updated.clone());
    standings::sort_and_rank(&mut group.standings, &finished);

    debug!(
        "Group {} standings after match {}: {:?}",
        group_index, updated.id, group.standings
    );

    Ok(CommitPlan {
        tournament: next,
        finished: updated,
        delete: Vec::new(),
        spawn: None,
        reverted,
        completed: false,
    })
}

fn plan_knockout(
    tournament: &Tournament,
    previous: &Match,
    updated: Match,
    downstream: Option<&Match>,
    boards: &[BoardId],
    reverted: bool,
) -> TournamentResult<CommitPlan> {
    expect_status(
        tournament,
        &[TournamentStatus::Knockout, TournamentStatus::Finished],
    )?;

    let mut next = tournament.clone();
    let mut delete = Vec::new();
    let winner = updated.winner.ok_or_else(|| {
        TournamentError::BracketInconsistent(format!("match {} has no winner", updated.id))
    })?;

    let (_, slot_index) = next.knockout.locate(previous.id).ok_or_else(|| {
        TournamentError::BracketInconsistent(format!("match {} has no bracket slot", previous.id))
    })?;
    let is_final = next.knockout.rounds.len() - 1 == previous.round;

    // Same winner on a non-final match: only the statistics change
    if reverted && previous.winner == Some(winner) && !is_final {
        return Ok(CommitPlan {
            tournament: next,
            finished: updated,
            delete,
            spawn: None,
            reverted,
            completed: false,
        });
    }

    if reverted {
        if let Some(spawned) = bracket::downstream_of(&next.knockout, previous.id) {
            match downstream {
                Some(d) if d.id == spawned && d.status == MatchStatus::Finished => {
                    return Err(TournamentError::CorrectionBlocked {
                        match_id: previous.id,
                        downstream: spawned,
                    });
                }
                Some(d) if d.id == spawned => {}
                _ => {
                    return Err(TournamentError::BracketInconsistent(format!(
                        "spawned match {spawned} was not supplied"
                    )));
                }
            }
        }

        let undone = bracket::revert(&mut next.knockout, previous.id)?;
        delete.extend(undone.downstream);
        if undone.was_final {
            info!("Reopening tournament {} for a corrected final", next.id);
            next.status = TournamentStatus::Knockout;
            next.placements.clear();
        }
    }

    let mut spawn = None;
    let mut completed = false;

    match bracket::resolve(&mut next.knockout, previous.id, winner)? {
        Advance::Advanced { round, slot, ready } => {
            if ready {
                let target = &next.knockout.rounds[round].slots[slot];
                let (Some(player1), Some(player2)) = (target.player1, target.player2) else {
                    return Err(TournamentError::BracketInconsistent(format!(
                        "round {round} slot {slot} reported ready without players"
                    )));
                };
                let board_id = bracket::board_for_round(round, boards).ok_or(
                    TournamentError::InsufficientBoards {
                        needed: 1,
                        available: 0,
                    },
                )?;
                spawn = Some(SpawnRequest {
                    round,
                    slot,
                    player1,
                    player2,
                    board_id,
                });
            }
            debug!(
                "Match {} (slot {}) advanced player {} to round {} slot {}",
                previous.id, slot_index, winner, round, slot
            );
        }
        Advance::Completed { champion } => {
            info!("Tournament {} won by player {}", next.id, champion);
            next.status = TournamentStatus::Finished;
            completed = true;
        }
    }

    Ok(CommitPlan {
        tournament: next,
        finished: updated,
        delete,
        spawn,
        reverted,
        completed,
    })
}

/// Board state after one of its matches finished: waiting for the next pending
/// match on the board, idle when there is none.
pub fn release_board(board: &Board, pending_on_board: &[Match]) -> Board {
    let mut released = board.clone();
    released.current_match = None;

    match pending_on_board
        .iter()
        .filter(|m| m.status == MatchStatus::Pending && m.board_id == board.board_id)
        .min_by_key(|m| m.id)
    {
        Some(next) => {
            released.status = BoardStatus::Waiting;
            released.waiting_players = vec![next.player1, next.player2];
        }
        None => {
            released.status = BoardStatus::Idle;
            released.waiting_players.clear();
        }
    }

    released
}

/// Boards whose state changes once `matches` is what storage holds.
///
/// A board stays as it is only while it plays a match that still exists and
/// is ongoing. Every other board is released onto its next pending match.
pub fn settle_boards(boards: &[Board], matches: &[Match]) -> Vec<Board> {
    boards
        .iter()
        .filter_map(|board| {
            let playing = board.status == BoardStatus::Playing
                && board.current_match.is_some_and(|id| {
                    matches
                        .iter()
                        .any(|m| m.id == id && m.status == MatchStatus::Ongoing)
                });
            if playing {
                return None;
            }

            let next = release_board(board, matches);
            (next != *board).then_some(next)
        })
        .collect()
}
