//! Knockout bracket state machine.
//!
//! Slots move `Empty -> Seeded -> MatchCreated -> Resolved`. Resolving a slot
//! writes the winner into slot `index / 2` of the next round, as `player1` for
//! even indices and `player2` for odd ones. Every step is a local update; the
//! bracket is never rebuilt.

use super::errors::{TournamentError, TournamentResult};
use super::models::{BoardId, Knockout, MatchId};
use crate::roster::PlayerId;

/// Effect of resolving a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Winner placed in `(round, slot)`; `ready` when that slot now needs a match
    Advanced {
        round: usize,
        slot: usize,
        ready: bool,
    },
    /// The final was decided
    Completed { champion: PlayerId },
}

/// Effect of reverting a resolved slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reverted {
    /// True when the reverted slot was the final
    pub was_final: bool,
    /// Match that had been spawned from the next slot, now detached
    pub downstream: Option<MatchId>,
}

/// Check that round `r + 1` has `ceil(slots(r) / 2)` slots and the last round one.
pub fn verify_shape(knockout: &Knockout) -> TournamentResult<()> {
    for (r, pair) in knockout.rounds.windows(2).enumerate() {
        let expected = pair[0].slots.len().div_ceil(2);
        if pair[1].slots.len() != expected {
            return Err(TournamentError::BracketInconsistent(format!(
                "round {} has {} slots, expected {}",
                r + 1,
                pair[1].slots.len(),
                expected
            )));
        }
    }

    match knockout.rounds.last() {
        Some(last) if last.slots.len() == 1 => Ok(()),
        Some(last) => Err(TournamentError::BracketInconsistent(format!(
            "final round has {} slots",
            last.slots.len()
        ))),
        None => Err(TournamentError::BracketInconsistent(
            "bracket has no rounds".to_string(),
        )),
    }
}

fn locate(knockout: &Knockout, match_id: MatchId) -> TournamentResult<(usize, usize)> {
    knockout.locate(match_id).ok_or_else(|| {
        TournamentError::BracketInconsistent(format!("match {match_id} has no bracket slot"))
    })
}

/// Mark the slot hosting `match_id` resolved and move the winner on.
pub fn resolve(
    knockout: &mut Knockout,
    match_id: MatchId,
    winner: PlayerId,
) -> TournamentResult<Advance> {
    let (round, index) = locate(knockout, match_id)?;
    let last_round = knockout.rounds.len() - 1;

    let slot = &mut knockout.rounds[round].slots[index];
    if slot.player1 != Some(winner) && slot.player2 != Some(winner) {
        return Err(TournamentError::BracketInconsistent(format!(
            "winner {winner} is not seeded in round {round} slot {index}"
        )));
    }
    slot.winner = Some(winner);

    if round == last_round {
        return Ok(Advance::Completed { champion: winner });
    }

    let next_index = index / 2;
    let next = &mut knockout.rounds[round + 1].slots[next_index];
    let position = if index % 2 == 0 {
        &mut next.player1
    } else {
        &mut next.player2
    };
    if let Some(existing) = *position {
        if existing != winner {
            return Err(TournamentError::BracketInconsistent(format!(
                "round {} slot {} already holds player {existing}",
                round + 1,
                next_index
            )));
        }
    }
    *position = Some(winner);

    Ok(Advance::Advanced {
        round: round + 1,
        slot: next_index,
        ready: next.is_ready() && next.match_reference.is_none(),
    })
}

/// Record the match created for a ready slot.
pub fn attach_match(
    knockout: &mut Knockout,
    round: usize,
    slot: usize,
    match_id: MatchId,
) -> TournamentResult<()> {
    let target = knockout
        .rounds
        .get_mut(round)
        .and_then(|r| r.slots.get_mut(slot))
        .ok_or_else(|| {
            TournamentError::BracketInconsistent(format!(
                "round {round} slot {slot} does not exist"
            ))
        })?;

    if !target.is_ready() {
        return Err(TournamentError::BracketInconsistent(format!(
            "round {round} slot {slot} is missing a player"
        )));
    }
    target.match_reference = Some(match_id);
    Ok(())
}

/// Undo the resolution of the slot hosting `match_id`.
///
/// The winner is removed from the next round and any match spawned there is
/// detached. Deleting that match is up to the caller.
pub fn revert(knockout: &mut Knockout, match_id: MatchId) -> TournamentResult<Reverted> {
    let (round, index) = locate(knockout, match_id)?;
    let last_round = knockout.rounds.len() - 1;

    let slot = &mut knockout.rounds[round].slots[index];
    let Some(previous) = slot.winner.take() else {
        return Err(TournamentError::BracketInconsistent(format!(
            "round {round} slot {index} was never resolved"
        )));
    };

    if round == last_round {
        return Ok(Reverted {
            was_final: true,
            downstream: None,
        });
    }

    let next = &mut knockout.rounds[round + 1].slots[index / 2];
    let position = if index % 2 == 0 {
        &mut next.player1
    } else {
        &mut next.player2
    };
    if *position != Some(previous) {
        return Err(TournamentError::BracketInconsistent(format!(
            "winner {previous} of round {round} slot {index} did not advance"
        )));
    }
    *position = None;

    Ok(Reverted {
        was_final: false,
        downstream: next.match_reference.take(),
    })
}

/// Downstream match that would be orphaned by reverting `match_id`
pub fn downstream_of(knockout: &Knockout, match_id: MatchId) -> Option<MatchId> {
    let (round, index) = knockout.locate(match_id)?;
    knockout
        .rounds
        .get(round + 1)
        .and_then(|r| r.slots.get(index / 2))
        .and_then(|slot| slot.match_reference)
}

/// Board for a spawned knockout match: the second board on even rounds, the
/// first on odd rounds. A single board takes everything.
pub fn board_for_round(round: usize, boards: &[BoardId]) -> Option<BoardId> {
    let first = *boards.first()?;
    let second = boards.get(1).copied().unwrap_or(first);
    Some(if round % 2 == 0 { second } else { first })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::SlotState;
    use crate::tournament::qualification::build_bracket;

    fn four_player_bracket() -> Knockout {
        let mut knockout = build_bracket(&[(1, 4), (2, 3)]);
        attach_match(&mut knockout, 0, 0, 100).unwrap();
        attach_match(&mut knockout, 0, 1, 101).unwrap();
        knockout
    }

    #[test]
    fn test_winner_moves_to_next_round() {
        let mut knockout = four_player_bracket();

        let advance = resolve(&mut knockout, 100, 4).unwrap();
        assert_eq!(
            advance,
            Advance::Advanced {
                round: 1,
                slot: 0,
                ready: false
            }
        );
        assert_eq!(knockout.rounds[0].slots[0].state(), SlotState::Resolved);
        assert_eq!(knockout.rounds[1].slots[0].player1, Some(4));
        assert_eq!(knockout.rounds[1].slots[0].state(), SlotState::Seeded);

        let advance = resolve(&mut knockout, 101, 2).unwrap();
        assert_eq!(
            advance,
            Advance::Advanced {
                round: 1,
                slot: 0,
                ready: true
            }
        );
        assert_eq!(knockout.rounds[1].slots[0].player2, Some(2));
    }

    #[test]
    fn test_final_completes() {
        let mut knockout = four_player_bracket();
        resolve(&mut knockout, 100, 1).unwrap();
        resolve(&mut knockout, 101, 3).unwrap();
        attach_match(&mut knockout, 1, 0, 102).unwrap();

        let advance = resolve(&mut knockout, 102, 3).unwrap();
        assert_eq!(advance, Advance::Completed { champion: 3 });
        assert!(knockout.is_resolved());
        assert_eq!(knockout.final_slot().unwrap().loser(), Some(1));
    }

    #[test]
    fn test_unseeded_winner_rejected() {
        let mut knockout = four_player_bracket();
        assert!(resolve(&mut knockout, 100, 2).is_err());
        assert!(resolve(&mut knockout, 999, 1).is_err());
    }

    #[test]
    fn test_revert_detaches_downstream() {
        let mut knockout = four_player_bracket();
        resolve(&mut knockout, 100, 1).unwrap();
        resolve(&mut knockout, 101, 2).unwrap();
        attach_match(&mut knockout, 1, 0, 102).unwrap();
        assert_eq!(downstream_of(&knockout, 101), Some(102));

        let reverted = revert(&mut knockout, 101).unwrap();
        assert_eq!(
            reverted,
            Reverted {
                was_final: false,
                downstream: Some(102)
            }
        );
        let next = &knockout.rounds[1].slots[0];
        assert_eq!(next.player1, Some(1));
        assert_eq!(next.player2, None);
        assert_eq!(next.match_reference, None);
        assert_eq!(knockout.rounds[0].slots[1].winner, None);

        // Re-applying a different winner lands in the same position
        resolve(&mut knockout, 101, 3).unwrap();
        assert_eq!(knockout.rounds[1].slots[0].player2, Some(3));
    }

    #[test]
    fn test_revert_unresolved_rejected() {
        let mut knockout = four_player_bracket();
        assert!(revert(&mut knockout, 100).is_err());
    }

    #[test]
    fn test_attach_requires_both_players() {
        let mut knockout = four_player_bracket();
        resolve(&mut knockout, 100, 1).unwrap();
        assert!(attach_match(&mut knockout, 1, 0, 102).is_err());
    }

    #[test]
    fn test_verify_shape() {
        let knockout = build_bracket(&[(1, 2), (3, 4), (5, 6), (7, 8)]);
        assert!(verify_shape(&knockout).is_ok());

        let mut broken = knockout.clone();
        broken.rounds[1].slots.pop();
        assert!(verify_shape(&broken).is_err());
        assert!(verify_shape(&Knockout::default()).is_err());
    }

    #[test]
    fn test_board_alternation() {
        assert_eq!(board_for_round(0, &[1, 2]), Some(2));
        assert_eq!(board_for_round(1, &[1, 2]), Some(1));
        assert_eq!(board_for_round(2, &[1, 2, 3]), Some(2));
        assert_eq!(board_for_round(1, &[5]), Some(5));
        assert_eq!(board_for_round(0, &[]), None);
    }
}
