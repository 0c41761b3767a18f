/// Property-based tests for scheduling, standings, qualification and the bracket
///
/// These tests check the engine's invariants over randomly generated group
/// sizes, results and application orders.
use std::collections::HashSet;

use darts_engine::config::EngineConfig;
use darts_engine::roster::PlayerId;
use darts_engine::tournament::qualification::{
    build_bracket, distribute_eliminations, qualify, qualifying_count,
};
use darts_engine::tournament::schedule::generate_schedule;
use darts_engine::tournament::standings::{apply_result, derive, sort_and_rank};
use darts_engine::tournament::{Group, Match, MatchStats, MatchStatus, Standing};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

// Every pair of `players` meets once; `outcomes` decides the winner and loser legs
fn round_robin(players: usize, outcomes: &[(bool, u32)]) -> Vec<Match> {
    let mut matches = Vec::new();
    let mut next = 0;
    for a in 0..players {
        for b in (a + 1)..players {
            let (first_wins, loser_legs) = outcomes[next % outcomes.len()];
            let mut stats = MatchStats::default();
            let (p1, p2) = (a as PlayerId + 1, b as PlayerId + 1);
            let winner = if first_wins {
                stats.player1.legs_won = 3;
                stats.player2.legs_won = loser_legs;
                p1
            } else {
                stats.player1.legs_won = loser_legs;
                stats.player2.legs_won = 3;
                p2
            };
            next += 1;
            matches.push(Match {
                id: next as i64,
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
            });
        }
    }
    matches
}

// Groups of the given sizes whose standings are already ranked without ties
fn ranked_groups(sizes: &[usize]) -> Vec<Group> {
    let mut next_player = 1;
    sizes
        .iter()
        .enumerate()
        .map(|(index, &size)| {
            let players: Vec<PlayerId> = (next_player..next_player + size as PlayerId).collect();
            next_player += size as PlayerId;
            let mut group = Group::new(index, &players);
            group.standings = players
                .iter()
                .enumerate()
                .map(|(i, &p)| Standing {
                    points: 2 * (size - i) as i32,
                    rank: i + 1,
                    ..Standing::new(p)
                })
                .collect();
            group
        })
        .collect()
}

fn outcomes_strategy() -> impl Strategy<Value = Vec<(bool, u32)>> {
    prop::collection::vec((any::<bool>(), 0u32..3), 1..30)
}

proptest! {
    #[test]
    fn schedule_covers_every_pair_once(players in 2usize..10, seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let schedule = generate_schedule(players, &EngineConfig::default(), &mut rng).unwrap();

        prop_assert_eq!(schedule.matches.len(), players * (players - 1) / 2);
        let pairs: HashSet<(usize, usize)> = schedule
            .matches
            .iter()
            .map(|m| (m.player1.min(m.player2), m.player1.max(m.player2)))
            .collect();
        prop_assert_eq!(pairs.len(), schedule.matches.len());
        prop_assert!(schedule.attempts >= 1);
    }

    #[test]
    fn scorer_never_plays_in_groups_of_three_or_more(players in 3usize..10, seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let schedule = generate_schedule(players, &EngineConfig::default(), &mut rng).unwrap();

        for m in &schedule.matches {
            prop_assert!(m.scorer != m.player1 && m.scorer != m.player2);
            prop_assert!(m.scorer < players);
        }
    }

    #[test]
    fn standings_independent_of_application_order(
        players in 2usize..7,
        outcomes in outcomes_strategy(),
        seed in any::<u64>(),
    ) {
        let matches = round_robin(players, &outcomes);
        let expected = derive(&matches, 2).unwrap();

        let mut shuffled = matches.clone();
        shuffled.shuffle(&mut StdRng::seed_from_u64(seed));
        let mut folded = Vec::new();
        for m in &shuffled {
            apply_result(&mut folded, m, 2).unwrap();
        }
        sort_and_rank(&mut folded, &shuffled);

        prop_assert_eq!(folded, expected);
    }

    #[test]
    fn ranks_rise_only_at_boundaries(players in 2usize..7, outcomes in outcomes_strategy()) {
        let standings = derive(&round_robin(players, &outcomes), 2).unwrap();

        prop_assert_eq!(standings[0].rank, 1);
        for i in 1..standings.len() {
            let (previous, current) = (&standings[i - 1], &standings[i]);
            prop_assert!(current.rank == previous.rank || current.rank == i + 1);
            prop_assert!(current.points <= previous.points);
            if current.rank == previous.rank {
                prop_assert_eq!(current.points, previous.points);
                prop_assert_eq!(current.leg_difference, previous.leg_difference);
            }
        }
    }

    #[test]
    fn qualifying_count_is_largest_power_of_two(total in 2usize..5000) {
        let q = qualifying_count(total);
        prop_assert!(q.is_power_of_two());
        prop_assert!(q <= total);
        prop_assert!(q * 2 > total);
    }

    #[test]
    fn eliminations_fit_their_groups(sizes in prop::collection::vec(2usize..9, 1..8)) {
        let total: usize = sizes.iter().sum();
        let eliminated = total - qualifying_count(total);

        let shares = distribute_eliminations(&sizes, eliminated).unwrap();
        prop_assert_eq!(shares.iter().sum::<usize>(), eliminated);
        for (share, size) in shares.iter().zip(&sizes) {
            prop_assert!(share <= size);
        }
    }

    #[test]
    fn qualification_splits_the_field(sizes in prop::collection::vec(2usize..9, 1..8)) {
        let groups = ranked_groups(&sizes);
        let total: usize = sizes.iter().sum();

        let cut = qualify(&groups).unwrap();
        let seeded: usize = cut.qualified.iter().map(Vec::len).sum();
        prop_assert_eq!(cut.qualifying, qualifying_count(total));
        prop_assert_eq!(seeded + cut.eliminated.len(), total);
        prop_assert_eq!(cut.pairings.len() * 2, cut.qualifying);

        let paired: HashSet<PlayerId> = cut.pairings.iter().flat_map(|&(a, b)| [a, b]).collect();
        prop_assert_eq!(paired.len(), cut.qualifying);
        prop_assert!(cut.eliminated.iter().all(|e| !paired.contains(&e.player_id)));
    }

    #[test]
    fn bracket_halves_each_round(exponent in 1u32..8) {
        let qualifying = 1usize << exponent;
        let pairs: Vec<(PlayerId, PlayerId)> = (0..qualifying as PlayerId / 2)
            .map(|i| (2 * i + 1, 2 * i + 2))
            .collect();

        let knockout = build_bracket(&pairs);
        prop_assert_eq!(knockout.rounds.len(), exponent as usize);
        for (r, round) in knockout.rounds.iter().enumerate() {
            prop_assert_eq!(round.slots.len(), qualifying >> (r + 1));
        }
        prop_assert_eq!(knockout.rounds.last().unwrap().slots.len(), 1);
    }
}
