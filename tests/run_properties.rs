//! Run state machine properties

use hawkins_escape::consts::{LEVEL_BASE_TIMES, LEVEL_COUNT};
use hawkins_escape::run::level_time;
use hawkins_escape::{Difficulty, Phase, RunState};
use proptest::prelude::*;

fn difficulty() -> impl Strategy<Value = Difficulty> {
    prop_oneof![
        Just(Difficulty::Easy),
        Just(Difficulty::Medium),
        Just(Difficulty::Hard),
    ]
}

fn playing_at(level: u8, difficulty: Difficulty) -> RunState {
    let mut run = RunState::new();
    run.start_game(difficulty);
    run.set_level(level);
    run
}

#[test]
fn test_medium_first_level_times_out_on_the_120th_second() {
    let mut run = RunState::new();
    run.start_game(Difficulty::Medium);
    assert_eq!(run.time_remaining(), 120);

    for _ in 0..119 {
        run.decrement_time();
    }
    assert_eq!(run.phase(), Phase::Playing);
    assert_eq!(run.time_remaining(), 1);

    run.decrement_time();
    assert_eq!(run.phase(), Phase::Jumpscare);
    assert!(!run.is_timer_running());
}

#[test]
fn test_full_run_to_victory() {
    let mut run = RunState::new();
    run.start_game(Difficulty::Hard);
    for level in 1..=LEVEL_COUNT as u8 {
        assert_eq!(run.current_level(), level);
        run.complete_level();
    }
    assert_eq!(run.phase(), Phase::Victory);
    assert_eq!(run.current_level(), LEVEL_COUNT as u8);
    assert!(run.level_completed().iter().all(|&done| done));
    assert!(!run.is_timer_running());

    // Nothing more to clear
    let score = run.score();
    run.complete_level();
    assert_eq!(run.score(), score);
}

#[test]
fn test_retry_keeps_score_and_level() {
    let mut run = RunState::new();
    run.start_game(Difficulty::Easy);
    run.complete_level();
    run.add_score(40);
    let score = run.score();

    run.trigger_jumpscare();
    run.show_retry();
    assert_eq!(run.phase(), Phase::Retry);
    run.retry();

    assert_eq!(run.phase(), Phase::Playing);
    assert_eq!(run.current_level(), 2);
    assert_eq!(run.score(), score);
    assert_eq!(run.time_remaining(), level_time(2, Difficulty::Easy));
}

proptest! {
    #[test]
    fn level_time_is_integer_percentage(level in 1u8..=5, d in difficulty()) {
        let base = LEVEL_BASE_TIMES[(level - 1) as usize];
        let expected = base * d.time_percent() / 100;
        prop_assert_eq!(level_time(level, d), expected);
        prop_assert!(level_time(level, d) > 0);
    }

    #[test]
    fn countdown_reaches_jumpscare_exactly_once(
        level in 1u8..=5,
        d in difficulty(),
        extra in 0u32..50,
    ) {
        let mut run = playing_at(level, d);
        let allowed = run.max_time();

        let mut jumpscares = 0;
        for _ in 0..allowed + extra {
            let before = run.phase();
            run.decrement_time();
            if before == Phase::Playing && run.phase() == Phase::Jumpscare {
                jumpscares += 1;
            }
        }
        prop_assert_eq!(jumpscares, 1);
        prop_assert_eq!(run.phase(), Phase::Jumpscare);
        prop_assert_eq!(run.time_remaining(), 1);
    }

    #[test]
    fn time_never_exceeds_max(level in 1u8..=5, d in difficulty(), ticks in 0u32..300) {
        let mut run = playing_at(level, d);
        for _ in 0..ticks {
            run.decrement_time();
            prop_assert!(run.time_remaining() <= run.max_time());
        }
    }

    #[test]
    fn complete_level_advances_or_wins(level in 1u8..=5, d in difficulty(), spent in 0u32..60) {
        let mut run = playing_at(level, d);
        for _ in 0..spent.min(run.max_time() - 1) {
            run.decrement_time();
        }
        let score = run.score();
        run.complete_level();

        prop_assert!(run.score() > score);
        prop_assert!(run.level_completed()[(level - 1) as usize]);
        if level as usize == LEVEL_COUNT {
            prop_assert_eq!(run.phase(), Phase::Victory);
        } else {
            prop_assert_eq!(run.phase(), Phase::Playing);
            prop_assert_eq!(run.current_level(), level + 1);
            prop_assert_eq!(run.time_remaining(), level_time(level + 1, d));
        }
    }

    #[test]
    fn reset_then_start_matches_fresh_start(
        d in difficulty(),
        next in difficulty(),
        cleared in 0usize..5,
        points in 0u64..10_000,
    ) {
        let mut run = RunState::new();
        run.start_game(d);
        for _ in 0..cleared {
            run.complete_level();
        }
        run.add_score(points);
        run.trigger_jumpscare();

        run.reset_game();
        prop_assert_eq!(run.snapshot(), RunState::new().snapshot());

        run.start_game(next);
        let mut fresh = RunState::new();
        fresh.start_game(next);
        prop_assert_eq!(run.snapshot(), fresh.snapshot());
    }

    #[test]
    fn score_is_sum_of_awards(awards in prop::collection::vec(0u64..1_000, 0..40)) {
        let mut run = RunState::new();
        run.start_game(Difficulty::Medium);
        for &points in &awards {
            run.add_score(points);
        }
        prop_assert_eq!(run.score(), awards.iter().sum::<u64>());
    }

    #[test]
    fn difficulty_names_round_trip(d in difficulty()) {
        prop_assert_eq!(Difficulty::from_str(d.as_str()), Some(d));
        prop_assert_eq!(Difficulty::from_str(&d.as_str().to_uppercase()), Some(d));
    }
}
