//! Session glue
//!
//! Owns the run, the one-second countdown and whichever level is live. The
//! shell feeds it frame deltas and input; it keeps the active engine in step
//! with the run's phase and level, tearing engines down the moment the run
//! leaves play so no stale timer can touch a finished attempt.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::consts::*;
use crate::run::{Difficulty, Phase, RunSnapshot, RunState};
use crate::sim::{
    Direction, MazeEngine, MazeView, Scheduler, ShooterEngine, ShooterInput, ShooterView,
    SoundEffect, seeded,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionTimer {
    /// Once per second while a level is live
    Countdown,
    /// End of the jumpscare presentation
    RetryScreen,
}

/// What the player is currently facing
pub enum ActiveLevel {
    /// Menu, jumpscare, retry screen or victory
    Idle,
    /// Puzzle level driven entirely by the UI shell
    Narrative { level: u8 },
    Maze(MazeEngine),
    Shooter(ShooterEngine),
}

impl ActiveLevel {
    pub fn name(&self) -> &'static str {
        match self {
            ActiveLevel::Idle => "idle",
            ActiveLevel::Narrative { .. } => "narrative",
            ActiveLevel::Maze(_) => "maze",
            ActiveLevel::Shooter(_) => "shooter",
        }
    }
}

/// One browser tab's worth of game
pub struct Session {
    run: RunState,
    clock: Scheduler<SessionTimer>,
    active: ActiveLevel,
    /// (level, attempt) the active level was built for
    built_for: Option<(u8, u32)>,
    attempt: u32,
    paused: bool,
    last_phase: Phase,
    seeds: Pcg32,
    cues: Vec<SoundEffect>,
}

impl Session {
    pub fn new(seed: u64) -> Self {
        Self {
            run: RunState::new(),
            clock: Scheduler::new(),
            active: ActiveLevel::Idle,
            built_for: None,
            attempt: 0,
            paused: false,
            last_phase: Phase::Menu,
            seeds: Pcg32::seed_from_u64(seed),
            cues: Vec::new(),
        }
    }

    pub fn run(&self) -> &RunState {
        &self.run
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.run.snapshot()
    }

    pub fn active(&self) -> &ActiveLevel {
        &self.active
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn maze_view(&self) -> Option<MazeView> {
        match &self.active {
            ActiveLevel::Maze(engine) => Some(engine.view()),
            _ => None,
        }
    }

    pub fn shooter_view(&self) -> Option<ShooterView> {
        match &self.active {
            ActiveLevel::Shooter(engine) => Some(engine.view()),
            _ => None,
        }
    }

    pub fn start(&mut self, difficulty: Difficulty) {
        self.run.start_game(difficulty);
        self.paused = false;
        self.attempt += 1;
        self.sync();
    }

    /// Level select. Restarts that level's timer and attempt.
    pub fn select_level(&mut self, level: u8) {
        self.run.set_level(level);
        self.attempt += 1;
        self.sync();
    }

    pub fn retry(&mut self) {
        self.run.retry();
        if self.run.phase() == Phase::Playing {
            self.attempt += 1;
            self.clock.cancel(SessionTimer::RetryScreen);
        }
        self.sync();
    }

    pub fn reset(&mut self) {
        self.run.reset_game();
        self.clock.cancel_all();
        self.paused = false;
        self.sync();
    }

    /// Freeze the countdown and the live engine (tab hidden, pause menu)
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        if paused {
            self.run.pause_timer();
        } else {
            self.run.resume_timer();
        }
    }

    /// The shell solved the current puzzle level
    pub fn complete_narrative(&mut self) {
        if matches!(self.active, ActiveLevel::Narrative { .. }) {
            self.run.complete_level();
            self.cues.push(SoundEffect::LevelClear);
            self.sync();
        }
    }

    pub fn steer(&mut self, dir: Direction) {
        if let ActiveLevel::Maze(engine) = &mut self.active {
            engine.steer(dir);
        }
    }

    pub fn set_shooter_input(&mut self, input: ShooterInput) {
        if let ActiveLevel::Shooter(engine) = &mut self.active {
            engine.set_input(input);
        }
    }

    pub fn drain_cues(&mut self) -> Vec<SoundEffect> {
        std::mem::take(&mut self.cues)
    }

    /// Advance by one frame. Long frames are capped at `MAX_FRAME_MS`.
    pub fn advance(&mut self, dt_ms: u64) {
        if self.paused {
            return;
        }
        let target = self.clock.now_ms() + dt_ms.min(MAX_FRAME_MS);
        // Step the level up to each session timer so a timeout lands at the right instant
        loop {
            let now = self.clock.now_ms();
            let until = self
                .clock
                .peek_due_ms()
                .filter(|&due| due <= target)
                .unwrap_or(target);
            let step = until.saturating_sub(now);
            let used = self.advance_level(step);

            // Timers armed by the sync count from the instant the attempt ended
            self.clock.settle(now + used);
            self.sync();
            if used < step {
                continue;
            }

            match self.clock.next_due(until) {
                Some(SessionTimer::Countdown) => self.run.decrement_time(),
                Some(SessionTimer::RetryScreen) => self.run.show_retry(),
                None if until >= target => break,
                None => {}
            }
            self.sync();
        }
    }

    /// Returns the time the level consumed, short of `dt_ms` when its attempt ended
    fn advance_level(&mut self, dt_ms: u64) -> u64 {
        match &mut self.active {
            ActiveLevel::Maze(engine) => {
                let used = engine.advance(&mut self.run, dt_ms);
                self.cues.extend(engine.drain_cues());
                used
            }
            ActiveLevel::Shooter(engine) => {
                let used = engine.advance(&mut self.run, dt_ms);
                self.cues.extend(engine.drain_cues());
                used
            }
            ActiveLevel::Idle | ActiveLevel::Narrative { .. } => dt_ms,
        }
    }

    /// Bring the active level and session timers in line with the run
    fn sync(&mut self) {
        let phase = self.run.phase();
        if phase != self.last_phase {
            self.on_phase_change(phase);
            self.last_phase = phase;
        }

        if phase != Phase::Playing {
            if self.built_for.take().is_some() {
                self.active = ActiveLevel::Idle;
            }
            self.clock.cancel(SessionTimer::Countdown);
            return;
        }

        let key = (self.run.current_level(), self.attempt);
        if self.built_for != Some(key) {
            self.build_level(key.0);
            self.built_for = Some(key);
            self.clock.every(SessionTimer::Countdown, COUNTDOWN_TICK_MS);
        }
    }

    fn on_phase_change(&mut self, phase: Phase) {
        match phase {
            Phase::Jumpscare => {
                self.cues.push(SoundEffect::Jumpscare);
                self.clock
                    .after(SessionTimer::RetryScreen, JUMPSCARE_DURATION_MS);
            }
            Phase::Victory => {
                log::info!("Run won with {} points", self.run.score());
            }
            Phase::Menu | Phase::Playing | Phase::Retry => {}
        }
    }

    fn build_level(&mut self, level: u8) {
        let rng = seeded(self.seeds.random());
        self.active = match level {
            MAZE_LEVEL => ActiveLevel::Maze(MazeEngine::new(rng)),
            SHOOTER_LEVEL => ActiveLevel::Shooter(ShooterEngine::new(rng)),
            _ => ActiveLevel::Narrative { level },
        };
        log::info!("Level {} ready ({})", level, self.active.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{MazeLayout, Position, ScriptedRandom};

    fn started(difficulty: Difficulty) -> Session {
        let mut session = Session::new(7);
        session.start(difficulty);
        session
    }

    /// Swap the live maze for a one-row corridor
    fn corridor_maze(session: &mut Session, len: usize, pursuer: Option<Position>) {
        let wall = "#".repeat(len + 2);
        let row = format!("#{}#", ".".repeat(len));
        let spawns: Vec<_> = pursuer.map(|pos| (pos, Direction::Left)).into_iter().collect();
        let mut engine = MazeEngine::with_setup(
            MazeLayout::from_rows(&[&wall, &row, &wall]),
            Position::new(1, 1),
            &spawns,
            &[],
            Box::new(ScriptedRandom::constant(0.99)),
        );
        engine.steer(Direction::Right);
        session.active = ActiveLevel::Maze(engine);
    }

    fn run_for(session: &mut Session, ms: u64) {
        let mut left = ms;
        while left > 0 {
            let dt = left.min(16);
            session.advance(dt);
            left -= dt;
        }
    }

    #[test]
    fn test_start_builds_first_level() {
        let session = started(Difficulty::Medium);
        assert!(matches!(session.active(), ActiveLevel::Narrative { level: 1 }));
        assert_eq!(session.snapshot().phase, Phase::Playing);
    }

    #[test]
    fn test_countdown_ticks_each_second() {
        let mut session = started(Difficulty::Medium);
        run_for(&mut session, 3000);
        assert_eq!(session.run().time_remaining(), 117);
    }

    #[test]
    fn test_long_frame_is_capped() {
        let mut session = started(Difficulty::Medium);
        session.advance(60_000);
        assert_eq!(session.run().time_remaining(), 120);
    }

    #[test]
    fn test_timeout_goes_to_retry_screen() {
        let mut session = started(Difficulty::Hard);
        run_for(&mut session, 84_000);
        assert_eq!(session.run().phase(), Phase::Jumpscare);
        assert!(matches!(session.active(), ActiveLevel::Idle));
        assert!(session.drain_cues().contains(&SoundEffect::Jumpscare));

        run_for(&mut session, JUMPSCARE_DURATION_MS);
        assert_eq!(session.run().phase(), Phase::Retry);

        session.retry();
        assert_eq!(session.run().phase(), Phase::Playing);
        assert_eq!(session.run().time_remaining(), 84);
        assert!(matches!(session.active(), ActiveLevel::Narrative { level: 1 }));
    }

    #[test]
    fn test_narrative_levels_lead_to_maze_then_shooter() {
        let mut session = started(Difficulty::Medium);
        for _ in 0..3 {
            session.complete_narrative();
        }
        assert_eq!(session.run().current_level(), MAZE_LEVEL);
        assert!(matches!(session.active(), ActiveLevel::Maze(_)));

        session.select_level(SHOOTER_LEVEL);
        assert!(matches!(session.active(), ActiveLevel::Shooter(_)));
        assert!(session.shooter_view().is_some());
        assert!(session.maze_view().is_none());
    }

    #[test]
    fn test_complete_narrative_ignored_in_arcade_level() {
        let mut session = started(Difficulty::Medium);
        session.select_level(MAZE_LEVEL);
        session.complete_narrative();
        assert_eq!(session.run().current_level(), MAZE_LEVEL);
    }

    #[test]
    fn test_pause_freezes_countdown() {
        let mut session = started(Difficulty::Medium);
        session.set_paused(true);
        run_for(&mut session, 5000);
        assert_eq!(session.run().time_remaining(), 120);

        session.set_paused(false);
        run_for(&mut session, 1000);
        assert_eq!(session.run().time_remaining(), 119);
    }

    #[test]
    fn test_level_change_restarts_countdown() {
        let mut session = started(Difficulty::Medium);
        run_for(&mut session, 1500);
        session.complete_narrative();
        assert_eq!(session.run().time_remaining(), 150);
        run_for(&mut session, 999);
        assert_eq!(session.run().time_remaining(), 150);
        run_for(&mut session, 1);
        assert_eq!(session.run().time_remaining(), 149);
    }

    #[test]
    fn test_reset_tears_down_level() {
        let mut session = started(Difficulty::Easy);
        session.select_level(MAZE_LEVEL);
        session.reset();
        assert!(matches!(session.active(), ActiveLevel::Idle));
        assert_eq!(session.snapshot(), RunState::new().snapshot());

        run_for(&mut session, 5000);
        assert_eq!(session.run().phase(), Phase::Menu);
    }

    #[test]
    fn test_maze_runs_under_session() {
        let mut session = started(Difficulty::Medium);
        session.select_level(MAZE_LEVEL);
        session.steer(Direction::Left);
        run_for(&mut session, 200);
        let view = session.maze_view().expect("maze live");
        assert_ne!(view.player, crate::sim::grid::PLAYER_START);
    }

    #[test]
    fn test_retry_screen_counts_from_the_catch() {
        let mut session = started(Difficulty::Medium);
        session.select_level(MAZE_LEVEL);
        corridor_maze(&mut session, 7, Some(Position::new(7, 1)));

        // Caught 750 ms in, partway through the fourth frame
        for _ in 0..4 {
            session.advance(200);
        }
        assert_eq!(session.run().phase(), Phase::Jumpscare);
        assert!(matches!(session.active(), ActiveLevel::Idle));

        run_for(&mut session, 750 + JUMPSCARE_DURATION_MS - 800 - 1);
        assert_eq!(session.run().phase(), Phase::Jumpscare);
        session.advance(1);
        assert_eq!(session.run().phase(), Phase::Retry);
    }

    #[test]
    fn test_countdown_after_clear_counts_from_completion() {
        let mut session = started(Difficulty::Medium);
        session.select_level(MAZE_LEVEL);
        corridor_maze(&mut session, 5, None);

        // Cleared at 600 ms, completed after the win delay at 2100 ms
        for _ in 0..11 {
            session.advance(200);
        }
        assert_eq!(session.run().current_level(), SHOOTER_LEVEL);
        assert_eq!(session.run().time_remaining(), 240);

        run_for(&mut session, 3099 - 2200);
        assert_eq!(session.run().time_remaining(), 240);
        session.advance(1);
        assert_eq!(session.run().time_remaining(), 239);
    }
}
