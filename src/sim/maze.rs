//! Maze chase engine (level 4)
//!
//! The player sweeps a walled grid eating dots while four pursuers hunt them.
//! Power pickups flip the pursuers into a frightened window where touching one
//! eats it instead. Each concern runs on its own timer:
//! - player step every `PLAYER_TICK_MS`
//! - pursuer step, slower, scaled by the run's enemy speed
//! - scatter/chase cycle, frightened expiry, win presentation delay

use serde::Serialize;

use super::clock::Scheduler;
use super::events::SoundEffect;
use super::grid::{Direction, MazeLayout, POWER_CELLS, PLAYER_START, PURSUER_SPAWNS, Position};
use super::pursuer::{GhostMode, Pursuer};
use super::rng::RandomSource;
use super::AttemptStatus;
use crate::run::{Phase, RunControl};
use crate::scaled_interval;

/// Player step interval
pub const PLAYER_TICK_MS: u64 = 150;
/// Pursuer step interval at enemy speed 1.0
pub const PURSUER_TICK_MS: u64 = 400;
/// Pursuer step interval while frightened, at enemy speed 1.0
pub const PURSUER_FRIGHTENED_TICK_MS: u64 = 600;
/// Fastest pursuer step, whatever the speed multiplier
pub const PURSUER_MIN_TICK_MS: u64 = 150;
/// Scatter/chase alternation period
pub const MODE_CYCLE_MS: u64 = 9000;
/// Frightened window length
pub const FRIGHTENED_MS: u64 = 7000;
/// Pause between the last dot and the level hand-off
pub const WIN_DELAY_MS: u64 = 1500;

pub const DOT_POINTS: u64 = 10;
pub const PURSUER_EAT_POINTS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MazeTimer {
    Player,
    Pursuers,
    ModeCycle,
    FrightenedEnd,
    WinDelay,
}

/// Render-facing snapshot
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MazeView {
    pub player: Position,
    pub pursuers: Vec<(usize, Position)>,
    pub mode: GhostMode,
    pub dots: Vec<Position>,
    pub power_cells: Vec<Position>,
    pub dots_collected: u32,
    pub total_dots: u32,
    pub status: AttemptStatus,
}

/// One attempt at the maze level
pub struct MazeEngine {
    maze: MazeLayout,
    clock: Scheduler<MazeTimer>,
    rng: Box<dyn RandomSource>,
    armed: bool,
    speed: f32,

    player: Position,
    heading: Option<Direction>,
    /// Requested turn, applied as soon as the corridor allows it
    queued: Option<Direction>,
    /// Direction of the player's most recent actual move
    last_moved: Option<Direction>,

    pursuers: Vec<Pursuer>,
    mode: GhostMode,

    dots: Vec<bool>,
    power: Vec<bool>,
    total_dots: u32,
    dots_collected: u32,

    frightened_windows: u32,
    pursuers_eaten: u32,
    status: AttemptStatus,
    cues: Vec<SoundEffect>,
}

fn cell_index(pos: Position) -> usize {
    let p = pos.wrapped();
    (p.y * super::grid::GRID_SIZE + p.x) as usize
}

impl MazeEngine {
    /// The standard level: centre start, four corner pursuers, four power pickups
    pub fn new(rng: Box<dyn RandomSource>) -> Self {
        Self::with_setup(
            MazeLayout::standard(),
            PLAYER_START,
            &PURSUER_SPAWNS,
            &POWER_CELLS,
            rng,
        )
    }

    /// Custom layout. Every corridor except the start and the power cells gets a dot.
    pub fn with_setup(
        maze: MazeLayout,
        start: Position,
        spawns: &[(Position, Direction)],
        power_cells: &[Position],
        rng: Box<dyn RandomSource>,
    ) -> Self {
        let cells = (super::grid::GRID_SIZE * super::grid::GRID_SIZE) as usize;
        let mut dots = vec![false; cells];
        let mut power = vec![false; cells];

        for pos in maze.corridors() {
            dots[cell_index(pos)] = true;
        }
        dots[cell_index(start)] = false;
        for &pos in power_cells {
            if maze.is_traversable(pos) {
                dots[cell_index(pos)] = false;
                power[cell_index(pos)] = true;
            }
        }
        let total_dots = dots.iter().filter(|&&d| d).count() as u32;

        let pursuers = spawns
            .iter()
            .enumerate()
            .map(|(i, &(pos, dir))| Pursuer::new(i, pos, dir))
            .collect();

        Self {
            maze,
            clock: Scheduler::new(),
            rng,
            armed: false,
            speed: 1.0,
            player: start.wrapped(),
            heading: None,
            queued: None,
            last_moved: None,
            pursuers,
            mode: GhostMode::Scatter,
            dots,
            power,
            total_dots,
            dots_collected: 0,
            frightened_windows: 0,
            pursuers_eaten: 0,
            status: AttemptStatus::Running,
            cues: Vec::new(),
        }
    }

    pub fn player(&self) -> Position {
        self.player
    }

    pub fn pursuers(&self) -> &[Pursuer] {
        &self.pursuers
    }

    pub fn mode(&self) -> GhostMode {
        self.mode
    }

    pub fn status(&self) -> AttemptStatus {
        self.status
    }

    pub fn total_dots(&self) -> u32 {
        self.total_dots
    }

    pub fn dots_collected(&self) -> u32 {
        self.dots_collected
    }

    pub fn has_dot(&self, pos: Position) -> bool {
        self.dots[cell_index(pos)]
    }

    pub fn has_power(&self, pos: Position) -> bool {
        self.power[cell_index(pos)]
    }

    /// Number of frightened windows entered this attempt (extensions don't count)
    pub fn frightened_windows(&self) -> u32 {
        self.frightened_windows
    }

    pub fn pursuers_eaten(&self) -> u32 {
        self.pursuers_eaten
    }

    pub fn frightened_remaining_ms(&self) -> Option<u64> {
        self.clock.remaining_ms(MazeTimer::FrightenedEnd)
    }

    /// True once no timer can fire again
    pub fn is_halted(&self) -> bool {
        self.armed && self.clock.is_idle()
    }

    /// Buffer a turn for the next player step
    pub fn steer(&mut self, dir: Direction) {
        self.queued = Some(dir);
    }

    pub fn drain_cues(&mut self) -> Vec<SoundEffect> {
        std::mem::take(&mut self.cues)
    }

    pub fn view(&self) -> MazeView {
        let cells = || self.maze.corridors();
        MazeView {
            player: self.player,
            pursuers: self.pursuers.iter().map(|p| (p.color_id, p.pos)).collect(),
            mode: self.mode,
            dots: cells().filter(|&p| self.has_dot(p)).collect(),
            power_cells: cells().filter(|&p| self.has_power(p)).collect(),
            dots_collected: self.dots_collected,
            total_dots: self.total_dots,
            status: self.status,
        }
    }

    /// Run every timer due within the next `dt_ms`.
    ///
    /// Returns the milliseconds consumed. That is all of `dt_ms` unless the
    /// attempt ends on the way, in which case it stops at the deciding tick.
    pub fn advance(&mut self, run: &mut dyn RunControl, dt_ms: u64) -> u64 {
        if self.status.is_over() {
            return dt_ms;
        }
        if run.phase() != Phase::Playing {
            self.halt();
            return dt_ms;
        }
        if !self.armed {
            self.arm(run.enemy_speed_multiplier());
        }

        let start = self.clock.now_ms();
        let target = start + dt_ms;
        while let Some(timer) = self.clock.next_due(target) {
            match timer {
                MazeTimer::Player => self.on_player_tick(run),
                MazeTimer::Pursuers => self.on_pursuer_tick(run),
                MazeTimer::ModeCycle => self.on_mode_cycle(),
                MazeTimer::FrightenedEnd => self.on_frightened_end(),
                MazeTimer::WinDelay => {
                    self.status = AttemptStatus::Completed;
                    self.clock.cancel_all();
                    run.complete_level();
                }
            }
            if run.phase() != Phase::Playing && !self.status.is_over() {
                self.halt();
            }
            if self.status.is_over() {
                return self.clock.now_ms() - start;
            }
        }
        self.clock.settle(target);
        dt_ms
    }

    /// Cancel every timer; the attempt can no longer change
    pub fn halt(&mut self) {
        self.clock.cancel_all();
        self.armed = true;
        if self.status == AttemptStatus::Running || self.status == AttemptStatus::Cleared {
            self.status = AttemptStatus::Abandoned;
        }
    }

    fn arm(&mut self, speed: f32) {
        self.speed = speed;
        self.armed = true;
        self.clock.every(MazeTimer::Player, PLAYER_TICK_MS);
        self.clock.every(MazeTimer::Pursuers, self.pursuer_interval());
        self.clock.every(MazeTimer::ModeCycle, MODE_CYCLE_MS);
    }

    fn pursuer_interval(&self) -> u64 {
        let base = if self.mode == GhostMode::Frightened {
            PURSUER_FRIGHTENED_TICK_MS
        } else {
            PURSUER_TICK_MS
        };
        scaled_interval(base, self.speed, PURSUER_MIN_TICK_MS)
    }

    fn on_player_tick(&mut self, run: &mut dyn RunControl) {
        self.step_player();
        self.collect(run);
        if self.dots_collected >= self.total_dots {
            self.clear_level();
            return;
        }
        self.resolve_contacts(run);
    }

    fn on_pursuer_tick(&mut self, run: &mut dyn RunControl) {
        for i in 0..self.pursuers.len() {
            let choice = self.pursuers[i].choose_move(
                &self.maze,
                self.mode,
                self.player,
                self.last_moved,
                self.rng.as_mut(),
            );
            if let Some(dir) = choice {
                self.pursuers[i].advance(&self.maze, dir);
            }
        }
        self.resolve_contacts(run);
    }

    fn on_mode_cycle(&mut self) {
        self.mode = match self.mode {
            GhostMode::Scatter => GhostMode::Chase,
            GhostMode::Chase => GhostMode::Scatter,
            // Cycle timer is cancelled while frightened
            GhostMode::Frightened => GhostMode::Frightened,
        };
        log::debug!("Pursuers switch to {:?}", self.mode);
    }

    fn on_frightened_end(&mut self) {
        self.mode = GhostMode::Chase;
        self.clock.every(MazeTimer::ModeCycle, MODE_CYCLE_MS);
        self.clock.every(MazeTimer::Pursuers, self.pursuer_interval());
        log::debug!("Frightened window over");
    }

    fn step_player(&mut self) {
        if let Some(turn) = self.queued
            && self.maze.try_step(self.player, turn).is_some()
        {
            self.heading = Some(turn);
            self.queued = None;
        }

        let next = self
            .heading
            .and_then(|dir| self.maze.try_step(self.player, dir).map(|pos| (dir, pos)));
        match next {
            Some((dir, pos)) => {
                self.player = pos;
                self.last_moved = Some(dir);
            }
            None => self.heading = None,
        }
    }

    fn collect(&mut self, run: &mut dyn RunControl) {
        let idx = cell_index(self.player);
        if self.dots[idx] {
            self.dots[idx] = false;
            self.dots_collected += 1;
            run.add_score(DOT_POINTS);
            self.cues.push(SoundEffect::DotPickup);
        }
        if self.power[idx] {
            self.power[idx] = false;
            self.cues.push(SoundEffect::PowerPickup);
            self.enter_frightened();
        }
    }

    fn enter_frightened(&mut self) {
        if self.mode != GhostMode::Frightened {
            self.mode = GhostMode::Frightened;
            self.frightened_windows += 1;
            for pursuer in &mut self.pursuers {
                pursuer.reverse();
            }
            self.clock.cancel(MazeTimer::ModeCycle);
            self.clock.every(MazeTimer::Pursuers, self.pursuer_interval());
            log::debug!("Frightened window #{}", self.frightened_windows);
        }
        // A second pickup restarts the same window
        self.clock.after(MazeTimer::FrightenedEnd, FRIGHTENED_MS);
    }

    fn resolve_contacts(&mut self, run: &mut dyn RunControl) {
        for i in 0..self.pursuers.len() {
            if self.pursuers[i].pos != self.player {
                continue;
            }
            if self.mode == GhostMode::Frightened {
                self.pursuers[i].respawn();
                self.pursuers_eaten += 1;
                run.add_score(PURSUER_EAT_POINTS);
                self.cues.push(SoundEffect::PursuerEaten);
            } else {
                log::info!("Caught by pursuer {} at {:?}", i, self.player);
                self.status = AttemptStatus::Failed;
                self.clock.cancel_all();
                run.trigger_jumpscare();
                return;
            }
        }
    }

    fn clear_level(&mut self) {
        log::info!("Maze cleared ({} dots)", self.dots_collected);
        self.status = AttemptStatus::Cleared;
        self.clock.cancel_all();
        self.clock.after(MazeTimer::WinDelay, WIN_DELAY_MS);
        self.cues.push(SoundEffect::LevelClear);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::grid::GRID_SIZE;
    use crate::sim::rng::ScriptedRandom;
    use crate::sim::testing::MockRun;

    fn no_random() -> Box<dyn RandomSource> {
        Box::new(ScriptedRandom::constant(0.99))
    }

    fn corridor(len: usize) -> MazeLayout {
        let wall = "#".repeat(len + 2);
        let row = format!("#{}#", ".".repeat(len));
        MazeLayout::from_rows(&[&wall, &row, &wall])
    }

    #[test]
    fn test_standard_initial_state() {
        let engine = MazeEngine::new(no_random());
        let maze = MazeLayout::standard();
        let corridors = maze.corridors().count() as u32;

        assert_eq!(engine.player(), PLAYER_START);
        assert_eq!(engine.total_dots(), corridors - 1 - POWER_CELLS.len() as u32);
        assert!(!engine.has_dot(PLAYER_START));
        for pos in POWER_CELLS {
            assert!(engine.has_power(pos));
            assert!(!engine.has_dot(pos));
        }
        assert_eq!(engine.pursuers().len(), 4);
        for (p, (spawn, dir)) in engine.pursuers().iter().zip(PURSUER_SPAWNS) {
            assert_eq!(p.pos, spawn);
            assert_eq!(p.direction, dir);
        }
        assert_eq!(engine.mode(), GhostMode::Scatter);
    }

    #[test]
    fn test_clearing_all_dots_completes_level() {
        let mut run = MockRun::playing();
        let mut engine = MazeEngine::with_setup(
            corridor(5),
            Position::new(1, 1),
            &[],
            &[],
            no_random(),
        );
        assert_eq!(engine.total_dots(), 4);
        engine.steer(Direction::Right);

        engine.advance(&mut run, PLAYER_TICK_MS * 4);
        assert_eq!(engine.dots_collected(), 4);
        assert_eq!(engine.status(), AttemptStatus::Cleared);
        assert_eq!(run.completions, 0);

        engine.advance(&mut run, WIN_DELAY_MS);
        assert_eq!(engine.status(), AttemptStatus::Completed);
        assert_eq!(run.completions, 1);
        assert_eq!(run.score, engine.total_dots() as u64 * DOT_POINTS);
        assert!(engine.is_halted());

        engine.advance(&mut run, 10_000);
        assert_eq!(run.completions, 1);
    }

    #[test]
    fn test_blocked_turn_stays_buffered() {
        let mut run = MockRun::playing();
        let maze = MazeLayout::from_rows(&[
            "#####", //
            "#...#", //
            "###.#", //
            "###.#", //
            "#####",
        ]);
        let mut engine = MazeEngine::with_setup(maze, Position::new(1, 1), &[], &[], no_random());
        engine.steer(Direction::Right);
        engine.advance(&mut run, PLAYER_TICK_MS);
        assert_eq!(engine.player(), Position::new(2, 1));

        // Down is a wall here; keep going right and turn when the corridor opens
        engine.steer(Direction::Down);
        engine.advance(&mut run, PLAYER_TICK_MS);
        assert_eq!(engine.player(), Position::new(3, 1));
        engine.advance(&mut run, PLAYER_TICK_MS);
        assert_eq!(engine.player(), Position::new(3, 2));
    }

    #[test]
    fn test_player_stops_at_wall() {
        let mut run = MockRun::playing();
        let mut engine = MazeEngine::with_setup(
            corridor(8),
            Position::new(1, 1),
            &[],
            &[Position::new(8, 1)],
            no_random(),
        );
        engine.steer(Direction::Left);
        engine.advance(&mut run, PLAYER_TICK_MS * 3);
        assert_eq!(engine.player(), Position::new(1, 1));
        assert_eq!(engine.status(), AttemptStatus::Running);
    }

    #[test]
    fn test_caught_by_pursuer_triggers_jumpscare() {
        let mut run = MockRun::playing();
        let mut engine = MazeEngine::with_setup(
            corridor(7),
            Position::new(1, 1),
            &[(Position::new(7, 1), Direction::Left)],
            &[],
            no_random(),
        );
        engine.steer(Direction::Right);
        // Caught on the fifth player step
        assert_eq!(engine.advance(&mut run, 1000), PLAYER_TICK_MS * 5);

        assert_eq!(engine.status(), AttemptStatus::Failed);
        assert_eq!(run.jumpscares, 1);
        assert_eq!(run.completions, 0);
        assert!(engine.is_halted());

        let player = engine.player();
        engine.advance(&mut run, 5000);
        assert_eq!(engine.player(), player);
        assert_eq!(run.jumpscares, 1);
    }

    #[test]
    fn test_frightened_pursuer_is_eaten() {
        let mut run = MockRun::playing();
        let mut engine = MazeEngine::with_setup(
            corridor(9),
            Position::new(1, 1),
            &[(Position::new(9, 1), Direction::Left)],
            &[Position::new(2, 1)],
            no_random(),
        );
        engine.steer(Direction::Right);

        engine.advance(&mut run, PLAYER_TICK_MS);
        assert_eq!(engine.mode(), GhostMode::Frightened);
        assert_eq!(engine.frightened_windows(), 1);
        // Panic turn
        assert_eq!(engine.pursuers()[0].direction, Direction::Right);

        engine.advance(&mut run, 1000);
        assert_eq!(engine.pursuers_eaten(), 1);
        assert_eq!(run.jumpscares, 0);
        assert_eq!(engine.status(), AttemptStatus::Running);
        assert!(run.score >= PURSUER_EAT_POINTS);
    }

    #[test]
    fn test_second_pickup_restarts_single_window() {
        let mut run = MockRun::playing();
        let mut engine = MazeEngine::with_setup(
            corridor(9),
            Position::new(1, 1),
            &[],
            &[Position::new(2, 1), Position::new(3, 1)],
            no_random(),
        );
        engine.steer(Direction::Right);
        engine.advance(&mut run, PLAYER_TICK_MS);
        assert_eq!(engine.frightened_windows(), 1);
        assert_eq!(engine.frightened_remaining_ms(), Some(FRIGHTENED_MS));

        engine.advance(&mut run, PLAYER_TICK_MS);
        assert_eq!(engine.frightened_windows(), 1);
        assert_eq!(engine.frightened_remaining_ms(), Some(FRIGHTENED_MS));
        assert_eq!(engine.mode(), GhostMode::Frightened);
    }

    #[test]
    fn test_frightened_window_expires_into_chase() {
        let mut run = MockRun::playing();
        let mut engine = MazeEngine::with_setup(
            MazeLayout::standard(),
            Position::new(1, 2),
            &[],
            &[Position::new(1, 3)],
            no_random(),
        );
        engine.steer(Direction::Down);
        engine.advance(&mut run, PLAYER_TICK_MS);
        assert_eq!(engine.mode(), GhostMode::Frightened);

        engine.advance(&mut run, FRIGHTENED_MS - 100);
        assert_eq!(engine.mode(), GhostMode::Frightened);
        engine.advance(&mut run, 100);
        assert_eq!(engine.mode(), GhostMode::Chase);
        assert_eq!(engine.frightened_remaining_ms(), None);
    }

    #[test]
    fn test_mode_cycles_scatter_chase() {
        let mut run = MockRun::playing();
        let mut engine =
            MazeEngine::with_setup(MazeLayout::standard(), PLAYER_START, &[], &[], no_random());
        engine.advance(&mut run, MODE_CYCLE_MS - 1);
        assert_eq!(engine.mode(), GhostMode::Scatter);
        engine.advance(&mut run, 1);
        assert_eq!(engine.mode(), GhostMode::Chase);
        engine.advance(&mut run, MODE_CYCLE_MS);
        assert_eq!(engine.mode(), GhostMode::Scatter);
    }

    #[test]
    fn test_halts_when_run_leaves_playing() {
        let mut run = MockRun::playing();
        let mut engine = MazeEngine::new(no_random());
        engine.steer(Direction::Left);
        engine.advance(&mut run, PLAYER_TICK_MS);
        let player = engine.player();

        run.phase = Phase::Jumpscare;
        engine.advance(&mut run, 5000);
        assert!(engine.is_halted());
        assert_eq!(engine.status(), AttemptStatus::Abandoned);
        assert_eq!(engine.player(), player);
    }

    #[test]
    fn test_tunnel_wraps_player() {
        let mut run = MockRun::playing();
        let mut engine = MazeEngine::with_setup(
            MazeLayout::standard(),
            Position::new(0, 7),
            &[],
            &[],
            no_random(),
        );
        engine.steer(Direction::Left);
        engine.advance(&mut run, PLAYER_TICK_MS);
        assert_eq!(engine.player(), Position::new(GRID_SIZE - 1, 7));
    }

    #[test]
    fn test_faster_enemies_step_more_often() {
        let mut slow = MockRun::playing();
        slow.speed = 0.7;
        let mut fast = MockRun::playing();
        fast.speed = 1.5;

        let spawn = [(Position::new(1, 1), Direction::Right)];
        let engine = || {
            MazeEngine::with_setup(corridor(12), Position::new(12, 1), &spawn, &[], no_random())
        };
        let mut a = engine();
        let mut b = engine();
        a.advance(&mut slow, 1200);
        b.advance(&mut fast, 1200);
        // 1200/571 = 2 steps vs 1200/266 = 4 steps
        assert_eq!(a.pursuers()[0].pos, Position::new(3, 1));
        assert_eq!(b.pursuers()[0].pos, Position::new(5, 1));
    }
}
