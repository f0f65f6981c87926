//! Run state machine
//!
//! One `RunState` per run: the authority for phase, countdown, score and
//! difficulty. Level engines talk to it only through [`RunControl`].

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Current phase of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Main menu, no run in progress
    #[default]
    Menu,
    /// A level attempt is live
    Playing,
    /// Failure transition (timeout or lethal collision)
    Jumpscare,
    /// Waiting for the player to retry or give up
    Retry,
    /// Final level cleared
    Victory,
}

/// Difficulty chosen when the run starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" | "med" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Level time multiplier in percent (integer so flooring is exact)
    pub fn time_percent(&self) -> u32 {
        match self {
            Difficulty::Easy => 150,
            Difficulty::Medium => 100,
            Difficulty::Hard => 70,
        }
    }

    pub fn time_multiplier(&self) -> f32 {
        self.time_percent() as f32 / 100.0
    }

    /// Enemy speed multiplier applied to engine tick intervals
    pub fn enemy_speed(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.7,
            Difficulty::Medium => 1.0,
            Difficulty::Hard => 1.5,
        }
    }

    /// Score multiplier in percent
    pub fn score_percent(&self) -> u64 {
        match self {
            Difficulty::Easy => 50,
            Difficulty::Medium => 100,
            Difficulty::Hard => 200,
        }
    }

    pub fn score_multiplier(&self) -> f32 {
        self.score_percent() as f32 / 100.0
    }
}

/// Time allowed for `level` at `difficulty`, in whole seconds
pub fn level_time(level: u8, difficulty: Difficulty) -> u32 {
    let idx = (level.clamp(1, LEVEL_COUNT as u8) - 1) as usize;
    LEVEL_BASE_TIMES[idx] * difficulty.time_percent() / 100
}

/// What the level engines may read and do to the run.
///
/// Engines never hold the run; it is passed to every tick.
pub trait RunControl {
    fn phase(&self) -> Phase;
    fn enemy_speed_multiplier(&self) -> f32;
    fn add_score(&mut self, points: u64);
    fn complete_level(&mut self);
    fn trigger_jumpscare(&mut self);
}

/// Read-only view for the UI shell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub phase: Phase,
    pub difficulty: Difficulty,
    pub current_level: u8,
    pub time_remaining: u32,
    pub max_time: u32,
    pub score: u64,
    pub is_timer_running: bool,
    pub level_completed: [bool; LEVEL_COUNT],
}

/// Global run state
#[derive(Debug, Clone)]
pub struct RunState {
    phase: Phase,
    difficulty: Difficulty,
    current_level: u8,
    time_remaining: u32,
    max_time: u32,
    score: u64,
    is_timer_running: bool,
    level_completed: [bool; LEVEL_COUNT],
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    /// Menu defaults
    pub fn new() -> Self {
        let difficulty = Difficulty::default();
        let time = level_time(1, difficulty);
        Self {
            phase: Phase::Menu,
            difficulty,
            current_level: 1,
            time_remaining: time,
            max_time: time,
            score: 0,
            is_timer_running: false,
            level_completed: [false; LEVEL_COUNT],
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn current_level(&self) -> u8 {
        self.current_level
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn max_time(&self) -> u32 {
        self.max_time
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn is_timer_running(&self) -> bool {
        self.is_timer_running
    }

    pub fn level_completed(&self) -> [bool; LEVEL_COUNT] {
        self.level_completed
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            phase: self.phase,
            difficulty: self.difficulty,
            current_level: self.current_level,
            time_remaining: self.time_remaining,
            max_time: self.max_time,
            score: self.score,
            is_timer_running: self.is_timer_running,
            level_completed: self.level_completed,
        }
    }

    /// Begin a fresh run. Difficulty is fixed until the next start.
    pub fn start_game(&mut self, difficulty: Difficulty) {
        *self = Self::new();
        self.difficulty = difficulty;
        self.reset_timer();
        self.phase = Phase::Playing;
        self.is_timer_running = true;
        log::info!(
            "Run started on {} ({}s for level 1)",
            difficulty.as_str(),
            self.max_time
        );
    }

    /// Jump straight to `level` (level select). Clamped to the valid range.
    /// While playing the level only moves forward; asking for an earlier
    /// one restarts the current level.
    pub fn set_level(&mut self, level: u8) {
        let floor = if self.phase == Phase::Playing {
            self.current_level
        } else {
            1
        };
        self.current_level = level.clamp(floor, LEVEL_COUNT as u8);
        self.reset_timer();
        self.is_timer_running = self.phase == Phase::Playing;
    }

    /// One real-time second elapsed. Hitting zero is a timeout failure.
    pub fn decrement_time(&mut self) {
        if !self.is_timer_running {
            return;
        }
        if self.time_remaining <= 1 {
            log::info!("Level {} timed out", self.current_level);
            self.trigger_jumpscare();
        } else {
            self.time_remaining -= 1;
        }
    }

    pub fn pause_timer(&mut self) {
        self.is_timer_running = false;
    }

    pub fn resume_timer(&mut self) {
        if self.phase == Phase::Playing {
            self.is_timer_running = true;
        }
    }

    pub fn add_score(&mut self, points: u64) {
        self.score = self.score.saturating_add(points);
    }

    /// Clear the current level; advances or ends the run in victory.
    ///
    /// No-op outside `Playing`.
    pub fn complete_level(&mut self) {
        if self.phase != Phase::Playing {
            return;
        }
        let idx = (self.current_level - 1) as usize;
        self.level_completed[idx] = true;

        let percent = self.difficulty.score_percent();
        let time_bonus = self.time_remaining as u64 * TIME_BONUS_PER_SECOND * percent / 100;
        let is_final = self.current_level as usize == LEVEL_COUNT;
        let flat = if is_final {
            FINAL_CLEAR_BONUS
        } else {
            LEVEL_CLEAR_BONUS
        };
        let bonus = time_bonus + flat * percent / 100;
        self.add_score(bonus);

        if is_final {
            self.phase = Phase::Victory;
            self.is_timer_running = false;
            log::info!("Victory! Final score {}", self.score);
        } else {
            self.current_level += 1;
            self.reset_timer();
            self.is_timer_running = true;
            log::info!(
                "Level {} cleared (+{}), on to level {}",
                self.current_level - 1,
                bonus,
                self.current_level
            );
        }
    }

    /// Universal failure signal; stops the countdown.
    pub fn trigger_jumpscare(&mut self) {
        self.phase = Phase::Jumpscare;
        self.is_timer_running = false;
    }

    /// Jumpscare finished playing; show the retry screen.
    pub fn show_retry(&mut self) {
        if self.phase == Phase::Jumpscare {
            self.phase = Phase::Retry;
        }
    }

    /// Restart the current level with a full timer. Progress inside the level is lost.
    pub fn retry(&mut self) {
        if !matches!(self.phase, Phase::Jumpscare | Phase::Retry) {
            return;
        }
        self.reset_timer();
        self.phase = Phase::Playing;
        self.is_timer_running = true;
        log::info!("Retrying level {}", self.current_level);
    }

    /// Back to the menu with every field at its default
    pub fn reset_game(&mut self) {
        *self = Self::new();
        log::info!("Run reset");
    }

    fn reset_timer(&mut self) {
        let time = level_time(self.current_level, self.difficulty);
        self.time_remaining = time;
        self.max_time = time;
    }
}

impl RunControl for RunState {
    fn phase(&self) -> Phase {
        self.phase
    }

    fn enemy_speed_multiplier(&self) -> f32 {
        self.difficulty.enemy_speed()
    }

    fn add_score(&mut self, points: u64) {
        RunState::add_score(self, points);
    }

    fn complete_level(&mut self) {
        RunState::complete_level(self);
    }

    fn trigger_jumpscare(&mut self) {
        RunState::trigger_jumpscare(self);
    }
}
