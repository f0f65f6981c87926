//! Hawkins Escape - a five-level escape run in the browser
//!
//! Core modules:
//! - `run`: Run state machine (phase, countdown, score, difficulty)
//! - `sim`: Deterministic simulation (maze chase, wave shooter, tick scheduler)
//! - `session`: Wires the run, the countdown and the active level engine together
//! - `highscores`: High score records, validation and the leaderboard API
//! - `settings`: Persisted player preferences

#[cfg(target_arch = "wasm32")]
pub mod audio;
pub mod highscores;
pub mod run;
pub mod session;
pub mod settings;
pub mod sim;

pub use highscores::{HighScoreEntry, HighScoreError, HighScoreQuery, NewHighScore};
pub use run::{Difficulty, Phase, RunControl, RunSnapshot, RunState};
pub use session::{ActiveLevel, Session};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Number of levels in a run
    pub const LEVEL_COUNT: usize = 5;
    /// Level hosting the maze chase
    pub const MAZE_LEVEL: u8 = 4;
    /// Level hosting the wave shooter (final level)
    pub const SHOOTER_LEVEL: u8 = 5;

    /// Base time per level in seconds, before the difficulty multiplier
    pub const LEVEL_BASE_TIMES: [u32; LEVEL_COUNT] = [120, 150, 180, 180, 240];
    /// Flat bonus for clearing levels 1-4
    pub const LEVEL_CLEAR_BONUS: u64 = 500;
    /// Flat bonus for clearing the final level
    pub const FINAL_CLEAR_BONUS: u64 = 1000;
    /// Time bonus points per remaining second
    pub const TIME_BONUS_PER_SECOND: u64 = 10;

    /// Global countdown period
    pub const COUNTDOWN_TICK_MS: u64 = 1000;
    /// How long the jumpscare plays before the retry screen
    pub const JUMPSCARE_DURATION_MS: u64 = 2500;

    /// Maximum simulated time consumed per frame (avoids spiral of death after tab switch)
    pub const MAX_FRAME_MS: u64 = 250;
}

/// Scale a base tick interval by the enemy speed multiplier.
///
/// Higher speed means shorter intervals; the result never drops below `floor_ms`.
#[inline]
pub fn scaled_interval(base_ms: u64, speed: f32, floor_ms: u64) -> u64 {
    let speed = if speed > 0.0 { speed } else { 1.0 };
    ((base_ms as f32 / speed).floor() as u64).max(floor_ms)
}
