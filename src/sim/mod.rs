//! Deterministic simulation module
//!
//! All arcade gameplay lives here. This module must stay pure and deterministic:
//! - Time only advances through [`clock::Scheduler`]
//! - Randomness only through an injected [`rng::RandomSource`]
//! - No rendering, audio or platform dependencies; side effects leave as [`SoundEffect`] cues
//!
//! Engines never own the run. They talk to it through [`crate::run::RunControl`].

pub mod clock;
pub mod collision;
pub mod events;
pub mod grid;
pub mod maze;
pub mod pursuer;
pub mod rng;
pub mod shooter;
pub mod waves;

use serde::Serialize;

pub use clock::Scheduler;
pub use collision::Rect;
pub use events::SoundEffect;
pub use grid::{Direction, MazeLayout, Position};
pub use maze::{MazeEngine, MazeView};
pub use pursuer::{GhostMode, Pursuer};
pub use rng::{RandomSource, ScriptedRandom, seeded};
pub use shooter::{ShooterEngine, ShooterInput, ShooterView, Stage};
pub use waves::{BossTier, EnemyType, WAVES, WaveDef};

/// Outcome of one level attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    /// Timers running
    Running,
    /// Won; waiting out the presentation delay before completing the level
    Cleared,
    /// Level completion handed to the run
    Completed,
    /// Lost; the run was sent to the jumpscare
    Failed,
    /// Stopped because the run left play (timeout, reset)
    Abandoned,
}

impl AttemptStatus {
    /// No further state change is possible
    pub fn is_over(self) -> bool {
        matches!(
            self,
            AttemptStatus::Completed | AttemptStatus::Failed | AttemptStatus::Abandoned
        )
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::run::{Phase, RunControl};

    /// Records every call an engine makes on the run
    #[derive(Debug)]
    pub struct MockRun {
        pub phase: Phase,
        pub speed: f32,
        pub score: u64,
        pub completions: u32,
        pub jumpscares: u32,
    }

    impl MockRun {
        pub fn playing() -> Self {
            Self {
                phase: Phase::Playing,
                speed: 1.0,
                score: 0,
                completions: 0,
                jumpscares: 0,
            }
        }
    }

    impl RunControl for MockRun {
        fn phase(&self) -> Phase {
            self.phase
        }

        fn enemy_speed_multiplier(&self) -> f32 {
            self.speed
        }

        fn add_score(&mut self, points: u64) {
            self.score += points;
        }

        fn complete_level(&mut self) {
            self.completions += 1;
        }

        fn trigger_jumpscare(&mut self) {
            self.jumpscares += 1;
            self.phase = Phase::Jumpscare;
        }
    }
}
