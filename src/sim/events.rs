//! Side-effect cues emitted by the simulation
//!
//! Engines queue cues as they tick; the shell drains and plays them.
//! Playback can fail or be skipped without touching simulation state.

use serde::{Deserialize, Serialize};

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundEffect {
    /// Maze dot eaten
    DotPickup,
    /// Power pickup eaten, pursuers panic
    PowerPickup,
    /// Frightened pursuer caught
    PursuerEaten,
    /// Player bullet fired
    PlayerShot,
    /// Enemy bullet fired
    EnemyShot,
    /// Enemy destroyed
    EnemyDestroyed,
    /// Boss took a hit
    BossHit,
    /// Final wave cleared, boss enters
    BossAppears,
    /// Level attempt won
    LevelClear,
    /// Run entered the jumpscare (any cause)
    Jumpscare,
}
