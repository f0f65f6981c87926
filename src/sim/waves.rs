//! Wave definitions, enemy fire patterns and boss tiers for the shooter

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Enemy flavour; decides hit points per wave and how it shoots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyType {
    /// Single straight shot
    Basic,
    /// Single fast shot, fires less often
    Sniper,
    /// Three-way spread
    Burst,
    /// Slow shot with a lifetime and a big hitbox
    Bomb,
}

/// Bullet flavour, for rendering and hitbox size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulletKind {
    Player,
    Standard,
    Fast,
    Spread,
    Bomb,
    Boss,
}

/// One bullet of a volley, relative to the shooter's muzzle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotSpec {
    pub velocity: Vec2,
    pub kind: BulletKind,
    /// Lifetime before despawning; `None` lives until it leaves the field
    pub ttl_ms: Option<u64>,
    /// Hitbox side
    pub size: f32,
}

/// Default bullet hitbox
pub const BULLET_SIZE: f32 = 8.0;
/// Bomb hitbox
pub const BOMB_SIZE: f32 = 16.0;
/// Bomb lifetime
pub const BOMB_TTL_MS: u64 = 2500;

const fn shot(vx: f32, vy: f32, kind: BulletKind) -> ShotSpec {
    ShotSpec {
        velocity: Vec2::new(vx, vy),
        kind,
        ttl_ms: None,
        size: BULLET_SIZE,
    }
}

const BASIC_VOLLEY: [ShotSpec; 1] = [shot(0.0, 5.0, BulletKind::Standard)];
const SNIPER_VOLLEY: [ShotSpec; 1] = [shot(0.0, 9.0, BulletKind::Fast)];
const BURST_VOLLEY: [ShotSpec; 3] = [
    shot(-2.0, 5.0, BulletKind::Spread),
    shot(0.0, 5.0, BulletKind::Spread),
    shot(2.0, 5.0, BulletKind::Spread),
];
const BOMB_VOLLEY: [ShotSpec; 1] = [ShotSpec {
    velocity: Vec2::new(0.0, 3.0),
    kind: BulletKind::Bomb,
    ttl_ms: Some(BOMB_TTL_MS),
    size: BOMB_SIZE,
}];

impl EnemyType {
    /// Chance that a fire tick actually produces a volley
    pub fn fire_chance(self) -> f32 {
        match self {
            EnemyType::Basic => 0.5,
            EnemyType::Sniper => 0.3,
            EnemyType::Burst => 0.4,
            EnemyType::Bomb => 0.35,
        }
    }

    /// Fire tick interval at enemy speed 1.0. Faster enemies go down to half of this.
    pub fn fire_interval_ms(self) -> u64 {
        match self {
            EnemyType::Basic => 1000,
            EnemyType::Sniper => 1200,
            EnemyType::Burst => 1400,
            EnemyType::Bomb => 1600,
        }
    }

    pub fn volley(self) -> &'static [ShotSpec] {
        match self {
            EnemyType::Basic => &BASIC_VOLLEY,
            EnemyType::Sniper => &SNIPER_VOLLEY,
            EnemyType::Burst => &BURST_VOLLEY,
            EnemyType::Bomb => &BOMB_VOLLEY,
        }
    }
}

/// One enemy formation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveDef {
    pub rows: u32,
    pub cols: u32,
    pub enemy_type: EnemyType,
    pub hp: u32,
}

impl WaveDef {
    pub fn enemy_count(&self) -> usize {
        (self.rows * self.cols) as usize
    }
}

/// Waves in the order they are fought
pub const WAVES: [WaveDef; 4] = [
    WaveDef {
        rows: 3,
        cols: 6,
        enemy_type: EnemyType::Basic,
        hp: 1,
    },
    WaveDef {
        rows: 2,
        cols: 6,
        enemy_type: EnemyType::Sniper,
        hp: 1,
    },
    WaveDef {
        rows: 2,
        cols: 5,
        enemy_type: EnemyType::Burst,
        hp: 2,
    },
    WaveDef {
        rows: 2,
        cols: 4,
        enemy_type: EnemyType::Bomb,
        hp: 3,
    },
];

/// Formation origin and spacing
pub const FORMATION_LEFT: f32 = 80.0;
pub const FORMATION_TOP: f32 = 50.0;
pub const FORMATION_COL_SPACING: f32 = 70.0;
pub const FORMATION_ROW_SPACING: f32 = 60.0;

/// Spawn position of the enemy at `row`, `col`
pub fn formation_slot(row: u32, col: u32) -> Vec2 {
    Vec2::new(
        FORMATION_LEFT + col as f32 * FORMATION_COL_SPACING,
        FORMATION_TOP + row as f32 * FORMATION_ROW_SPACING,
    )
}

/// Boss aggression, escalating as its health drops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BossTier {
    Calm,
    Angry,
    Furious,
}

/// Horizontal spacing of the calm tier's parallel shots
pub const BOSS_PARALLEL_SPACING: f32 = 30.0;
/// Boss bullet fall speed
pub const BOSS_BULLET_SPEED: f32 = 5.0;

impl BossTier {
    /// Tier for the given `health / max_health`
    pub fn from_ratio(ratio: f32) -> Self {
        if ratio > 0.66 {
            BossTier::Calm
        } else if ratio > 0.33 {
            BossTier::Angry
        } else {
            BossTier::Furious
        }
    }

    /// Fire interval multiplier (below 1 fires faster)
    pub fn interval_percent(self) -> u64 {
        match self {
            BossTier::Calm => 100,
            BossTier::Angry => 80,
            BossTier::Furious => 60,
        }
    }

    /// Volley as (muzzle x offset, velocity) pairs
    pub fn volley(self) -> Vec<(f32, Vec2)> {
        match self {
            BossTier::Calm => (-1..=1)
                .map(|i| (i as f32 * BOSS_PARALLEL_SPACING, Vec2::new(0.0, BOSS_BULLET_SPEED)))
                .collect(),
            BossTier::Angry => (-2..=2)
                .map(|i| (0.0, Vec2::new(i as f32, BOSS_BULLET_SPEED)))
                .collect(),
            BossTier::Furious => (-3..=3)
                .map(|i| (0.0, Vec2::new(i as f32, BOSS_BULLET_SPEED)))
                .collect(),
        }
    }
}
