//! Wave shooter engine (level 5)
//!
//! Invader-style formations sweep the field while the player strafes along the
//! bottom edge. Once every wave is cleared the boss takes over; beating it
//! completes the run. One enemy bullet touching the player ends the attempt.
//!
//! Coordinates are pixels with the origin at the top-left, y pointing down.

use glam::Vec2;
use serde::Serialize;

use super::AttemptStatus;
use super::clock::Scheduler;
use super::collision::Rect;
use super::events::SoundEffect;
use super::rng::RandomSource;
use super::waves::{BULLET_SIZE, BossTier, BulletKind, EnemyType, WAVES, formation_slot};
use crate::run::{Phase, RunControl};
use crate::scaled_interval;

pub const FIELD_WIDTH: f32 = 600.0;
pub const FIELD_HEIGHT: f32 = 500.0;
pub const PLAYER_SIZE: f32 = 50.0;
pub const ENEMY_SIZE: f32 = 40.0;
pub const BOSS_SIZE: f32 = 80.0;
/// Player row: one player height plus a gap above the bottom edge
pub const PLAYER_Y: f32 = FIELD_HEIGHT - PLAYER_SIZE - 20.0;
/// Bullets this far outside the field are discarded
pub const OFFSCREEN_MARGIN: f32 = 20.0;

pub const PLAYER_TICK_MS: u64 = 30;
pub const PROJECTILE_TICK_MS: u64 = 30;
pub const PLAYER_SPEED: f32 = 8.0;
pub const PLAYER_BULLET_SPEED: f32 = 8.0;
pub const FIRE_COOLDOWN_MS: u64 = 300;

pub const FORMATION_TICK_MS: u64 = 500;
pub const FORMATION_MIN_TICK_MS: u64 = 200;
pub const FORMATION_STEP: f32 = 10.0;
pub const FORMATION_DROP: f32 = 15.0;
pub const FORMATION_EDGE_MARGIN: f32 = 10.0;

pub const BOSS_HEALTH: u32 = 20;
pub const BOSS_STEP: f32 = 20.0;
pub const BOSS_MOVE_MS: u64 = 800;
pub const BOSS_MOVE_MIN_MS: u64 = 400;
pub const BOSS_FIRE_MS: u64 = 1500;
pub const BOSS_FIRE_MIN_MS: u64 = 700;

pub const KILL_POINTS: u64 = 50;
pub const BOSS_HIT_POINTS: u64 = 20;
pub const BOSS_DEFEAT_BONUS: u64 = 500;
/// Pause between the boss going down and the level hand-off
pub const VICTORY_DELAY_MS: u64 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShooterTimer {
    Player,
    Projectiles,
    Formation,
    EnemyFire,
    BossMove,
    BossFire,
    VictoryDelay,
}

/// Held keys, sampled on every player tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShooterInput {
    pub left: bool,
    pub right: bool,
    pub fire: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enemy {
    pub id: u32,
    pub pos: Vec2,
    pub alive: bool,
    pub enemy_type: EnemyType,
    pub hp: u32,
}

impl Enemy {
    pub fn rect(&self) -> Rect {
        Rect::square(self.pos, ENEMY_SIZE)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bullet {
    pub id: u32,
    pub pos: Vec2,
    pub velocity: Vec2,
    pub is_enemy: bool,
    pub kind: BulletKind,
    pub ttl_ms: Option<u64>,
    pub size: f32,
}

impl Bullet {
    pub fn rect(&self) -> Rect {
        Rect::square(self.pos, self.size)
    }

    fn off_field(&self) -> bool {
        self.pos.x < -OFFSCREEN_MARGIN
            || self.pos.x > FIELD_WIDTH + OFFSCREEN_MARGIN
            || self.pos.y < -OFFSCREEN_MARGIN
            || self.pos.y > FIELD_HEIGHT + OFFSCREEN_MARGIN
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Boss {
    pub pos: Vec2,
    pub health: u32,
    pub max_health: u32,
    pub alive: bool,
}

impl Boss {
    pub fn rect(&self) -> Rect {
        Rect::square(self.pos, BOSS_SIZE)
    }

    pub fn health_ratio(&self) -> f32 {
        self.health as f32 / self.max_health.max(1) as f32
    }
}

/// Which half of the level is running; never both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    /// Index into [`WAVES`]
    Wave(usize),
    Boss,
}

/// Render-facing snapshot
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShooterView {
    pub player: Vec2,
    pub enemies: Vec<Enemy>,
    pub bullets: Vec<Bullet>,
    pub boss: Option<Boss>,
    pub stage: Stage,
    pub status: AttemptStatus,
}

/// One attempt at the shooter level
pub struct ShooterEngine {
    clock: Scheduler<ShooterTimer>,
    rng: Box<dyn RandomSource>,
    armed: bool,
    speed: f32,

    input: ShooterInput,
    player_x: f32,
    last_shot_ms: Option<u64>,

    stage: Stage,
    enemies: Vec<Enemy>,
    /// +1 sweeping right, -1 sweeping left
    formation_dir: f32,
    bullets: Vec<Bullet>,
    boss: Option<Boss>,
    boss_tier: BossTier,

    next_id: u32,
    kills: u32,
    status: AttemptStatus,
    cues: Vec<SoundEffect>,
}

impl ShooterEngine {
    pub fn new(rng: Box<dyn RandomSource>) -> Self {
        let mut engine = Self {
            clock: Scheduler::new(),
            rng,
            armed: false,
            speed: 1.0,
            input: ShooterInput::default(),
            player_x: FIELD_WIDTH / 2.0 - PLAYER_SIZE / 2.0,
            last_shot_ms: None,
            stage: Stage::Wave(0),
            enemies: Vec::new(),
            formation_dir: 1.0,
            bullets: Vec::new(),
            boss: None,
            boss_tier: BossTier::Calm,
            next_id: 0,
            kills: 0,
            status: AttemptStatus::Running,
            cues: Vec::new(),
        };
        engine.spawn_wave(0);
        engine
    }

    pub fn player_pos(&self) -> Vec2 {
        Vec2::new(self.player_x, PLAYER_Y)
    }

    pub fn player_rect(&self) -> Rect {
        Rect::square(self.player_pos(), PLAYER_SIZE)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn alive_enemies(&self) -> usize {
        self.enemies.iter().filter(|e| e.alive).count()
    }

    pub fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }

    pub fn boss(&self) -> Option<&Boss> {
        self.boss.as_ref()
    }

    pub fn kills(&self) -> u32 {
        self.kills
    }

    pub fn status(&self) -> AttemptStatus {
        self.status
    }

    pub fn is_halted(&self) -> bool {
        self.armed && self.clock.is_idle()
    }

    pub fn set_input(&mut self, input: ShooterInput) {
        self.input = input;
    }

    pub fn drain_cues(&mut self) -> Vec<SoundEffect> {
        std::mem::take(&mut self.cues)
    }

    pub fn view(&self) -> ShooterView {
        ShooterView {
            player: self.player_pos(),
            enemies: self.enemies.iter().filter(|e| e.alive).cloned().collect(),
            bullets: self.bullets.clone(),
            boss: self.boss.clone().filter(|b| b.alive),
            stage: self.stage,
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
                ShooterTimer::Player => {
                    self.step_player();
                    self.resolve_collisions(run);
                }
                ShooterTimer::Projectiles => {
                    self.step_projectiles();
                    self.resolve_collisions(run);
                }
                ShooterTimer::Formation => self.step_formation(run),
                ShooterTimer::EnemyFire => self.enemy_fire(),
                ShooterTimer::BossMove => self.move_boss(),
                ShooterTimer::BossFire => self.boss_fire(),
                ShooterTimer::VictoryDelay => {
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
        self.clock.every(ShooterTimer::Player, PLAYER_TICK_MS);
        self.clock.every(ShooterTimer::Projectiles, PROJECTILE_TICK_MS);
        match self.stage {
            Stage::Wave(_) => self.arm_wave_timers(),
            Stage::Boss => self.arm_boss_timers(),
        }
    }

    fn arm_wave_timers(&mut self) {
        let Stage::Wave(index) = self.stage else {
            return;
        };
        let enemy_type = WAVES[index].enemy_type;
        let base = enemy_type.fire_interval_ms();
        self.clock.every(
            ShooterTimer::Formation,
            scaled_interval(FORMATION_TICK_MS, self.speed, FORMATION_MIN_TICK_MS),
        );
        self.clock
            .every(ShooterTimer::EnemyFire, scaled_interval(base, self.speed, base / 2));
    }

    fn arm_boss_timers(&mut self) {
        self.clock.cancel(ShooterTimer::Formation);
        self.clock.cancel(ShooterTimer::EnemyFire);
        self.schedule_boss_move();
        self.clock.every(ShooterTimer::BossFire, self.boss_fire_interval());
    }

    fn boss_fire_interval(&self) -> u64 {
        let base = scaled_interval(BOSS_FIRE_MS, self.speed, BOSS_FIRE_MIN_MS);
        base * self.boss_tier.interval_percent() / 100
    }

    /// Boss moves at irregular intervals, between half and all of the scaled base
    fn schedule_boss_move(&mut self) {
        let base = scaled_interval(BOSS_MOVE_MS, self.speed, BOSS_MOVE_MIN_MS);
        let factor = 0.5 + 0.5 * self.rng.next_unit();
        self.clock
            .after(ShooterTimer::BossMove, ((base as f32 * factor) as u64).max(1));
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn spawn_wave(&mut self, index: usize) {
        let wave = WAVES[index];
        self.stage = Stage::Wave(index);
        self.formation_dir = 1.0;
        self.enemies.clear();
        for row in 0..wave.rows {
            for col in 0..wave.cols {
                let id = self.next_id();
                self.enemies.push(Enemy {
                    id,
                    pos: formation_slot(row, col),
                    alive: true,
                    enemy_type: wave.enemy_type,
                    hp: wave.hp,
                });
            }
        }
    }

    fn enter_boss_stage(&mut self) {
        log::info!("All waves cleared, boss appears");
        self.stage = Stage::Boss;
        self.enemies.clear();
        self.bullets.clear();
        self.boss = Some(Boss {
            pos: Vec2::new(FIELD_WIDTH / 2.0 - BOSS_SIZE / 2.0, 50.0),
            health: BOSS_HEALTH,
            max_health: BOSS_HEALTH,
            alive: true,
        });
        self.boss_tier = BossTier::Calm;
        self.cues.push(SoundEffect::BossAppears);
        self.arm_boss_timers();
    }

    fn step_player(&mut self) {
        let mut dx = 0.0;
        if self.input.left {
            dx -= PLAYER_SPEED;
        }
        if self.input.right {
            dx += PLAYER_SPEED;
        }
        self.player_x = (self.player_x + dx).clamp(0.0, FIELD_WIDTH - PLAYER_SIZE);

        let now = self.clock.now_ms();
        let ready = self
            .last_shot_ms
            .is_none_or(|last| now.saturating_sub(last) >= FIRE_COOLDOWN_MS);
        if self.input.fire && ready {
            self.last_shot_ms = Some(now);
            let id = self.next_id();
            self.bullets.push(Bullet {
                id,
                pos: Vec2::new(self.player_x + PLAYER_SIZE / 2.0 - BULLET_SIZE / 2.0, PLAYER_Y),
                velocity: Vec2::new(0.0, -PLAYER_BULLET_SPEED),
                is_enemy: false,
                kind: BulletKind::Player,
                ttl_ms: None,
                size: BULLET_SIZE,
            });
            self.cues.push(SoundEffect::PlayerShot);
        }
    }

    fn step_projectiles(&mut self) {
        for bullet in &mut self.bullets {
            bullet.pos += bullet.velocity;
            if let Some(ttl) = bullet.ttl_ms.as_mut() {
                *ttl = ttl.saturating_sub(PROJECTILE_TICK_MS);
            }
        }
        self.bullets
            .retain(|b| !b.off_field() && b.ttl_ms.is_none_or(|ttl| ttl > 0));
    }

    fn step_formation(&mut self, run: &mut dyn RunControl) {
        let alive = self.enemies.iter().filter(|e| e.alive);
        let (left, right) = alive.fold((f32::MAX, f32::MIN), |(l, r), e| {
            (l.min(e.pos.x), r.max(e.pos.x))
        });
        if left > right {
            return;
        }

        let mut dy = 0.0;
        if self.formation_dir > 0.0 && right + ENEMY_SIZE >= FIELD_WIDTH - FORMATION_EDGE_MARGIN {
            self.formation_dir = -1.0;
            dy = FORMATION_DROP;
        } else if self.formation_dir < 0.0 && left <= FORMATION_EDGE_MARGIN {
            self.formation_dir = 1.0;
            dy = FORMATION_DROP;
        }

        let shift = Vec2::new(self.formation_dir * FORMATION_STEP, dy);
        for enemy in &mut self.enemies {
            enemy.pos += shift;
        }

        let landed = self
            .enemies
            .iter()
            .any(|e| e.alive && e.pos.y + ENEMY_SIZE >= PLAYER_Y);
        if landed {
            self.fail(run, "formation reached the player's row");
        }
    }

    fn enemy_fire(&mut self) {
        let Stage::Wave(index) = self.stage else {
            return;
        };
        let enemy_type = WAVES[index].enemy_type;
        let shooters: Vec<Vec2> = self
            .enemies
            .iter()
            .filter(|e| e.alive)
            .map(|e| e.pos)
            .collect();
        if shooters.is_empty() || !self.rng.chance(enemy_type.fire_chance()) {
            return;
        }

        let origin = shooters[self.rng.index(shooters.len())];
        let muzzle_x = origin.x + ENEMY_SIZE / 2.0;
        for shot in enemy_type.volley() {
            let id = self.next_id();
            self.bullets.push(Bullet {
                id,
                pos: Vec2::new(muzzle_x - shot.size / 2.0, origin.y + ENEMY_SIZE),
                velocity: shot.velocity,
                is_enemy: true,
                kind: shot.kind,
                ttl_ms: shot.ttl_ms,
                size: shot.size,
            });
        }
        self.cues.push(SoundEffect::EnemyShot);
    }

    fn move_boss(&mut self) {
        let step = if self.rng.chance(0.5) { BOSS_STEP } else { -BOSS_STEP };
        if let Some(boss) = self.boss.as_mut().filter(|b| b.alive) {
            boss.pos.x = (boss.pos.x + step).clamp(0.0, FIELD_WIDTH - BOSS_SIZE);
            self.schedule_boss_move();
        }
    }

    fn boss_fire(&mut self) {
        let Some(muzzle) = self
            .boss
            .as_ref()
            .filter(|b| b.alive)
            .map(|b| {
                Vec2::new(
                    b.pos.x + BOSS_SIZE / 2.0 - BULLET_SIZE / 2.0,
                    b.pos.y + BOSS_SIZE,
                )
            })
        else {
            return;
        };
        for (offset, velocity) in self.boss_tier.volley() {
            let id = self.next_id();
            self.bullets.push(Bullet {
                id,
                pos: muzzle + Vec2::new(offset, 0.0),
                velocity,
                is_enemy: true,
                kind: BulletKind::Boss,
                ttl_ms: None,
                size: BULLET_SIZE,
            });
        }
        self.cues.push(SoundEffect::EnemyShot);
    }

    /// Apply every overlap in one pass, then settle stage changes.
    /// Each player bullet is spent on the first target it touches.
    fn resolve_collisions(&mut self, run: &mut dyn RunControl) {
        let player = self.player_rect();
        let mut points = 0;
        let mut player_hit = false;
        let mut boss_hits = 0;

        let enemies = &mut self.enemies;
        let boss = &mut self.boss;
        let cues = &mut self.cues;
        let mut kills = 0;
        self.bullets.retain(|bullet| {
            let rect = bullet.rect();
            if bullet.is_enemy {
                player_hit |= rect.overlaps(&player);
                return true;
            }

            if let Some(enemy) = enemies
                .iter_mut()
                .find(|e| e.alive && e.rect().overlaps(&rect))
            {
                enemy.hp = enemy.hp.saturating_sub(1);
                if enemy.hp == 0 {
                    enemy.alive = false;
                    kills += 1;
                    points += KILL_POINTS;
                    cues.push(SoundEffect::EnemyDestroyed);
                }
                return false;
            }

            if let Some(boss) = boss.as_mut().filter(|b| b.alive && b.rect().overlaps(&rect)) {
                boss.health = boss.health.saturating_sub(1);
                boss_hits += 1;
                points += BOSS_HIT_POINTS;
                cues.push(SoundEffect::BossHit);
                return false;
            }
            true
        });
        self.kills += kills;

        if points > 0 {
            run.add_score(points);
        }

        if boss_hits > 0 && self.check_boss(run) {
            return;
        }
        if player_hit {
            self.fail(run, "hit by enemy fire");
            return;
        }
        self.check_wave_cleared();
    }

    /// Returns true when the boss went down
    fn check_boss(&mut self, run: &mut dyn RunControl) -> bool {
        let Some(boss) = self.boss.as_mut().filter(|b| b.alive) else {
            return false;
        };
        if boss.health > 0 {
            let tier = BossTier::from_ratio(boss.health_ratio());
            if tier != self.boss_tier {
                log::debug!("Boss escalates to {:?}", tier);
                self.boss_tier = tier;
                self.clock.every(ShooterTimer::BossFire, self.boss_fire_interval());
            }
            return false;
        }

        boss.alive = false;
        log::info!("Boss defeated");
        run.add_score(BOSS_DEFEAT_BONUS);
        self.status = AttemptStatus::Cleared;
        self.clock.cancel_all();
        self.clock.after(ShooterTimer::VictoryDelay, VICTORY_DELAY_MS);
        self.cues.push(SoundEffect::LevelClear);
        true
    }

    fn check_wave_cleared(&mut self) {
        let Stage::Wave(index) = self.stage else {
            return;
        };
        if self.enemies.iter().any(|e| e.alive) {
            return;
        }
        if index + 1 < WAVES.len() {
            log::info!("Wave {} cleared", index + 1);
            self.spawn_wave(index + 1);
            self.arm_wave_timers();
        } else {
            self.enter_boss_stage();
        }
    }

    fn fail(&mut self, run: &mut dyn RunControl, cause: &str) {
        log::info!("Shooter attempt lost: {}", cause);
        self.status = AttemptStatus::Failed;
        self.clock.cancel_all();
        run.trigger_jumpscare();
    }
}
