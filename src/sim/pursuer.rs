//! Pursuer actors and their move selection

use serde::{Deserialize, Serialize};

use super::grid::{Direction, MazeLayout, Position, SCATTER_CORNERS};
use super::rng::RandomSource;

/// Chance that a pursuer ignores its greedy choice and picks any legal move
pub const RANDOM_MOVE_CHANCE: f32 = 0.3;
/// Cells ahead of the player targeted by ambushing pursuers
pub const AMBUSH_LOOKAHEAD: i32 = 2;

/// Global pursuer behaviour, shared by all four
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GhostMode {
    /// Head for own corner
    #[default]
    Scatter,
    /// Hunt the player
    Chase,
    /// Flee the player; touching one eats it
    Frightened,
}

/// One pursuer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pursuer {
    /// Index into the fixed spawn/corner tables (also the colour id)
    pub color_id: usize,
    pub pos: Position,
    /// Last applied heading; the pursuer may not reverse it unless cornered
    pub direction: Direction,
    pub spawn: Position,
    pub spawn_direction: Direction,
}

impl Pursuer {
    pub fn new(color_id: usize, spawn: Position, direction: Direction) -> Self {
        Self {
            color_id,
            pos: spawn,
            direction,
            spawn,
            spawn_direction: direction,
        }
    }

    /// Teleport home after being eaten
    pub fn respawn(&mut self) {
        self.pos = self.spawn;
        self.direction = self.spawn_direction;
    }

    /// Panic turn at the start of a frightened window
    pub fn reverse(&mut self) {
        self.direction = self.direction.reverse();
    }

    /// Even pursuers chase the player directly, odd ones ambush ahead of them
    pub fn is_ambusher(&self) -> bool {
        self.color_id % 2 == 1
    }

    fn scatter_target(&self) -> Position {
        SCATTER_CORNERS[self.color_id % SCATTER_CORNERS.len()]
    }

    /// Moves available this tick: corridor neighbours other than straight back.
    /// A pursuer in a dead end may reverse.
    pub fn legal_moves(&self, maze: &MazeLayout) -> Vec<Direction> {
        let back = self.direction.reverse();
        let forward: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|&d| d != back && maze.try_step(self.pos, d).is_some())
            .collect();
        if !forward.is_empty() {
            return forward;
        }
        if maze.try_step(self.pos, back).is_some() {
            vec![back]
        } else {
            Vec::new()
        }
    }

    /// Pick this tick's move, or `None` if boxed in
    pub fn choose_move(
        &self,
        maze: &MazeLayout,
        mode: GhostMode,
        player: Position,
        player_heading: Option<Direction>,
        rng: &mut dyn RandomSource,
    ) -> Option<Direction> {
        let moves = self.legal_moves(maze);
        if moves.is_empty() {
            return None;
        }

        let greedy = match mode {
            GhostMode::Scatter => closest(&moves, self.pos, self.scatter_target(), maze),
            GhostMode::Chase => {
                let target = match (self.is_ambusher(), player_heading) {
                    (true, Some(dir)) => player.offset(dir, AMBUSH_LOOKAHEAD).wrapped(),
                    _ => player,
                };
                closest(&moves, self.pos, target, maze)
            }
            GhostMode::Frightened => farthest(&moves, self.pos, player, maze),
        };

        if rng.chance(RANDOM_MOVE_CHANCE) {
            Some(moves[rng.index(moves.len())])
        } else {
            Some(greedy)
        }
    }

    /// Apply a chosen move
    pub fn advance(&mut self, maze: &MazeLayout, dir: Direction) {
        self.pos = maze.step(self.pos, dir);
        self.direction = dir;
    }
}

fn closest(moves: &[Direction], from: Position, target: Position, maze: &MazeLayout) -> Direction {
    let mut best = moves[0];
    let mut best_dist = i32::MAX;
    for &dir in moves {
        let dist = maze.step(from, dir).manhattan(target);
        if dist < best_dist {
            best_dist = dist;
            best = dir;
        }
    }
    best
}

fn farthest(moves: &[Direction], from: Position, threat: Position, maze: &MazeLayout) -> Direction {
    let mut best = moves[0];
    let mut best_dist = i32::MIN;
    for &dir in moves {
        let dist = maze.step(from, dir).manhattan(threat);
        if dist > best_dist {
            best_dist = dist;
            best = dir;
        }
    }
    best
}
