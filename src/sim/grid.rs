//! Maze grid geometry
//!
//! Integer cell coordinates on a toroidal grid: stepping off one edge lands on
//! the opposite edge. Every move check and every final position goes through
//! [`MazeLayout::step`] so wraparound is applied the same way everywhere.

use serde::{Deserialize, Serialize};

/// Cells per side
pub const GRID_SIZE: i32 = 15;

/// A grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Wrap into `0..GRID_SIZE` on both axes
    pub fn wrapped(self) -> Self {
        Self {
            x: self.x.rem_euclid(GRID_SIZE),
            y: self.y.rem_euclid(GRID_SIZE),
        }
    }

    /// Plain Manhattan distance (targets may lie outside the maze)
    pub fn manhattan(self, other: Position) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Offset by `n` steps in `dir`, without wrapping
    pub fn offset(self, dir: Direction, n: i32) -> Self {
        let (dx, dy) = dir.delta();
        Self::new(self.x + dx * n, self.y + dy * n)
    }
}

/// Unit movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Fixed probing order; ties in move selection resolve to the earliest entry
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// `1` = wall, `0` = corridor. Row 7 is open end to end: the centre is the
/// player's start and its edges form a wraparound tunnel.
const LAYOUT: [[u8; GRID_SIZE as usize]; GRID_SIZE as usize] = [
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
    [1, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 1, 1, 0, 1, 0, 1, 0, 1, 0, 1, 1, 0, 1],
    [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 1, 0, 1, 1, 0, 1, 0, 1, 1, 0, 1, 0, 1],
    [1, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 1],
    [1, 1, 1, 0, 1, 0, 0, 0, 0, 0, 1, 0, 1, 1, 1],
    [0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0],
    [1, 1, 1, 0, 1, 0, 0, 0, 0, 0, 1, 0, 1, 1, 1],
    [1, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 1, 0, 1, 1, 0, 1, 0, 1, 1, 0, 1, 0, 1],
    [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 1, 1, 0, 1, 0, 1, 0, 1, 0, 1, 1, 0, 1],
    [1, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 1],
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
];

/// Player start
pub const PLAYER_START: Position = Position::new(7, 7);

/// Pursuer spawn cells with their initial headings
pub const PURSUER_SPAWNS: [(Position, Direction); 4] = [
    (Position::new(1, 1), Direction::Right),
    (Position::new(13, 1), Direction::Left),
    (Position::new(1, 13), Direction::Up),
    (Position::new(13, 13), Direction::Down),
];

/// Scatter targets, one grid corner per pursuer
pub const SCATTER_CORNERS: [Position; 4] = [
    Position::new(0, 0),
    Position::new(GRID_SIZE - 1, 0),
    Position::new(0, GRID_SIZE - 1),
    Position::new(GRID_SIZE - 1, GRID_SIZE - 1),
];

/// Power pickups, just off the corners
pub const POWER_CELLS: [Position; 4] = [
    Position::new(1, 3),
    Position::new(13, 3),
    Position::new(1, 11),
    Position::new(13, 11),
];

/// Static wall layout
#[derive(Debug, Clone)]
pub struct MazeLayout {
    walls: Vec<bool>,
}

impl Default for MazeLayout {
    fn default() -> Self {
        Self::standard()
    }
}

impl MazeLayout {
    /// The level 4 maze
    pub fn standard() -> Self {
        let walls = LAYOUT
            .iter()
            .flat_map(|row| row.iter().map(|&c| c == 1))
            .collect();
        Self { walls }
    }

    /// Build from rows of `#` (wall) and anything else (corridor).
    /// Missing cells are walls.
    pub fn from_rows(rows: &[&str]) -> Self {
        let mut walls = vec![true; (GRID_SIZE * GRID_SIZE) as usize];
        for (y, row) in rows.iter().take(GRID_SIZE as usize).enumerate() {
            for (x, ch) in row.chars().take(GRID_SIZE as usize).enumerate() {
                walls[y * GRID_SIZE as usize + x] = ch == '#';
            }
        }
        Self { walls }
    }

    pub fn is_traversable(&self, pos: Position) -> bool {
        let p = pos.wrapped();
        !self.walls[(p.y * GRID_SIZE + p.x) as usize]
    }

    /// Neighbouring cell in `dir`, wrapped
    pub fn step(&self, pos: Position, dir: Direction) -> Position {
        pos.offset(dir, 1).wrapped()
    }

    /// Neighbouring cell in `dir` if it is a corridor
    pub fn try_step(&self, pos: Position, dir: Direction) -> Option<Position> {
        let next = self.step(pos, dir);
        self.is_traversable(next).then_some(next)
    }

    /// All corridor cells in row-major order
    pub fn corridors(&self) -> impl Iterator<Item = Position> + '_ {
        (0..GRID_SIZE).flat_map(move |y| {
            (0..GRID_SIZE)
                .map(move |x| Position::new(x, y))
                .filter(move |&p| self.is_traversable(p))
        })
    }
}
