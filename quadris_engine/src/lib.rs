//! Core engine for quadris, a two-player competitive falling-block game.
//!
//! Each player owns an 18x11 [`Board`], a block-generation [`Level`] policy
//! and a falling [`Piece`], and exposes the full turn action surface through
//! the [`Player`] trait. Temporary opponent handicaps are modelled as
//! decorators ([`PlayerEffect`]) wrapping a player, and a thin [`Game`]
//! coordinator owns both (possibly decorated) players and the turn order.

mod board;
mod effects;
mod game;
mod levels;
mod player;

use std::ops;

pub use board::{Board, LineClearSummary, Tile};
pub use effects::{Effect, PlayerEffect};
pub use game::{Command, CommandOutcome, Game, GameSetup};
pub use levels::Level;
pub use player::{BasicPlayer, Observer, Player};

/// A 2D integer coordinate, used both as an absolute board position
/// (row 0 at the top) and as a piece-relative cell offset.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Default, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

impl ops::Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.row + rhs.row, self.col + rhs.col)
    }
}

#[derive(Eq, PartialEq, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    Left,
    Right,
    Down,
}

impl Direction {
    /// The board-coordinate delta of a single step in this direction.
    pub const fn step(self) -> Position {
        match self {
            Direction::Left => Position::new(0, -1),
            Direction::Right => Position::new(0, 1),
            Direction::Down => Position::new(1, 0),
        }
    }
}

#[derive(Eq, PartialEq, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Spin {
    Clockwise,
    CounterClockwise,
}

/// The seven piece kinds. The set is closed and fixed by the game rules,
/// so shapes live in per-kind lookup tables rather than behind dynamic
/// dispatch.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PieceKind {
    I,
    J,
    L,
    O,
    S,
    T,
    Z,
}

impl PieceKind {
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::J,
        PieceKind::L,
        PieceKind::O,
        PieceKind::S,
        PieceKind::T,
        PieceKind::Z,
    ];

    pub const fn symbol(self) -> char {
        match self {
            PieceKind::I => 'I',
            PieceKind::J => 'J',
            PieceKind::L => 'L',
            PieceKind::O => 'O',
            PieceKind::S => 'S',
            PieceKind::T => 'T',
            PieceKind::Z => 'Z',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol.to_ascii_uppercase() {
            'I' => Some(PieceKind::I),
            'J' => Some(PieceKind::J),
            'L' => Some(PieceKind::L),
            'O' => Some(PieceKind::O),
            'S' => Some(PieceKind::S),
            'T' => Some(PieceKind::T),
            'Z' => Some(PieceKind::Z),
            _ => None,
        }
    }

    /// Number of distinct rotation states: 1 for the square, 2 for the
    /// 2-fold-symmetric kinds (the straight kind included), 4 otherwise.
    pub const fn rotation_count(self) -> u8 {
        match self {
            PieceKind::O => 1,
            PieceKind::I | PieceKind::S | PieceKind::Z => 2,
            PieceKind::J | PieceKind::L | PieceKind::T => 4,
        }
    }

    /// The four occupied cells for a rotation state, relative to the piece
    /// origin. Local coordinates are bottom-anchored within a 3x3 box
    /// (the vertical straight kind grows upward through negative rows),
    /// which keeps the visual bottom row stable across rotations.
    pub fn cells(self, rotation: u8) -> [Position; 4] {
        let raw: [(i32, i32); 4] = match (self, rotation % self.rotation_count()) {
            (PieceKind::I, 0) => [(0, 0), (0, 1), (0, 2), (0, 3)],
            (PieceKind::I, _) => [(0, 0), (-1, 0), (-2, 0), (-3, 0)],
            (PieceKind::O, _) => [(0, 0), (0, 1), (1, 0), (1, 1)],
            (PieceKind::S, 0) => [(1, 1), (1, 2), (2, 0), (2, 1)],
            (PieceKind::S, _) => [(0, 0), (1, 0), (1, 1), (2, 1)],
            (PieceKind::Z, 0) => [(1, 0), (1, 1), (2, 1), (2, 2)],
            (PieceKind::Z, _) => [(0, 1), (1, 0), (1, 1), (2, 0)],
            (PieceKind::J, 0) => [(1, 0), (1, 1), (1, 2), (2, 0)],
            (PieceKind::J, 1) => [(0, 1), (1, 1), (2, 0), (2, 1)],
            (PieceKind::J, 2) => [(1, 2), (2, 0), (2, 1), (2, 2)],
            (PieceKind::J, _) => [(0, 0), (0, 1), (1, 0), (2, 0)],
            (PieceKind::L, 0) => [(1, 0), (1, 1), (1, 2), (2, 2)],
            (PieceKind::L, 1) => [(0, 1), (1, 1), (2, 1), (2, 2)],
            (PieceKind::L, 2) => [(1, 0), (1, 1), (1, 2), (2, 0)],
            (PieceKind::L, _) => [(0, 0), (0, 1), (1, 1), (2, 1)],
            (PieceKind::T, 0) => [(1, 0), (1, 1), (1, 2), (2, 1)],
            (PieceKind::T, 1) => [(0, 0), (1, 0), (1, 1), (2, 0)],
            (PieceKind::T, 2) => [(1, 1), (2, 0), (2, 1), (2, 2)],
            (PieceKind::T, _) => [(0, 1), (1, 0), (1, 1), (2, 1)],
        };
        raw.map(|(row, col)| Position::new(row, col))
    }
}

/// Bounding box of a piece's current cell set, in piece-local coordinates.
#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub struct BoundingBox {
    pub min_row: i32,
    pub max_row: i32,
    pub min_col: i32,
    pub max_col: i32,
}

/// A falling piece: a kind, a unique per-match id, the difficulty level
/// active when it was generated (drives removal-bonus scoring) and the
/// current rotation state.
#[derive(Eq, PartialEq, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Piece {
    id: u32,
    kind: PieceKind,
    born_level: u8,
    rotation: u8,
    cells: [Position; 4],
}

impl Piece {
    pub fn new(kind: PieceKind, id: u32, born_level: u8) -> Self {
        Self {
            id,
            kind,
            born_level,
            rotation: 0,
            cells: kind.cells(0),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    pub fn symbol(&self) -> char {
        self.kind.symbol()
    }

    pub fn born_level(&self) -> u8 {
        self.born_level
    }

    pub fn cells(&self) -> &[Position; 4] {
        &self.cells
    }

    /// Regenerates the cell set from the per-kind lookup table for the next
    /// rotation state. Lookup instead of geometric transformation avoids
    /// positional drift over repeated rotations.
    pub fn rotate_cw(&mut self) {
        let n = self.kind.rotation_count();
        self.rotation = (self.rotation + 1) % n;
        self.cells = self.kind.cells(self.rotation);
    }

    pub fn rotate_ccw(&mut self) {
        let n = self.kind.rotation_count();
        self.rotation = (self.rotation + n - 1) % n;
        self.cells = self.kind.cells(self.rotation);
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bb = BoundingBox {
            min_row: i32::MAX,
            max_row: i32::MIN,
            min_col: i32::MAX,
            max_col: i32::MIN,
        };
        for cell in &self.cells {
            bb.min_row = bb.min_row.min(cell.row);
            bb.max_row = bb.max_row.max(cell.row);
            bb.min_col = bb.min_col.min(cell.col);
            bb.max_col = bb.max_col.max(cell.col);
        }
        bb
    }
}
