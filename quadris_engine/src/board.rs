//! The 18x11 playing grid: placement, collision checks, full-row clearing
//! with per-piece provenance tracking, and the visibility mask used by the
//! blind effect.

use std::collections::BTreeMap;

use crate::{Piece, Position};

/// One occupied cell. Filler cells inserted by [`Board::force_drop`] carry
/// no piece id and never contribute to removal scoring.
#[derive(Eq, PartialEq, Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tile {
    pub symbol: char,
    pub piece_id: Option<u32>,
    pub born_level: u8,
}

type Row = [Option<Tile>; Board::COLS];

/// Result of a row-clear pass: how many rows vanished, and the birth level
/// of every piece whose cells were all removed by the clear (ascending id).
#[derive(Eq, PartialEq, Clone, Default, Debug)]
pub struct LineClearSummary {
    pub rows_cleared: u32,
    pub removed_piece_levels: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct Board {
    grid: Vec<Row>,
    blind: bool,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub const ROWS: usize = 18;
    pub const COLS: usize = 11;
    /// Rows 0-2 are reserve space above the visible stack; new pieces
    /// originate here.
    pub const SPAWN: Position = Position::new(3, 0);

    pub const EMPTY_SYMBOL: char = ' ';
    pub const MASK_SYMBOL: char = '?';
    pub const FILLER_SYMBOL: char = '*';

    const MASK_ROWS: (i32, i32) = (3, 12);
    const MASK_COLS: (i32, i32) = (3, 9);

    pub fn new() -> Self {
        Self {
            grid: vec![[None; Self::COLS]; Self::ROWS],
            blind: false,
        }
    }

    fn in_bounds(row: i32, col: i32) -> bool {
        (0..Self::ROWS as i32).contains(&row) && (0..Self::COLS as i32).contains(&col)
    }

    fn tile(&self, row: i32, col: i32) -> Option<Tile> {
        Self::in_bounds(row, col)
            .then(|| self.grid[row as usize][col as usize])
            .flatten()
    }

    /// True iff every cell of `piece` at `pos` is in bounds and unoccupied.
    /// Pure query, no side effects.
    pub fn can_place(&self, piece: &Piece, pos: Position) -> bool {
        piece.cells().iter().all(|&offset| {
            let cell = pos + offset;
            Self::in_bounds(cell.row, cell.col)
                && self.grid[cell.row as usize][cell.col as usize].is_none()
        })
    }

    /// Marks the piece's cells occupied. The caller must have validated the
    /// position with [`Board::can_place`]; out-of-bounds cells are skipped.
    pub fn place(&mut self, piece: &Piece, pos: Position) {
        for &offset in piece.cells() {
            let cell = pos + offset;
            if Self::in_bounds(cell.row, cell.col) {
                self.grid[cell.row as usize][cell.col as usize] = Some(Tile {
                    symbol: piece.symbol(),
                    piece_id: Some(piece.id()),
                    born_level: piece.born_level(),
                });
            }
        }
    }

    pub fn remove(&mut self, piece: &Piece, pos: Position) {
        for &offset in piece.cells() {
            let cell = pos + offset;
            if Self::in_bounds(cell.row, cell.col) {
                self.grid[cell.row as usize][cell.col as usize] = None;
            }
        }
    }

    /// Clears every full row, compacting the stack by prepending one empty
    /// row per cleared row. Tracks per-piece cell counts across the clear so
    /// pieces that lost all their cells can be reported for bonus scoring.
    pub fn clear_full_rows(&mut self) -> LineClearSummary {
        let before = self.tally_piece_cells();

        let mut remaining = Vec::with_capacity(Self::ROWS);
        let mut rows_cleared = 0u32;
        for row in &self.grid {
            if row.iter().all(|cell| cell.is_some()) {
                rows_cleared += 1;
            } else {
                remaining.push(*row);
            }
        }
        let mut grid = vec![[None; Self::COLS]; rows_cleared as usize];
        grid.extend(remaining);
        self.grid = grid;

        let after = self.tally_piece_cells();
        let removed_piece_levels = before
            .into_iter()
            .filter(|(id, _)| !after.contains_key(id))
            .map(|(_, born_level)| born_level)
            .collect();

        LineClearSummary {
            rows_cleared,
            removed_piece_levels,
        }
    }

    /// Per-piece birth levels for every piece with at least one cell on the
    /// board. A `BTreeMap` keeps removed-piece reporting in ascending id
    /// order.
    fn tally_piece_cells(&self) -> BTreeMap<u32, u8> {
        let mut tally = BTreeMap::new();
        for row in &self.grid {
            for tile in row.iter().flatten() {
                if let Some(id) = tile.piece_id {
                    tally.entry(id).or_insert(tile.born_level);
                }
            }
        }
        tally
    }

    /// Inserts a single filler cell into `col`, resting on top of the
    /// column's current stack (bottom row if the column is empty). A column
    /// already full to row 0 is left untouched.
    pub fn force_drop(&mut self, col: usize) {
        if col >= Self::COLS {
            return;
        }
        let filler = Tile {
            symbol: Self::FILLER_SYMBOL,
            piece_id: None,
            born_level: 0,
        };
        let topmost = (0..Self::ROWS).find(|&row| self.grid[row][col].is_some());
        match topmost {
            None => self.grid[Self::ROWS - 1][col] = Some(filler),
            Some(0) => {}
            Some(row) => self.grid[row - 1][col] = Some(filler),
        }
    }

    /// Display symbol for a cell. Out-of-range coordinates read as empty;
    /// with the blind mask on, the fixed masked rectangle reads as the mask
    /// symbol regardless of occupancy.
    pub fn cell_symbol(&self, row: i32, col: i32) -> char {
        if !Self::in_bounds(row, col) {
            return Self::EMPTY_SYMBOL;
        }
        if self.blind
            && (Self::MASK_ROWS.0..=Self::MASK_ROWS.1).contains(&row)
            && (Self::MASK_COLS.0..=Self::MASK_COLS.1).contains(&col)
        {
            return Self::MASK_SYMBOL;
        }
        self.tile(row, col)
            .map_or(Self::EMPTY_SYMBOL, |tile| tile.symbol)
    }

    pub fn is_blind(&self) -> bool {
        self.blind
    }

    pub fn set_blind(&mut self, enabled: bool) {
        self.blind = enabled;
    }

    /// Empties the grid. The blind mask is forced off: a reset always yields
    /// full visibility.
    pub fn reset(&mut self) {
        self.grid = vec![[None; Self::COLS]; Self::ROWS];
        self.blind = false;
    }
}
