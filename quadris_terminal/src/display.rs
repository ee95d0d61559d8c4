//! Side-by-side text rendering of both players, in the classic two-column
//! layout: level/score headers, the 18-row grids with the falling piece
//! overlaid on top of the (possibly masked) board, and next/held previews.

use std::cell::Cell;
use std::rc::Rc;

use quadris_engine::{Board, Game, Observer, Piece, Player};

/// Width of the left column; the right player's column starts here.
const COLUMN_WIDTH: usize = 23;
const SEPARATOR: &str = "-----------";

/// Dirty flag raised by player notifications; the application loop drains it
/// and redraws at most once per command.
pub struct RedrawFlag(Cell<bool>);

impl RedrawFlag {
    pub fn new() -> Rc<Self> {
        Rc::new(Self(Cell::new(true)))
    }

    pub fn take(&self) -> bool {
        self.0.replace(false)
    }
}

impl Observer for RedrawFlag {
    fn notify(&self) {
        self.0.set(true);
    }
}

/// Renders the whole match as one printable frame.
pub fn render(game: &Game) -> String {
    let (left, right) = (game.player(0), game.player(1));
    let mut out = String::new();

    push_pair(
        &mut out,
        &format!("Level:    {}", left.level()),
        &format!("Level:    {}", right.level()),
    );
    push_pair(
        &mut out,
        &format!("Score:    {}", left.score()),
        &format!("Score:    {}", right.score()),
    );
    push_pair(&mut out, SEPARATOR, SEPARATOR);

    let rows_left = board_rows(left);
    let rows_right = board_rows(right);
    for (l, r) in rows_left.iter().zip(&rows_right) {
        push_pair(&mut out, l, r);
    }
    push_pair(&mut out, SEPARATOR, SEPARATOR);

    push_pair(&mut out, "Next:", "Next:");
    push_preview_pair(&mut out, left.next_piece(), right.next_piece());

    if left.held_piece().is_some() || right.held_piece().is_some() {
        push_pair(&mut out, "Held:", "Held:");
        push_preview_pair(&mut out, left.held_piece(), right.held_piece());
    }

    out
}

fn push_pair(out: &mut String, left: &str, right: &str) {
    out.push_str(&format!("{left:<COLUMN_WIDTH$}{right}"));
    while out.ends_with(' ') {
        out.pop();
    }
    out.push('\n');
}

/// The player's grid as display rows, falling piece overlaid after the
/// board's own masking has been applied.
fn board_rows(player: &dyn Player) -> Vec<String> {
    let board = player.board();
    let mut grid = vec![vec![Board::EMPTY_SYMBOL; Board::COLS]; Board::ROWS];
    for (row, cells) in grid.iter_mut().enumerate() {
        for (col, cell) in cells.iter_mut().enumerate() {
            *cell = board.cell_symbol(row as i32, col as i32);
        }
    }
    if let Some(piece) = player.current_piece() {
        let pos = player.piece_position();
        for &offset in piece.cells() {
            let cell = pos + offset;
            if (0..Board::ROWS as i32).contains(&cell.row)
                && (0..Board::COLS as i32).contains(&cell.col)
            {
                grid[cell.row as usize][cell.col as usize] = piece.symbol();
            }
        }
    }
    grid.into_iter().map(|row| row.into_iter().collect()).collect()
}

/// The piece drawn in its bounding box, one string per row. An absent piece
/// still occupies one blank line so the two columns stay in step.
fn piece_lines(piece: Option<&Piece>) -> Vec<String> {
    let Some(piece) = piece else {
        return vec![String::from(" ")];
    };
    let bb = piece.bounding_box();
    let mut lines = Vec::new();
    for row in bb.min_row..=bb.max_row {
        let line = (bb.min_col..=bb.max_col)
            .map(|col| {
                let occupied = piece
                    .cells()
                    .iter()
                    .any(|cell| cell.row == row && cell.col == col);
                if occupied {
                    piece.symbol()
                } else {
                    ' '
                }
            })
            .collect();
        lines.push(line);
    }
    lines
}

fn push_preview_pair(out: &mut String, left: Option<&Piece>, right: Option<&Piece>) {
    let left_lines = piece_lines(left);
    let right_lines = piece_lines(right);
    for i in 0..left_lines.len().max(right_lines.len()) {
        let l = left_lines.get(i).map_or("", String::as_str);
        let r = right_lines.get(i).map_or("", String::as_str);
        push_pair(out, l, r);
    }
}
