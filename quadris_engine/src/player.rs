//! The player turn state machine and its action surface.
//!
//! [`Player`] is the abstraction shared by the base implementation and the
//! effect decorators; [`BasicPlayer`] owns the board, the level policy, the
//! current/next/held pieces and the scoring state. External renderers couple
//! to a player only through the [`Observer`] subscription mechanism.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::{Board, Direction, Level, Piece, PieceKind, Position, Spin};

/// Change-notification subscriber. Notifications are delivered synchronously
/// in the call stack of the mutating action; handlers must not re-enter
/// mutating player actions.
pub trait Observer {
    fn notify(&self);
}

/// The full action surface of a player. Effect decorators implement this by
/// forwarding to a wrapped player and overriding a subset of the operations.
pub trait Player {
    fn board(&self) -> &Board;
    fn board_mut(&mut self) -> &mut Board;
    fn score(&self) -> u32;
    fn level(&self) -> u8;
    fn is_alive(&self) -> bool;
    fn current_piece(&self) -> Option<&Piece>;
    fn next_piece(&self) -> Option<&Piece>;
    fn held_piece(&self) -> Option<&Piece>;
    fn piece_position(&self) -> Position;

    fn generate_next_piece(&mut self);
    /// Promotes the next piece to current at the spawn coordinate. Returns
    /// false (and flips liveness) when the spawn position collides.
    fn spawn_piece(&mut self) -> bool;
    fn shift(&mut self, dir: Direction) -> bool;
    fn rotate(&mut self, spin: Spin);
    fn drop_piece(&mut self);
    fn hold(&mut self);
    fn level_up(&mut self);
    fn level_down(&mut self);
    fn reset(&mut self);
    fn set_script_source(&mut self, path: &Path);
    fn set_random_enabled(&mut self, enabled: bool);

    fn has_current_piece(&self) -> bool;
    fn can_descend(&self) -> bool;

    /// Rows cleared by the most recent drop. Defined on the base contract so
    /// the match coordinator never has to inspect concrete types; wrappers
    /// forward it.
    fn last_rows_cleared(&self) -> u32;
    fn can_apply_special(&self) -> bool {
        self.last_rows_cleared() >= 2
    }

    // Helpers used by the forced-piece effect.
    fn next_piece_id(&self) -> u32;
    fn set_next_piece(&mut self, piece: Piece);
    fn replace_current_piece(&mut self, kind: PieceKind) -> bool;

    // Effect introspection: answered by the outermost layer only.
    fn has_blind_effect(&self) -> bool {
        false
    }
    fn has_heavy_effect(&self) -> bool {
        false
    }
    fn has_force_effect(&self) -> bool {
        false
    }
    fn forced_piece_kind(&self) -> Option<PieceKind> {
        None
    }

    fn attach_observer(&mut self, observer: Rc<dyn Observer>);
    fn detach_observer(&mut self, observer: &Rc<dyn Observer>);
    fn observers(&self) -> Vec<Rc<dyn Observer>>;

    /// Strips every effect layer, yielding the base player.
    fn into_base(self: Box<Self>) -> Box<dyn Player>;
}

pub struct BasicPlayer {
    board: Board,
    level: Level,
    rng: StdRng,
    current: Option<Piece>,
    next: Option<Piece>,
    held: Option<Piece>,
    pos: Position,
    score: u32,
    piece_counter: u32,
    alive: bool,
    can_hold: bool,
    resting: bool,
    rest_move_used: bool,
    last_rows_cleared: u32,
    drops_without_clear: u32,
    script_source: PathBuf,
    observers: Vec<Rc<dyn Observer>>,
}

impl BasicPlayer {
    /// Number of consecutive no-clear drops on level 4 between forced filler
    /// insertions.
    const FILLER_CADENCE: u32 = 5;

    /// A fresh player on the scripted level. No next piece is generated yet;
    /// callers configure levels and script sources first, then call
    /// [`Player::generate_next_piece`].
    pub fn new(script_source: impl Into<PathBuf>, seed: u64) -> Self {
        let script_source = script_source.into();
        Self {
            board: Board::new(),
            level: Level::scripted(&script_source),
            rng: StdRng::seed_from_u64(seed),
            current: None,
            next: None,
            held: None,
            pos: Board::SPAWN,
            score: 0,
            piece_counter: 0,
            alive: true,
            can_hold: true,
            resting: false,
            rest_move_used: false,
            last_rows_cleared: 0,
            drops_without_clear: 0,
            script_source,
            observers: Vec::new(),
        }
    }

    /// Lock-delay bookkeeping: whether the falling piece has come to rest on
    /// an obstruction. Informational only; no action is ever blocked by it.
    pub fn is_resting(&self) -> bool {
        self.resting
    }

    /// Whether the one post-touch move this turn has been spent.
    pub fn used_rest_move(&self) -> bool {
        self.rest_move_used
    }

    fn fits(&self, pos: Position) -> bool {
        self.current
            .as_ref()
            .is_some_and(|piece| self.board.can_place(piece, pos))
    }

    fn notify_observers(&self) {
        for observer in &self.observers {
            observer.notify();
        }
    }

    /// One forced single-row descent, applied after horizontal moves and
    /// rotations on the heavy levels.
    fn heavy_descent(&mut self) {
        let below = self.pos + Direction::Down.step();
        if self.fits(below) {
            self.pos = below;
            self.notify_observers();
        }
    }

    /// After a successful horizontal move or rotation while resting, record
    /// the spent move and re-check whether the piece is still resting.
    fn track_rest_move(&mut self) {
        if self.resting {
            self.rest_move_used = true;
            if self.can_descend() {
                self.resting = false;
                self.rest_move_used = false;
            }
        }
    }

    fn switch_level(&mut self, number: u8) {
        self.level = Level::new(number, &self.script_source);
        if self.current.is_none() {
            self.generate_next_piece();
        }
        self.notify_observers();
    }
}

impl Player for BasicPlayer {
    fn board(&self) -> &Board {
        &self.board
    }

    fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    fn score(&self) -> u32 {
        self.score
    }

    fn level(&self) -> u8 {
        self.level.number()
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn current_piece(&self) -> Option<&Piece> {
        self.current.as_ref()
    }

    fn next_piece(&self) -> Option<&Piece> {
        self.next.as_ref()
    }

    fn held_piece(&self) -> Option<&Piece> {
        self.held.as_ref()
    }

    fn piece_position(&self) -> Position {
        self.pos
    }

    fn generate_next_piece(&mut self) {
        self.piece_counter += 1;
        self.next = Some(self.level.generate_piece(&mut self.rng, self.piece_counter));
        self.notify_observers();
    }

    fn spawn_piece(&mut self) -> bool {
        if self.next.is_none() {
            self.generate_next_piece();
        }
        self.current = self.next.take();
        self.generate_next_piece();
        self.resting = false;
        self.rest_move_used = false;
        self.pos = Board::SPAWN;
        if !self.fits(self.pos) {
            self.alive = false;
            self.notify_observers();
            return false;
        }
        self.notify_observers();
        true
    }

    fn shift(&mut self, dir: Direction) -> bool {
        if self.current.is_none() {
            return false;
        }
        let candidate = self.pos + dir.step();
        if !self.fits(candidate) {
            if dir == Direction::Down {
                self.resting = true;
            }
            return false;
        }
        self.pos = candidate;
        self.notify_observers();
        if dir != Direction::Down {
            if self.level.is_heavy() {
                self.heavy_descent();
            }
            self.track_rest_move();
        }
        true
    }

    fn rotate(&mut self, spin: Spin) {
        let Some(mut piece) = self.current.take() else {
            return;
        };
        let old_box = piece.bounding_box();
        match spin {
            Spin::Clockwise => piece.rotate_cw(),
            Spin::CounterClockwise => piece.rotate_ccw(),
        }
        let new_box = piece.bounding_box();
        // Anchor the bounding box's bottom row and left column so the piece
        // rotates in place visually.
        let anchor_shift = Position::new(
            old_box.max_row - new_box.max_row,
            old_box.min_col - new_box.min_col,
        );
        let candidate = self.pos + anchor_shift;
        if self.board.can_place(&piece, candidate) {
            self.pos = candidate;
            self.current = Some(piece);
            self.notify_observers();
            if self.level.is_heavy() {
                self.heavy_descent();
            }
            self.track_rest_move();
        } else {
            // Exact revert: inverse rotation, original position untouched.
            match spin {
                Spin::Clockwise => piece.rotate_ccw(),
                Spin::CounterClockwise => piece.rotate_cw(),
            }
            self.current = Some(piece);
        }
    }

    fn drop_piece(&mut self) {
        if self.current.is_none() {
            return;
        }
        while self.shift(Direction::Down) {}
        let Some(piece) = self.current.take() else {
            return;
        };
        self.board.place(&piece, self.pos);
        let summary = self.board.clear_full_rows();
        self.last_rows_cleared = summary.rows_cleared;

        // Level 4: every 5th consecutive drop without a clear inserts a
        // filler cell into the center column.
        if self.level.number() == 4 {
            if summary.rows_cleared == 0 {
                self.drops_without_clear += 1;
                if self.drops_without_clear % Self::FILLER_CADENCE == 0 {
                    self.board.force_drop(Board::COLS / 2);
                    self.notify_observers();
                }
            } else {
                self.drops_without_clear = 0;
            }
        }

        if summary.rows_cleared > 0 {
            let base = u32::from(self.level.number()) + summary.rows_cleared;
            self.score += base * base;
        }
        for born_level in summary.removed_piece_levels {
            let bonus = u32::from(born_level) + 1;
            self.score += bonus * bonus;
        }

        self.can_hold = true;
        // The match coordinator spawns the next player's piece.
        self.notify_observers();
    }

    fn hold(&mut self) {
        if self.pos.row != Board::SPAWN.row || !self.can_hold || self.current.is_none() {
            return;
        }
        if self.held.is_none() {
            self.held = self.current.take();
            self.spawn_piece();
        } else {
            std::mem::swap(&mut self.current, &mut self.held);
            self.pos = Board::SPAWN;
            if !self.fits(self.pos) {
                // Swapped-in piece cannot legally spawn; revert fully.
                std::mem::swap(&mut self.current, &mut self.held);
                return;
            }
        }
        self.can_hold = false;
        self.notify_observers();
    }

    fn level_up(&mut self) {
        let number = self.level.number();
        if number < 4 {
            self.switch_level(number + 1);
        }
    }

    fn level_down(&mut self) {
        let number = self.level.number();
        if number > 0 {
            self.switch_level(number - 1);
        }
    }

    fn reset(&mut self) {
        self.board.reset();
        self.level = Level::scripted(&self.script_source);
        self.score = 0;
        self.piece_counter = 0;
        self.alive = true;
        self.current = None;
        self.next = None;
        self.held = None;
        self.pos = Board::SPAWN;
        self.can_hold = true;
        self.resting = false;
        self.rest_move_used = false;
        self.last_rows_cleared = 0;
        self.drops_without_clear = 0;
        self.generate_next_piece();
        // No spawn here; spawning stays with the match coordinator.
    }

    fn set_script_source(&mut self, path: &Path) {
        self.script_source = path.to_path_buf();
        self.level.set_script_source(path);
    }

    fn set_random_enabled(&mut self, enabled: bool) {
        self.level.set_random_enabled(enabled);
    }

    fn has_current_piece(&self) -> bool {
        self.current.is_some()
    }

    fn can_descend(&self) -> bool {
        self.fits(self.pos + Direction::Down.step())
    }

    fn last_rows_cleared(&self) -> u32 {
        self.last_rows_cleared
    }

    fn next_piece_id(&self) -> u32 {
        self.piece_counter + 1
    }

    fn set_next_piece(&mut self, piece: Piece) {
        self.next = Some(piece);
        self.notify_observers();
    }

    fn replace_current_piece(&mut self, kind: PieceKind) -> bool {
        let Some(current) = self.current.as_ref() else {
            return false;
        };
        let replacement = Piece::new(kind, current.id(), self.level.number());
        if !self.board.can_place(&replacement, Board::SPAWN) {
            // Replacement collision at the spawn coordinate is a loss.
            self.alive = false;
            self.current = None;
            self.notify_observers();
            return false;
        }
        self.current = Some(replacement);
        self.pos = Board::SPAWN;
        self.notify_observers();
        true
    }

    fn attach_observer(&mut self, observer: Rc<dyn Observer>) {
        self.observers.push(observer);
    }

    fn detach_observer(&mut self, observer: &Rc<dyn Observer>) {
        self.observers
            .retain(|existing| !Rc::ptr_eq(existing, observer));
    }

    fn observers(&self) -> Vec<Rc<dyn Observer>> {
        self.observers.clone()
    }

    fn into_base(self: Box<Self>) -> Box<dyn Player> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// A player whose scripted level points at a missing file, so every
    /// generated piece is the default straight kind.
    fn player() -> BasicPlayer {
        BasicPlayer::new("no_such_quadris_script.txt", 0)
    }

    fn spawn(player: &mut BasicPlayer, kind: PieceKind) {
        player.set_next_piece(Piece::new(kind, player.next_piece_id(), player.level()));
        assert!(player.spawn_piece());
    }

    /// Fills the given rows (counted up from the bottom) with filler cells in
    /// every column except those listed.
    fn prefill_bottom_rows(player: &mut BasicPlayer, rows: u32, open_cols: &[usize]) {
        for col in 0..Board::COLS {
            if !open_cols.contains(&col) {
                for _ in 0..rows {
                    player.board_mut().force_drop(col);
                }
            }
        }
    }

    #[test]
    fn spawn_promotes_next_and_generates_replacement() {
        let mut p = player();
        p.generate_next_piece();
        let next_id = p.next_piece().map(Piece::id);
        assert!(p.spawn_piece());
        assert_eq!(p.current_piece().map(Piece::id), next_id);
        assert!(p.next_piece().is_some());
        assert_eq!(p.piece_position(), Board::SPAWN);
    }

    #[test]
    fn piece_ids_are_monotonic() {
        let mut p = player();
        p.generate_next_piece();
        let first = p.next_piece().map(Piece::id);
        assert_eq!(first, Some(1));
        p.spawn_piece();
        assert_eq!(p.next_piece().map(Piece::id), Some(2));
        assert_eq!(p.next_piece_id(), 3);
    }

    #[test]
    fn spawn_collision_is_a_loss() {
        let mut p = player();
        // Occupy the straight piece's spawn cells (row 3, columns 0-3).
        let blocker = Piece::new(PieceKind::I, 99, 0);
        p.board_mut().place(&blocker, Board::SPAWN);
        p.set_next_piece(Piece::new(PieceKind::I, 1, 0));
        assert!(!p.spawn_piece());
        assert!(!p.is_alive());
    }

    #[test]
    fn rejected_shift_leaves_state_unchanged() {
        let mut p = player();
        spawn(&mut p, PieceKind::I);
        assert!(!p.shift(Direction::Left));
        assert_eq!(p.piece_position(), Board::SPAWN);
        assert!(p.shift(Direction::Right));
        assert_eq!(p.piece_position(), Position::new(3, 1));
    }

    #[test]
    fn rejected_rotation_reverts_exactly() {
        let mut p = player();
        spawn(&mut p, PieceKind::I);
        // Against the left wall at the top there is room, so first check a
        // genuine revert: wall off the vertical orientation's target cells.
        for row in 0..3 {
            p.board_mut().place(
                &Piece::new(PieceKind::I, 98, 0),
                Position::new(row, 0),
            );
        }
        let before_cells = *p.current_piece().map(Piece::cells).unwrap();
        p.rotate(Spin::Clockwise);
        assert_eq!(p.current_piece().map(Piece::cells), Some(&before_cells));
        assert_eq!(p.piece_position(), Board::SPAWN);
    }

    #[test]
    fn rotation_anchors_bottom_left_corner() {
        let mut p = player();
        spawn(&mut p, PieceKind::I);
        p.rotate(Spin::Clockwise);
        // Horizontal at row 3 becomes vertical occupying rows 0-3, column 0.
        let bb = p.current_piece().map(Piece::bounding_box).unwrap();
        assert_eq!((bb.min_row, bb.max_row), (-3, 0));
        assert_eq!(p.piece_position(), Position::new(3, 0));
    }

    #[test]
    fn scoring_two_rows_at_level_one() {
        let mut p = player();
        p.level_up();
        assert_eq!(p.level(), 1);
        prefill_bottom_rows(&mut p, 2, &[0]);
        spawn(&mut p, PieceKind::I);
        p.rotate(Spin::Clockwise);
        p.drop_piece();
        assert_eq!(p.last_rows_cleared(), 2);
        // (level 1 + 2 rows)^2, no fully removed pieces.
        assert_eq!(p.score(), 9);
        assert!(!p.has_current_piece());
        assert!(p.can_apply_special());
    }

    #[test]
    fn removed_piece_bonus_adds_to_line_score() {
        let mut p = player();
        prefill_bottom_rows(&mut p, 2, &[0, 1, 2]);
        // A square born at level 2 fills columns 1-2 of the bottom two rows.
        let square = Piece::new(PieceKind::O, 50, 2);
        p.board_mut().place(&square, Position::new(16, 1));
        spawn(&mut p, PieceKind::I);
        p.rotate(Spin::Clockwise);
        p.drop_piece();
        assert_eq!(p.last_rows_cleared(), 2);
        // (0 + 2)^2 for the clear plus (2 + 1)^2 for the removed square.
        assert_eq!(p.score(), 13);
    }

    #[test]
    fn single_row_clear_grants_no_special() {
        let mut p = player();
        prefill_bottom_rows(&mut p, 1, &[0]);
        spawn(&mut p, PieceKind::I);
        p.rotate(Spin::Clockwise);
        p.drop_piece();
        assert_eq!(p.last_rows_cleared(), 1);
        assert!(!p.can_apply_special());
    }

    #[test]
    fn hold_stashes_and_respawns() {
        let mut p = player();
        spawn(&mut p, PieceKind::I);
        let held_id = p.current_piece().map(Piece::id);
        p.hold();
        assert_eq!(p.held_piece().map(Piece::id), held_id);
        assert!(p.has_current_piece());
        assert_eq!(p.piece_position(), Board::SPAWN);
    }

    #[test]
    fn hold_is_rejected_twice_in_one_turn() {
        let mut p = player();
        spawn(&mut p, PieceKind::I);
        p.hold();
        let held_id = p.held_piece().map(Piece::id);
        let current_id = p.current_piece().map(Piece::id);
        p.hold();
        assert_eq!(p.held_piece().map(Piece::id), held_id);
        assert_eq!(p.current_piece().map(Piece::id), current_id);
    }

    #[test]
    fn hold_is_rejected_below_the_spawn_row() {
        let mut p = player();
        spawn(&mut p, PieceKind::I);
        assert!(p.shift(Direction::Down));
        p.hold();
        assert!(p.held_piece().is_none());
    }

    #[test]
    fn hold_availability_returns_after_a_drop() {
        let mut p = player();
        spawn(&mut p, PieceKind::I);
        p.hold();
        p.drop_piece();
        spawn(&mut p, PieceKind::O);
        p.hold();
        // Second turn's hold swapped current and held.
        assert_eq!(p.held_piece().map(Piece::kind), Some(PieceKind::O));
        assert_eq!(p.current_piece().map(Piece::kind), Some(PieceKind::I));
    }

    #[test]
    fn heavy_levels_descend_after_horizontal_moves() {
        let mut p = player();
        for _ in 0..3 {
            p.level_up();
        }
        assert_eq!(p.level(), 3);
        spawn(&mut p, PieceKind::O);
        assert!(p.shift(Direction::Right));
        assert_eq!(p.piece_position(), Position::new(4, 1));
        p.rotate(Spin::Clockwise);
        assert_eq!(p.piece_position(), Position::new(5, 1));
    }

    #[test]
    fn plain_levels_do_not_auto_descend() {
        let mut p = player();
        spawn(&mut p, PieceKind::O);
        assert!(p.shift(Direction::Right));
        assert_eq!(p.piece_position(), Position::new(3, 1));
    }

    #[test]
    fn level_four_inserts_filler_every_fifth_dry_drop() {
        let mut p = player();
        for _ in 0..4 {
            p.level_up();
        }
        assert_eq!(p.level(), 4);
        for drop in 1..=5 {
            spawn(&mut p, PieceKind::O);
            p.drop_piece();
            let center_filled = p.board().cell_symbol(17, (Board::COLS / 2) as i32)
                == Board::FILLER_SYMBOL;
            assert_eq!(center_filled, drop == 5, "after drop {drop}");
        }
    }

    #[test]
    fn resting_flags_are_informational_only() {
        let mut p = player();
        spawn(&mut p, PieceKind::O);
        while p.shift(Direction::Down) {}
        assert!(p.is_resting());
        assert!(!p.used_rest_move());
        // A horizontal move at the floor is still allowed and is recorded.
        assert!(p.shift(Direction::Right));
        assert!(p.used_rest_move());
        assert!(p.is_resting());
    }

    #[test]
    fn resting_clears_when_piece_can_fall_again() {
        let mut p = player();
        // A single filler pillar: resting on it, a side-step frees the piece.
        p.board_mut().force_drop(0);
        spawn(&mut p, PieceKind::O);
        while p.shift(Direction::Down) {}
        assert!(p.is_resting());
        assert!(p.shift(Direction::Right));
        assert!(!p.is_resting());
        assert!(!p.used_rest_move());
    }

    #[test]
    fn replace_current_piece_keeps_id_and_respawns() {
        let mut p = player();
        spawn(&mut p, PieceKind::I);
        let id = p.current_piece().map(Piece::id);
        assert!(p.shift(Direction::Down));
        assert!(p.replace_current_piece(PieceKind::Z));
        assert_eq!(p.current_piece().map(Piece::kind), Some(PieceKind::Z));
        assert_eq!(p.current_piece().map(Piece::id), id);
        assert_eq!(p.piece_position(), Board::SPAWN);
    }

    #[test]
    fn replacement_collision_is_a_loss() {
        let mut p = player();
        spawn(&mut p, PieceKind::I);
        // Block the square's spawn cells (rows 3-4, columns 0-1) while the
        // straight piece only occupies row 3.
        let blocker = Piece::new(PieceKind::O, 97, 0);
        p.board_mut().place(&blocker, Position::new(4, 0));
        assert!(!p.replace_current_piece(PieceKind::O));
        assert!(!p.is_alive());
        assert!(!p.has_current_piece());
    }

    #[test]
    fn level_changes_clamp_and_rebuild_policy() {
        let mut p = player();
        p.level_down();
        assert_eq!(p.level(), 0);
        for _ in 0..6 {
            p.level_up();
        }
        assert_eq!(p.level(), 4);
    }

    #[test]
    fn level_zero_restores_configured_script() {
        let path = std::env::temp_dir().join("quadris_player_script.txt");
        std::fs::write(&path, "Z").unwrap();
        let mut p = BasicPlayer::new(&path, 0);
        p.level_up();
        p.level_down();
        // No current piece, so the policy change regenerated next.
        assert_eq!(p.next_piece().map(Piece::kind), Some(PieceKind::Z));
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut p = player();
        spawn(&mut p, PieceKind::I);
        p.hold();
        p.level_up();
        p.board_mut().force_drop(0);
        p.reset();
        assert_eq!(p.score(), 0);
        assert_eq!(p.level(), 0);
        assert!(p.is_alive());
        assert!(p.current_piece().is_none());
        assert!(p.held_piece().is_none());
        assert_eq!(p.next_piece().map(Piece::id), Some(1));
        assert_eq!(p.board().cell_symbol(17, 0), Board::EMPTY_SYMBOL);
    }

    struct CountingObserver(Cell<u32>);

    impl Observer for CountingObserver {
        fn notify(&self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn observers_see_mutations_until_detached() {
        let mut p = player();
        let counter = Rc::new(CountingObserver(Cell::new(0)));
        p.attach_observer(counter.clone());
        p.generate_next_piece();
        assert_eq!(counter.0.get(), 1);
        let as_observer: Rc<dyn Observer> = counter.clone();
        p.detach_observer(&as_observer);
        p.generate_next_piece();
        assert_eq!(counter.0.get(), 1);
    }
}
