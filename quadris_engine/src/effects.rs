//! Temporary handicap effects, applied to the opponent as decorators.
//!
//! A single [`PlayerEffect`] wrapper covers all three effects; the behavioral
//! differences live in a few overridden operations keyed on the effect kind,
//! everything else forwards to the wrapped player. Effects stack by wrapping
//! an already-wrapped player, and [`Player::into_base`] strips the whole
//! chain on restart.

use std::path::Path;
use std::rc::Rc;

use crate::{Board, Direction, Observer, Piece, PieceKind, Player, Position, Spin};

/// An effect request, as selected by the rewarded player.
#[derive(Eq, PartialEq, Clone, Copy, Hash, Debug)]
pub enum Effect {
    /// Masks the centre of the opponent's board until their next drop.
    Blind,
    /// The opponent's piece falls two extra rows after every move or
    /// rotation.
    Heavy,
    /// Replaces the opponent's current piece (or, if none is falling, their
    /// next spawn) with the given kind. Single use.
    Force(PieceKind),
}

/// Runtime state of an applied effect. Only the forced-piece effect carries
/// state of its own: it burns out after replacing one piece.
enum EffectKind {
    Blind,
    Heavy,
    Force { kind: PieceKind, used: bool },
}

/// Decorator wrapping a [`Player`] (possibly itself a `PlayerEffect`) with
/// one effect. Observers attach per layer; the match coordinator copies the
/// outermost layer's observers onto each newly applied wrapper so the
/// outermost list always reflects the full subscription set, while
/// notifications keep flowing from the base player's own list.
pub struct PlayerEffect {
    inner: Box<dyn Player>,
    kind: EffectKind,
    observers: Vec<Rc<dyn Observer>>,
}

impl PlayerEffect {
    /// Wraps a player with an effect. Application is immediate where the
    /// effect can act on an in-progress turn: blind masks the board right
    /// away, and force replaces the current piece (which can end the match
    /// if the replacement collides at the spawn coordinate).
    pub fn new(mut inner: Box<dyn Player>, effect: Effect) -> Self {
        let kind = match effect {
            Effect::Blind => {
                if inner.has_current_piece() {
                    inner.board_mut().set_blind(true);
                }
                EffectKind::Blind
            }
            Effect::Heavy => EffectKind::Heavy,
            Effect::Force(kind) => {
                let mut used = false;
                if inner.has_current_piece() {
                    // Consumed whether or not the replacement fit; a misfit
                    // already cost the opponent the match.
                    inner.replace_current_piece(kind);
                    used = true;
                }
                EffectKind::Force { kind, used }
            }
        };
        Self {
            inner,
            kind,
            observers: Vec::new(),
        }
    }

    /// Two forced single-row descents, stopping early at an obstruction.
    fn heavy_descent(&mut self) {
        for _ in 0..2 {
            if !self.inner.shift(Direction::Down) {
                break;
            }
        }
    }
}

impl Player for PlayerEffect {
    fn board(&self) -> &Board {
        self.inner.board()
    }

    fn board_mut(&mut self) -> &mut Board {
        self.inner.board_mut()
    }

    fn score(&self) -> u32 {
        self.inner.score()
    }

    fn level(&self) -> u8 {
        self.inner.level()
    }

    fn is_alive(&self) -> bool {
        self.inner.is_alive()
    }

    fn current_piece(&self) -> Option<&Piece> {
        self.inner.current_piece()
    }

    fn next_piece(&self) -> Option<&Piece> {
        self.inner.next_piece()
    }

    fn held_piece(&self) -> Option<&Piece> {
        self.inner.held_piece()
    }

    fn piece_position(&self) -> Position {
        self.inner.piece_position()
    }

    fn generate_next_piece(&mut self) {
        self.inner.generate_next_piece();
    }

    fn spawn_piece(&mut self) -> bool {
        match &mut self.kind {
            // The mask covers the whole upcoming turn, so it goes up before
            // the spawn notification reaches any renderer.
            EffectKind::Blind => self.inner.board_mut().set_blind(true),
            EffectKind::Force { kind, used } if !*used => {
                let forced = Piece::new(*kind, self.inner.next_piece_id(), self.inner.level());
                self.inner.set_next_piece(forced);
                *used = true;
            }
            _ => {}
        }
        self.inner.spawn_piece()
    }

    fn shift(&mut self, dir: Direction) -> bool {
        let moved = self.inner.shift(dir);
        if matches!(self.kind, EffectKind::Heavy) && moved && dir != Direction::Down {
            self.heavy_descent();
        }
        moved
    }

    fn rotate(&mut self, spin: Spin) {
        self.inner.rotate(spin);
        if matches!(self.kind, EffectKind::Heavy) {
            self.heavy_descent();
        }
    }

    fn drop_piece(&mut self) {
        // The turn ends here, so the mask comes down before the drop
        // notification goes out.
        if matches!(self.kind, EffectKind::Blind) {
            self.inner.board_mut().set_blind(false);
        }
        self.inner.drop_piece();
    }

    fn hold(&mut self) {
        self.inner.hold();
    }

    fn level_up(&mut self) {
        self.inner.level_up();
    }

    fn level_down(&mut self) {
        self.inner.level_down();
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn set_script_source(&mut self, path: &Path) {
        self.inner.set_script_source(path);
    }

    fn set_random_enabled(&mut self, enabled: bool) {
        self.inner.set_random_enabled(enabled);
    }

    fn has_current_piece(&self) -> bool {
        self.inner.has_current_piece()
    }

    fn can_descend(&self) -> bool {
        self.inner.can_descend()
    }

    fn last_rows_cleared(&self) -> u32 {
        self.inner.last_rows_cleared()
    }

    fn next_piece_id(&self) -> u32 {
        self.inner.next_piece_id()
    }

    fn set_next_piece(&mut self, piece: Piece) {
        self.inner.set_next_piece(piece);
    }

    fn replace_current_piece(&mut self, kind: PieceKind) -> bool {
        self.inner.replace_current_piece(kind)
    }

    fn has_blind_effect(&self) -> bool {
        matches!(self.kind, EffectKind::Blind)
    }

    fn has_heavy_effect(&self) -> bool {
        matches!(self.kind, EffectKind::Heavy)
    }

    fn has_force_effect(&self) -> bool {
        matches!(self.kind, EffectKind::Force { used: false, .. })
    }

    fn forced_piece_kind(&self) -> Option<PieceKind> {
        match self.kind {
            EffectKind::Force { kind, used: false } => Some(kind),
            _ => None,
        }
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
        self.inner.into_base()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BasicPlayer;

    fn base() -> Box<dyn Player> {
        Box::new(BasicPlayer::new("no_such_quadris_script.txt", 0))
    }

    fn spawn(player: &mut dyn Player, kind: PieceKind) {
        let piece = Piece::new(kind, player.next_piece_id(), player.level());
        player.set_next_piece(piece);
        assert!(player.spawn_piece());
    }

    #[test]
    fn blind_masks_an_in_progress_turn_immediately() {
        let mut inner = base();
        spawn(inner.as_mut(), PieceKind::I);
        let p = PlayerEffect::new(inner, Effect::Blind);
        assert!(p.board().is_blind());
        assert!(p.has_blind_effect());
    }

    #[test]
    fn blind_waits_for_the_next_spawn_when_between_turns() {
        let mut p = PlayerEffect::new(base(), Effect::Blind);
        assert!(!p.board().is_blind());
        p.generate_next_piece();
        assert!(p.spawn_piece());
        assert!(p.board().is_blind());
    }

    #[test]
    fn blind_lifts_for_the_drop_and_returns_next_turn() {
        let mut p = PlayerEffect::new(base(), Effect::Blind);
        p.generate_next_piece();
        assert!(p.spawn_piece());
        p.drop_piece();
        assert!(!p.board().is_blind());
        assert!(p.spawn_piece());
        assert!(p.board().is_blind());
    }

    #[test]
    fn heavy_adds_two_descents_after_horizontal_moves() {
        let mut inner = base();
        spawn(inner.as_mut(), PieceKind::O);
        let mut p = PlayerEffect::new(inner, Effect::Heavy);
        assert!(p.shift(Direction::Right));
        assert_eq!(p.piece_position(), Position::new(5, 1));
        p.rotate(Spin::Clockwise);
        assert_eq!(p.piece_position(), Position::new(7, 1));
    }

    #[test]
    fn heavy_descent_stops_at_the_floor() {
        let mut inner = base();
        spawn(inner.as_mut(), PieceKind::O);
        let mut p = PlayerEffect::new(inner, Effect::Heavy);
        while p.shift(Direction::Down) {}
        // At the floor the extra descents have nowhere to go.
        assert!(p.shift(Direction::Right));
        assert_eq!(p.piece_position(), Position::new(16, 1));
    }

    #[test]
    fn force_replaces_an_in_progress_piece_and_burns_out() {
        let mut inner = base();
        spawn(inner.as_mut(), PieceKind::I);
        let p = PlayerEffect::new(inner, Effect::Force(PieceKind::Z));
        assert_eq!(p.current_piece().map(Piece::kind), Some(PieceKind::Z));
        assert!(!p.has_force_effect());
        assert_eq!(p.forced_piece_kind(), None);
    }

    #[test]
    fn force_applies_to_the_next_spawn_when_between_turns() {
        let mut p = PlayerEffect::new(base(), Effect::Force(PieceKind::S));
        assert!(p.has_force_effect());
        assert_eq!(p.forced_piece_kind(), Some(PieceKind::S));
        p.generate_next_piece();
        assert!(p.spawn_piece());
        assert_eq!(p.current_piece().map(Piece::kind), Some(PieceKind::S));
        assert!(!p.has_force_effect());
        // Subsequent spawns draw from the level policy again.
        p.drop_piece();
        assert!(p.spawn_piece());
        assert_eq!(p.current_piece().map(Piece::kind), Some(PieceKind::I));
    }

    #[test]
    fn effects_stack_and_the_outermost_layer_answers_queries() {
        let mut inner = base();
        spawn(inner.as_mut(), PieceKind::O);
        let blind = Box::new(PlayerEffect::new(inner, Effect::Blind));
        let mut p = PlayerEffect::new(blind, Effect::Heavy);
        assert!(p.has_heavy_effect());
        assert!(!p.has_blind_effect());
        // Both layers still act: the board is masked and moves fall heavy.
        assert!(p.board().is_blind());
        assert!(p.shift(Direction::Right));
        assert_eq!(p.piece_position(), Position::new(5, 1));
    }

    #[test]
    fn unwrapping_strips_every_layer() {
        let blind = Box::new(PlayerEffect::new(base(), Effect::Blind));
        let heavy = Box::new(PlayerEffect::new(blind, Effect::Heavy));
        let stripped = heavy.into_base();
        assert!(!stripped.has_blind_effect());
        assert!(!stripped.has_heavy_effect());
    }
}
