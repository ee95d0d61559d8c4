//! The two-player match coordinator.
//!
//! [`Game`] owns both (possibly effect-wrapped) players and the turn index,
//! executes engine commands with repeat counts, and implements the effect
//! re-wrapping protocol. Rendering and input stay outside; frontends couple
//! through observers and the player accessors.

use std::path::PathBuf;

use crate::{BasicPlayer, Direction, Effect, PieceKind, Player, PlayerEffect, Spin};

/// An engine-level command, already parsed and validated by the frontend.
#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub enum Command {
    Left,
    Right,
    Down,
    Clockwise,
    CounterClockwise,
    Drop,
    Hold,
    LevelUp,
    LevelDown,
    /// Testing tag: replace the current piece with the given kind.
    ForceKind(PieceKind),
    SetRandom(bool),
}

/// What a command execution produced, for the frontend's turn bookkeeping.
#[derive(Eq, PartialEq, Clone, Copy, Default, Debug)]
pub struct CommandOutcome {
    /// The turn ended with a locked piece.
    pub dropped: bool,
    /// The drop cleared enough rows to earn a special effect.
    pub special_available: bool,
}

/// Match parameters, assembled from the command line by the frontend.
#[derive(Clone, Debug)]
pub struct GameSetup {
    /// Base RNG seed; the second player draws from seed + 1. Unseeded
    /// matches fall back to entropy.
    pub seed: Option<u64>,
    pub script_source_1: PathBuf,
    pub script_source_2: PathBuf,
    pub start_level: u8,
}

pub struct Game {
    // Slots are only transiently empty inside the re-wrapping calls below.
    players: [Option<Box<dyn Player>>; 2],
    current: usize,
}

impl Game {
    pub fn new(setup: &GameSetup) -> Self {
        let seed = setup.seed.unwrap_or_else(rand::random);
        let players = [
            Self::build_player(&setup.script_source_1, seed, setup.start_level),
            Self::build_player(&setup.script_source_2, seed + 1, setup.start_level),
        ];
        Self {
            players,
            current: 0,
        }
    }

    fn build_player(script: &PathBuf, seed: u64, start_level: u8) -> Option<Box<dyn Player>> {
        let mut player: Box<dyn Player> = Box::new(BasicPlayer::new(script, seed));
        for _ in 0..start_level {
            player.level_up();
        }
        if player.next_piece().is_none() {
            player.generate_next_piece();
        }
        Some(player)
    }

    /// Spawns the first player's opening piece. The second player spawns
    /// when the turn passes to them.
    pub fn begin(&mut self) {
        self.player_mut(0).spawn_piece();
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn opponent_index(&self) -> usize {
        1 - self.current
    }

    pub fn player(&self, index: usize) -> &dyn Player {
        // SAFETY: see the slot invariant on the field.
        self.players[index].as_deref().unwrap()
    }

    pub fn player_mut(&mut self, index: usize) -> &mut dyn Player {
        // SAFETY: see the slot invariant on the field.
        self.players[index].as_deref_mut().unwrap()
    }

    pub fn current_player(&self) -> &dyn Player {
        self.player(self.current)
    }

    pub fn current_player_mut(&mut self) -> &mut dyn Player {
        self.player_mut(self.current)
    }

    /// Executes a command `multiplier` times against the current player.
    /// Non-repeatable commands (hold, level changes, testing tags, the
    /// randomness toggle) execute at most once.
    pub fn handle_command(&mut self, command: Command, multiplier: u32) -> CommandOutcome {
        let mut outcome = CommandOutcome::default();
        for _ in 0..multiplier {
            let player = self.player_mut(self.current);
            match command {
                Command::Left => {
                    player.shift(Direction::Left);
                }
                Command::Right => {
                    player.shift(Direction::Right);
                }
                Command::Down => {
                    player.shift(Direction::Down);
                }
                Command::Clockwise => player.rotate(Spin::Clockwise),
                Command::CounterClockwise => player.rotate(Spin::CounterClockwise),
                Command::Drop => {
                    player.drop_piece();
                    outcome.dropped = true;
                    outcome.special_available = player.can_apply_special();
                }
                Command::Hold => {
                    player.hold();
                    break;
                }
                Command::LevelUp => {
                    player.level_up();
                    break;
                }
                Command::LevelDown => {
                    player.level_down();
                    break;
                }
                Command::ForceKind(kind) => {
                    player.replace_current_piece(kind);
                    break;
                }
                Command::SetRandom(enabled) => {
                    player.set_random_enabled(enabled);
                    break;
                }
            }
        }
        outcome
    }

    /// Wraps the target player in a new effect layer. The previous outermost
    /// layer's subscriptions are copied onto the new wrapper so the outermost
    /// object always carries the full subscription set.
    pub fn apply_effect(&mut self, effect: Effect, target: usize) {
        let Some(inner) = self.players[target].take() else {
            return;
        };
        let observers = inner.observers();
        let mut wrapped: Box<dyn Player> = Box::new(PlayerEffect::new(inner, effect));
        for observer in observers {
            wrapped.attach_observer(observer);
        }
        self.players[target] = Some(wrapped);
    }

    pub fn switch_turn(&mut self) {
        self.current = 1 - self.current;
    }

    /// Strips all effect layers from both players, resets them, and respawns
    /// the first player's opening piece.
    pub fn restart(&mut self) {
        for slot in &mut self.players {
            if let Some(player) = slot.take() {
                let mut base = player.into_base();
                base.reset();
                *slot = Some(base);
            }
        }
        self.current = 0;
        self.begin();
    }

    pub fn is_over(&self) -> bool {
        !self.player(0).is_alive() || !self.player(1).is_alive()
    }
}
