//! Block-generation policies, one per difficulty level.
//!
//! Level 0 replays a scripted kind sequence cyclically; levels 1-3 draw from
//! fixed weighted tables; level 4 reuses the level-3 distribution and only
//! differs in the board-side rules keyed off its number (forced filler
//! insertion and heavy descent, both implemented by the player).

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::{Piece, PieceKind};

/// Kind returned by the scripted policy on an empty sequence and by the
/// stochastic policies when randomness is disabled.
const DEFAULT_KIND: PieceKind = PieceKind::I;

/// Level 1 table: S and Z at weight 1/12, every other kind at 2/12.
const LIGHT_BIAS_TABLE: [PieceKind; 12] = [
    PieceKind::S,
    PieceKind::Z,
    PieceKind::I,
    PieceKind::I,
    PieceKind::J,
    PieceKind::J,
    PieceKind::L,
    PieceKind::L,
    PieceKind::O,
    PieceKind::O,
    PieceKind::T,
    PieceKind::T,
];

/// Level 3 (and 4) table: S and Z at weight 2/9 each, the rest at 1/9.
const HEAVY_BIAS_TABLE: [PieceKind; 9] = [
    PieceKind::S,
    PieceKind::Z,
    PieceKind::S,
    PieceKind::Z,
    PieceKind::I,
    PieceKind::J,
    PieceKind::L,
    PieceKind::O,
    PieceKind::T,
];

#[derive(Clone, Debug)]
pub enum Level {
    /// Level 0: deterministic, cycling through a kind sequence loaded from a
    /// script source. An unreadable or empty source degrades to the default
    /// kind rather than failing the match.
    Scripted {
        source: PathBuf,
        sequence: Vec<PieceKind>,
        cursor: usize,
    },
    /// Level 1: uniform draw over [`LIGHT_BIAS_TABLE`].
    LightBias { random: bool },
    /// Level 2: uniform draw over all seven kinds.
    Uniform { random: bool },
    /// Level 3: uniform draw over [`HEAVY_BIAS_TABLE`]; also denotes heavy
    /// gameplay (single-row auto-descent), enforced by the player.
    HeavyBias { random: bool },
    /// Level 4: level-3 distribution, level-4 number.
    Relentless { random: bool },
}

impl Level {
    /// Builds the policy for a numeric level, clamping to the 0-4 range.
    /// The script source only matters for level 0.
    pub fn new(number: u8, script_source: &Path) -> Self {
        match number {
            0 => Self::scripted(script_source),
            1 => Level::LightBias { random: true },
            2 => Level::Uniform { random: true },
            3 => Level::HeavyBias { random: true },
            _ => Level::Relentless { random: true },
        }
    }

    pub fn scripted(source: &Path) -> Self {
        Level::Scripted {
            source: source.to_path_buf(),
            sequence: load_sequence(source),
            cursor: 0,
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            Level::Scripted { .. } => 0,
            Level::LightBias { .. } => 1,
            Level::Uniform { .. } => 2,
            Level::HeavyBias { .. } => 3,
            Level::Relentless { .. } => 4,
        }
    }

    /// Whether this level forces an extra descent after horizontal moves and
    /// rotations.
    pub fn is_heavy(&self) -> bool {
        self.number() >= 3
    }

    pub fn generate_kind(&mut self, rng: &mut StdRng) -> PieceKind {
        match self {
            Level::Scripted {
                sequence, cursor, ..
            } => {
                if sequence.is_empty() {
                    return DEFAULT_KIND;
                }
                let kind = sequence[*cursor];
                *cursor = (*cursor + 1) % sequence.len();
                kind
            }
            Level::LightBias { random } => draw(&LIGHT_BIAS_TABLE, *random, rng),
            Level::Uniform { random } => draw(&PieceKind::ALL, *random, rng),
            Level::HeavyBias { random } | Level::Relentless { random } => {
                draw(&HEAVY_BIAS_TABLE, *random, rng)
            }
        }
    }

    /// Constructs a fresh piece of the next generated kind, stamped with the
    /// given id and this policy's level number as its birth level.
    pub fn generate_piece(&mut self, rng: &mut StdRng, id: u32) -> Piece {
        let kind = self.generate_kind(rng);
        Piece::new(kind, id, self.number())
    }

    /// No-op for the scripted policy, which is inherently deterministic.
    pub fn set_random_enabled(&mut self, enabled: bool) {
        match self {
            Level::Scripted { .. } => {}
            Level::LightBias { random }
            | Level::Uniform { random }
            | Level::HeavyBias { random }
            | Level::Relentless { random } => *random = enabled,
        }
    }

    /// Rebinds the scripted policy to a new source and reloads immediately,
    /// discarding the previous cursor position. Other policies ignore it.
    pub fn set_script_source(&mut self, path: &Path) {
        if let Level::Scripted {
            source,
            sequence,
            cursor,
        } = self
        {
            *source = path.to_path_buf();
            *sequence = load_sequence(path);
            *cursor = 0;
        }
    }
}

fn draw(table: &[PieceKind], random: bool, rng: &mut StdRng) -> PieceKind {
    if !random {
        return DEFAULT_KIND;
    }
    // SAFETY: the tables are non-empty constants.
    *table.choose(rng).unwrap()
}

/// Reads whitespace-delimited kind tags from the script source. Characters
/// that are not a kind tag take the default kind, preserving the sequence
/// length so the cycle period matches the source.
fn load_sequence(source: &Path) -> Vec<PieceKind> {
    fs::read_to_string(source)
        .unwrap_or_default()
        .split_whitespace()
        .flat_map(|token| token.chars())
        .map(|c| PieceKind::from_symbol(c).unwrap_or(DEFAULT_KIND))
        .collect()
}
