//! Text command parsing: multiplier prefixes, lowercase normalization and
//! shortest-unique-prefix matching over the command table.

use quadris_engine::{Command, PieceKind};

/// A matched input word, ready for dispatch.
#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub enum Action {
    /// Handed to the match coordinator, possibly with a repeat count.
    Engine(Command),
    /// Reads the next word as a file of commands to execute.
    Sequence,
    Restart,
    Quit,
}

const COMMAND_TABLE: &[(&str, Action)] = &[
    ("left", Action::Engine(Command::Left)),
    ("right", Action::Engine(Command::Right)),
    ("down", Action::Engine(Command::Down)),
    ("clockwise", Action::Engine(Command::Clockwise)),
    ("counterclockwise", Action::Engine(Command::CounterClockwise)),
    ("cw", Action::Engine(Command::Clockwise)),
    ("ccw", Action::Engine(Command::CounterClockwise)),
    ("drop", Action::Engine(Command::Drop)),
    ("hold", Action::Engine(Command::Hold)),
    ("levelup", Action::Engine(Command::LevelUp)),
    ("leveldown", Action::Engine(Command::LevelDown)),
    ("norandom", Action::Engine(Command::SetRandom(false))),
    ("random", Action::Engine(Command::SetRandom(true))),
    ("sequence", Action::Sequence),
    ("restart", Action::Restart),
];

/// Splits a leading decimal repeat count off an input word. A missing or
/// zero count reads as 1. An all-digit word yields an empty command part;
/// the caller reads the next word as the command.
pub fn split_multiplier(word: &str) -> (u32, &str) {
    let digits = word
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(word.len());
    let (count, command) = word.split_at(digits);
    let multiplier = count.parse().ok().filter(|&n| n > 0).unwrap_or(1);
    (multiplier, command)
}

/// Resolves a command word. Single letters naming a piece kind are the
/// testing tags and take precedence (case-insensitively) over prefix
/// matching; `quit` must be spelled out. Everything else matches any
/// unambiguous prefix of a table entry. Ambiguous or unknown words yield
/// `None`.
pub fn match_command(word: &str) -> Option<Action> {
    let mut chars = word.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if let Some(kind) = PieceKind::from_symbol(c) {
            return Some(Action::Engine(Command::ForceKind(kind)));
        }
    }

    let word = word.to_ascii_lowercase();
    if word == "quit" {
        return Some(Action::Quit);
    }

    let mut matched = None;
    for (name, action) in COMMAND_TABLE {
        if name.starts_with(&word) {
            if matched.is_some() {
                return None;
            }
            matched = Some(*action);
        }
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_prefix_is_split_off() {
        assert_eq!(split_multiplier("3right"), (3, "right"));
        assert_eq!(split_multiplier("right"), (1, "right"));
        assert_eq!(split_multiplier("12"), (12, ""));
    }

    #[test]
    fn zero_multiplier_reads_as_one() {
        assert_eq!(split_multiplier("0left"), (1, "left"));
    }

    #[test]
    fn full_names_match() {
        assert_eq!(
            match_command("left"),
            Some(Action::Engine(Command::Left))
        );
        assert_eq!(
            match_command("counterclockwise"),
            Some(Action::Engine(Command::CounterClockwise))
        );
        assert_eq!(match_command("restart"), Some(Action::Restart));
        assert_eq!(match_command("sequence"), Some(Action::Sequence));
        assert_eq!(match_command("quit"), Some(Action::Quit));
    }

    #[test]
    fn unique_prefixes_match() {
        assert_eq!(match_command("lef"), Some(Action::Engine(Command::Left)));
        assert_eq!(match_command("ri"), Some(Action::Engine(Command::Right)));
        assert_eq!(match_command("dr"), Some(Action::Engine(Command::Drop)));
        assert_eq!(match_command("re"), Some(Action::Restart));
        assert_eq!(
            match_command("nor"),
            Some(Action::Engine(Command::SetRandom(false)))
        );
    }

    #[test]
    fn ambiguous_prefixes_are_rejected() {
        // down/drop, left/levelup/leveldown, the rotation family.
        assert_eq!(match_command("d"), None);
        assert_eq!(match_command("le"), None);
        assert_eq!(match_command("c"), None);
    }

    #[test]
    fn short_rotation_names_are_exact_entries() {
        assert_eq!(match_command("cw"), Some(Action::Engine(Command::Clockwise)));
        assert_eq!(
            match_command("ccw"),
            Some(Action::Engine(Command::CounterClockwise))
        );
        assert_eq!(
            match_command("cc"),
            Some(Action::Engine(Command::CounterClockwise))
        );
    }

    #[test]
    fn testing_tags_beat_prefix_matching() {
        // "l" would be an ambiguous prefix, but it names the L piece.
        assert_eq!(
            match_command("l"),
            Some(Action::Engine(Command::ForceKind(PieceKind::L)))
        );
        assert_eq!(
            match_command("Z"),
            Some(Action::Engine(Command::ForceKind(PieceKind::Z)))
        );
    }

    #[test]
    fn case_is_ignored_for_words() {
        assert_eq!(match_command("DROP"), Some(Action::Engine(Command::Drop)));
        assert_eq!(match_command("Quit"), Some(Action::Quit));
    }

    #[test]
    fn unknown_words_are_rejected() {
        assert_eq!(match_command("wiggle"), None);
        assert_eq!(match_command(""), None);
    }
}
