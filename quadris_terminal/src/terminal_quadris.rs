//! The interactive application: token input, command dispatch, the turn
//! hand-off after each drop, the special-effect prompt, and match-record
//! persistence.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read, Write};
use std::rc::Rc;

use crossterm::{style::Print, QueueableCommand};
use quadris_engine::{Effect, Game, GameSetup, Observer, PieceKind, Player};

use crate::commands::{self, Action};
use crate::display::{self, RedrawFlag};

/// One finished match, appended to the save file on exit.
#[derive(Eq, PartialEq, Clone, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct MatchRecord {
    timestamp: String,
    /// 1-based winning player; `None` when both lost.
    winner: Option<u8>,
    scores: [u32; 2],
    start_level: u8,
}

pub struct App<T: Write> {
    term: T,
    game: Game,
    setup: GameSetup,
    redraw: Rc<RedrawFlag>,
    /// Tokens queued from `sequence` files; drained before stdin.
    pending: VecDeque<String>,
    line_tokens: VecDeque<String>,
    records: Vec<MatchRecord>,
    outcome_recorded: bool,
}

impl<T: Write> Drop for App<T> {
    fn drop(&mut self) {
        let _ = Self::save_records(&self.records);
        let _ = self.term.flush();
    }
}

impl<T: Write> App<T> {
    pub const SAVE_FILE: &'static str = "./quadris_scores.json";

    pub fn new(terminal: T, setup: GameSetup) -> Self {
        let mut game = Game::new(&setup);
        let redraw = RedrawFlag::new();
        for index in 0..2 {
            game.player_mut(index)
                .attach_observer(redraw.clone() as Rc<dyn Observer>);
        }
        game.begin();
        Self {
            term: terminal,
            game,
            setup,
            redraw,
            pending: VecDeque::new(),
            line_tokens: VecDeque::new(),
            records: Self::load_records().unwrap_or_default(),
            outcome_recorded: false,
        }
    }

    fn save_records(records: &Vec<MatchRecord>) -> io::Result<()> {
        let save_str = serde_json::to_string(records)?;
        let mut file = File::create(Self::SAVE_FILE)?;
        file.write_all(save_str.as_bytes())?;
        Ok(())
    }

    fn load_records() -> io::Result<Vec<MatchRecord>> {
        let mut file = File::open(Self::SAVE_FILE)?;
        let mut save_str = String::new();
        file.read_to_string(&mut save_str)?;
        let records = serde_json::from_str(&save_str)?;
        Ok(records)
    }

    pub fn run(&mut self) -> io::Result<String> {
        self.print_welcome()?;
        self.draw()?;
        let msg = loop {
            let Some(token) = self.next_token() else {
                break String::from("end of input");
            };
            let (multiplier, rest) = commands::split_multiplier(&token);
            let word = if rest.is_empty() {
                match self.next_token() {
                    Some(word) => word,
                    None => break String::from("end of input"),
                }
            } else {
                rest.to_string()
            };
            let Some(action) = commands::match_command(&word) else {
                self.println(format!("Unrecognized command: {word}"))?;
                continue;
            };
            match action {
                Action::Quit => break String::from("Thanks for playing!"),
                Action::Restart => {
                    self.game.restart();
                    self.outcome_recorded = false;
                    self.println("Match restarted.")?;
                }
                Action::Sequence => self.run_sequence_file()?,
                Action::Engine(command) => {
                    let outcome = self.game.handle_command(command, multiplier);
                    if outcome.dropped {
                        self.game.switch_turn();
                        self.game.current_player_mut().spawn_piece();
                        if outcome.special_available && !self.game.is_over() {
                            self.prompt_effect()?;
                        }
                    }
                }
            }
            if self.game.is_over() {
                self.report_game_over()?;
                continue;
            }
            if self.redraw.take() {
                self.draw()?;
            }
        };
        Ok(msg)
    }

    fn print_welcome(&mut self) -> io::Result<()> {
        self.println("Welcome to quadris!")?;
        self.println("Movement: left, right, down; rotation: clockwise (cw), counterclockwise (ccw)")?;
        self.println("Actions: drop, hold, levelup, leveldown, norandom, random, sequence, restart, quit")?;
        self.println("Prefix a command with a count to repeat it (e.g. 3right); prefixes abbreviate (e.g. lef)")?;
        self.println("")
    }

    /// Next input token: queued sequence-file tokens first, then words from
    /// stdin. `None` means end of input.
    fn next_token(&mut self) -> Option<String> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(token);
            }
            if let Some(token) = self.line_tokens.pop_front() {
                return Some(token);
            }
            let mut line = String::new();
            if io::stdin().read_line(&mut line).ok()? == 0 {
                return None;
            }
            self.line_tokens
                .extend(line.split_whitespace().map(str::to_string));
        }
    }

    /// `sequence <file>`: queues the file's whitespace-delimited tokens ahead
    /// of all other input.
    fn run_sequence_file(&mut self) -> io::Result<()> {
        let Some(path) = self.next_token() else {
            return Ok(());
        };
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                for token in contents.split_whitespace().rev() {
                    self.pending.push_front(token.to_string());
                }
            }
            Err(err) => self.println(format!("Cannot read sequence file {path}: {err}"))?,
        }
        Ok(())
    }

    /// The reward prompt after a 2+ row clear. The turn has already passed,
    /// so the current player is the one being punished.
    fn prompt_effect(&mut self) -> io::Result<()> {
        let target = self.game.current_index();
        loop {
            self.println("You cleared 2 or more rows! Choose an effect for your opponent:")?;
            self.println("  blind | heavy | force <kind>   (kinds: I J L O S T Z)")?;
            let Some(choice) = self.next_token() else {
                return Ok(());
            };
            let effect = match choice.to_ascii_lowercase().as_str() {
                "blind" => Effect::Blind,
                "heavy" => Effect::Heavy,
                "force" => {
                    let Some(kind_token) = self.next_token() else {
                        return Ok(());
                    };
                    let kind = kind_token.chars().next().and_then(PieceKind::from_symbol);
                    match kind {
                        Some(kind) => Effect::Force(kind),
                        None => {
                            self.println(format!("Unknown piece kind: {kind_token}"))?;
                            continue;
                        }
                    }
                }
                _ => {
                    self.println("Please answer blind, heavy or force <kind>.")?;
                    continue;
                }
            };
            self.game.apply_effect(effect, target);
            self.println("Effect applied.")?;
            return Ok(());
        }
    }

    fn report_game_over(&mut self) -> io::Result<()> {
        if self.outcome_recorded {
            return Ok(());
        }
        self.outcome_recorded = true;
        if self.redraw.take() {
            self.draw()?;
        }
        let alive = [
            self.game.player(0).is_alive(),
            self.game.player(1).is_alive(),
        ];
        let winner = match alive {
            [true, false] => Some(1),
            [false, true] => Some(2),
            _ => None,
        };
        self.println("Game over!")?;
        match winner {
            Some(number) => self.println(format!("Player {number} wins!"))?,
            None => self.println("Both players lost!")?,
        }
        self.println("Type 'restart' to play again or 'quit' to exit.")?;
        self.records.push(MatchRecord {
            timestamp: chrono::Utc::now().format("%Y-%m-%d %H:%M").to_string(),
            winner,
            scores: [self.game.player(0).score(), self.game.player(1).score()],
            start_level: self.setup.start_level,
        });
        Ok(())
    }

    fn draw(&mut self) -> io::Result<()> {
        let frame = display::render(&self.game);
        self.term.queue(Print(frame))?;
        self.term.flush()
    }

    fn println(&mut self, line: impl std::fmt::Display) -> io::Result<()> {
        self.term.queue(Print(format!("{line}\n")))?;
        self.term.flush()
    }
}
