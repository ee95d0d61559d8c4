mod commands;
mod display;
pub mod terminal_quadris;

use std::io;
use std::path::PathBuf;

use clap::Parser;
use quadris_engine::GameSetup;

/// Terminal frontend for quadris, a two-player competitive falling-block
/// duel.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Seed for the piece generators, for reproducible matches.
    #[arg(long)]
    seed: Option<u64>,
    /// Level-0 piece script for player 1.
    #[arg(long, default_value = "quadris_sequence1.txt")]
    scriptfile1: PathBuf,
    /// Level-0 piece script for player 2.
    #[arg(long, default_value = "quadris_sequence2.txt")]
    scriptfile2: PathBuf,
    /// Starting difficulty level (0-4).
    #[arg(long, default_value_t = 0)]
    startlevel: u8,
}

fn main() -> Result<(), io::Error> {
    let args = Args::parse();
    let setup = GameSetup {
        seed: args.seed,
        script_source_1: args.scriptfile1,
        script_source_2: args.scriptfile2,
        start_level: args.startlevel.min(4),
    };
    let stdout = io::BufWriter::new(io::stdout());
    let mut app = terminal_quadris::App::new(stdout, setup);
    let msg = app.run()?;
    println!("{msg}");
    Ok(())
}
