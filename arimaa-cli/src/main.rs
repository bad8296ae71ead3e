//! Arimaa terminal front-end
//!
//! Usage:
//!   arimaa replay game.txt            # print the final position
//!   arimaa check game.txt             # replay, re-save, report differences
//!   arimaa play --timed --save g.txt  # interactive session
//!
//! Logging goes to stderr and follows `RUST_LOG` (default `warn`).

mod play;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use arimaa_core::engine::WinReason;
use arimaa_core::{history, Engine, GameConfig, GameMode};

#[derive(Parser, Debug)]
#[command(name = "arimaa", version, about = "Arimaa rule engine in the terminal")]
struct Cli {
    /// JSON game config (mode, clock limits, setup counts)
    #[arg(global = true, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a history file and print the final position
    Replay { file: PathBuf },
    /// Replay a history file, save it again and report differing lines
    Check { file: PathBuf },
    /// Play an interactive game
    Play {
        /// Run the turn and game clocks
        #[arg(long)]
        timed: bool,
        /// Continue from a history file
        #[arg(long)]
        load: Option<PathBuf>,
        /// Where `save` and Ctrl-C write the history
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => GameConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => GameConfig::default(),
    };

    match cli.command {
        Command::Replay { file } => replay(&file, config),
        Command::Check { file } => check(&file, config),
        Command::Play { timed, load, save } => {
            let config = if timed { GameConfig { mode: GameMode::Timed, ..config } } else { config };
            play::run(config, load.as_deref(), save)
        }
    }
}

fn replay(file: &Path, config: GameConfig) -> Result<()> {
    let engine = history::load_from_file(file, config)
        .with_context(|| format!("loading {}", file.display()))?;
    print_status(&engine);
    Ok(())
}

fn check(file: &Path, config: GameConfig) -> Result<()> {
    let original = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let engine = history::load_from_str(&original, config)?;

    let expected: Vec<&str> = original.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let resaved = history::history_lines(&engine);

    let mut differences = 0;
    for i in 0..expected.len().max(resaved.len()) {
        let before = expected.get(i).copied().unwrap_or("<missing>");
        let after = resaved.get(i).map(String::as_str).unwrap_or("<missing>");
        if before != after {
            differences += 1;
            println!("line {}:", i + 1);
            println!("  file:   {}", before);
            println!("  replay: {}", after);
        }
    }

    if differences > 0 {
        bail!("{} line(s) differ after replay", differences);
    }
    println!("{}: {} lines, replay identical", file.display(), expected.len());
    Ok(())
}

/// Board, side to move, remaining steps and the result so far.
pub(crate) fn print_status(engine: &Engine) {
    println!("{}", engine.board());
    println!();
    match engine.outcome() {
        None => println!(
            "Turn {}{}: {} to move, {} step(s) left",
            engine.turn().number,
            engine.active_side().letter(),
            engine.active_side(),
            engine.remaining_steps()
        ),
        Some(outcome) => {
            let reason = match outcome.reason {
                WinReason::Goal => "rabbit reached the goal".to_string(),
                WinReason::Elimination => "no rabbits left".to_string(),
                WinReason::Timeout(timeout) => format!("{} time exceeded", timeout),
            };
            match outcome.winner {
                Some(side) => println!("Game over: {} wins ({})", side, reason),
                None => println!("Game over: draw ({})", reason),
            }
        }
    }
}
