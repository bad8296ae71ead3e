//! Interactive terminal session.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::{debug, warn};

use arimaa_core::notation::{parse_square, square_name};
use arimaa_core::{history, ClockEvent, Engine, EngineError, GameConfig, MoveToken, Pos, StepOutcome};

use crate::print_status;

const AUTOSAVE_PATH: &str = "arimaa-autosave.txt";

const HELP: &str = "\
commands:
  step a2 a3    move the piece on a2 to a3
  choose a4     pick the push/pull destination
  end           end the turn early
  skip          skip one step
  undo          take back the last action
  board         show the position
  history       show the move history
  save <path>   write the move history
  quit";

pub fn run(config: GameConfig, load: Option<&Path>, save: Option<PathBuf>) -> Result<()> {
    let engine = match load {
        Some(path) => history::load_from_file(path, config).with_context(|| format!("loading {}", path.display()))?,
        None => Engine::new(config),
    };
    let timed = engine.clock().is_enabled();
    let events = engine.clock().events();
    let engine = Arc::new(Mutex::new(engine));

    // Set up SIGINT handler: autosave, then exit
    let autosave = save.clone().unwrap_or_else(|| PathBuf::from(AUTOSAVE_PATH));
    let e = Arc::clone(&engine);
    ctrlc::set_handler(move || {
        println!("\n\nInterrupt received, saving history to {}...", autosave.display());
        if let Err(err) = history::save_to_file(&e.lock(), &autosave) {
            println!("Error saving history: {}", err);
        }
        std::process::exit(130);
    })
    .context("setting Ctrl-C handler")?;

    if timed {
        let e = Arc::clone(&engine);
        thread::spawn(move || {
            for event in events.iter() {
                match event {
                    ClockEvent::TurnTick { side, elapsed } => debug!(%side, ?elapsed, "turn tick"),
                    ClockEvent::TotalTick { elapsed } => debug!(?elapsed, "total tick"),
                    ClockEvent::TurnTimeout { side } => {
                        println!("\n*** {} ran out of turn time", side);
                        let _ = e.lock().check_time();
                    }
                    ClockEvent::TotalTimeout => {
                        println!("\n*** game time ran out");
                        let _ = e.lock().check_time();
                    }
                }
            }
        });
    }

    println!("Arimaa");
    println!("======");
    println!("{}", HELP);
    println!();
    print_status(&engine.lock());

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            continue;
        };

        let mut game = engine.lock();
        match (command, args) {
            ("step", [from, to]) => match (parse_square(from), parse_square(to)) {
                (Ok(from), Ok(to)) => report(step(&mut game, from, to)),
                (Err(err), _) | (_, Err(err)) => println!("error: {}", err),
            },
            ("choose", [dest]) => match parse_square(dest) {
                Ok(dest) => report(choose(&mut game, dest)),
                Err(err) => println!("error: {}", err),
            },
            ("end", []) => report(game.end_turn_early().map(|tokens| tokens_line(&tokens))),
            ("skip", []) => report(game.skip_step().map(|()| "step skipped".to_string())),
            ("undo", []) => {
                if game.undo() {
                    println!("undone");
                } else {
                    println!("nothing to undo");
                }
            }
            ("board", []) => print_status(&game),
            ("history", []) => print!("{}", history::history_to_string(&game)),
            ("save", [path]) => match history::save_to_file(&game, Path::new(path)) {
                Ok(()) => println!("saved to {}", path),
                Err(err) => println!("error: {}", err),
            },
            ("help", []) => println!("{}", HELP),
            ("quit", []) => break,
            _ => println!("unknown command, type `help`"),
        }

        if game.is_game_over() {
            print_status(&game);
        }
    }

    if let Some(path) = save {
        history::save_to_file(&engine.lock(), &path)?;
        println!("saved to {}", path.display());
    }
    Ok(())
}

fn step(engine: &mut Engine, from: Pos, to: Pos) -> Result<String, EngineError> {
    match engine.attempt_step(from, to)? {
        StepOutcome::Completed(tokens) if tokens.is_empty() => Ok("step retracted".to_string()),
        StepOutcome::Completed(tokens) => Ok(tokens_line(&tokens)),
        StepOutcome::ChoiceRequired { kind, destinations } => {
            let squares: Vec<String> = destinations.into_iter().map(square_name).collect();
            Ok(format!("{:?}: choose one of {}", kind, squares.join(" ")))
        }
    }
}

fn choose(engine: &mut Engine, dest: Pos) -> Result<String, EngineError> {
    let Some(choice) = engine.pending_choice() else {
        return Ok("no push or pull pending".to_string());
    };
    let (from, to) = (choice.from, choice.to);
    engine.resolve_choice(from, to, dest).map(|tokens| tokens_line(&tokens))
}

fn report(result: Result<String, EngineError>) {
    match result {
        Ok(message) => println!("{}", message),
        Err(err) if err.is_fatal() => {
            warn!(%err, "game ended");
            println!("game over: {}", err);
        }
        Err(err) => println!("error: {}", err),
    }
}

fn tokens_line(tokens: &[MoveToken]) -> String {
    tokens.iter().map(MoveToken::to_string).collect::<Vec<_>>().join(" ")
}
