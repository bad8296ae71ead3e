//! Move-history text files.
//!
//! ```text
//! 1g Ra2 Rb2 Rc2 ... Ea1
//! 1s ra7 rb7 rc7 ... eh8
//! 2g Ra2n Ra3n Ra4n Ra5n
//! 2s ed7s ed6s ed5s -
//! 3g Cc2n - - - Cc3x
//! ```
//!
//! The two setup lines come first, Gold then Silver. Each later line holds
//! one turn: its four step or pass tokens, then its captures in the order
//! they happened. A turn still in progress is written with the tokens
//! played so far.
//!
//! Loading replays every line through the engine's public calls, so the
//! loaded game carries its own undo history. Bad tokens are logged and
//! skipped rather than failing the load.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::config::GameConfig;
use crate::engine::{Engine, StepOutcome};
use crate::error::{EngineError, HistoryError, IllegalStep, NotationError};
use crate::notation::{parse_turn_label, turn_label, MoveToken};
use crate::{Piece, Pos, Side};

/// One line of a history file after the setup lines.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct TurnLine {
    pub number: u32,
    pub side: Side,
    pub tokens: Vec<MoveToken>,
}

impl fmt::Display for TurnLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&turn_label(self.number, self.side))?;
        for token in &self.tokens {
            write!(f, " {}", token)?;
        }
        Ok(())
    }
}

impl FromStr for TurnLine {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<TurnLine, NotationError> {
        let mut parts = s.split_whitespace();
        let label = parts.next().ok_or(NotationError::Empty)?;
        let (number, side) = parse_turn_label(label)?;
        let tokens = parts.map(str::parse).collect::<Result<Vec<MoveToken>, _>>()?;
        Ok(TurnLine { number, side, tokens })
    }
}

/// The engine's history as file lines.
pub fn history_lines(engine: &Engine) -> Vec<String> {
    let mut setup: [Vec<(Piece, Pos)>; 2] = [Vec::new(), Vec::new()];
    let mut turns: Vec<TurnLine> = Vec::new();

    for ((number, side), token) in engine.labelled_history() {
        if let MoveToken::Setup { side, placements } = token {
            setup[*side as usize].extend_from_slice(placements);
            continue;
        }
        match turns.last_mut() {
            Some(line) if line.number == number && line.side == side => line.tokens.push(token.clone()),
            _ => turns.push(TurnLine { number, side, tokens: vec![token.clone()] }),
        }
    }

    let [gold, silver] = setup;
    let mut lines = vec![
        MoveToken::Setup { side: Side::Gold, placements: gold }.to_string(),
        MoveToken::Setup { side: Side::Silver, placements: silver }.to_string(),
    ];
    for line in &mut turns {
        // stable, so steps and captures each keep their order
        line.tokens.sort_by_key(|token| !token.fills_slot());
    }
    lines.extend(turns.iter().map(TurnLine::to_string));
    lines
}

/// Write the history, one line per turn.
pub fn save_history<W: Write>(engine: &Engine, mut writer: W) -> Result<(), HistoryError> {
    for line in history_lines(engine) {
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}

/// The history as a single string.
pub fn history_to_string(engine: &Engine) -> String {
    let mut text = String::new();
    for line in history_lines(engine) {
        text.push_str(&line);
        text.push('\n');
    }
    text
}

pub fn save_to_file(engine: &Engine, path: &Path) -> Result<(), HistoryError> {
    let writer = BufWriter::new(File::create(path)?);
    save_history(engine, writer)?;
    debug!(path = %path.display(), tokens = engine.history().len(), "history saved");
    Ok(())
}

pub fn load_from_file(path: &Path, config: GameConfig) -> Result<Engine, HistoryError> {
    let text = std::fs::read_to_string(path)?;
    load_from_str(&text, config)
}

/// Rebuild a game from history text.
///
/// The setup lines must be present and valid. Every other problem is
/// logged and the offending line or token skipped.
pub fn load_from_str(text: &str, config: GameConfig) -> Result<Engine, HistoryError> {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

    let mut setup: [Option<Vec<(Piece, Pos)>>; 2] = [None, None];
    for _ in 0..2 {
        let Some(line) = lines.next() else { break };
        match line.parse::<MoveToken>()? {
            MoveToken::Setup { side, placements } => setup[side as usize] = Some(placements),
            _ => return Err(NotationError::Malformed(line.to_string()).into()),
        }
    }

    let mut engine = Engine::empty(config);
    for side in [Side::Gold, Side::Silver] {
        let placements = setup[side as usize].take().ok_or(HistoryError::MissingSetup(side))?;
        engine.place_setup(side, &placements)?;
    }
    engine.clear_undo();
    engine.start_clock();

    for line in lines {
        let mut parts = line.split_whitespace();
        let label = parts.next().unwrap_or_default();
        let (number, side) = match parse_turn_label(label) {
            Ok(label) => label,
            Err(err) => {
                warn!(line, %err, "skipping line");
                continue;
            }
        };
        engine.begin_turn(number, side);

        let mut passed = false;
        for text in parts {
            let token = match text.parse::<MoveToken>() {
                Ok(token) => token,
                Err(err) => {
                    warn!(token = text, %err, "skipping malformed token");
                    continue;
                }
            };
            if matches!(token, MoveToken::Pass) {
                if passed {
                    continue;
                }
                passed = true;
            }
            if let Err(err) = replay(&mut engine, &token) {
                warn!(%token, %err, "skipping rejected token");
                if err.is_fatal() {
                    return Ok(engine);
                }
            }
        }
    }
    debug!(tokens = engine.history().len(), "history loaded");
    Ok(engine)
}

/// Feed one token to the engine. Captures are regenerated, so they are
/// not replayed.
fn replay(engine: &mut Engine, token: &MoveToken) -> Result<(), EngineError> {
    let (piece, dest) = match *token {
        MoveToken::Capture { .. } | MoveToken::Setup { .. } => return Ok(()),
        MoveToken::Pass => return engine.end_turn_early().map(|_| ()),
        MoveToken::Simple { piece, .. } => (piece, None),
        MoveToken::Push { piece, dest, .. } | MoveToken::Pull { piece, dest, .. } => (piece, Some(dest)),
    };
    let Some((from, to)) = token.squares() else {
        return Ok(());
    };
    if engine.board().get(from) != Some(piece) {
        return Err(IllegalStep::NoPiece(from).into());
    }

    match (engine.attempt_step(from, to)?, dest) {
        (StepOutcome::Completed(_), None) => Ok(()),
        (StepOutcome::ChoiceRequired { .. }, Some(dest)) => engine.resolve_choice(from, to, dest).map(|_| ()),
        (StepOutcome::ChoiceRequired { .. }, None) => {
            Err(IllegalStep::NoPendingChoice { from, to }.into())
        }
        (StepOutcome::Completed(_), Some(_)) => {
            Err(IllegalStep::NoPushOrPull(to).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::PieceKind;

    fn at(row: u8, col: u8) -> Pos {
        Pos::from_row_col(row, col)
    }

    fn play(engine: &mut Engine, from: Pos, to: Pos) {
        engine.attempt_step(from, to).unwrap();
    }

    #[test]
    fn test_turn_line_roundtrip() {
        let line: TurnLine = "3s rb7s rb6s - - Cc3x".parse().unwrap();
        assert_eq!(line.number, 3);
        assert_eq!(line.side, Side::Silver);
        assert_eq!(line.tokens.len(), 5);
        assert_eq!(line.to_string(), "3s rb7s rb6s - - Cc3x");
        assert!("3s Zb7s".parse::<TurnLine>().is_err());
        assert!("".parse::<TurnLine>().is_err());
    }

    #[test]
    fn test_fresh_game_saves_setup_lines() {
        let engine = Engine::new(GameConfig::classic());
        let lines = history_lines(&engine);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1g "));
        assert!(lines[1].starts_with("1s "));
        assert_eq!(lines[0].split(' ').count(), 17);
        assert!(lines[0].contains("Ea1"));
        assert!(lines[1].contains("eh8"));
    }

    #[test]
    fn test_turn_lines_numbering() {
        let mut engine = Engine::new(GameConfig::classic());
        for row in (2..6).rev() {
            play(&mut engine, at(row + 1, 0), at(row, 0));
        }
        play(&mut engine, at(1, 7), at(2, 7));
        engine.end_turn_early().unwrap();
        play(&mut engine, at(6, 7), at(5, 7));

        let lines = history_lines(&engine);
        assert_eq!(lines[2], "2g Ra2n Ra3n Ra4n Ra5n");
        assert_eq!(lines[3], "2s rh7s - - -");
        assert_eq!(lines[4], "3g Rh2n");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_captures_follow_step_slots() {
        let mut board = Board::new();
        board.set(at(6, 2), Some(Piece::new(PieceKind::Cat, Side::Gold)));
        board.set(at(7, 0), Some(Piece::new(PieceKind::Rabbit, Side::Gold)));
        board.set(at(0, 7), Some(Piece::new(PieceKind::Rabbit, Side::Silver)));
        let mut engine = Engine::with_board(GameConfig::classic(), board);

        play(&mut engine, at(6, 2), at(5, 2));
        engine.end_turn_early().unwrap();
        play(&mut engine, at(0, 7), at(1, 7));

        let lines = history_lines(&engine);
        assert_eq!(lines[2], "2g Cc2n - - - Cc3x");
        assert_eq!(lines[3], "2s rh8s");

        let loaded = load_from_str(&history_to_string(&engine), GameConfig::classic()).unwrap();
        assert_eq!(loaded.board(), engine.board());
        assert_eq!(loaded.turn(), engine.turn());
        assert_eq!(history_lines(&loaded), lines);
    }

    #[test]
    fn test_save_load_restores_position() {
        let mut engine = Engine::new(GameConfig::classic());
        play(&mut engine, at(6, 2), at(5, 2));
        engine.end_turn_early().unwrap();
        play(&mut engine, at(1, 4), at(2, 4));
        play(&mut engine, at(2, 4), at(2, 5));

        let text = history_to_string(&engine);
        let loaded = load_from_str(&text, GameConfig::classic()).unwrap();

        assert_eq!(loaded.board(), engine.board());
        assert_eq!(loaded.turn(), engine.turn());
        assert_eq!(loaded.history(), engine.history());
        assert_eq!(history_to_string(&loaded), text);
    }

    #[test]
    fn test_load_replays_push_and_capture() {
        let mut board = Board::new();
        board.set(at(7, 3), Some(Piece::new(PieceKind::Elephant, Side::Gold)));
        board.set(at(7, 0), Some(Piece::new(PieceKind::Rabbit, Side::Gold)));
        board.set(at(0, 3), Some(Piece::new(PieceKind::Cat, Side::Silver)));
        board.set(at(0, 0), Some(Piece::new(PieceKind::Rabbit, Side::Silver)));

        let text = "1g Ed1 Ra1\n1s cd8 ra8\n2g Ed1n Ed2n Ed3n Ed4n\n2s cd8s cd7s -\n3g Ed5n>c6 cc6x\n";
        let loaded = load_from_str(text, GameConfig::classic()).unwrap();

        let mut engine = Engine::with_board(GameConfig::classic(), board);
        for row in (3..7).rev() {
            play(&mut engine, at(row + 1, 3), at(row, 3));
        }
        for row in 1..3 {
            play(&mut engine, at(row - 1, 3), at(row, 3));
        }
        engine.end_turn_early().unwrap();
        engine.attempt_step(at(3, 3), at(2, 3)).unwrap();
        engine.resolve_choice(at(3, 3), at(2, 3), at(2, 2)).unwrap();

        assert_eq!(loaded.board(), engine.board());
        assert!(loaded.board().is_empty(at(2, 2)));
        assert_eq!(loaded.active_side(), Side::Gold);
        assert_eq!(loaded.steps_used(), 2);
        let lines = history_lines(&loaded);
        assert_eq!(lines[3], "2s cd8s cd7s - -");
        assert_eq!(lines[4], "3g Ed5n>c6 cc6x");
    }

    #[test]
    fn test_load_skips_bad_tokens() {
        let engine = Engine::new(GameConfig::classic());
        let mut text = history_to_string(&engine);
        text.push_str("2g Ra2n Zz9q Ra3n Rh2s\nnonsense\n2s rh7s\n");

        let loaded = load_from_str(&text, GameConfig::classic()).unwrap();
        assert_eq!(loaded.board().get(at(4, 0)), Some(Piece::new(PieceKind::Rabbit, Side::Gold)));
        assert_eq!(loaded.board().get(at(2, 7)), Some(Piece::new(PieceKind::Rabbit, Side::Silver)));
        assert_eq!(loaded.active_side(), Side::Silver);
        assert_eq!(loaded.steps_used(), 1);
    }

    #[test]
    fn test_load_requires_setup() {
        let err = load_from_str("1g Ra2\n", GameConfig::classic()).unwrap_err();
        assert!(matches!(err, HistoryError::MissingSetup(Side::Silver)));

        let err = load_from_str("", GameConfig::classic()).unwrap_err();
        assert!(matches!(err, HistoryError::MissingSetup(Side::Gold)));

        let err = load_from_str("1g Ra8\n1s ra7\n", GameConfig::classic()).unwrap_err();
        assert!(matches!(err, HistoryError::Setup(_)));

        let err = load_from_str("2g Ra2n\n1s ra7\n", GameConfig::classic()).unwrap_err();
        assert!(matches!(err, HistoryError::Notation(_)));
    }

    #[test]
    fn test_loaded_moves_can_be_undone() {
        let engine = Engine::new(GameConfig::classic());
        let mut text = history_to_string(&engine);
        text.push_str("2g Ra2n Ra3n\n");

        let mut loaded = load_from_str(&text, GameConfig::classic()).unwrap();
        assert_eq!(loaded.undo_depth(), 2);
        assert!(loaded.undo());
        assert!(loaded.undo());
        assert!(!loaded.undo());
        assert_eq!(loaded.board(), &Board::standard());
    }
}
