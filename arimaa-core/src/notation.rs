//! Move notation.
//!
//! # Grammar
//!
//! ```text
//! setup    1g Ra2 Rb2 ...        one entry per placed piece
//! simple   Ra2n                  piece, square, direction
//! push     Ed4e>f5               mover, square, direction to victim > victim's destination
//! pull     Ed4e<c4               mover, square, direction to victim < mover's destination
//! capture  cc3x                  captured piece, trap square
//! pass     -
//! ```
//!
//! Uppercase pieces are Gold, lowercase are Silver. Files run `a`-`h` with
//! the column; ranks run `8` (row 0) down to `1` (row 7). Directions are
//! `n` (towards row 0), `s`, `e`, `w`.
//!
//! [`MoveToken`]'s `Display` and `FromStr` are exact inverses on
//! well-formed tokens.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::NotationError;
use crate::{Direction, Piece, Pos, Side, SIZE};

/// One recorded event in the move history.
#[derive(Clone, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum MoveToken {
    /// Initial placement of one side's pieces.
    Setup { side: Side, placements: Vec<(Piece, Pos)> },
    /// A piece steps onto an empty square.
    Simple { piece: Piece, from: Pos, dir: Direction },
    /// `piece` steps from `from` towards `dir`, pushing the victim there to `dest`.
    Push { piece: Piece, from: Pos, dir: Direction, dest: Pos },
    /// `piece` steps from `from` to `dest`, dragging the victim found towards `dir`.
    Pull { piece: Piece, from: Pos, dir: Direction, dest: Pos },
    /// A piece removed from a trap.
    Capture { piece: Piece, at: Pos },
    /// An unused step.
    Pass,
}

impl MoveToken {
    /// Steps this token spent from the turn budget.
    pub fn step_cost(&self) -> u8 {
        match self {
            MoveToken::Simple { .. } => 1,
            MoveToken::Push { .. } | MoveToken::Pull { .. } => 2,
            MoveToken::Setup { .. } | MoveToken::Capture { .. } | MoveToken::Pass => 0,
        }
    }

    /// Tokens that fill one of the four step slots of a turn line.
    pub fn fills_slot(&self) -> bool {
        matches!(
            self,
            MoveToken::Simple { .. } | MoveToken::Push { .. } | MoveToken::Pull { .. } | MoveToken::Pass
        )
    }

    #[inline]
    pub fn is_capture(&self) -> bool {
        matches!(self, MoveToken::Capture { .. })
    }

    /// The mover's origin and the square it stepped towards.
    ///
    /// For push and pull tokens the second square is the victim's origin.
    pub fn squares(&self) -> Option<(Pos, Pos)> {
        match *self {
            MoveToken::Simple { from, dir, .. }
            | MoveToken::Push { from, dir, .. }
            | MoveToken::Pull { from, dir, .. } => from.step(dir).map(|to| (from, to)),
            _ => None,
        }
    }
}

/// File/rank name of a square, e.g. `a8` for (0,0).
pub fn square_name(pos: Pos) -> String {
    let file = (b'a' + pos.col()) as char;
    let rank = (b'1' + (SIZE - 1 - pos.row())) as char;
    format!("{}{}", file, rank)
}

/// Parse a file/rank square name.
pub fn parse_square(s: &str) -> Result<Pos, NotationError> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
        return Err(NotationError::BadSquare(s.to_string()));
    }
    let (file, rank) = (bytes[0], bytes[1]);
    if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
        return Err(NotationError::BadSquare(s.to_string()));
    }
    let col = file - b'a';
    let row = SIZE - 1 - (rank - b'1');
    Ok(Pos::from_row_col(row, col))
}

/// Turn label such as `2g` or `17s`.
pub fn turn_label(number: u32, side: Side) -> String {
    format!("{}{}", number, side.letter())
}

/// Parse a turn label into its number and side.
pub fn parse_turn_label(s: &str) -> Result<(u32, Side), NotationError> {
    let bad = || NotationError::BadTurnLabel(s.to_string());
    if !s.is_ascii() {
        return Err(bad());
    }
    let (digits, suffix) = s.split_at(s.len().saturating_sub(1));
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) || digits.starts_with('0') {
        return Err(bad());
    }
    let side = suffix.chars().next().and_then(Side::from_letter).ok_or_else(bad)?;
    let number = digits.parse().map_err(|_| bad())?;
    Ok((number, side))
}

fn parse_piece(c: char) -> Result<Piece, NotationError> {
    Piece::from_symbol(c).ok_or(NotationError::UnknownPiece(c))
}

fn parse_direction(c: char) -> Result<Direction, NotationError> {
    Direction::from_letter(c).ok_or(NotationError::BadDirection(c))
}

/// Parse `<piece><square><dir>` and check the step stays on the board.
fn parse_step(s: &str) -> Result<(Piece, Pos, Direction), NotationError> {
    let mut chars = s.chars();
    let (Some(p), Some(dir)) = (chars.next(), s.chars().last()) else {
        return Err(NotationError::Malformed(s.to_string()));
    };
    if s.len() != 4 {
        return Err(NotationError::Malformed(s.to_string()));
    }
    let piece = parse_piece(p)?;
    let from = parse_square(&s[1..3])?;
    let dir = parse_direction(dir)?;
    if from.step(dir).is_none() {
        return Err(NotationError::OffBoard(s.to_string()));
    }
    Ok((piece, from, dir))
}

fn parse_setup(s: &str) -> Result<MoveToken, NotationError> {
    let mut parts = s.split(' ');
    let label = parts.next().ok_or(NotationError::Empty)?;
    let (number, side) = parse_turn_label(label)?;
    if number != 1 {
        return Err(NotationError::BadTurnLabel(label.to_string()));
    }

    let mut placements = Vec::new();
    for entry in parts {
        let mut chars = entry.chars();
        let c = chars.next().ok_or_else(|| NotationError::Malformed(s.to_string()))?;
        if entry.len() != 3 {
            return Err(NotationError::Malformed(entry.to_string()));
        }
        placements.push((parse_piece(c)?, parse_square(&entry[1..])?));
    }
    Ok(MoveToken::Setup { side, placements })
}

impl FromStr for MoveToken {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<MoveToken, NotationError> {
        trace!(token = s, "decoding");
        if s.is_empty() {
            return Err(NotationError::Empty);
        }
        if !s.is_ascii() {
            return Err(NotationError::Malformed(s.to_string()));
        }
        if s == "-" {
            return Ok(MoveToken::Pass);
        }
        if s.starts_with(|c: char| c.is_ascii_digit()) {
            return parse_setup(s);
        }

        if let Some(idx) = s.find(['>', '<']) {
            let (piece, from, dir) = parse_step(&s[..idx])?;
            let dest = parse_square(&s[idx + 1..])?;
            return Ok(if s.as_bytes()[idx] == b'>' {
                MoveToken::Push { piece, from, dir, dest }
            } else {
                MoveToken::Pull { piece, from, dir, dest }
            });
        }

        if s.len() == 4 && s.ends_with('x') {
            let piece = parse_piece(s.chars().next().unwrap_or(' '))?;
            let at = parse_square(&s[1..3])?;
            return Ok(MoveToken::Capture { piece, at });
        }

        let (piece, from, dir) = parse_step(s)?;
        Ok(MoveToken::Simple { piece, from, dir })
    }
}

impl fmt::Display for MoveToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveToken::Setup { side, placements } => {
                f.write_str(&turn_label(1, *side))?;
                for (piece, pos) in placements {
                    write!(f, " {}{}", piece.symbol(), square_name(*pos))?;
                }
                Ok(())
            }
            MoveToken::Simple { piece, from, dir } => {
                write!(f, "{}{}{}", piece.symbol(), square_name(*from), dir.letter())
            }
            MoveToken::Push { piece, from, dir, dest } => write!(
                f,
                "{}{}{}>{}",
                piece.symbol(),
                square_name(*from),
                dir.letter(),
                square_name(*dest)
            ),
            MoveToken::Pull { piece, from, dir, dest } => write!(
                f,
                "{}{}{}<{}",
                piece.symbol(),
                square_name(*from),
                dir.letter(),
                square_name(*dest)
            ),
            MoveToken::Capture { piece, at } => write!(f, "{}{}x", piece.symbol(), square_name(*at)),
            MoveToken::Pass => f.write_str("-"),
        }
    }
}

/// Encode a token as text.
pub fn encode(token: &MoveToken) -> String {
    token.to_string()
}

/// Decode one token.
pub fn decode(s: &str) -> Result<MoveToken, NotationError> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PieceKind;

    fn at(row: u8, col: u8) -> Pos {
        Pos::from_row_col(row, col)
    }

    #[test]
    fn test_square_names() {
        assert_eq!(square_name(at(0, 0)), "a8");
        assert_eq!(square_name(at(7, 0)), "a1");
        assert_eq!(square_name(at(7, 7)), "h1");
        assert_eq!(square_name(at(2, 2)), "c6");
        for pos in Pos::all() {
            assert_eq!(parse_square(&square_name(pos)), Ok(pos));
        }
    }

    #[test]
    fn test_parse_square_rejects() {
        assert!(parse_square("i1").is_err());
        assert!(parse_square("a9").is_err());
        assert!(parse_square("a0").is_err());
        assert!(parse_square("a").is_err());
        assert!(parse_square("a10").is_err());
    }

    #[test]
    fn test_decode_simple() {
        let token = decode("Ra2n").unwrap();
        assert_eq!(
            token,
            MoveToken::Simple {
                piece: Piece::new(PieceKind::Rabbit, Side::Gold),
                from: at(6, 0),
                dir: Direction::North,
            }
        );
        assert_eq!(token.squares(), Some((at(6, 0), at(5, 0))));
        assert_eq!(token.step_cost(), 1);
    }

    #[test]
    fn test_decode_push_and_pull() {
        let push = decode("Ed5e>e6").unwrap();
        assert_eq!(
            push,
            MoveToken::Push {
                piece: Piece::new(PieceKind::Elephant, Side::Gold),
                from: at(3, 3),
                dir: Direction::East,
                dest: at(2, 4),
            }
        );
        assert_eq!(push.squares(), Some((at(3, 3), at(3, 4))));
        assert_eq!(push.step_cost(), 2);

        let pull = decode("md4s<c4").unwrap();
        assert_eq!(
            pull,
            MoveToken::Pull {
                piece: Piece::new(PieceKind::Camel, Side::Silver),
                from: at(4, 3),
                dir: Direction::South,
                dest: at(4, 2),
            }
        );
    }

    #[test]
    fn test_decode_capture_and_pass() {
        assert_eq!(
            decode("cc3x").unwrap(),
            MoveToken::Capture { piece: Piece::new(PieceKind::Cat, Side::Silver), at: at(5, 2) }
        );
        assert_eq!(decode("-").unwrap(), MoveToken::Pass);
        assert_eq!(MoveToken::Pass.step_cost(), 0);
    }

    #[test]
    fn test_decode_setup() {
        let token = decode("1s ra7 Eh8").unwrap();
        assert_eq!(
            token,
            MoveToken::Setup {
                side: Side::Silver,
                placements: vec![
                    (Piece::new(PieceKind::Rabbit, Side::Silver), at(1, 0)),
                    (Piece::new(PieceKind::Elephant, Side::Gold), at(0, 7)),
                ],
            }
        );
        assert_eq!(decode("1g").unwrap(), MoveToken::Setup { side: Side::Gold, placements: vec![] });
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert_eq!(decode(""), Err(NotationError::Empty));
        assert_eq!(decode("Xa2n"), Err(NotationError::UnknownPiece('X')));
        assert_eq!(decode("Ra2q"), Err(NotationError::BadDirection('q')));
        assert!(matches!(decode("Ra8n"), Err(NotationError::OffBoard(_))));
        assert!(matches!(decode("Ra2"), Err(NotationError::Malformed(_))));
        assert!(matches!(decode("Ra2nn"), Err(NotationError::Malformed(_))));
        assert!(matches!(decode("Rz2n"), Err(NotationError::BadSquare(_))));
        assert!(matches!(decode("Ed5e>"), Err(NotationError::BadSquare(_))));
        assert!(matches!(decode("2g Ra2"), Err(NotationError::BadTurnLabel(_))));
        assert!(matches!(decode("Ré2n"), Err(NotationError::Malformed(_))));
    }

    #[test]
    fn test_text_roundtrip_every_family() {
        for text in [
            "Ra2n", "rh7s", "Cc3e", "dd6w", "Ed5e>e6", "ed5w<d4", "Hc6x", "rf3x", "-",
            "1g Ra2 Rb2 Ea1", "1s ra7 mg8", "1g",
        ] {
            let token = decode(text).unwrap();
            assert_eq!(encode(&token), text, "roundtrip failed for {}", text);
        }
    }

    #[test]
    fn test_token_roundtrip_fuzz() {
        use rand::prelude::*;

        let mut rng = rand::rng();
        let kinds: Vec<PieceKind> = PieceKind::all().collect();
        let dirs: Vec<Direction> = Direction::all().collect();

        for _ in 0..500 {
            let kind = kinds[rng.random_range(0..kinds.len())];
            let side = if rng.random_bool(0.5) { Side::Gold } else { Side::Silver };
            let piece = Piece::new(kind, side);
            let from = Pos(rng.random_range(0..64));
            let dest = Pos(rng.random_range(0..64));
            let dir = dirs[rng.random_range(0..dirs.len())];
            if from.step(dir).is_none() {
                continue;
            }
            for token in [
                MoveToken::Simple { piece, from, dir },
                MoveToken::Push { piece, from, dir, dest },
                MoveToken::Pull { piece, from, dir, dest },
                MoveToken::Capture { piece, at: from },
            ] {
                let text = encode(&token);
                assert_eq!(decode(&text), Ok(token.clone()), "decode failed for {}", text);
            }
        }
    }

    #[test]
    fn test_turn_labels() {
        assert_eq!(turn_label(2, Side::Gold), "2g");
        assert_eq!(parse_turn_label("2g"), Ok((2, Side::Gold)));
        assert_eq!(parse_turn_label("17s"), Ok((17, Side::Silver)));
        assert!(parse_turn_label("g").is_err());
        assert!(parse_turn_label("2x").is_err());
        assert!(parse_turn_label("02g").is_err());
        assert!(parse_turn_label("").is_err());
    }
}
