//! Arimaa rule engine.
//!
//! # Board Layout
//!
//! ```text
//!        a  b  c  d  e  f  g  h
//!   8    0  1  2  3  4  5  6  7     row 0 = Silver home row
//!   7    8  9 10 11 12 13 14 15
//!   6   16 17 [X] 19 20 [X] 22 23   [X] = trap square
//!   5   24 25 26 27 28 29 30 31
//!   4   32 33 34 35 36 37 38 39
//!   3   40 41 [X] 43 44 [X] 46 47
//!   2   48 49 50 51 52 53 54 55
//!   1   56 57 58 59 60 61 62 63     row 7 = Gold home row
//! ```
//!
//! A square is packed as `row * 8 + col`. North decreases the row index,
//! so Gold rabbits run north towards row 0 and Silver rabbits run south.
//!
//! # Modules
//!
//! - [`board`]: piece grid, traps, frozen/support facts
//! - [`notation`]: move token codec (`Ra2n`, `Ed4e>f5`, `cc3x`, `-`)
//! - [`engine`]: the step/push/pull state machine
//! - [`ledger`]: undo snapshots
//! - [`clock`]: background turn/total timer for the timed mode
//! - [`history`]: move-history text files
//! - [`config`]: game mode and limits

use serde::{Deserialize, Serialize};

pub mod board;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod ledger;
pub mod notation;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use board::Board;
pub use clock::{ClockEvent, Timeout, TurnClock};
pub use config::{ClockConfig, GameConfig, GameMode, SetupCounts};
pub use engine::{
    ChoiceKind, Engine, GameOutcome, PendingChoice, Phase, Player, PlayerId, StepOutcome, TurnState, WinReason,
};
pub use error::{ConfigError, EngineError, HistoryError, IllegalStep, NotationError, SetupError};
pub use notation::MoveToken;

/// Board edge length.
pub const SIZE: u8 = 8;

/// Steps available to a side in one turn.
pub const MAX_STEPS: u8 = 4;

/// The two sides. Gold moves first.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum Side {
    Gold,
    Silver,
}

impl Side {
    /// Get the opposing side.
    #[inline]
    pub fn opponent(self) -> Side {
        match self {
            Side::Gold => Side::Silver,
            Side::Silver => Side::Gold,
        }
    }

    /// The row this side's officers start on.
    #[inline]
    pub fn home_row(self) -> u8 {
        match self {
            Side::Gold => 7,
            Side::Silver => 0,
        }
    }

    /// The row a rabbit of this side must reach to win.
    #[inline]
    pub fn goal_row(self) -> u8 {
        self.opponent().home_row()
    }

    /// The two rows this side may set up on.
    pub fn setup_rows(self) -> [u8; 2] {
        match self {
            Side::Gold => [6, 7],
            Side::Silver => [0, 1],
        }
    }

    /// Suffix used in turn labels (`2g`, `2s`).
    #[inline]
    pub fn letter(self) -> char {
        match self {
            Side::Gold => 'g',
            Side::Silver => 's',
        }
    }

    /// Parse a turn-label suffix.
    pub fn from_letter(c: char) -> Option<Side> {
        match c {
            'g' => Some(Side::Gold),
            's' => Some(Side::Silver),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Gold => f.write_str("gold"),
            Side::Silver => f.write_str("silver"),
        }
    }
}

/// Piece kind.
///
/// The strength table ranks Dog above Horse. Push and pull legality
/// depends on these exact numbers.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    Elephant,
    Camel,
    Horse,
    Dog,
    Cat,
    Rabbit,
}

impl PieceKind {
    /// Base strength used for freezing and push/pull comparisons.
    #[inline]
    pub const fn strength(self) -> u8 {
        match self {
            PieceKind::Elephant => 6,
            PieceKind::Camel => 5,
            PieceKind::Dog => 4,
            PieceKind::Horse => 3,
            PieceKind::Cat => 2,
            PieceKind::Rabbit => 1,
        }
    }

    /// Uppercase notation letter.
    #[inline]
    pub const fn letter(self) -> char {
        match self {
            PieceKind::Elephant => 'E',
            PieceKind::Camel => 'M',
            PieceKind::Horse => 'H',
            PieceKind::Dog => 'D',
            PieceKind::Cat => 'C',
            PieceKind::Rabbit => 'R',
        }
    }

    /// Parse a notation letter, ignoring case.
    pub fn from_letter(c: char) -> Option<PieceKind> {
        match c.to_ascii_uppercase() {
            'E' => Some(PieceKind::Elephant),
            'M' => Some(PieceKind::Camel),
            'H' => Some(PieceKind::Horse),
            'D' => Some(PieceKind::Dog),
            'C' => Some(PieceKind::Cat),
            'R' => Some(PieceKind::Rabbit),
            _ => None,
        }
    }

    /// All kinds, strongest first.
    pub fn all() -> impl Iterator<Item = PieceKind> {
        [
            PieceKind::Elephant,
            PieceKind::Camel,
            PieceKind::Dog,
            PieceKind::Horse,
            PieceKind::Cat,
            PieceKind::Rabbit,
        ]
        .into_iter()
    }
}

/// A piece on the board.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub side: Side,
}

impl Piece {
    #[inline]
    pub const fn new(kind: PieceKind, side: Side) -> Piece {
        Piece { kind, side }
    }

    #[inline]
    pub const fn strength(self) -> u8 {
        self.kind.strength()
    }

    #[inline]
    pub fn is_rabbit(self) -> bool {
        self.kind == PieceKind::Rabbit
    }

    /// Notation symbol: uppercase for Gold, lowercase for Silver.
    pub fn symbol(self) -> char {
        let c = self.kind.letter();
        match self.side {
            Side::Gold => c,
            Side::Silver => c.to_ascii_lowercase(),
        }
    }

    /// Parse a notation symbol; the case selects the side.
    pub fn from_symbol(c: char) -> Option<Piece> {
        let kind = PieceKind::from_letter(c)?;
        let side = if c.is_ascii_uppercase() { Side::Gold } else { Side::Silver };
        Some(Piece { kind, side })
    }
}

/// Step direction. North decreases the row index.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Row and column delta.
    #[inline]
    pub const fn delta(self) -> (i8, i8) {
        match self {
            Direction::North => (-1, 0),
            Direction::South => (1, 0),
            Direction::East => (0, 1),
            Direction::West => (0, -1),
        }
    }

    pub const fn letter(self) -> char {
        match self {
            Direction::North => 'n',
            Direction::South => 's',
            Direction::East => 'e',
            Direction::West => 'w',
        }
    }

    pub fn from_letter(c: char) -> Option<Direction> {
        match c {
            'n' => Some(Direction::North),
            's' => Some(Direction::South),
            'e' => Some(Direction::East),
            'w' => Some(Direction::West),
            _ => None,
        }
    }

    pub fn all() -> impl Iterator<Item = Direction> {
        [Direction::North, Direction::South, Direction::East, Direction::West].into_iter()
    }
}

/// Square on the 8x8 board (0-63), see the crate docs for the layout.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pos(pub u8);

impl Pos {
    /// Create a position from row and column (0-7 each).
    #[inline]
    pub fn from_row_col(row: u8, col: u8) -> Pos {
        debug_assert!(row < SIZE && col < SIZE);
        Pos(row * SIZE + col)
    }

    /// Checked constructor for coordinates coming from outside the engine.
    pub fn new(row: i32, col: i32) -> Option<Pos> {
        let size = SIZE as i32;
        if (0..size).contains(&row) && (0..size).contains(&col) {
            Some(Pos::from_row_col(row as u8, col as u8))
        } else {
            None
        }
    }

    #[inline]
    pub fn row(self) -> u8 {
        self.0 / SIZE
    }

    #[inline]
    pub fn col(self) -> u8 {
        self.0 % SIZE
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 < SIZE * SIZE
    }

    /// Iterate over all 64 squares.
    pub fn all() -> impl Iterator<Item = Pos> {
        (0..SIZE * SIZE).map(Pos)
    }

    /// The adjacent square in `dir`, or None at the board edge.
    pub fn step(self, dir: Direction) -> Option<Pos> {
        let (dr, dc) = dir.delta();
        Pos::new(self.row() as i32 + dr as i32, self.col() as i32 + dc as i32)
    }

    /// Orthogonal neighbors that lie on the board.
    pub fn neighbors(self) -> impl Iterator<Item = Pos> {
        Direction::all().filter_map(move |dir| self.step(dir))
    }

    /// Direction of an orthogonally adjacent square.
    pub fn direction_to(self, other: Pos) -> Option<Direction> {
        Direction::all().find(|&dir| self.step(dir) == Some(other))
    }
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.row(), self.col())
    }
}
