//! Error types.
//!
//! Rule violations are split by what the caller can do about them:
//! [`IllegalStep`] and [`EngineError::OutOfSteps`] are recoverable (try
//! another action, or end the turn), while [`EngineError::TimeExceeded`]
//! and [`EngineError::GameOver`] end the game.

use crate::clock::Timeout;
use crate::{Piece, PieceKind, Pos, Side};

/// A step the rules do not allow in the current position.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IllegalStep {
    #[error("no piece at {0}")]
    NoPiece(Pos),

    #[error("piece at {pos} belongs to {owner}")]
    NotYourPiece { pos: Pos, owner: Side },

    #[error("{from} and {to} are not orthogonally adjacent")]
    NotAdjacent { from: Pos, to: Pos },

    #[error("piece at {0} is frozen")]
    Frozen(Pos),

    #[error("rabbit at {0} cannot step towards its home row")]
    RabbitRetreat(Pos),

    #[error("{0} is occupied by a friendly piece")]
    FriendlyOccupied(Pos),

    #[error("mover strength {mover} does not exceed target strength {target}")]
    TooWeak { mover: u8, target: u8 },

    #[error("no square to push or pull the piece at {0}")]
    NoPushOrPull(Pos),

    #[error("no push or pull is pending for {from} -> {to}")]
    NoPendingChoice { from: Pos, to: Pos },

    #[error("{0} was not offered as a push or pull destination")]
    DestinationNotOffered(Pos),

    #[error("square index {0} is off the board")]
    OffBoard(u8),
}

/// Errors returned by the rule engine.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("illegal step: {0}")]
    Illegal(#[from] IllegalStep),

    #[error("not enough steps left: {used} of {max} used, {needed} needed")]
    OutOfSteps { used: u8, needed: u8, max: u8 },

    #[error("{0} time exceeded")]
    TimeExceeded(Timeout),

    #[error("the game is over")]
    GameOver,
}

impl EngineError {
    /// Fatal errors end the game; everything else may be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::TimeExceeded(_) | EngineError::GameOver)
    }
}

/// A token that does not follow the move grammar.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum NotationError {
    #[error("empty token")]
    Empty,

    #[error("unknown piece letter '{0}'")]
    UnknownPiece(char),

    #[error("bad square '{0}'")]
    BadSquare(String),

    #[error("bad direction '{0}'")]
    BadDirection(char),

    #[error("step from {0} leaves the board")]
    OffBoard(String),

    #[error("bad turn label '{0}'")]
    BadTurnLabel(String),

    #[error("malformed token '{0}'")]
    Malformed(String),
}

/// A setup placement that breaks the setup rules.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("piece {piece:?} does not belong to {side}")]
    WrongSide { piece: Piece, side: Side },

    #[error("{pos} is outside {side}'s setup rows")]
    OutsideHomeRows { pos: Pos, side: Side },

    #[error("{0} is already occupied")]
    Occupied(Pos),

    #[error("too many {kind:?}: {count} placed, {max} allowed")]
    TooMany { kind: PieceKind, count: u8, max: u8 },
    #[error("setup is closed once play has started")]
    PlayStarted,
}

/// Errors while loading or saving a move-history file.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing setup line for {0}")]
    MissingSetup(Side),

    #[error("invalid setup: {0}")]
    Setup(#[from] SetupError),

    #[error("bad setup line: {0}")]
    Notation(#[from] NotationError),
}

/// Errors while loading a [`GameConfig`](crate::GameConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
