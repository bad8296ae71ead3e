//! Undo ledger: a stack of value snapshots.

use crate::board::Board;
use crate::engine::TurnState;

/// Everything undo needs to put the game back.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Snapshot {
    pub board: Board,
    pub turn: TurnState,
    /// History length at the time of the snapshot.
    pub history_len: usize,
}

/// Last-in first-out store of snapshots.
#[derive(Clone, Debug, Default)]
pub struct UndoLedger {
    stack: Vec<Snapshot>,
}

impl UndoLedger {
    pub fn new() -> UndoLedger {
        UndoLedger::default()
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.stack.push(snapshot);
    }

    pub fn pop(&mut self) -> Option<Snapshot> {
        self.stack.pop()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Piece, PieceKind, Pos, Side};

    #[test]
    fn test_snapshots_are_independent() {
        let mut board = Board::new();
        let mut ledger = UndoLedger::new();
        let turn = TurnState::new(Side::Gold);

        ledger.push(Snapshot { board, turn, history_len: 0 });
        board.set(Pos(10), Some(Piece::new(PieceKind::Cat, Side::Silver)));

        let snap = ledger.pop().unwrap();
        assert!(snap.board.is_empty(Pos(10)));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_lifo_order() {
        let mut ledger = UndoLedger::new();
        for len in 0..3 {
            ledger.push(Snapshot {
                board: Board::new(),
                turn: TurnState::new(Side::Gold),
                history_len: len,
            });
        }
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.pop().map(|s| s.history_len), Some(2));
        assert_eq!(ledger.pop().map(|s| s.history_len), Some(1));
        ledger.clear();
        assert!(ledger.pop().is_none());
    }
}
