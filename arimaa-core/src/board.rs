//! Board state: 64 squares, each empty or holding one piece.
//!
//! The four trap squares are fixed. Everything else the rules need
//! (freezing, friendly support) is derived from orthogonal neighbors.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, trace};

use crate::config::SetupCounts;
use crate::{Piece, PieceKind, Pos, Side, SIZE};

/// The four trap squares: (2,2), (2,5), (5,2), (5,5).
pub const TRAPS: [Pos; 4] = [Pos(18), Pos(21), Pos(42), Pos(45)];

/// Piece grid. Copying a board gives an independent snapshot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Board {
    cells: [Option<Piece>; 64],
}

impl Board {
    /// Create an empty board.
    pub fn new() -> Board {
        Board { cells: [None; 64] }
    }

    /// Standard opening position.
    ///
    /// ```text
    ///   row 0: c c h d d h m e    (silver officers)
    ///   row 1: r r r r r r r r
    ///   row 6: R R R R R R R R
    ///   row 7: E M H D D H C C    (gold officers)
    /// ```
    pub fn standard() -> Board {
        use PieceKind::*;

        let mut board = Board::new();
        let gold_rank = [Elephant, Camel, Horse, Dog, Dog, Horse, Cat, Cat];
        let silver_rank = [Cat, Cat, Horse, Dog, Dog, Horse, Camel, Elephant];

        for col in 0..SIZE {
            board.set(Pos::from_row_col(7, col), Some(Piece::new(gold_rank[col as usize], Side::Gold)));
            board.set(Pos::from_row_col(6, col), Some(Piece::new(Rabbit, Side::Gold)));
            board.set(Pos::from_row_col(1, col), Some(Piece::new(Rabbit, Side::Silver)));
            board.set(Pos::from_row_col(0, col), Some(Piece::new(silver_rank[col as usize], Side::Silver)));
        }
        debug!("standard setup placed");
        board
    }

    /// Get the piece on a square.
    #[inline]
    pub fn get(&self, pos: Pos) -> Option<Piece> {
        self.cells[pos.0 as usize]
    }

    /// Put a piece on a square, or clear it with `None`.
    #[inline]
    pub fn set(&mut self, pos: Pos, piece: Option<Piece>) {
        trace!(%pos, ?piece, "set square");
        self.cells[pos.0 as usize] = piece;
    }

    /// Remove and return the piece on a square.
    #[inline]
    pub fn take(&mut self, pos: Pos) -> Option<Piece> {
        self.cells[pos.0 as usize].take()
    }

    #[inline]
    pub fn is_empty(&self, pos: Pos) -> bool {
        self.get(pos).is_none()
    }

    #[inline]
    pub fn is_trap(&self, pos: Pos) -> bool {
        TRAPS.contains(&pos)
    }

    /// Check if the piece on `pos` is frozen.
    ///
    /// A piece is frozen when at least one orthogonal enemy is strictly
    /// stronger and no orthogonal neighbor is friendly. Empty squares are
    /// never frozen.
    pub fn is_frozen(&self, pos: Pos) -> bool {
        let Some(piece) = self.get(pos) else {
            return false;
        };

        let mut stronger_enemy = false;
        for neighbor in pos.neighbors().filter_map(|n| self.get(n)) {
            if neighbor.side == piece.side {
                return false;
            }
            if neighbor.strength() > piece.strength() {
                stronger_enemy = true;
            }
        }
        stronger_enemy
    }

    /// Number of orthogonal neighbors holding a piece of the same side.
    pub fn count_friendly_neighbors(&self, pos: Pos) -> u8 {
        let Some(piece) = self.get(pos) else {
            return 0;
        };
        pos.neighbors()
            .filter(|&n| self.get(n).is_some_and(|p| p.side == piece.side))
            .count() as u8
    }

    /// Base strength plus friendly support, used for push/pull comparisons.
    pub fn effective_strength(&self, pos: Pos) -> u8 {
        self.get(pos)
            .map_or(0, |piece| piece.strength() + self.count_friendly_neighbors(pos))
    }

    /// Independent copy of the board.
    #[inline]
    pub fn snapshot(&self) -> Board {
        *self
    }

    /// Remove every piece.
    pub fn clear(&mut self) {
        self.cells = [None; 64];
    }

    /// Iterate over occupied squares.
    pub fn pieces(&self) -> impl Iterator<Item = (Pos, Piece)> + '_ {
        Pos::all().filter_map(move |pos| self.get(pos).map(|piece| (pos, piece)))
    }

    /// Pieces of one side, in square order.
    pub fn placements(&self, side: Side) -> Vec<(Piece, Pos)> {
        self.pieces()
            .filter(|(_, piece)| piece.side == side)
            .map(|(pos, piece)| (piece, pos))
            .collect()
    }

    /// Count pieces of a kind for a side.
    pub fn count(&self, side: Side, kind: PieceKind) -> u8 {
        self.pieces()
            .filter(|(_, p)| p.side == side && p.kind == kind)
            .count() as u8
    }

    pub fn has_rabbit(&self, side: Side) -> bool {
        self.pieces().any(|(_, p)| p.side == side && p.is_rabbit())
    }

    /// Check if a rabbit of `side` stands on its goal row.
    pub fn rabbit_on_goal(&self, side: Side) -> bool {
        let row = side.goal_row();
        (0..SIZE).any(|col| {
            self.get(Pos::from_row_col(row, col))
                .is_some_and(|p| p.side == side && p.is_rabbit())
        })
    }

    /// Fill `side`'s empty setup squares with the pieces still missing
    /// relative to `counts`, shuffled.
    ///
    /// Returns the placements made.
    pub fn randomize_one_side<R: Rng + ?Sized>(
        &mut self,
        side: Side,
        counts: &SetupCounts,
        rng: &mut R,
    ) -> Vec<(Piece, Pos)> {
        let mut free: Vec<Pos> = side
            .setup_rows()
            .into_iter()
            .flat_map(|row| (0..SIZE).map(move |col| Pos::from_row_col(row, col)))
            .filter(|&pos| self.is_empty(pos))
            .collect();

        let mut kinds: Vec<PieceKind> = PieceKind::all()
            .flat_map(|kind| {
                let missing = counts.get(kind).saturating_sub(self.count(side, kind));
                std::iter::repeat(kind).take(missing as usize)
            })
            .collect();

        free.shuffle(rng);
        kinds.shuffle(rng);

        let placed: Vec<(Piece, Pos)> = free
            .into_iter()
            .zip(kinds)
            .map(|(pos, kind)| (Piece::new(kind, side), pos))
            .collect();

        for &(piece, pos) in &placed {
            self.set(pos, Some(piece));
        }
        debug!(%side, placed = placed.len(), "randomized setup");
        placed
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Board {
    /// Text diagram with ranks and files; `x` marks empty traps.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in 0..SIZE {
            write!(f, "{} ", SIZE - row)?;
            for col in 0..SIZE {
                let pos = Pos::from_row_col(row, col);
                let c = match self.get(pos) {
                    Some(piece) => piece.symbol(),
                    None if self.is_trap(pos) => 'x',
                    None => '.',
                };
                write!(f, " {}", c)?;
            }
            writeln!(f)?;
        }
        write!(f, "   a b c d e f g h")
    }
}
