//! The rule engine.
//!
//! # Turn flow
//!
//! ```text
//!   AwaitingStep --attempt_step(empty target)----------> AwaitingStep
//!   AwaitingStep --attempt_step(weaker enemy target)---> AwaitingChoice
//!   AwaitingChoice --resolve_choice(destination)-------> AwaitingStep
//!   any --clock limit exceeded-------------------------> GameOver
//! ```
//!
//! A side has [`MAX_STEPS`] steps per turn. A simple step costs one, a push
//! or pull costs two. The turn passes to the opponent as soon as the budget
//! is spent, or when [`Engine::end_turn_early`] pads the rest with passes.
//!
//! Every call that changes the game pushes a [`Snapshot`] first, so
//! [`Engine::undo`] reverses exactly one call. The snapshot stores the
//! history length, which keeps history and ledger in step.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::board::{Board, TRAPS};
use crate::clock::{Timeout, TurnClock};
use crate::config::GameConfig;
use crate::error::{EngineError, IllegalStep, SetupError};
use crate::ledger::{Snapshot, UndoLedger};
use crate::notation::MoveToken;
use crate::{Direction, Piece, PieceKind, Pos, Side, MAX_STEPS};

/// Turn number of the first Gold turn after setup.
pub const FIRST_TURN: u32 = 2;

/// Side to move and steps spent so far.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub struct TurnState {
    pub active: Side,
    pub steps_used: u8,
    /// Label number of the turn: `2g`, `2s`, `3g`, ...
    pub number: u32,
}

impl TurnState {
    pub fn new(active: Side) -> TurnState {
        TurnState { active, steps_used: 0, number: FIRST_TURN }
    }

    #[inline]
    pub fn remaining(&self) -> u8 {
        MAX_STEPS.saturating_sub(self.steps_used)
    }

    /// The next side's turn, numbered the way history lines are.
    fn next(&self) -> TurnState {
        let number = match self.active {
            Side::Gold => self.number,
            Side::Silver => self.number + 1,
        };
        TurnState { active: self.active.opponent(), steps_used: 0, number }
    }
}

/// Which interactions an enemy-occupied target allows.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum ChoiceKind {
    Push,
    Pull,
    Both,
}

/// A push/pull waiting for the caller to pick a destination.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PendingChoice {
    pub from: Pos,
    pub to: Pos,
    pub kind: ChoiceKind,
    /// Empty neighbors of `to` the victim can be pushed to.
    pub push: Vec<Pos>,
    /// Empty neighbors of `from` the mover can retreat to.
    pub pull: Vec<Pos>,
}

impl PendingChoice {
    /// All offered squares; push destinations first.
    pub fn destinations(&self) -> Vec<Pos> {
        self.push.iter().chain(self.pull.iter()).copied().collect()
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Phase {
    AwaitingStep,
    AwaitingChoice(PendingChoice),
    GameOver,
}

/// Result of [`Engine::attempt_step`].
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum StepOutcome {
    /// The step was played. Holds the tokens it appended, captures included.
    /// A retraction completes with no tokens.
    Completed(Vec<MoveToken>),
    /// The target holds a weaker enemy; call [`Engine::resolve_choice`].
    ChoiceRequired { kind: ChoiceKind, destinations: Vec<Pos> },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum WinReason {
    /// A rabbit reached its goal row.
    Goal,
    /// The loser has no rabbits left.
    Elimination,
    /// The loser ran out of time.
    Timeout(Timeout),
}

/// How a finished game ended. `winner` is `None` when both sides lost
/// their last rabbit at once.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub struct GameOutcome {
    pub winner: Option<Side>,
    pub reason: WinReason,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub side: Side,
}

/// A validated step, before it touches the board.
enum Action {
    Simple { piece: Piece, dir: Direction },
    Choice(PendingChoice),
}

/// Arimaa game state and rules.
#[derive(Debug)]
pub struct Engine {
    board: Board,
    turn: TurnState,
    phase: Phase,
    history: Vec<MoveToken>,
    /// Turn label of each history entry, same length as `history`.
    labels: Vec<(u32, Side)>,
    ledger: UndoLedger,
    clock: TurnClock,
    config: GameConfig,
    players: [Player; 2],
    timed_out: Option<(Timeout, Side)>,
}

impl Engine {
    /// New game from the standard setup. Timed games start the clock.
    pub fn new(config: GameConfig) -> Engine {
        Engine::with_board(config, Board::standard())
    }

    /// New game from an arbitrary position, Gold to move.
    pub fn with_board(config: GameConfig, board: Board) -> Engine {
        let mut engine = Engine::empty(config);
        engine.board = board;
        for side in [Side::Gold, Side::Silver] {
            let placements = board.placements(side);
            engine.record(MoveToken::Setup { side, placements }, (1, side));
        }
        engine.start_clock();
        engine
    }

    /// Empty board and history. Pieces go on with [`Engine::place_setup`];
    /// the clock waits for [`Engine::start_clock`].
    pub fn empty(config: GameConfig) -> Engine {
        Engine {
            board: Board::new(),
            turn: TurnState::new(Side::Gold),
            phase: Phase::AwaitingStep,
            history: Vec::new(),
            labels: Vec::new(),
            ledger: UndoLedger::new(),
            clock: TurnClock::new(config.mode, config.clock),
            config,
            players: [
                Player { id: PlayerId(0), side: Side::Gold },
                Player { id: PlayerId(1), side: Side::Silver },
            ],
            timed_out: None,
        }
    }

    /// Replace the default player ids (0 for Gold, 1 for Silver).
    pub fn with_players(mut self, gold: PlayerId, silver: PlayerId) -> Engine {
        self.players = [
            Player { id: gold, side: Side::Gold },
            Player { id: silver, side: Side::Silver },
        ];
        self
    }

    /// Start a fresh game clock and the active side's turn. No-op when
    /// untimed.
    pub fn start_clock(&mut self) {
        self.clock.reset();
        self.clock.start_game();
        self.clock.start_turn(self.turn.active);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn active_side(&self) -> Side {
        self.turn.active
    }

    #[inline]
    pub fn steps_used(&self) -> u8 {
        self.turn.steps_used
    }

    #[inline]
    pub fn remaining_steps(&self) -> u8 {
        self.turn.remaining()
    }

    pub fn turn(&self) -> TurnState {
        self.turn
    }

    pub fn history(&self) -> &[MoveToken] {
        &self.history
    }

    /// History entries with the `(number, side)` of the line they belong to.
    pub fn labelled_history(&self) -> impl Iterator<Item = ((u32, Side), &MoveToken)> + '_ {
        self.labels.iter().copied().zip(self.history.iter())
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn pending_choice(&self) -> Option<&PendingChoice> {
        match &self.phase {
            Phase::AwaitingChoice(choice) => Some(choice),
            _ => None,
        }
    }

    pub fn clock(&self) -> &TurnClock {
        &self.clock
    }

    pub fn players(&self) -> &[Player; 2] {
        &self.players
    }

    pub fn player(&self, side: Side) -> Player {
        match side {
            Side::Gold => self.players[0],
            Side::Silver => self.players[1],
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Number of calls [`Engine::undo`] can still reverse.
    pub fn undo_depth(&self) -> usize {
        self.ledger.len()
    }

    // ========================================================================
    // Steps
    // ========================================================================

    /// Try to move the piece on `from` to the adjacent square `to`.
    ///
    /// Reversing the last step of the current turn retracts it and refunds
    /// its cost. A pending choice is abandoned by a new attempt.
    pub fn attempt_step(&mut self, from: Pos, to: Pos) -> Result<StepOutcome, EngineError> {
        self.ensure_running()?;
        debug!(%from, %to, side = %self.turn.active, used = self.turn.steps_used, "attempt step");

        if matches!(self.phase, Phase::AwaitingChoice(_)) {
            self.phase = Phase::AwaitingStep;
        }
        let staged = self.snapshot();

        if self.turn.steps_used >= MAX_STEPS {
            return Err(EngineError::OutOfSteps {
                used: self.turn.steps_used,
                needed: 1,
                max: MAX_STEPS,
            });
        }

        if let Some(token) = self.retraction(from, to) {
            self.retract(&token);
            self.ledger.push(staged);
            return Ok(StepOutcome::Completed(Vec::new()));
        }

        self.check_time()?;

        match self.classify(from, to)? {
            Action::Simple { piece, dir } => {
                self.board.set(from, None);
                self.board.set(to, Some(piece));
                let tokens = vec![MoveToken::Simple { piece, from, dir }];
                Ok(StepOutcome::Completed(self.finish(staged, 1, tokens)))
            }
            Action::Choice(choice) => {
                debug!(kind = ?choice.kind, push = choice.push.len(), pull = choice.pull.len(), "choice required");
                let outcome = StepOutcome::ChoiceRequired {
                    kind: choice.kind,
                    destinations: choice.destinations(),
                };
                self.phase = Phase::AwaitingChoice(choice);
                Ok(outcome)
            }
        }
    }

    /// Complete the pending push or pull for `from -> to` by picking one of
    /// the offered squares.
    pub fn resolve_choice(
        &mut self,
        from: Pos,
        to: Pos,
        destination: Pos,
    ) -> Result<Vec<MoveToken>, EngineError> {
        self.ensure_running()?;
        let choice = match &self.phase {
            Phase::AwaitingChoice(choice) if choice.from == from && choice.to == to => choice.clone(),
            _ => return Err(IllegalStep::NoPendingChoice { from, to }.into()),
        };
        self.check_time()?;

        let dir = from.direction_to(to).ok_or(IllegalStep::NotAdjacent { from, to })?;
        let (Some(mover), Some(victim)) = (self.board.get(from), self.board.get(to)) else {
            return Err(IllegalStep::NoPiece(from).into());
        };
        let staged = self.snapshot();

        let token = if choice.push.contains(&destination) {
            self.board.set(destination, Some(victim));
            self.board.set(to, Some(mover));
            self.board.set(from, None);
            MoveToken::Push { piece: mover, from, dir, dest: destination }
        } else if choice.pull.contains(&destination) {
            self.board.set(destination, Some(mover));
            self.board.set(from, Some(victim));
            self.board.set(to, None);
            MoveToken::Pull { piece: mover, from, dir, dest: destination }
        } else {
            return Err(IllegalStep::DestinationNotOffered(destination).into());
        };

        self.phase = Phase::AwaitingStep;
        Ok(self.finish(staged, 2, vec![token]))
    }

    /// Pad the rest of the turn with passes and hand over to the opponent.
    pub fn end_turn_early(&mut self) -> Result<Vec<MoveToken>, EngineError> {
        self.ensure_running()?;
        self.check_time()?;
        let staged = self.snapshot();

        let passes = vec![MoveToken::Pass; self.turn.remaining() as usize];
        let label = self.label();
        for token in &passes {
            self.record(token.clone(), label);
        }
        self.ledger.push(staged);
        self.phase = Phase::AwaitingStep;
        self.switch_turn();
        Ok(passes)
    }

    /// Spend one step without moving. No token is recorded.
    pub fn skip_step(&mut self) -> Result<(), EngineError> {
        self.ensure_running()?;
        self.check_time()?;
        let staged = self.snapshot();

        self.turn.steps_used += 1;
        self.ledger.push(staged);
        self.phase = Phase::AwaitingStep;
        if self.turn.steps_used >= MAX_STEPS {
            self.switch_turn();
        }
        Ok(())
    }

    /// Reverse the most recent mutating call. Returns false when there is
    /// nothing to undo or the game ended on time.
    pub fn undo(&mut self) -> bool {
        if self.phase == Phase::GameOver {
            return false;
        }
        let Some(snapshot) = self.ledger.pop() else {
            return false;
        };

        let side_changed = snapshot.turn.active != self.turn.active;
        self.board = snapshot.board;
        self.turn = snapshot.turn;
        self.history.truncate(snapshot.history_len);
        self.labels.truncate(snapshot.history_len);
        self.phase = Phase::AwaitingStep;
        if side_changed {
            self.clock.start_turn(self.turn.active);
        }
        debug!(side = %self.turn.active, used = self.turn.steps_used, history = self.history.len(), "undo");
        true
    }

    /// Whether `attempt_step(from, to)` would be accepted, without changing
    /// anything. A step onto a weaker enemy counts when a push or pull is
    /// possible.
    pub fn is_legal(&self, from: Pos, to: Pos) -> bool {
        if self.phase == Phase::GameOver || self.turn.steps_used >= MAX_STEPS {
            return false;
        }
        self.retraction(from, to).is_some() || self.classify(from, to).is_ok()
    }

    /// Every `(from, to)` pair [`Engine::is_legal`] accepts.
    pub fn legal_steps(&self) -> Vec<(Pos, Pos)> {
        self.board
            .pieces()
            .filter(|(_, piece)| piece.side == self.turn.active)
            .flat_map(|(from, _)| from.neighbors().map(move |to| (from, to)))
            .filter(|&(from, to)| self.is_legal(from, to))
            .collect()
    }

    // ========================================================================
    // Setup
    // ========================================================================

    /// Put `side`'s pieces on its two home rows and record a setup token.
    ///
    /// The batch is checked as a whole before anything is placed.
    pub fn place_setup(&mut self, side: Side, placements: &[(Piece, Pos)]) -> Result<(), SetupError> {
        let started = self.history.iter().any(|token| !matches!(token, MoveToken::Setup { .. }));
        if started || self.phase != Phase::AwaitingStep {
            return Err(SetupError::PlayStarted);
        }
        let mut seen: Vec<Pos> = Vec::with_capacity(placements.len());
        for &(piece, pos) in placements {
            if piece.side != side {
                return Err(SetupError::WrongSide { piece, side });
            }
            if !side.setup_rows().contains(&pos.row()) {
                return Err(SetupError::OutsideHomeRows { pos, side });
            }
            if !self.board.is_empty(pos) || seen.contains(&pos) {
                return Err(SetupError::Occupied(pos));
            }
            seen.push(pos);
        }
        for kind in PieceKind::all() {
            let added = placements.iter().filter(|(piece, _)| piece.kind == kind).count() as u8;
            let count = self.board.count(side, kind) + added;
            let max = self.config.setup_counts.get(kind);
            if count > max {
                return Err(SetupError::TooMany { kind, count, max });
            }
        }

        let staged = self.snapshot();
        for &(piece, pos) in placements {
            self.board.set(pos, Some(piece));
        }
        self.record(MoveToken::Setup { side, placements: placements.to_vec() }, (1, side));
        self.ledger.push(staged);
        info!(%side, pieces = placements.len(), "setup placed");
        Ok(())
    }

    /// Fill `side`'s free home squares with the pieces it is still missing,
    /// in random order.
    pub fn randomize_setup<R: Rng + ?Sized>(&mut self, side: Side, rng: &mut R) -> Result<(), SetupError> {
        let mut scratch = self.board;
        let placements = scratch.randomize_one_side(side, &self.config.setup_counts, rng);
        self.place_setup(side, &placements)
    }

    // ========================================================================
    // Game over
    // ========================================================================

    /// How the game ended, if it has.
    pub fn outcome(&self) -> Option<GameOutcome> {
        if let Some((timeout, loser)) = self.timed_out {
            return Some(GameOutcome {
                winner: Some(loser.opponent()),
                reason: WinReason::Timeout(timeout),
            });
        }
        for side in [Side::Gold, Side::Silver] {
            if self.board.rabbit_on_goal(side) {
                return Some(GameOutcome { winner: Some(side), reason: WinReason::Goal });
            }
        }
        let winner = match (self.board.has_rabbit(Side::Gold), self.board.has_rabbit(Side::Silver)) {
            (true, true) => return None,
            (true, false) => Some(Side::Gold),
            (false, true) => Some(Side::Silver),
            (false, false) => None,
        };
        Some(GameOutcome { winner, reason: WinReason::Elimination })
    }

    pub fn is_game_over(&self) -> bool {
        let over = self.phase == Phase::GameOver || self.outcome().is_some();
        if over {
            debug!(outcome = ?self.outcome(), "game over");
        }
        over
    }

    /// Compare the clock against its limits, ending the game on overrun.
    ///
    /// Every mutating call runs this check. Front-ends can call it when a
    /// timeout event arrives.
    pub fn check_time(&mut self) -> Result<(), EngineError> {
        let Some(timeout) = self.clock.check_limits() else {
            return Ok(());
        };
        warn!(side = %self.turn.active, %timeout, "time exceeded");
        self.phase = Phase::GameOver;
        self.timed_out = Some((timeout, self.turn.active));
        self.clock.stop_game_timer();
        Err(EngineError::TimeExceeded(timeout))
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Start the labelled turn fresh, as a history line does.
    pub(crate) fn begin_turn(&mut self, number: u32, side: Side) {
        let switched = side != self.turn.active;
        self.turn = TurnState { active: side, steps_used: 0, number };
        self.phase = Phase::AwaitingStep;
        if switched {
            self.clock.start_turn(side);
        }
    }

    /// Drop the undo history, e.g. once a loaded setup is in place.
    pub(crate) fn clear_undo(&mut self) {
        self.ledger.clear();
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn ensure_running(&self) -> Result<(), EngineError> {
        if self.phase == Phase::GameOver {
            return Err(EngineError::GameOver);
        }
        Ok(())
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            board: self.board.snapshot(),
            turn: self.turn,
            history_len: self.history.len(),
        }
    }

    #[inline]
    fn label(&self) -> (u32, Side) {
        (self.turn.number, self.turn.active)
    }

    fn record(&mut self, token: MoveToken, label: (u32, Side)) {
        self.history.push(token);
        self.labels.push(label);
    }

    /// Book a completed action: spend steps, run captures, record tokens,
    /// commit the snapshot and switch sides when the budget is gone.
    fn finish(&mut self, staged: Snapshot, cost: u8, mut tokens: Vec<MoveToken>) -> Vec<MoveToken> {
        self.turn.steps_used += cost;
        tokens.extend(self.capture_traps());

        let label = self.label();
        for token in &tokens {
            self.record(token.clone(), label);
        }
        self.ledger.push(staged);
        let text: Vec<String> = tokens.iter().map(MoveToken::to_string).collect();
        debug!(tokens = ?text, used = self.turn.steps_used, "step completed");

        if self.turn.steps_used >= MAX_STEPS {
            self.switch_turn();
        }
        tokens
    }

    /// Remove every trapped piece with no friendly neighbor.
    fn capture_traps(&mut self) -> Vec<MoveToken> {
        let mut captures = Vec::new();
        for trap in TRAPS {
            if self.board.get(trap).is_some() && self.board.count_friendly_neighbors(trap) == 0 {
                if let Some(piece) = self.board.take(trap) {
                    info!(piece = %piece.symbol(), at = %trap, "captured");
                    captures.push(MoveToken::Capture { piece, at: trap });
                }
            }
        }
        captures
    }

    fn switch_turn(&mut self) {
        self.clock.end_turn();
        self.turn = self.turn.next();
        self.clock.start_turn(self.turn.active);
        info!(side = %self.turn.active, number = self.turn.number, "turn switched");
    }

    /// The last token of this turn, if `from -> to` undoes it and the
    /// pieces are still where it left them.
    fn retraction(&self, from: Pos, to: Pos) -> Option<MoveToken> {
        let token = self.history.last()?;
        if self.labels.last() != Some(&self.label()) || token.step_cost() > self.turn.steps_used {
            return None;
        }
        let (origin, target) = token.squares()?;
        if (target, origin) != (from, to) {
            return None;
        }

        let board = &self.board;
        let in_place = match *token {
            MoveToken::Simple { piece, .. } => board.get(target) == Some(piece) && board.is_empty(origin),
            MoveToken::Push { piece, dest, .. } => {
                board.get(target) == Some(piece) && board.get(dest).is_some() && board.is_empty(origin)
            }
            MoveToken::Pull { piece, dest, .. } => {
                board.get(dest) == Some(piece) && board.get(origin).is_some() && board.is_empty(target)
            }
            _ => false,
        };
        in_place.then(|| token.clone())
    }

    fn retract(&mut self, token: &MoveToken) {
        let Some((origin, target)) = token.squares() else {
            return;
        };
        match *token {
            MoveToken::Simple { .. } => {
                let mover = self.board.take(target);
                self.board.set(origin, mover);
            }
            MoveToken::Push { dest, .. } => {
                let mover = self.board.take(target);
                self.board.set(origin, mover);
                let victim = self.board.take(dest);
                self.board.set(target, victim);
            }
            MoveToken::Pull { dest, .. } => {
                let victim = self.board.take(origin);
                self.board.set(target, victim);
                let mover = self.board.take(dest);
                self.board.set(origin, mover);
            }
            _ => return,
        }
        self.history.pop();
        self.labels.pop();
        self.turn.steps_used -= token.step_cost();
        info!(%token, refunded = token.step_cost(), "step retracted");
    }

    /// Validate a step against the current position.
    fn classify(&self, from: Pos, to: Pos) -> Result<Action, EngineError> {
        for pos in [from, to] {
            if !pos.is_valid() {
                return Err(IllegalStep::OffBoard(pos.0).into());
            }
        }
        let piece = self.board.get(from).ok_or(IllegalStep::NoPiece(from))?;
        if piece.side != self.turn.active {
            return Err(IllegalStep::NotYourPiece { pos: from, owner: piece.side }.into());
        }
        let dir = from.direction_to(to).ok_or(IllegalStep::NotAdjacent { from, to })?;
        if self.board.is_frozen(from) {
            return Err(IllegalStep::Frozen(from).into());
        }

        let Some(target) = self.board.get(to) else {
            let retreat = match piece.side {
                Side::Gold => to.row() > from.row(),
                Side::Silver => to.row() < from.row(),
            };
            if piece.is_rabbit() && retreat {
                return Err(IllegalStep::RabbitRetreat(from).into());
            }
            return Ok(Action::Simple { piece, dir });
        };

        if target.side == piece.side {
            return Err(IllegalStep::FriendlyOccupied(to).into());
        }

        let mover = self.board.effective_strength(from);
        let victim = self.board.effective_strength(to);
        if mover <= victim {
            return Err(IllegalStep::TooWeak { mover, target: victim }.into());
        }
        if self.turn.steps_used + 2 > MAX_STEPS {
            return Err(EngineError::OutOfSteps {
                used: self.turn.steps_used,
                needed: 2,
                max: MAX_STEPS,
            });
        }

        let push: Vec<Pos> = to
            .neighbors()
            .filter(|&pos| pos != from && self.board.is_empty(pos))
            .collect();
        let pull: Vec<Pos> = from
            .neighbors()
            .filter(|&pos| pos != to && self.board.is_empty(pos))
            .collect();
        let kind = match (push.is_empty(), pull.is_empty()) {
            (false, false) => ChoiceKind::Both,
            (false, true) => ChoiceKind::Push,
            (true, false) => ChoiceKind::Pull,
            (true, true) => return Err(IllegalStep::NoPushOrPull(to).into()),
        };
        Ok(Action::Choice(PendingChoice { from, to, kind, push, pull }))
    }
}
