//! WASM bindings for arimaa-core
//!
//! Provides a JavaScript-friendly API for the rule engine. Games created
//! here are always untimed; the clock needs threads.

use wasm_bindgen::prelude::*;

use crate::engine::{ChoiceKind, Engine, StepOutcome, WinReason};
use crate::history;
use crate::{GameConfig, IllegalStep, MoveToken, Pos, Side};

/// WASM-friendly wrapper around Engine
#[wasm_bindgen]
pub struct WasmEngine {
    inner: Engine,
}

fn pos(row: u8, col: u8) -> Result<Pos, JsValue> {
    Pos::new(row as i32, col as i32)
        .ok_or_else(|| JsValue::from_str(&IllegalStep::OffBoard(row.saturating_mul(8).saturating_add(col)).to_string()))
}

fn to_js<T: serde::Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}

fn side_code(side: Side) -> u8 {
    match side {
        Side::Gold => 0,
        Side::Silver => 1,
    }
}

#[wasm_bindgen]
impl WasmEngine {
    /// New game from the standard setup
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmEngine {
        WasmEngine { inner: Engine::new(GameConfig::classic()) }
    }

    /// Rebuild a game from move-history text
    #[wasm_bindgen(js_name = fromHistory)]
    pub fn from_history(text: &str) -> Result<WasmEngine, JsValue> {
        history::load_from_str(text, GameConfig::classic())
            .map(|inner| WasmEngine { inner })
            .map_err(|err| JsValue::from_str(&err.to_string()))
    }

    /// Side to move: 0 (gold) or 1 (silver)
    #[wasm_bindgen(js_name = activeSide)]
    pub fn active_side(&self) -> u8 {
        side_code(self.inner.active_side())
    }

    #[wasm_bindgen(js_name = remainingSteps)]
    pub fn remaining_steps(&self) -> u8 {
        self.inner.remaining_steps()
    }

    /// Notation symbol of the piece at a square, or "" if empty
    #[wasm_bindgen(js_name = pieceAt)]
    pub fn piece_at(&self, row: u8, col: u8) -> String {
        pos(row, col)
            .ok()
            .and_then(|p| self.inner.board().get(p))
            .map(|piece| piece.symbol().to_string())
            .unwrap_or_default()
    }

    #[wasm_bindgen(js_name = isFrozen)]
    pub fn is_frozen(&self, row: u8, col: u8) -> bool {
        pos(row, col).is_ok_and(|p| self.inner.board().is_frozen(p))
    }

    #[wasm_bindgen(js_name = isLegal)]
    pub fn is_legal(&self, from_row: u8, from_col: u8, to_row: u8, to_col: u8) -> bool {
        match (pos(from_row, from_col), pos(to_row, to_col)) {
            (Ok(from), Ok(to)) => self.inner.is_legal(from, to),
            _ => false,
        }
    }

    /// Legal steps as [[fromRow, fromCol, toRow, toCol], ...]
    #[wasm_bindgen(js_name = legalSteps)]
    pub fn legal_steps(&self) -> JsValue {
        let steps: Vec<[u8; 4]> = self
            .inner
            .legal_steps()
            .into_iter()
            .map(|(from, to)| [from.row(), from.col(), to.row(), to.col()])
            .collect();
        to_js(&steps)
    }

    /// Attempt a step. Returns { completed, tokens, kind, destinations }
    #[wasm_bindgen(js_name = attemptStep)]
    pub fn attempt_step(&mut self, from_row: u8, from_col: u8, to_row: u8, to_col: u8) -> Result<JsValue, JsValue> {
        let (from, to) = (pos(from_row, from_col)?, pos(to_row, to_col)?);
        let outcome = self
            .inner
            .attempt_step(from, to)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        Ok(to_js(&WasmOutcome::from(outcome)))
    }

    /// Finish a pending push or pull. Returns the recorded tokens
    #[wasm_bindgen(js_name = resolveChoice)]
    pub fn resolve_choice(
        &mut self,
        from_row: u8,
        from_col: u8,
        to_row: u8,
        to_col: u8,
        dest_row: u8,
        dest_col: u8,
    ) -> Result<JsValue, JsValue> {
        let (from, to, dest) = (pos(from_row, from_col)?, pos(to_row, to_col)?, pos(dest_row, dest_col)?);
        let tokens = self
            .inner
            .resolve_choice(from, to, dest)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        Ok(to_js(&token_strings(&tokens)))
    }

    #[wasm_bindgen(js_name = endTurn)]
    pub fn end_turn(&mut self) -> Result<JsValue, JsValue> {
        let tokens = self
            .inner
            .end_turn_early()
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        Ok(to_js(&token_strings(&tokens)))
    }

    pub fn undo(&mut self) -> bool {
        self.inner.undo()
    }

    #[wasm_bindgen(js_name = isGameOver)]
    pub fn is_game_over(&self) -> bool {
        self.inner.is_game_over()
    }

    /// Get game result: "ongoing", "gold_wins", "silver_wins" or "draw"
    pub fn result(&self) -> String {
        match self.inner.outcome() {
            None => "ongoing".to_string(),
            Some(outcome) => match outcome.winner {
                Some(Side::Gold) => "gold_wins".to_string(),
                Some(Side::Silver) => "silver_wins".to_string(),
                None => "draw".to_string(),
            },
        }
    }

    /// How the game ended: "goal", "elimination", "timeout" or ""
    pub fn reason(&self) -> String {
        match self.inner.outcome().map(|outcome| outcome.reason) {
            Some(WinReason::Goal) => "goal".to_string(),
            Some(WinReason::Elimination) => "elimination".to_string(),
            Some(WinReason::Timeout(_)) => "timeout".to_string(),
            None => String::new(),
        }
    }

    /// Move history in file format
    pub fn history(&self) -> String {
        history::history_to_string(&self.inner)
    }
}

impl Default for WasmEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn token_strings(tokens: &[MoveToken]) -> Vec<String> {
    tokens.iter().map(MoveToken::to_string).collect()
}

/// Serializable step outcome for JavaScript
#[derive(serde::Serialize)]
struct WasmOutcome {
    completed: bool,
    tokens: Vec<String>,
    kind: Option<&'static str>,
    destinations: Vec<[u8; 2]>,
}

impl From<StepOutcome> for WasmOutcome {
    fn from(outcome: StepOutcome) -> Self {
        match outcome {
            StepOutcome::Completed(tokens) => WasmOutcome {
                completed: true,
                tokens: token_strings(&tokens),
                kind: None,
                destinations: vec![],
            },
            StepOutcome::ChoiceRequired { kind, destinations } => WasmOutcome {
                completed: false,
                tokens: vec![],
                kind: Some(match kind {
                    ChoiceKind::Push => "push",
                    ChoiceKind::Pull => "pull",
                    ChoiceKind::Both => "both",
                }),
                destinations: destinations.iter().map(|d| [d.row(), d.col()]).collect(),
            },
        }
    }
}
