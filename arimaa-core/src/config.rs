//! Game configuration: mode, clock limits and setup counts.
//!
//! Configs are plain serde structs, so a front-end can keep them in a JSON
//! file:
//!
//! ```json
//! { "mode": "Timed", "clock": { "max_turn_ms": 60000, "max_total_ms": 1200000, "tick_ms": 500 } }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::PieceKind;

/// Classic games are untimed; timed games run the turn clock.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum GameMode {
    #[default]
    Classic,
    Timed,
}

/// Limits shared by the clock reporters and the engine's timeout check.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub max_turn_ms: u64,
    pub max_total_ms: u64,
    pub tick_ms: u64,
}

impl ClockConfig {
    pub const DEFAULT_MAX_TURN_MS: u64 = 90_000;
    pub const DEFAULT_MAX_TOTAL_MS: u64 = 35 * 60_000;
    pub const DEFAULT_TICK_MS: u64 = 500;

    #[inline]
    pub fn max_turn(&self) -> Duration {
        Duration::from_millis(self.max_turn_ms)
    }

    #[inline]
    pub fn max_total(&self) -> Duration {
        Duration::from_millis(self.max_total_ms)
    }

    #[inline]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        ClockConfig {
            max_turn_ms: Self::DEFAULT_MAX_TURN_MS,
            max_total_ms: Self::DEFAULT_MAX_TOTAL_MS,
            tick_ms: Self::DEFAULT_TICK_MS,
        }
    }
}

/// Pieces each side sets up, per kind.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupCounts {
    pub elephant: u8,
    pub camel: u8,
    pub horse: u8,
    pub dog: u8,
    pub cat: u8,
    pub rabbit: u8,
}

impl SetupCounts {
    /// Expected number of pieces of `kind`.
    pub fn get(&self, kind: PieceKind) -> u8 {
        match kind {
            PieceKind::Elephant => self.elephant,
            PieceKind::Camel => self.camel,
            PieceKind::Horse => self.horse,
            PieceKind::Dog => self.dog,
            PieceKind::Cat => self.cat,
            PieceKind::Rabbit => self.rabbit,
        }
    }

    /// Total pieces per side.
    pub fn total(&self) -> u8 {
        PieceKind::all().map(|kind| self.get(kind)).sum()
    }
}

impl Default for SetupCounts {
    fn default() -> Self {
        SetupCounts {
            elephant: 1,
            camel: 1,
            horse: 2,
            dog: 2,
            cat: 2,
            rabbit: 8,
        }
    }
}

/// Everything an engine needs to know before the first step.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub mode: GameMode,
    pub clock: ClockConfig,
    pub setup_counts: SetupCounts,
}

impl GameConfig {
    /// Untimed game with default counts.
    pub fn classic() -> GameConfig {
        GameConfig::default()
    }

    /// Timed game with the given clock limits.
    pub fn timed(clock: ClockConfig) -> GameConfig {
        GameConfig {
            mode: GameMode::Timed,
            clock,
            ..GameConfig::default()
        }
    }

    #[inline]
    pub fn is_timed(&self) -> bool {
        self.mode == GameMode::Timed
    }

    /// Reject limits the clock cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clock.tick_ms == 0 {
            return Err(ConfigError::Invalid("tick_ms must be positive".to_string()));
        }
        if self.clock.max_turn_ms == 0 || self.clock.max_total_ms == 0 {
            return Err(ConfigError::Invalid("time limits must be positive".to_string()));
        }
        if self.clock.max_turn_ms > self.clock.max_total_ms {
            return Err(ConfigError::Invalid(format!(
                "max_turn_ms ({}) exceeds max_total_ms ({})",
                self.clock.max_turn_ms, self.clock.max_total_ms
            )));
        }
        let total = self.setup_counts.total();
        if total == 0 || total > 16 {
            return Err(ConfigError::Invalid(format!(
                "setup counts must place 1-16 pieces per side, got {}",
                total
            )));
        }
        if self.setup_counts.rabbit == 0 {
            return Err(ConfigError::Invalid("each side needs at least one rabbit".to_string()));
        }
        Ok(())
    }

    /// Parse and validate a JSON config.
    pub fn from_json(text: &str) -> Result<GameConfig, ConfigError> {
        let config: GameConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<GameConfig, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        GameConfig::from_json(&text)
    }
}
