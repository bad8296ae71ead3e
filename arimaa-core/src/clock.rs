//! Turn and game clock for the timed mode.
//!
//! Two background reporters tick at `tick_ms`: one for the running turn and
//! one for the whole game. Each sends [`ClockEvent`]s over a channel and
//! stops itself after its timeout fires.
//!
//! Every reporter has a generation number. Cancelling a reporter bumps the
//! generation under the state mutex, and a reporter only emits while
//! holding that mutex with its own generation still current. Once
//! [`TurnClock::start_turn`] returns, no event from an older turn can be
//! sent.
//!
//! A clock built for a classic game is disabled: every call is a no-op and
//! every read returns zero.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{ClockConfig, GameMode};
use crate::Side;

/// Which limit ran out.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum Timeout {
    Turn,
    Total,
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Timeout::Turn => "turn",
            Timeout::Total => "total",
        })
    }
}

/// Messages sent by the reporters.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClockEvent {
    TurnTick { side: Side, elapsed: Duration },
    TotalTick { elapsed: Duration },
    TurnTimeout { side: Side },
    TotalTimeout,
}

#[derive(Debug)]
struct TimerState {
    gold: Duration,
    silver: Duration,
    turn_start: Option<Instant>,
    active: Side,
    turn_gen: u64,
    total_gen: u64,
}

impl TimerState {
    fn new() -> TimerState {
        TimerState {
            gold: Duration::ZERO,
            silver: Duration::ZERO,
            turn_start: None,
            active: Side::Gold,
            turn_gen: 0,
            total_gen: 0,
        }
    }

    fn current_turn(&self) -> Duration {
        self.turn_start.map_or(Duration::ZERO, |start| start.elapsed())
    }

    fn banked(&self, side: Side) -> Duration {
        match side {
            Side::Gold => self.gold,
            Side::Silver => self.silver,
        }
    }

    fn elapsed(&self, side: Side) -> Duration {
        let running = if side == self.active { self.current_turn() } else { Duration::ZERO };
        self.banked(side) + running
    }

    fn total(&self) -> Duration {
        self.gold + self.silver + self.current_turn()
    }

    /// Move the running interval into the active side's total.
    fn fold(&mut self) {
        if let Some(start) = self.turn_start.take() {
            let spent = start.elapsed();
            match self.active {
                Side::Gold => self.gold += spent,
                Side::Silver => self.silver += spent,
            }
        }
    }
}

struct Reporter {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl Reporter {
    /// Wake the thread and wait for it. The caller has already bumped the
    /// generation, so the thread cannot emit on the way out.
    fn cancel(self) {
        let _ = self.stop.send(());
        let _ = self.handle.join();
    }
}

/// Mode-gated timer shared by the engine and the reporters.
pub struct TurnClock {
    enabled: bool,
    config: ClockConfig,
    state: Arc<Mutex<TimerState>>,
    events_tx: Sender<ClockEvent>,
    events_rx: Receiver<ClockEvent>,
    turn_reporter: Option<Reporter>,
    total_reporter: Option<Reporter>,
}

impl TurnClock {
    pub fn new(mode: GameMode, config: ClockConfig) -> TurnClock {
        let (events_tx, events_rx) = unbounded();
        TurnClock {
            enabled: mode == GameMode::Timed,
            config,
            state: Arc::new(Mutex::new(TimerState::new())),
            events_tx,
            events_rx,
            turn_reporter: None,
            total_reporter: None,
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    /// Receiver for reporter events. Every clone sees the same queue.
    pub fn events(&self) -> Receiver<ClockEvent> {
        self.events_rx.clone()
    }

    /// Start the total reporter. Later calls do nothing.
    pub fn start_game(&mut self) {
        if !self.enabled || self.total_reporter.is_some() {
            return;
        }
        let gen = {
            let mut state = self.state.lock();
            state.total_gen += 1;
            state.total_gen
        };
        self.total_reporter = Some(self.spawn_total(gen));
        info!("game clock started");
    }

    /// Bank any running interval, then start timing `side`'s turn.
    pub fn start_turn(&mut self, side: Side) {
        if !self.enabled {
            return;
        }
        let gen = {
            let mut state = self.state.lock();
            state.fold();
            state.active = side;
            state.turn_start = Some(Instant::now());
            state.turn_gen += 1;
            state.turn_gen
        };
        if let Some(old) = self.turn_reporter.take() {
            old.cancel();
        }
        self.turn_reporter = Some(self.spawn_turn(side, gen));
        debug!(%side, "turn clock started");
    }

    /// Bank the running interval and stop the turn reporter.
    pub fn end_turn(&mut self) {
        if !self.enabled {
            return;
        }
        let side = {
            let mut state = self.state.lock();
            state.fold();
            state.turn_gen += 1;
            state.active
        };
        if let Some(old) = self.turn_reporter.take() {
            old.cancel();
        }
        debug!(%side, "turn clock stopped");
    }

    /// Stop both reporters. Safe to call repeatedly.
    pub fn stop_game_timer(&mut self) {
        {
            let mut state = self.state.lock();
            state.fold();
            state.turn_gen += 1;
            state.total_gen += 1;
        }
        let stopped = self.turn_reporter.is_some() || self.total_reporter.is_some();
        if let Some(old) = self.turn_reporter.take() {
            old.cancel();
        }
        if let Some(old) = self.total_reporter.take() {
            old.cancel();
        }
        if stopped {
            info!("game clock stopped");
        }
    }

    /// Stop everything and zero the accumulated times.
    pub fn reset(&mut self) {
        self.stop_game_timer();
        let mut state = self.state.lock();
        let (turn_gen, total_gen) = (state.turn_gen, state.total_gen);
        *state = TimerState::new();
        state.turn_gen = turn_gen;
        state.total_gen = total_gen;
    }

    /// Time spent in the running turn, zero between turns.
    pub fn current_turn_time(&self) -> Duration {
        if !self.enabled {
            return Duration::ZERO;
        }
        self.state.lock().current_turn()
    }

    /// Time spent by both sides, including the running turn.
    pub fn total_time(&self) -> Duration {
        if !self.enabled {
            return Duration::ZERO;
        }
        self.state.lock().total()
    }

    /// Time spent by one side, including its running turn.
    pub fn elapsed(&self, side: Side) -> Duration {
        if !self.enabled {
            return Duration::ZERO;
        }
        self.state.lock().elapsed(side)
    }

    /// The same comparison the reporters make.
    pub fn check_limits(&self) -> Option<Timeout> {
        if !self.enabled {
            return None;
        }
        let state = self.state.lock();
        if state.current_turn() > self.config.max_turn() {
            Some(Timeout::Turn)
        } else if state.total() > self.config.max_total() {
            Some(Timeout::Total)
        } else {
            None
        }
    }

    fn spawn_turn(&self, side: Side, gen: u64) -> Reporter {
        let (stop, stop_rx) = unbounded();
        let state = Arc::clone(&self.state);
        let events = self.events_tx.clone();
        let (tick, max) = (self.config.tick(), self.config.max_turn());

        let handle = thread::spawn(move || loop {
            if !matches!(stop_rx.recv_timeout(tick), Err(RecvTimeoutError::Timeout)) {
                return;
            }
            let guard = state.lock();
            if guard.turn_gen != gen {
                return;
            }
            let elapsed = guard.current_turn();
            if elapsed > max {
                info!(%side, ?elapsed, "turn time exceeded");
                let _ = events.send(ClockEvent::TurnTimeout { side });
                return;
            }
            let _ = events.send(ClockEvent::TurnTick { side, elapsed });
        });
        Reporter { stop, handle }
    }

    fn spawn_total(&self, gen: u64) -> Reporter {
        let (stop, stop_rx) = unbounded();
        let state = Arc::clone(&self.state);
        let events = self.events_tx.clone();
        let (tick, max) = (self.config.tick(), self.config.max_total());

        let handle = thread::spawn(move || loop {
            if !matches!(stop_rx.recv_timeout(tick), Err(RecvTimeoutError::Timeout)) {
                return;
            }
            let guard = state.lock();
            if guard.total_gen != gen {
                return;
            }
            let elapsed = guard.total();
            if elapsed > max {
                info!(?elapsed, "total time exceeded");
                let _ = events.send(ClockEvent::TotalTimeout);
                return;
            }
            let _ = events.send(ClockEvent::TotalTick { elapsed });
        });
        Reporter { stop, handle }
    }
}

impl Drop for TurnClock {
    fn drop(&mut self) {
        self.stop_game_timer();
    }
}

impl fmt::Debug for TurnClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnClock")
            .field("enabled", &self.enabled)
            .field("config", &self.config)
            .field("state", &*self.state.lock())
            .finish()
    }
}
