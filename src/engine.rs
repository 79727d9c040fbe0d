//! The emission loop.
//!
//! `EmissionEngine::run` walks the payload one character at a time from a
//! resume cursor. After every successful keystroke the cursor is persisted
//! before anything else happens, so a crash loses at most the character in
//! flight. Control state is read from a `watch` channel between ticks;
//! the engine never writes it.

use crate::checkpoint::CheckpointStore;
use crate::config::Config;
use crate::key_sender::{char_to_emission, KeyEmitter};
use crate::payload::EncodedPayload;
use crate::telemetry::TelemetrySample;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    CountingDown,
    Emitting,
    Finished,
}

/// Control flags shared between the session and the engine.
///
/// Only the session coordinator writes this. `cancelled` and `interrupted`
/// are terminal and never reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunState {
    pub phase: Phase,
    pub paused: bool,
    pub cancelled: bool,
    pub interrupted: bool,
}

impl RunState {
    pub fn started(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn stopping(&self) -> bool {
        self.cancelled || self.interrupted
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionReason {
    Completed,
    Cancelled,
    /// Stopped without cancelling; the checkpoint stays for a later resume.
    Interrupted,
    EmissionFailure { character: char, cause: String },
    CheckpointFailure(String),
    /// The engine could not start, or its thread died.
    Aborted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub final_cursor: usize,
    /// Characters typed during this run.
    pub emitted: usize,
    pub reason: CompletionReason,
}

/// Receives progress as the engine runs.
pub trait ProgressObserver {
    fn progress(&mut self, sample: &TelemetrySample);
    fn paused(&mut self, cursor: usize, total: usize);
}

impl ProgressObserver for () {
    fn progress(&mut self, _sample: &TelemetrySample) {}
    fn paused(&mut self, _cursor: usize, _total: usize) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub tick: Duration,
    pub pause_poll: Duration,
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            tick: config.tick,
            pause_poll: config.pause_poll,
        }
    }
}

pub struct EmissionEngine<E, O> {
    emitter: E,
    observer: O,
    checkpoint: CheckpointStore,
    control: watch::Receiver<RunState>,
    settings: EngineSettings,
}

impl<E: KeyEmitter, O: ProgressObserver> EmissionEngine<E, O> {
    pub fn new(
        emitter: E,
        observer: O,
        checkpoint: CheckpointStore,
        control: watch::Receiver<RunState>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            emitter,
            observer,
            checkpoint,
            control,
            settings,
        }
    }

    /// Type `payload` from `initial_cursor` until it is exhausted, the run is
    /// stopped, or a keystroke or checkpoint write fails. Blocks the calling
    /// thread for the whole run.
    pub fn run(&mut self, payload: &EncodedPayload, initial_cursor: usize) -> RunOutcome {
        let total = payload.len();
        let start = initial_cursor.min(total);
        let mut cursor = start;
        let started = Instant::now();

        info!(cursor, total, tick = ?self.settings.tick, "emission started");

        let finish = |cursor: usize, reason: CompletionReason| {
            info!(cursor, total, ?reason, "emission finished");
            RunOutcome {
                final_cursor: cursor,
                emitted: cursor - start,
                reason,
            }
        };

        loop {
            let state = *self.control.borrow();
            if state.cancelled {
                return finish(cursor, CompletionReason::Cancelled);
            }
            if state.interrupted {
                return finish(cursor, CompletionReason::Interrupted);
            }

            let Some(character) = payload.get(cursor) else {
                return finish(cursor, CompletionReason::Completed);
            };

            if state.paused {
                self.observer.paused(cursor, total);
                thread::sleep(self.settings.pause_poll);
                continue;
            }

            let tick_started = Instant::now();

            if let Err(e) = self.emitter.emit(char_to_emission(character)) {
                error!(cursor, ?character, error = %e, "keystroke failed");
                return finish(
                    cursor,
                    CompletionReason::EmissionFailure {
                        character,
                        cause: e.to_string(),
                    },
                );
            }

            cursor += 1;

            if let Err(e) = self.checkpoint.save(cursor) {
                error!(cursor, error = %e, "checkpoint write failed");
                return finish(cursor, CompletionReason::CheckpointFailure(e.to_string()));
            }

            self.observer
                .progress(&TelemetrySample::sample(started, Instant::now(), cursor, total));

            if cursor % 1000 == 0 {
                debug!(cursor, total, "emission milestone");
            }

            if let Some(rest) = self.settings.tick.checked_sub(tick_started.elapsed()) {
                if !rest.is_zero() {
                    thread::sleep(rest);
                }
            }
        }
    }
}
