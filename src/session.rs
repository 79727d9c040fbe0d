//! Session coordination.
//!
//! A `Session` owns the run state and is its only writer. The hotkey
//! listener runs on a blocking thread and sends commands; the countdown is
//! an async task; the engine runs on its own blocking thread and reports
//! back once. The session returns only after the engine has stopped and the
//! listener has released the terminal.

use crate::checkpoint::CheckpointStore;
use crate::config::Config;
use crate::console;
use crate::engine::{
    CompletionReason, EmissionEngine, EngineSettings, Phase, ProgressObserver, RunOutcome,
    RunState,
};
use crate::error::Result;
use crate::hotkey::{self, ControlCommand, KeySource};
use crate::key_sender::KeyEmitter;
use crate::payload::{EncodedPayload, PreparedRun, RunArtifacts};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The run started (or was stopped during the countdown) and ended for
    /// the given reason.
    Finished(RunOutcome),
    /// Hotkeys were switched off before the run started.
    Abandoned,
    /// Reading control keys failed; the run was stopped with its checkpoint kept.
    ListenerFailed { error: String, final_cursor: usize },
}

impl SessionOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Finished(run) => match run.reason {
                CompletionReason::Completed | CompletionReason::Cancelled => 0,
                CompletionReason::Interrupted => 130,
                CompletionReason::EmissionFailure { .. }
                | CompletionReason::CheckpointFailure(_)
                | CompletionReason::Aborted(_) => 1,
            },
            Self::Abandoned => 0,
            Self::ListenerFailed { .. } => 1,
        }
    }
}

#[derive(Debug)]
enum SessionEvent {
    Countdown(u64),
    CountdownElapsed,
    EngineFinished(RunOutcome),
}

enum Flow {
    Continue,
    Finish(SessionOutcome),
}

pub struct Session {
    config: Config,
    artifacts: RunArtifacts,
    payload: EncodedPayload,
    initial_cursor: usize,
    state: watch::Sender<RunState>,
}

impl Session {
    /// Build a session for a prepared run, resuming from its checkpoint.
    pub fn new(config: Config, prepared: PreparedRun) -> Self {
        let store = CheckpointStore::new(prepared.artifacts.checkpoint.clone());
        let initial_cursor = store.load_within(prepared.payload.len());
        Self::with_cursor(config, prepared, initial_cursor)
    }

    /// Build a session that resumes at a cursor the caller already loaded.
    pub fn with_cursor(config: Config, prepared: PreparedRun, initial_cursor: usize) -> Self {
        let (state, _) = watch::channel(RunState::default());
        Self {
            config,
            initial_cursor: initial_cursor.min(prepared.payload.len()),
            artifacts: prepared.artifacts,
            payload: prepared.payload,
            state,
        }
    }

    /// Drive the session until the run finishes, is cancelled, or control is lost.
    ///
    /// `make_emitter` is called on the engine thread, so the emitter itself
    /// need not be `Send`.
    pub async fn run<S, F, E, O>(self, keys: S, make_emitter: F, observer: O) -> Result<SessionOutcome>
    where
        S: KeySource + Send + 'static,
        F: FnOnce() -> Result<E> + Send + 'static,
        E: KeyEmitter,
        O: ProgressObserver + Send + 'static,
    {
        let hotkeys = self.config.hotkeys;
        let (control_tx, mut control_rx) = mpsc::unbounded_channel();
        let mut listener = Some(tokio::task::spawn_blocking(move || {
            let mut keys = keys;
            hotkey::listen(&mut keys, hotkeys, &control_tx)
        }));

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let mut coordinator = Coordinator {
            config: self.config,
            artifacts: self.artifacts,
            initial_cursor: self.initial_cursor,
            state: self.state,
            events: events_tx,
            countdown: None,
            pending: Some((self.payload, make_emitter, observer)),
            listener_error: None,
        };

        let mut listening = true;
        let outcome = loop {
            let flow = tokio::select! {
                command = control_rx.recv(), if listening => match command {
                    Some(command) => coordinator.on_command(command),
                    None => {
                        listening = false;
                        let result = match listener.take() {
                            Some(handle) => join_listener(handle).await,
                            None => Ok(()),
                        };
                        coordinator.on_listener_closed(result)
                    }
                },
                Some(event) = events_rx.recv() => coordinator.on_event(event),
            };

            if let Flow::Finish(outcome) = flow {
                break outcome;
            }
        };

        drop(control_rx);
        if let Some(handle) = listener.take() {
            if let Err(e) = join_listener(handle).await {
                warn!(error = %e, "hotkey listener ended with an error");
            }
        }

        coordinator.finish();
        Ok(outcome)
    }
}

async fn join_listener(handle: JoinHandle<Result<()>>) -> std::result::Result<(), String> {
    match handle.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(format!("hotkey listener task failed: {e}")),
    }
}

struct Coordinator<F, O> {
    config: Config,
    artifacts: RunArtifacts,
    initial_cursor: usize,
    state: watch::Sender<RunState>,
    events: mpsc::UnboundedSender<SessionEvent>,
    countdown: Option<JoinHandle<()>>,
    pending: Option<(EncodedPayload, F, O)>,
    listener_error: Option<String>,
}

impl<F, E, O> Coordinator<F, O>
where
    F: FnOnce() -> Result<E> + Send + 'static,
    E: KeyEmitter,
    O: ProgressObserver + Send + 'static,
{
    fn current(&self) -> RunState {
        *self.state.borrow()
    }

    fn not_started(&self, reason: CompletionReason) -> Flow {
        Flow::Finish(SessionOutcome::Finished(RunOutcome {
            final_cursor: self.initial_cursor,
            emitted: 0,
            reason,
        }))
    }

    fn stop_countdown(&mut self) {
        if let Some(handle) = self.countdown.take() {
            handle.abort();
        }
    }

    fn on_command(&mut self, command: ControlCommand) -> Flow {
        let state = self.current();
        debug!(?command, ?state, "control command");

        match command {
            ControlCommand::Start => {
                if state.started() {
                    debug!("start requested again, ignoring");
                    return Flow::Continue;
                }
                self.state.send_modify(|s| s.phase = Phase::CountingDown);
                self.start_countdown();
                Flow::Continue
            }
            ControlCommand::PauseToggle => {
                if state.phase != Phase::Emitting {
                    console::error("Printing has not started yet");
                    return Flow::Continue;
                }
                let mut paused = false;
                self.state.send_modify(|s| {
                    s.paused = !s.paused;
                    paused = s.paused;
                });
                info!(paused, "pause toggled");
                if paused {
                    console::status("Printing paused");
                } else {
                    console::status("Resuming printing");
                }
                Flow::Continue
            }
            ControlCommand::Cancel => match state.phase {
                Phase::CountingDown if !self.config.cancel_during_countdown => {
                    console::line("Cancelling is only possible once printing has begun");
                    Flow::Continue
                }
                Phase::Idle | Phase::CountingDown => {
                    console::line("Process cancelled");
                    self.stop_countdown();
                    self.state.send_modify(|s| s.cancelled = true);
                    self.not_started(CompletionReason::Cancelled)
                }
                Phase::Emitting | Phase::Finished => {
                    console::end_status();
                    console::line("Process cancelled");
                    self.state.send_modify(|s| s.cancelled = true);
                    Flow::Continue
                }
            },
            ControlCommand::Interrupt => match state.phase {
                Phase::Idle | Phase::CountingDown => {
                    self.stop_countdown();
                    self.state.send_modify(|s| s.interrupted = true);
                    self.not_started(CompletionReason::Interrupted)
                }
                Phase::Emitting | Phase::Finished => {
                    console::end_status();
                    console::line("Stopping, progress is kept");
                    self.state.send_modify(|s| s.interrupted = true);
                    Flow::Continue
                }
            },
            ControlCommand::StopListening => {
                if state.started() {
                    if state.paused {
                        self.state.send_modify(|s| s.paused = false);
                        console::end_status();
                        console::line("Hotkeys disabled, resuming printing until done");
                    } else {
                        console::line("Hotkeys disabled, printing continues until done");
                    }
                    Flow::Continue
                } else {
                    Flow::Finish(SessionOutcome::Abandoned)
                }
            }
            ControlCommand::Unrecognized => Flow::Continue,
        }
    }

    fn on_listener_closed(&mut self, result: std::result::Result<(), String>) -> Flow {
        let state = self.current();
        match result {
            Ok(()) if state.started() => Flow::Continue,
            Ok(()) => Flow::Finish(SessionOutcome::Abandoned),
            Err(e) => {
                error!(error = %e, "hotkey listener failed");
                self.stop_countdown();
                self.state.send_modify(|s| s.interrupted = true);
                if state.phase == Phase::Emitting {
                    self.listener_error = Some(e);
                    Flow::Continue
                } else {
                    Flow::Finish(SessionOutcome::ListenerFailed {
                        error: e,
                        final_cursor: self.initial_cursor,
                    })
                }
            }
        }
    }

    fn on_event(&mut self, event: SessionEvent) -> Flow {
        match event {
            SessionEvent::Countdown(remaining) => {
                console::line(format!("{remaining} seconds remaining..."));
                Flow::Continue
            }
            SessionEvent::CountdownElapsed => {
                self.countdown = None;
                if !self.current().stopping() {
                    self.launch_engine();
                }
                Flow::Continue
            }
            SessionEvent::EngineFinished(run) => {
                console::end_status();
                match self.listener_error.take() {
                    Some(error) => Flow::Finish(SessionOutcome::ListenerFailed {
                        error,
                        final_cursor: run.final_cursor,
                    }),
                    None => Flow::Finish(SessionOutcome::Finished(run)),
                }
            }
        }
    }

    fn start_countdown(&mut self) {
        let seconds = self.config.countdown.as_secs();
        console::line("Printing started...");
        console::line(format!("Printing will start in {seconds} seconds..."));
        info!(seconds, "countdown started");

        let events = self.events.clone();
        self.countdown = Some(tokio::spawn(async move {
            for remaining in (1..=seconds).rev() {
                if events.send(SessionEvent::Countdown(remaining)).is_err() {
                    return;
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            let _ = events.send(SessionEvent::CountdownElapsed);
        }));
    }

    fn launch_engine(&mut self) {
        let Some((payload, make_emitter, observer)) = self.pending.take() else {
            return;
        };
        self.state.send_modify(|s| s.phase = Phase::Emitting);

        let control = self.state.subscribe();
        let store = CheckpointStore::new(self.artifacts.checkpoint.clone());
        let settings = EngineSettings::from(&self.config);
        let initial = self.initial_cursor;
        let events = self.events.clone();

        let engine = tokio::task::spawn_blocking(move || match make_emitter() {
            Ok(emitter) => {
                EmissionEngine::new(emitter, observer, store, control, settings).run(&payload, initial)
            }
            Err(e) => RunOutcome {
                final_cursor: initial,
                emitted: 0,
                reason: CompletionReason::Aborted(e.to_string()),
            },
        });

        let checkpoint = self.artifacts.checkpoint.clone();
        tokio::spawn(async move {
            let outcome = engine.await.unwrap_or_else(|e| RunOutcome {
                final_cursor: CheckpointStore::new(checkpoint).load(),
                emitted: 0,
                reason: CompletionReason::Aborted(format!("emission task failed: {e}")),
            });
            let _ = events.send(SessionEvent::EngineFinished(outcome));
        });
    }

    /// Mark the run finished and remove its artifacts if it was cancelled.
    fn finish(&mut self) {
        self.stop_countdown();
        self.state.send_modify(|s| s.phase = Phase::Finished);

        if self.current().cancelled {
            match self.artifacts.cleanup() {
                Ok(()) => info!("artifacts removed after cancellation"),
                Err(e) => console::error(format!("failed to remove artifacts: {e}")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_outcome(reason: CompletionReason) -> SessionOutcome {
        SessionOutcome::Finished(RunOutcome {
            final_cursor: 0,
            emitted: 0,
            reason,
        })
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(run_outcome(CompletionReason::Completed).exit_code(), 0);
        assert_eq!(run_outcome(CompletionReason::Cancelled).exit_code(), 0);
        assert_eq!(run_outcome(CompletionReason::Interrupted).exit_code(), 130);
        assert_eq!(
            run_outcome(CompletionReason::EmissionFailure {
                character: '+',
                cause: "refused".into()
            })
            .exit_code(),
            1
        );
        assert_eq!(SessionOutcome::Abandoned.exit_code(), 0);
        assert_eq!(
            SessionOutcome::ListenerFailed {
                error: "tty".into(),
                final_cursor: 3
            }
            .exit_code(),
            1
        );
    }

    #[test]
    fn test_run_state_flags() {
        let mut state = RunState::default();
        assert!(!state.started());
        state.phase = Phase::CountingDown;
        assert!(state.started());
        assert!(!state.stopping());
        state.cancelled = true;
        assert!(state.stopping());
    }
}
