//! Control keys read from the controlling terminal.
//!
//! The listener runs on a blocking thread, turns raw keypresses into
//! `ControlCommand`s and forwards them to the session. It stops on Esc, on
//! an input error, or once the session stops listening.

use crate::config::Hotkeys;
use crate::error::{Result, TeleTypeError};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// How long one read waits before re-checking whether anyone is listening.
pub const LISTENER_POLL: Duration = Duration::from_millis(100);

/// A single keypress, reduced to what the session cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    Escape,
    CtrlC,
    Other,
}

/// Yields keypresses. `next_key` blocks for at most `timeout` and returns
/// `None` when nothing was pressed in that window.
pub trait KeySource {
    fn next_key(&mut self, timeout: Duration) -> Result<Option<KeyInput>>;
}

/// `KeySource` over the process terminal. Holds raw mode until dropped.
pub struct TerminalKeys {
    _raw: (),
}

impl TerminalKeys {
    pub fn new() -> Result<Self> {
        terminal::enable_raw_mode().map_err(TeleTypeError::terminal)?;
        debug!("terminal raw mode enabled");
        Ok(Self { _raw: () })
    }
}

impl Drop for TerminalKeys {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            eprintln!("Failed to restore terminal mode: {}", e);
        }
    }
}

impl KeySource for TerminalKeys {
    fn next_key(&mut self, timeout: Duration) -> Result<Option<KeyInput>> {
        if !event::poll(timeout).map_err(TeleTypeError::terminal)? {
            return Ok(None);
        }
        match event::read().map_err(TeleTypeError::terminal)? {
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(key_input(key))),
            _ => Ok(None),
        }
    }
}

fn key_input(key: KeyEvent) -> KeyInput {
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('C')
            if key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            KeyInput::CtrlC
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => KeyInput::Char(c),
        KeyCode::Esc => KeyInput::Escape,
        _ => KeyInput::Other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    PauseToggle,
    Cancel,
    /// Stop the run but keep its checkpoint.
    Interrupt,
    StopListening,
    Unrecognized,
}

impl Hotkeys {
    pub fn translate(&self, key: KeyInput) -> ControlCommand {
        match key {
            KeyInput::Char(c) => {
                let c = c.to_ascii_lowercase();
                if c == self.start.to_ascii_lowercase() {
                    ControlCommand::Start
                } else if c == self.pause.to_ascii_lowercase() {
                    ControlCommand::PauseToggle
                } else if c == self.cancel.to_ascii_lowercase() {
                    ControlCommand::Cancel
                } else {
                    ControlCommand::Unrecognized
                }
            }
            KeyInput::Escape => ControlCommand::StopListening,
            KeyInput::CtrlC => ControlCommand::Interrupt,
            KeyInput::Other => ControlCommand::Unrecognized,
        }
    }
}

/// Read keys until Esc, an input error, or the receiver goes away.
/// Unrecognized keys are dropped here.
pub fn listen<S: KeySource>(
    source: &mut S,
    hotkeys: Hotkeys,
    commands: &mpsc::UnboundedSender<ControlCommand>,
) -> Result<()> {
    while !commands.is_closed() {
        let Some(key) = source.next_key(LISTENER_POLL)? else {
            continue;
        };

        let command = hotkeys.translate(key);
        trace!(?key, ?command, "key pressed");

        match command {
            ControlCommand::Unrecognized => {}
            ControlCommand::StopListening => {
                let _ = commands.send(command);
                break;
            }
            _ => {
                if commands.send(command).is_err() {
                    break;
                }
            }
        }
    }

    debug!("hotkey listener stopped");
    Ok(())
}
