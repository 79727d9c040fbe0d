//! Keystroke injection.
//!
//! Characters are typed as literal text except the ones that collide with
//! shifted keys on common layouts, which are pressed as explicit key chords
//! so the result does not depend on how the OS maps the text.

use crate::error::{Result, TeleTypeError};
use enigo::{Direction, Enigo, InputError, Key, Keyboard, Settings};
use std::fmt;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Shift,
}

/// What to ask the OS for in order to produce one payload character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionRequest {
    /// Type the character as text.
    Text(char),
    /// Press `base`, optionally holding `modifier`.
    Chord {
        base: char,
        modifier: Option<Modifier>,
    },
}

impl EmissionRequest {
    pub fn is_chord(&self) -> bool {
        matches!(self, Self::Chord { .. })
    }
}

impl fmt::Display for EmissionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(c) => write!(f, "{c}"),
            Self::Chord {
                base,
                modifier: Some(Modifier::Shift),
            } => write!(f, "shift+{base}"),
            Self::Chord {
                base,
                modifier: None,
            } => write!(f, "key {base}"),
        }
    }
}

/// Map a payload character to the request that produces it. Total over
/// every `char`; only `+`, `/` and `=` become chords.
pub fn char_to_emission(c: char) -> EmissionRequest {
    match c {
        '+' => EmissionRequest::Chord {
            base: '=',
            modifier: Some(Modifier::Shift),
        },
        '/' | '=' => EmissionRequest::Chord {
            base: c,
            modifier: None,
        },
        _ => EmissionRequest::Text(c),
    }
}

/// Something that can deliver one request to the focused application.
pub trait KeyEmitter {
    fn emit(&mut self, request: EmissionRequest) -> Result<()>;
}

impl<E: KeyEmitter + ?Sized> KeyEmitter for Box<E> {
    fn emit(&mut self, request: EmissionRequest) -> Result<()> {
        (**self).emit(request)
    }
}

/// `KeyEmitter` backed by the OS input queue via `enigo`.
pub struct KeySender {
    enigo: Enigo,
}

impl KeySender {
    pub fn new() -> Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| TeleTypeError::EmitterUnavailable(e.to_string()))?;
        Ok(Self { enigo })
    }

    fn chord(&mut self, base: char, modifier: Option<Modifier>) -> Result<()> {
        let request = EmissionRequest::Chord { base, modifier };
        let rejected = |e: InputError| TeleTypeError::emission_failed(request, e.to_string());
        let shift = modifier == Some(Modifier::Shift);

        if shift {
            self.enigo.key(Key::Shift, Direction::Press).map_err(rejected)?;
        }

        let clicked = self.enigo.key(Key::Unicode(base), Direction::Click);

        // Release the modifier even when the click failed.
        if shift {
            self.enigo.key(Key::Shift, Direction::Release).map_err(rejected)?;
        }

        clicked.map_err(rejected)
    }
}

impl KeyEmitter for KeySender {
    fn emit(&mut self, request: EmissionRequest) -> Result<()> {
        trace!(%request, "emitting");
        match request {
            EmissionRequest::Text(c) => {
                let mut buf = [0u8; 4];
                self.enigo
                    .text(c.encode_utf8(&mut buf))
                    .map_err(|e| TeleTypeError::emission_failed(request, e.to_string()))
            }
            EmissionRequest::Chord { base, modifier } => self.chord(base, modifier),
        }
    }
}
