//! Custom error types for tele-type.
//!
//! This module provides structured error types using `thiserror` so that
//! setup failures, emission failures and configuration problems can be told
//! apart by the binary when it picks an exit code.

use std::io;
use thiserror::Error;

/// Main error type for tele-type operations.
#[derive(Error, Debug)]
pub enum TeleTypeError {
    /// Preparing the run failed before any session started.
    #[error("setup failed while {context}: {reason}")]
    Setup { context: String, reason: String },

    /// The encoded payload contains a character outside the base64 alphabet.
    #[error("invalid payload character {found:?} at position {position}")]
    InvalidPayload { position: usize, found: char },

    /// The automation backend refused a keystroke or key chord.
    #[error("keyboard backend rejected {keys}: {reason}")]
    EmissionFailed { keys: String, reason: String },

    /// The automation backend could not be initialised.
    #[error("keyboard automation unavailable: {0}")]
    EmitterUnavailable(String),

    /// The checkpoint file could not be written or removed.
    #[error("checkpoint '{path}' could not be updated: {reason}")]
    Checkpoint { path: String, reason: String },

    /// Configuration validation error.
    #[error("configuration error: {0}")]
    ConfigValidation(String),

    /// Error reading or parsing configuration file.
    #[error("failed to load config from '{path}': {reason}")]
    ConfigLoad { path: String, reason: String },

    /// Error writing configuration file.
    #[error("failed to save config to '{path}': {reason}")]
    ConfigSave { path: String, reason: String },

    /// Error parsing duration string.
    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    /// Error reading control keys from the terminal.
    #[error("terminal error: {0}")]
    Terminal(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for tele-type operations.
pub type Result<T> = std::result::Result<T, TeleTypeError>;

impl TeleTypeError {
    /// Create a new Setup error.
    pub fn setup(context: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Setup {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a new EmissionFailed error.
    pub fn emission_failed(keys: impl ToString, reason: impl Into<String>) -> Self {
        Self::EmissionFailed {
            keys: keys.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a new Checkpoint error.
    pub fn checkpoint(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Checkpoint {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a new ConfigValidation error.
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation(message.into())
    }

    /// Create a new ConfigLoad error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new ConfigSave error.
    pub fn config_save(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigSave {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new InvalidDuration error.
    pub fn invalid_duration(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a new Terminal error.
    pub fn terminal(message: impl std::fmt::Display) -> Self {
        Self::Terminal(message.to_string())
    }
}
