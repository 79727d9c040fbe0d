//! Run configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config file.
//! Durations are written as human strings (`"50ms"`, `"10s"`, `"2m"`, or bare
//! milliseconds).

use crate::error::{Result, TeleTypeError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

/// Keys that drive a session. Matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hotkeys {
    pub start: char,
    pub pause: char,
    pub cancel: char,
}

impl Default for Hotkeys {
    fn default() -> Self {
        Self {
            start: 's',
            pause: 'p',
            cancel: 'q',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum delay between two typed characters.
    #[serde(
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub tick: Duration,

    /// Time given to focus the target window after the start key.
    #[serde(
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub countdown: Duration,

    /// How often a paused run re-checks its state.
    #[serde(
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub pause_poll: Duration,

    pub bar_width: usize,
    pub hotkeys: Hotkeys,
    pub cancel_during_countdown: bool,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(50),
            countdown: Duration::from_secs(10),
            pause_poll: Duration::from_secs(1),
            bar_width: 50,
            hotkeys: Hotkeys::default(),
            cancel_during_countdown: true,
            verbose: false,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TeleTypeError::config_load(path, e.to_string()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| TeleTypeError::config_load(path, e.to_string()))?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| TeleTypeError::config_save(path, e.to_string()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.bar_width == 0 {
            return Err(TeleTypeError::config_validation(
                "bar_width must be at least 1",
            ));
        }
        if self.pause_poll.is_zero() {
            return Err(TeleTypeError::config_validation(
                "pause_poll must be greater than zero",
            ));
        }
        if self.countdown.subsec_nanos() != 0 {
            return Err(TeleTypeError::config_validation(
                "countdown must be a whole number of seconds",
            ));
        }

        let keys = [self.hotkeys.start, self.hotkeys.pause, self.hotkeys.cancel];
        if keys.iter().any(|k| k.is_control() || k.is_whitespace()) {
            return Err(TeleTypeError::config_validation(
                "hotkeys must be printable characters",
            ));
        }
        let lowered: Vec<char> = keys.iter().map(|k| k.to_ascii_lowercase()).collect();
        if lowered[0] == lowered[1] || lowered[0] == lowered[2] || lowered[1] == lowered[2] {
            return Err(TeleTypeError::config_validation(format!(
                "hotkeys must be distinct (start '{}', pause '{}', cancel '{}')",
                self.hotkeys.start, self.hotkeys.pause, self.hotkeys.cancel
            )));
        }

        Ok(())
    }
}

/// Parse a duration such as `500ms`, `2s`, `1m` or a bare millisecond count.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let trimmed = value.trim().to_lowercase();
    if trimmed.is_empty() {
        return Err(TeleTypeError::invalid_duration(value, "empty string"));
    }

    let (digits, scale_ms) = if let Some(rest) = trimmed.strip_suffix("ms") {
        (rest, 1)
    } else if let Some(rest) = trimmed.strip_suffix('s') {
        (rest, 1_000)
    } else if let Some(rest) = trimmed.strip_suffix('m') {
        (rest, 60_000)
    } else {
        (trimmed.as_str(), 1)
    };

    let amount: u64 = digits
        .trim()
        .parse()
        .map_err(|_| TeleTypeError::invalid_duration(value, "expected a non-negative number"))?;

    amount
        .checked_mul(scale_ms)
        .map(Duration::from_millis)
        .ok_or_else(|| TeleTypeError::invalid_duration(value, "duration is too large"))
}

/// Render a duration in the same format `parse_duration` accepts.
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms != 0 && ms % 60_000 == 0 {
        format!("{}m", ms / 60_000)
    } else if ms != 0 && ms % 1_000 == 0 {
        format!("{}s", ms / 1_000)
    } else {
        format!("{ms}ms")
    }
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_duration(*duration))
}

fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_duration(&value).map_err(serde::de::Error::custom)
}
