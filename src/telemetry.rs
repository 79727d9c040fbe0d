//! Throughput, ETA and the progress line.
//!
//! Rates are long-run averages since the run started, not instantaneous
//! speeds: time spent paused drags the average down.

use std::fmt;
use std::time::{Duration, Instant};

/// One derived progress reading. Never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    pub cursor: usize,
    pub total: usize,
    pub percent: f64,
    pub chars_per_minute: u64,
    pub bytes_per_second: u64,
    /// `None` while the rate is still unknown.
    pub eta: Option<Duration>,
}

impl TelemetrySample {
    pub fn sample(started: Instant, now: Instant, cursor: usize, total: usize) -> Self {
        Self::from_elapsed(now.saturating_duration_since(started), cursor, total)
    }

    pub fn from_elapsed(elapsed: Duration, cursor: usize, total: usize) -> Self {
        let percent = if total == 0 {
            100.0
        } else {
            (cursor as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
        };

        let secs = elapsed.as_secs_f64();
        let (chars_per_minute, bytes_per_second) = if secs > 0.0 {
            let per_second = cursor as f64 / secs;
            ((per_second * 60.0) as u64, per_second as u64)
        } else {
            (0, 0)
        };

        let eta = if chars_per_minute == 0 {
            None
        } else {
            let remaining = total.saturating_sub(cursor) as f64;
            Some(Duration::from_secs_f64(
                remaining / (chars_per_minute as f64 / 60.0),
            ))
        };

        Self {
            cursor,
            total,
            percent,
            chars_per_minute,
            bytes_per_second,
            eta,
        }
    }
}

/// Formats an ETA as `HH:MM:SS`, or `unknown`.
pub struct Eta(pub Option<Duration>);

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(eta) => {
                let secs = eta.as_secs();
                write!(
                    f,
                    "{:02}:{:02}:{:02}",
                    secs / 3600,
                    (secs % 3600) / 60,
                    secs % 60
                )
            }
            None => f.write_str("unknown"),
        }
    }
}

/// Fixed-width text bar.
#[derive(Debug, Clone)]
pub struct ProgressBar {
    width: usize,
    done: char,
    ongoing: char,
}

impl Default for ProgressBar {
    fn default() -> Self {
        Self::new(50)
    }
}

impl ProgressBar {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            done: '#',
            ongoing: '.',
        }
    }

    /// `(done, ongoing)` cell counts; done cells are floored.
    pub fn cells(&self, percent: f64) -> (usize, usize) {
        let fraction = (percent / 100.0).clamp(0.0, 1.0);
        let done = ((fraction * self.width as f64).floor() as usize).min(self.width);
        (done, self.width - done)
    }

    pub fn render(&self, percent: f64) -> String {
        let (done, ongoing) = self.cells(percent);
        let mut bar = String::with_capacity(self.width);
        bar.extend(std::iter::repeat(self.done).take(done));
        bar.extend(std::iter::repeat(self.ongoing).take(ongoing));
        bar
    }

    /// The whole progress line, without the leading carriage return.
    pub fn line(&self, sample: &TelemetrySample) -> String {
        format!(
            "[{}] {:.2}% Speed: {} chars/min, Transfer rate: {} bytes/sec, Time remaining: {}",
            self.render(sample.percent),
            sample.percent,
            sample.chars_per_minute,
            sample.bytes_per_second,
            Eta(sample.eta)
        )
    }
}
