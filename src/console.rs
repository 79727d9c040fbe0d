//! What the user sees on the terminal.
//!
//! The hotkey listener keeps the terminal in raw mode, so every full line
//! ends in `\r\n` and the progress display rewrites the current line.

use crate::config::Hotkeys;
use crate::engine::ProgressObserver;
use crate::payload::PreparedRun;
use crate::telemetry::{ProgressBar, TelemetrySample};
use colored::Colorize;
use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use std::fmt::Display;
use std::io::{self, Write};

/// Print a full line.
pub fn line(message: impl Display) {
    print!("{message}\r\n");
    let _ = io::stdout().flush();
}

/// Replace the current line without advancing.
pub fn status(message: impl Display) {
    let mut out = io::stdout().lock();
    let _ = queue!(
        out,
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(message)
    );
    let _ = out.flush();
}

/// Finish a rewritten status line so the next message starts fresh.
pub fn end_status() {
    line("");
}

pub fn error(message: impl Display) {
    line(format!("{} {}", "Error:".red().bold(), message));
}

fn kib(bytes: u64) -> f64 {
    bytes as f64 / 1024.0
}

pub fn banner(prepared: &PreparedRun, resume_at: usize) {
    line("Welcome to TeleType!".bold());
    line(format!("SHA-256 of the input file: {}", prepared.content_hash.cyan()));
    line(format!("Path to the input file: {}", prepared.artifacts.input.display()));
    line(format!("Input file size: {:.2} KB", kib(prepared.input_size)));
    line(format!(
        "Full path to Base64 file: {}",
        prepared.artifacts.encoded.display()
    ));
    line(format!("Base64 file size: {:.2} KB", kib(prepared.encoded_size)));
    line(format!(
        "Full path to offset file: {}",
        prepared.artifacts.checkpoint.display()
    ));
    if resume_at > 0 {
        line(
            format!(
                "Resuming at character {} of {}",
                resume_at,
                prepared.payload.len()
            )
            .yellow(),
        );
    }
}

pub fn hotkey_legend(hotkeys: &Hotkeys) {
    line("");
    line("Hotkeys:".bold());
    line(format!("{} - Start printing", hotkeys.start.to_ascii_uppercase()));
    line(format!(
        "{} - Pause/Resume printing",
        hotkeys.pause.to_ascii_uppercase()
    ));
    line(format!(
        "{} - Cancel printing and exit",
        hotkeys.cancel.to_ascii_uppercase()
    ));
    line("Esc - Stop listening for hotkeys, Ctrl+C - Stop and keep progress");
}

/// `ProgressObserver` that draws the bar on the current line.
pub struct ConsoleProgress {
    bar: ProgressBar,
    pause_key: char,
}

impl ConsoleProgress {
    pub fn new(bar_width: usize, pause_key: char) -> Self {
        Self {
            bar: ProgressBar::new(bar_width),
            pause_key,
        }
    }
}

impl ProgressObserver for ConsoleProgress {
    fn progress(&mut self, sample: &TelemetrySample) {
        status(self.bar.line(sample));
    }

    fn paused(&mut self, _cursor: usize, _total: usize) {
        status(format!(
            "Printing paused. Press {} to continue.",
            self.pause_key.to_ascii_uppercase()
        ));
    }
}
