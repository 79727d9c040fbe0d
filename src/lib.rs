//! # TeleType
//!
//! Types the base64 encoding of a file into whichever application has
//! keyboard focus, slowly and one character at a time, the way a person
//! would.
//!
//! ## Features
//!
//! - Start, pause/resume and cancel from single-key hotkeys in the terminal
//! - A countdown before typing begins, to focus the target window
//! - Progress persisted after every character, so a rerun resumes where the
//!   last one stopped
//! - Live progress bar with throughput and time remaining
//! - JSON configuration file support
//!
//! ## Example
//!
//! ```no_run
//! use tele_type::{payload, Config, ConsoleProgress, KeySender, Session, TerminalKeys};
//!
//! # async fn demo() -> tele_type::Result<()> {
//! let config = Config::default();
//! let prepared = payload::prepare("archive.zip")?;
//! let session = Session::new(config.clone(), prepared);
//! let outcome = session
//!     .run(
//!         TerminalKeys::new()?,
//!         KeySender::new,
//!         ConsoleProgress::new(config.bar_width, config.hotkeys.pause),
//!     )
//!     .await?;
//! std::process::exit(outcome.exit_code());
//! # }
//! ```
//!
//! ## Configuration
//!
//! ```json
//! {
//!   "tick": "50ms",
//!   "countdown": "10s",
//!   "hotkeys": { "start": "s", "pause": "p", "cancel": "q" }
//! }
//! ```

pub mod checkpoint;
pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod hotkey;
pub mod key_sender;
pub mod payload;
pub mod session;
pub mod telemetry;

pub use checkpoint::CheckpointStore;
pub use config::Config;
pub use console::ConsoleProgress;
pub use engine::{CompletionReason, EmissionEngine, RunOutcome, RunState};
pub use error::{Result, TeleTypeError};
pub use hotkey::{ControlCommand, KeySource, TerminalKeys};
pub use key_sender::{char_to_emission, EmissionRequest, KeyEmitter, KeySender};
pub use payload::EncodedPayload;
pub use session::{Session, SessionOutcome};
pub use telemetry::{ProgressBar, TelemetrySample};
