use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;
use tele_type::config::parse_duration;
use tele_type::{
    console, payload, CheckpointStore, CompletionReason, Config, ConsoleProgress, KeySender,
    Session, SessionOutcome, TerminalKeys,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "teletype",
    about = "Types the base64 encoding of a file into the focused window",
    version
)]
struct Cli {
    /// Path to the input file (any binary file).
    #[arg(short, long)]
    file: PathBuf,

    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Minimum delay between characters, e.g. "50ms".
    #[arg(long, value_parser = parse_duration)]
    tick: Option<Duration>,

    /// Delay before typing starts, in whole seconds, e.g. "10s".
    #[arg(long, value_parser = parse_duration)]
    countdown: Option<Duration>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            std::process::exit(code);
        }
    };

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    init_tracing(config.verbose);

    let code = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")
        .and_then(|runtime| runtime.block_on(run(cli.file, config)))
    {
        Ok(code) => code,
        Err(e) => {
            console::error(format!("{e:#}"));
            1
        }
    };

    std::process::exit(code);
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "tele_type=debug,teletype=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(&path.to_string_lossy())?,
        None => Config::default(),
    };

    if let Some(tick) = cli.tick {
        config.tick = tick;
    }
    if let Some(countdown) = cli.countdown {
        config.countdown = countdown;
    }
    if cli.verbose {
        config.verbose = true;
    }

    config.validate()?;
    Ok(config)
}

async fn run(file: PathBuf, config: Config) -> Result<i32> {
    let prepared = payload::prepare(&file)
        .with_context(|| format!("could not prepare '{}'", file.display()))?;

    let total = prepared.payload.len();
    let resume_at =
        CheckpointStore::new(prepared.artifacts.checkpoint.clone()).load_within(total);

    console::banner(&prepared, resume_at);
    console::hotkey_legend(&config.hotkeys);

    let keys = TerminalKeys::new().context("could not read hotkeys from the terminal")?;
    let observer = ConsoleProgress::new(config.bar_width, config.hotkeys.pause);
    let session = Session::with_cursor(config, prepared, resume_at);

    info!(total, resume_at, "session ready");
    let outcome = session.run(keys, KeySender::new, observer).await?;

    report(&outcome, total);
    Ok(outcome.exit_code())
}

fn report(outcome: &SessionOutcome, total: usize) {
    match outcome {
        SessionOutcome::Finished(run) => match &run.reason {
            CompletionReason::Completed => {
                console::line(format!("Printing completed ({total} characters)").green());
            }
            CompletionReason::Cancelled => {}
            CompletionReason::Interrupted => console::line(format!(
                "Stopped at character {} of {}. Run again to resume.",
                run.final_cursor, total
            )),
            CompletionReason::EmissionFailure { character, cause } => {
                console::error(format!(
                    "could not type character {character:?} at position {}: {cause}",
                    run.final_cursor
                ));
                console::line(format!(
                    "Progress saved at character {}. Run again to resume.",
                    run.final_cursor
                ));
            }
            CompletionReason::CheckpointFailure(cause) => {
                console::error(format!("could not save progress: {cause}"));
            }
            CompletionReason::Aborted(cause) => {
                console::error(format!("printing aborted: {cause}"));
            }
        },
        SessionOutcome::Abandoned => {
            console::line("Hotkeys disabled before printing started, nothing was typed");
        }
        SessionOutcome::ListenerFailed {
            error,
            final_cursor,
        } => {
            console::error(format!("lost hotkey input: {error}"));
            console::line(format!(
                "Progress saved at character {final_cursor}. Run again to resume."
            ));
        }
    }
}
