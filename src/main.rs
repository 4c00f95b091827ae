mod args;
mod console;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::fs::File;
use std::process::ExitCode;
use std::sync::{Arc, Mutex, mpsc};
use tracing::info;

use copyctl::{ChannelObserver, CopyEngine, TransferOutcome};

use crate::args::Args;
use crate::console::Console;

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(&args)?;

    info!("{} v{} starting", copyctl::APP_NAME, copyctl::VERSION);

    let descriptor = args.descriptor();
    let name = descriptor.display_name();

    let (tx, rx) = mpsc::channel();
    let engine = CopyEngine::new(descriptor, Arc::new(ChannelObserver::new(tx)))
        .with_options(args.transfer_options());
    let control = engine.control();

    // Handle Ctrl+C
    let cancel_handle = control.clone();
    ctrlc::set_handler(move || cancel_handle.request_cancel())
        .context("installing Ctrl+C handler")?;

    let answers = console::spawn_input(control.clone());
    let console = Console::new(args.json, name, control)?;

    let task = engine.spawn().context("starting transfer worker")?;
    console.run(rx, &answers)?;
    let outcome = task
        .join()
        .map_err(|_| anyhow!("transfer worker panicked"))?;

    Ok(exit_code(&outcome))
}

fn exit_code(outcome: &TransferOutcome) -> ExitCode {
    match outcome {
        TransferOutcome::Completed { .. } => ExitCode::SUCCESS,
        TransferOutcome::Failed(_) => ExitCode::from(1),
        TransferOutcome::Cancelled => ExitCode::from(130),
    }
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(args.log_level()))?;

    match &args.log {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}
