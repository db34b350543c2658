//! Keypad code lock daemon.
//!
//! Scans the keypad over sysfs GPIO lines (or a simulated board with
//! `--demo`), runs the lock policy and appends every outcome to the access
//! log until interrupted.

mod console;
mod demo;
mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use codelock_engine::{CodeLock, CsvAccessLog, LockService, PasswordStore};
use codelock_hardware::{
    IoMultiplexer, LineBus, ScannerHandle,
    devices::AnyLine,
    mock::{MockBoard, MockBoardHandle},
};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use console::ConsoleDisplay;
use settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "codelock")]
#[command(about = "Keypad door-code lock", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run against a simulated board with scripted key presses
    #[arg(long)]
    demo: bool,

    /// Log filter, e.g. `debug` or `codelock_hardware=trace`; overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    info!("Starting codelock v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load(cli.config.as_deref())?;
    let password = PasswordStore::from_config(&settings.lock)
        .load_or_init()
        .context("loading password")?;

    let (bus, board) = open_lines(&settings, cli.demo)?;
    let scanner = IoMultiplexer::new(bus, settings.scanner.clone())?;

    let mut builder = CodeLock::builder(
        settings.lock.clone(),
        password.clone(),
        scanner.indicator_handle(),
    )
    .with_display(ConsoleDisplay::stdout());

    match CsvAccessLog::open(&settings.lock.access_log_file) {
        Ok(log) => builder = builder.with_access_log(log),
        Err(e) => warn!(
            path = %settings.lock.access_log_file.display(),
            error = %e,
            "Access log unavailable, keeping records in memory"
        ),
    }
    if !cli.demo {
        match settings.gpio.open_progress_bar() {
            Ok(Some(bar)) => builder = builder.with_progress_bar(bar),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Progress bar unavailable"),
        }
    }

    let service = LockService::new(builder)?;
    service.attach(&scanner.digits());
    let lock = service.sender();

    let scanner = ScannerHandle::start(scanner);
    let lock_task = tokio::spawn(service.run());
    info!(demo = cli.demo, "Code lock running");

    let demo_done = async {
        match board {
            Some(board) => demo::play(board, demo::script(&password, &settings.lock)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        _ = demo_done => info!("Demo finished"),
        _ = scanner.finished() => error!("Keypad scanner ended, shutting down"),
        signal = tokio::signal::ctrl_c() => {
            signal.context("waiting for shutdown signal")?;
            info!("Received shutdown signal");
        }
    }

    let scan_result = scanner.shutdown_checked().await;
    lock.shutdown();
    match lock_task.await {
        Ok(_) => info!("Code lock stopped"),
        Err(e) => error!(error = %e, "Lock task failed"),
    }
    println!();

    scan_result.context("keypad scanner")
}

fn open_lines(
    settings: &Settings,
    demo: bool,
) -> Result<(LineBus<AnyLine>, Option<MockBoardHandle>)> {
    if demo {
        let (bus, board) = MockBoard::new(settings.scanner.idle_level);
        Ok((bus.map(AnyLine::Mock), Some(board)))
    } else {
        let bus = settings
            .gpio
            .open_bus()
            .context("opening GPIO lines")?;
        Ok((bus.map(AnyLine::Sysfs), None))
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let filter = match &cli.log_level {
        Some(level) => EnvFilter::try_new(level).context("invalid --log-level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let registry = tracing_subscriber::registry().with(filter);
    match &cli.log_file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
    Ok(())
}
