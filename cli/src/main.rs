//! CLI entrypoint for huddle
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use huddle_application::{
    MemoryStateStore, NoSessionEventLogger, RunSessionUseCase, RunSurveyInput,
    SessionEventLogger, SessionOutcome, SessionStateStore, SurveyCommand,
};
use huddle_domain::{SessionId, StudentId};
use huddle_infrastructure::{
    ConfigLoader, FileConfig, HttpSessionService, JsonFileStateStore, JsonlSessionEventLogger,
};
use huddle_presentation::{Cli, ConsoleFormatter, ConsoleReporter, spawn_stdin_reader};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Install the tracing subscriber; the guard must live until exit
fn init_logging(verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "huddle.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

/// File config with command-line overrides applied
fn resolve_config(cli: &Cli) -> Result<FileConfig> {
    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?
    };

    if let Some(server) = &cli.server {
        config.server.base_url = server.clone();
    }
    if let Some(dir) = &cli.state_dir {
        config.storage.state_dir = Some(dir.clone());
        config.storage.ephemeral = false;
    }
    if cli.ephemeral {
        config.storage.ephemeral = true;
    }
    if let Some(path) = &cli.event_log {
        config.logging.event_log = Some(path.clone());
    }
    if let Some(dir) = &cli.log_dir {
        config.logging.log_dir = Some(dir.clone());
    }

    let issues = config.validate();
    for issue in &issues {
        if issue.is_error() {
            eprintln!("{} {}", "error:".red().bold(), issue);
        } else {
            eprintln!("{} {}", "warning:".yellow().bold(), issue);
        }
    }
    if issues.iter().any(|i| i.is_error()) {
        bail!("Invalid configuration");
    }
    Ok(config)
}

async fn run_session<T: SessionStateStore + 'static>(
    service: Arc<HttpSessionService>,
    store: Arc<T>,
    config: &FileConfig,
    input: RunSurveyInput,
    quiet: bool,
) -> Result<SessionOutcome> {
    let logger: Arc<dyn SessionEventLogger> = match &config.logging.event_log {
        Some(path) => match JsonlSessionEventLogger::new(path) {
            Some(logger) => Arc::new(logger),
            None => {
                warn!("Session events will not be recorded");
                Arc::new(NoSessionEventLogger)
            }
        },
        None => Arc::new(NoSessionEventLogger),
    };

    let use_case = RunSessionUseCase::new(service, store, config.timing.to_session_timing())
        .with_notifier(Arc::new(ConsoleReporter::new(quiet)))
        .with_event_logger(logger);

    let (tx, mut commands) = mpsc::unbounded_channel::<SurveyCommand>();
    spawn_stdin_reader(tx).context("Failed to start the input reader")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let outcome = use_case.execute(input, &mut commands, &cancel).await;
    cancel.cancel();
    Ok(outcome?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(());
    }

    let config = resolve_config(&cli)?;
    let log_guard = init_logging(cli.verbose, config.logging.log_dir.as_deref());

    info!("Starting huddle");

    let (Some(session), Some(student)) = (cli.session.as_deref(), cli.student.as_deref()) else {
        bail!("Session and student ids are required. Run with --help for usage.");
    };
    let input = RunSurveyInput::new(
        SessionId::new(session).context("Invalid session id")?,
        StudentId::new(student).context("Invalid student id")?,
        cli.level.clone(),
    );

    // === Dependency Injection ===
    let service = Arc::new(
        HttpSessionService::new(&config.server.base_url, config.server.timeout())
            .context("Failed to create the session service client")?,
    );

    if !cli.quiet {
        println!("{}", ConsoleFormatter::header("Huddle"));
        println!("Session: {}  Student: {}", session, student);
        println!();
    }

    let outcome = if config.storage.ephemeral {
        let store = Arc::new(MemoryStateStore::new());
        run_session(service, store, &config, input, cli.quiet).await?
    } else {
        let root = match &config.storage.state_dir {
            Some(dir) => dir.clone(),
            None => JsonFileStateStore::default_dir()
                .context("No data directory on this platform; use --state-dir or --ephemeral")?,
        };
        info!("Phase snapshots in {}", root.display());
        let store = Arc::new(JsonFileStateStore::new(root));
        run_session(service, store, &config, input, cli.quiet).await?
    };

    println!("{}", ConsoleFormatter::outcome(&outcome));

    // The input thread may still be blocked on stdin
    drop(log_guard);
    std::process::exit(0);
}
