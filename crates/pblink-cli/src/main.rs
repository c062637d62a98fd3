mod cli;
mod commands;
mod completions;
mod config;
mod error;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use pblink_storage::paths;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Always log to a daily file; `--verbose` adds stderr.
fn init_logging(verbose: bool) -> Option<WorkerGuard> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,pblink_core=debug".into())
    };

    let writer = paths::resolve_pblink_dir()
        .ok()
        .map(|dir| dir.join("logs"))
        .filter(|dir| std::fs::create_dir_all(dir).is_ok())
        .map(|dir| tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "pblink.log")));
    let (writer, guard) = match writer {
        Some((writer, guard)) => (Some(writer), Some(guard)),
        None => (None, None),
    };

    let file_layer = writer.map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false)
            .with_level(true)
            .with_filter(filter())
    });
    let stderr_layer = verbose.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter())
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .init();
    guard
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let guard = init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        // handle_error exits; flush the log file first.
        drop(guard);
        error::handle_error(err);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::CliConfig::load();
    let format = cli.format;

    match cli.command {
        Commands::Completions { shell } => {
            completions::generate_completions(shell);
            Ok(())
        }
        Commands::Plan(args) => commands::plan::run(args, format),
        Commands::Probe => commands::probe::run(format).await,
        Commands::Link(args) => {
            let storage = commands::open_storage(cli.db_path, &config)?;
            commands::link::run(storage, args, &config, format).await
        }
        Commands::Auth { command } => {
            let storage = commands::open_storage(cli.db_path, &config)?;
            commands::auth::run(storage, command, &config, format).await
        }
        Commands::Runs { limit } => {
            let storage = commands::open_storage(cli.db_path, &config)?;
            commands::runs::run(storage, limit, format)
        }
    }
}
