//! `bookwright`: markdown volume build pipeline

use clap::Parser;

use bookwright::cli::args::Cli;
use bookwright::cli::commands;
use bookwright::error::{BookwrightError, ExitCode};
use bookwright::observability::init_logging;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version
        Err(e) if !e.use_stderr() => {
            let _ = e.print();
            std::process::exit(ExitCode::SUCCESS);
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(BookwrightError::from(e).exit_code());
        }
    };

    if !cli.quiet {
        if let Err(e) = init_logging(cli.log_format, cli.verbose, cli.color, cli.log_file.as_deref()) {
            eprintln!("error: cannot open log file: {e}");
            std::process::exit(ExitCode::IO_ERROR);
        }
    }

    tokio::spawn(shutdown_on_signal());

    match commands::dispatch(cli).await {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

/// Exits with the conventional code when the build is interrupted.
#[cfg(unix)]
async fn shutdown_on_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
        tracing::warn!("failed to register SIGTERM handler");
        let _ = tokio::signal::ctrl_c().await;
        std::process::exit(ExitCode::INTERRUPTED);
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => std::process::exit(ExitCode::INTERRUPTED),
        _ = sigterm.recv() => std::process::exit(ExitCode::TERMINATED),
    }
}

#[cfg(not(unix))]
async fn shutdown_on_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        std::process::exit(ExitCode::INTERRUPTED);
    }
}
