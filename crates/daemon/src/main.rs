// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key-value daemon (kvd)
//!
//! Serves the store over HTTP and keeps it durable through the transaction log.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use kv_daemon::{lifecycle, Config, LifecycleError};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "kvd", version, about = "Durable key-value service")]
struct Cli {
    /// TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config and KVD_BIND)
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration: file, then environment, then flags
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_env(|name| std::env::var(name).ok())?;
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    config.validate()?;

    // Set up logging
    let log_guard = setup_logging(&config)?;

    info!("Starting kvd {}", env!("CARGO_PKG_VERSION"));

    let daemon = match lifecycle::startup(&config).await {
        Ok(d) => d,
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let shutdown = daemon.state.shutdown_handle();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
            _ = shutdown.requested() => {}
        }
        shutdown.request();
    });

    info!("Daemon ready, listening on {}", daemon.local_addr()?);

    let report = daemon.serve().await?;
    if report.stopped_on_error {
        error!(
            "Daemon stopped after {} append failure(s); last durable sequence {}",
            report.append_failures, report.last_sequence
        );
        drop(log_guard);
        return Err("transaction log append failed".into());
    }

    info!("Daemon stopped");
    Ok(())
}

/// Write startup error synchronously to the log file, if one is configured.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Some(log_file) = &config.log_file else {
        return;
    };
    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let (non_blocking, guard) = match &config.log_file {
        Some(log_file) => {
            let dir = log_file
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = log_file.file_name().ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("log_file has no file name: {}", log_file.display()),
                )
            })?;

            // Create log directory if needed
            std::fs::create_dir_all(dir)?;
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name))
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    // Set up subscriber with env filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
