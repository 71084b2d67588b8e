//! mockapi: mock HTTP API server.
//!
//! # Architecture Overview
//!
//! ```text
//!   settings.yaml ──▶ config (load, validate) ──▶ lifecycle::Reloader
//!        ▲                                             │
//!        │ poll (-w) / SIGHUP                          ▼
//!   config::watcher                          lifecycle::ListenerRegistry
//!                                                      │ one per listener
//!                                                      ▼
//!   Client ───────────────▶ net::Endpoint ──▶ http::ListenerWorker ──▶ routing::RoutingTable
//!   Client ◀─────────────── status + headers + body (inline | file) ◀──┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use mockapi::config::ConfigWatcher;
use mockapi::http::WorkerOptions;
use mockapi::lifecycle::{signals, ListenerRegistry, Reloader, Shutdown};
use mockapi::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "mockapi", version)]
#[command(about = "Serve mocked HTTP responses described by a YAML settings file", long_about = None)]
struct Cli {
    /// Settings file (.yaml)
    #[arg(short = 'f', long = "file", value_name = "FILE", value_parser = parse_settings_path)]
    file: PathBuf,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,

    /// Reload whenever the settings file changes
    #[arg(short, long)]
    watch: bool,

    /// Also append logs to this file
    #[arg(short = 'l', long = "log-file", value_name = "LOG")]
    log_file: Option<PathBuf>,

    /// Seconds in-flight requests get when a listener stops
    #[arg(long, default_value_t = 5)]
    shutdown_grace_secs: u64,

    /// Serve Prometheus metrics on this address
    #[arg(long, value_name = "ADDR")]
    metrics_address: Option<SocketAddr>,
}

fn parse_settings_path(value: &str) -> Result<PathBuf, String> {
    if value.ends_with(".yaml") {
        Ok(PathBuf::from(value))
    } else {
        Err(format!("settings file must end in .yaml, got {value}"))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    logging::init(cli.verbose, cli.log_file.as_deref())?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), file = %cli.file.display(), "mockapi starting");

    if let Some(addr) = cli.metrics_address {
        metrics::install_exporter(addr)?;
    }

    let options = WorkerOptions {
        shutdown_grace: Duration::from_secs(cli.shutdown_grace_secs),
    };
    let registry = Arc::new(ListenerRegistry::new(options));
    let reloader = Arc::new(Reloader::new(&cli.file, Arc::clone(&registry)));

    // Fail fast: the first document must be valid.
    let report = reloader.reload().await?;
    if report.established.is_empty() && !report.failures.is_empty() {
        tracing::warn!("No listener could be started");
    }
    for info in registry.live() {
        tracing::info!(listener = %info.name, address = %info.local_addr, tls = info.tls, bindings = info.bindings, "Serving");
    }

    let shutdown = Shutdown::new();
    let mut tasks = Vec::new();

    let _watcher = if cli.watch {
        let (watcher, events) = ConfigWatcher::new(&cli.file).run()?;
        tracing::info!(file = %cli.file.display(), "Watching settings file for changes");
        let reloader = Arc::clone(&reloader);
        let listener = shutdown.subscribe();
        tasks.push(tokio::spawn(async move { reloader.watch(events, listener).await }));
        Some(watcher)
    } else {
        None
    };

    tasks.push(tokio::spawn(signals::reload_on_hangup(
        Arc::clone(&reloader),
        shutdown.subscribe(),
    )));

    signals::shutdown_signal().await;
    shutdown.trigger();

    // Background loops first, so no reload races the final teardown.
    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Background task failed");
        }
    }

    let stopped = registry.stop_all().await;
    tracing::info!(stopped, "Shutdown complete");
    Ok(())
}
