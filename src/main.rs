//! `fogmap`: fog-of-war map rendering worker.
//!
//! Reads commands and interactive-surface inputs on stdin, runs them through
//! the host and the isolated render worker, and writes events to stdout.
//! Logs go to stderr.

mod config;
mod host;
mod loader;
#[cfg(test)]
mod testing;
mod transport;
mod worker;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::config::WorkerConfig;
use crate::host::Host;
use crate::loader::HttpSource;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(2);
        }
    };
    let source = match HttpSource::new(config.timeouts) {
        Ok(source) => source,
        Err(e) => {
            tracing::error!(error = %e, "image source unavailable");
            std::process::exit(1);
        }
    };

    let (events_tx, events_rx) = mpsc::channel(config.event_queue_capacity);
    let (commands, worker) = worker::spawn_worker(config, Arc::new(source), events_tx.clone());
    let writer = tokio::spawn(transport::write_events(config.wire, events_rx, tokio::io::stdout()));

    tracing::info!(wire = ?config.wire, correction = ?config.correction, "fogmap ready");
    let mut host = Host::new(commands, events_tx);
    if let Err(e) = transport::read_inbound(config.wire, tokio::io::stdin(), &mut host).await {
        tracing::error!(error = %e, "failed reading stdin");
    }

    // Closing the command queue lets the worker drain and stop, which in turn
    // closes the event stream.
    drop(host);
    if let Err(e) = worker.await {
        tracing::error!(error = %e, "render worker panicked");
    }
    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "failed writing stdout"),
        Err(e) => tracing::error!(error = %e, "event writer panicked"),
    }
}
