//! JSON-lines front end for the ledger.
//!
//! Reads one request per line on stdin and answers on stdout with one
//! response line, followed by a `{"event": ..}` line for every notification
//! the request produced. State is loaded from and saved to the configured
//! file, if any.

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::broadcast;

use token_analytics::config::{Config, ConfigArgs};
use token_analytics::service;
use token_analytics::{persist, BroadcastSink, Ledger, LedgerEvent, SystemTimeSource};

const EVENT_BUFFER: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::build(ConfigArgs::parse())?;

    #[cfg(feature = "trace")]
    token_analytics::logging::init_tracer(config.log.json)
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    let sink = BroadcastSink::new(EVENT_BUFFER);
    let mut events = sink.subscribe();
    let ledger = open_ledger(&config, sink)?;

    run_session(
        &ledger,
        &mut events,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        config.state_path.as_deref(),
    )
    .await?;

    tracing::info!(summary = ?ledger.summary(), "shutting down");
    Ok(())
}

fn open_ledger(config: &Config, sink: BroadcastSink) -> anyhow::Result<Ledger<SystemTimeSource>> {
    if let Some(path) = &config.state_path {
        let loaded = persist::load(path)
            .with_context(|| format!("loading state from {}", path.display()))?;
        if let Some(state) = loaded {
            return Ok(Ledger::from_state(state, SystemTimeSource, sink)?);
        }
    }

    let admin = config
        .admin
        .context("no state file to resume from; an admin identity is required")?;
    tracing::info!(%admin, "starting fresh ledger");
    Ok(Ledger::with_parts(admin, SystemTimeSource, sink)?)
}

/// Serve requests until `input` ends, then save to `state_path`.
///
/// The state is saved even when serving stops on an I/O error.
async fn run_session<R, W>(
    ledger: &Ledger<SystemTimeSource>,
    events: &mut broadcast::Receiver<LedgerEvent>,
    input: R,
    output: W,
    state_path: Option<&Path>,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let served = serve(ledger, events, input, output).await;
    if let Err(e) = &served {
        tracing::error!(error = %e, "request loop stopped");
    }

    if let Some(path) = state_path {
        persist::save(path, &ledger.export_state())
            .with_context(|| format!("saving state to {}", path.display()))?;
    }
    served
}

async fn serve<R, W>(
    ledger: &Ledger<SystemTimeSource>,
    events: &mut broadcast::Receiver<LedgerEvent>,
    input: R,
    mut output: W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.context("reading input")? {
        let out = service::respond_line(ledger, events, &line)?;
        if out.is_empty() {
            continue;
        }
        output.write_all(out.as_bytes()).await?;
        output.flush().await?;
    }
    Ok(())
}
