//! Non-interactive commands for scripts and quick checks.

use std::io::Write;

use anyhow::Context;
use tokio::sync::mpsc;

use sirview_network::{StreamEvent, TransportClient};
use sirview_protocol::SimulationParams;

/// Fetch one batch run and print a summary.
pub async fn run_batch(
    client: &TransportClient,
    params: &SimulationParams,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let run = client
        .run_batch(params)
        .await
        .with_context(|| format!("batch run against {} failed", client.config().base_url))?;

    writeln!(out, "frames: {}", run.len())?;
    if let Some(peak) = run.peak_infected() {
        writeln!(out, "peak infected: {} at step {}", peak.i, peak.step)?;
    }
    if let Some(last) = run.aggregate_stats.last() {
        writeln!(
            out,
            "final (step {}): S={} I={} R={}",
            last.step, last.s, last.i, last.r
        )?;
    }
    Ok(())
}

/// Follow the live stream, printing one line per applied message. Stops
/// after `limit` messages, when the server ends the stream, or on a
/// connection failure (reported as an error).
pub async fn follow_stream(
    client: &TransportClient,
    params: &SimulationParams,
    limit: Option<usize>,
    out: &mut impl Write,
) -> anyhow::Result<usize> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut subscription = client.open_stream(params, move |event| tx.send(event).is_ok());

    let mut printed = 0usize;
    let mut skipped = 0usize;
    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::Opened => {
                tracing::info!(url = %client.config().base_url, "Live stream opened");
            }
            StreamEvent::Message(message) => {
                let s = message.stats;
                writeln!(out, "step {:>6}  S={:<6} I={:<6} R={}", s.step, s.s, s.i, s.r)?;
                printed += 1;
                if limit.is_some_and(|l| printed >= l) {
                    break;
                }
            }
            StreamEvent::Rejected(e) => {
                skipped += 1;
                tracing::warn!(error = %e, "Skipped stream message");
            }
            StreamEvent::Failed(e) => {
                subscription.close();
                return Err(e).context("live stream failed");
            }
            StreamEvent::Ended => break,
        }
    }
    subscription.close();
    tracing::info!(printed, skipped, "Live stream finished");
    Ok(printed)
}

pub async fn health(client: &TransportClient, out: &mut impl Write) -> anyhow::Result<()> {
    let body = client
        .health()
        .await
        .with_context(|| format!("health check against {} failed", client.config().base_url))?;
    writeln!(out, "{}", body.trim())?;
    Ok(())
}
