//! Replay a JSON-lines delta log through a live set

use anyhow::Context;
use futures::stream;
use serde_json::Value;
use std::path::Path;
use tokio::sync::mpsc;
use xui_live::{
    Document, LiveSet, LiveSetError, LiveSubscription, NotificationPolicy, SinkEvent, TransportError,
};

/// Outcome of a replay
#[derive(Debug, Clone, Default)]
pub struct ReplayReport {
    /// Final contents, in insertion order
    pub documents: Vec<Document>,
    /// Number of snapshots pushed to the sink
    pub snapshots: usize,
    /// Whether `Ready` was seen
    pub ready: bool,
    /// Errors reported to the sink, in order
    pub errors: Vec<LiveSetError>,
}

impl ReplayReport {
    /// Check if replay stopped on a terminal error
    #[must_use]
    pub fn aborted(&self) -> bool {
        self.errors.iter().any(LiveSetError::is_terminal)
    }
}

/// Parse JSON lines into transport items
///
/// Blank lines are skipped. A line that is not JSON becomes a transport
/// error, which ends the replay at that point.
#[must_use]
pub fn parse_lines(text: &str) -> Vec<Result<Value, TransportError>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .map_err(|e| TransportError::new(format!("line {}: {e}", index + 1)))
        })
        .collect()
}

/// Replay in-memory JSON lines
///
/// # Errors
/// Fails if the live set task panics
pub async fn replay_text(text: &str, policy: NotificationPolicy) -> anyhow::Result<ReplayReport> {
    let (tx, mut rx) = mpsc::unbounded_channel::<SinkEvent<Document>>();
    let live_set = LiveSet::new(tx, policy);

    let subscription = LiveSubscription::spawn(live_set, stream::iter(parse_lines(text)));
    let live_set = subscription
        .join()
        .await
        .context("live set task did not finish")?;

    let mut report = ReplayReport {
        documents: live_set.snapshot().to_vec(),
        ready: live_set.is_ready(),
        ..ReplayReport::default()
    };
    drop(live_set);

    while let Some(event) = rx.recv().await {
        match event {
            SinkEvent::Snapshot(_) => report.snapshots += 1,
            SinkEvent::Error(error) => report.errors.push(error),
        }
    }
    tracing::info!(
        documents = report.documents.len(),
        snapshots = report.snapshots,
        errors = report.errors.len(),
        "replay finished"
    );
    Ok(report)
}

/// Replay a JSON-lines file
///
/// # Errors
/// Fails if the file cannot be read
pub async fn replay_file(path: &Path, policy: NotificationPolicy) -> anyhow::Result<ReplayReport> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    replay_text(&text, policy).await
}
