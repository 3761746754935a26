//! Per-artifact ingestion: read, parse, hand off to the registry.

use std::path::PathBuf;

use tokio::sync::mpsc;

use owamp_core::report::{parse_summary, MeasurementReport};

/// Suffix powstream uses for completed summary files.
pub const SUMMARY_SUFFIX: &str = ".sum";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A report reached the registry channel.
    Sent,
    /// Unreadable or malformed artifact; the previous value stays visible.
    Skipped,
    ChannelClosed,
}

pub async fn ingest_summary_file(
    idx: usize,
    path: PathBuf,
    out: mpsc::Sender<MeasurementReport>,
) -> IngestOutcome {
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(
                measurement = idx,
                path = %path.display(),
                error = %e,
                "failed read of summary"
            );
            return IngestOutcome::Skipped;
        }
    };

    let summary = match parse_summary(&text) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(
                measurement = idx,
                path = %path.display(),
                error = %e,
                "failed parse of summary"
            );
            return IngestOutcome::Skipped;
        }
    };

    let report = MeasurementReport::new(idx, summary);
    tracing::debug!(
        measurement = idx,
        path = %path.display(),
        ts = report.timestamp_ms(),
        "summary ingested"
    );

    if out.send(report).await.is_err() {
        tracing::warn!(measurement = idx, "registry channel closed, dropping report");
        return IngestOutcome::ChannelClosed;
    }
    IngestOutcome::Sent
}
