//! Latest-report registry.
//!
//! All workers feed one channel; a single collector task drains it and
//! overwrites the entry for the report's measurement. Scrapes render the
//! whole map under the same lock, so a reader never sees a half-applied
//! report set.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use owamp_core::histogram::{fmt_exp, write_prometheus, write_victoria, HistogramEncoding};
use owamp_core::report::MeasurementReport;

use crate::config::MeasurementConfig;

pub struct Registry {
    measurements: Arc<[MeasurementConfig]>,
    encoding: HistogramEncoding,
    reports: Mutex<BTreeMap<usize, MeasurementReport>>,
}

impl Registry {
    pub fn new(measurements: Arc<[MeasurementConfig]>, encoding: HistogramEncoding) -> Self {
        Self {
            measurements,
            encoding,
            reports: Mutex::new(BTreeMap::new()),
        }
    }

    /// Build the registry and start its collector. Capacity 1 keeps
    /// producers in lockstep with the collector.
    pub fn spawn(
        measurements: Arc<[MeasurementConfig]>,
        encoding: HistogramEncoding,
    ) -> (Arc<Self>, mpsc::Sender<MeasurementReport>) {
        let registry = Arc::new(Self::new(measurements, encoding));
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(Arc::clone(&registry).run_collector(rx));
        (registry, tx)
    }

    /// Drain `rx` until every sender is gone.
    pub async fn run_collector(self: Arc<Self>, mut rx: mpsc::Receiver<MeasurementReport>) {
        while let Some(report) = rx.recv().await {
            self.apply(report);
        }
        tracing::debug!("registry collector stopped");
    }

    /// Store `report`, replacing any earlier one for the same measurement.
    pub fn apply(&self, report: MeasurementReport) {
        let idx = report.measurement_idx;
        if idx >= self.measurements.len() {
            tracing::warn!(measurement = idx, "report for unknown measurement dropped");
            return;
        }
        self.lock().insert(idx, report);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render every stored report. Stops at the first write error; lines
    /// already written stay written.
    pub fn dump_metrics<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let reports = self.lock();
        for (idx, report) in reports.iter() {
            let Some(mcfg) = self.measurements.get(*idx) else { continue };
            self.write_report(w, mcfg, report)?;
        }
        Ok(())
    }

    fn write_report<W: Write>(
        &self,
        w: &mut W,
        mcfg: &MeasurementConfig,
        report: &MeasurementReport,
    ) -> io::Result<()> {
        let tags = mcfg.tag_string();
        let ts = report.timestamp_ms();
        let rs = &report.summary;

        // run meta-data
        writeln!(w, "owamp_start_time{{{tags}}} {:.3} {ts}", rs.start_time)?;
        writeln!(w, "owamp_end_time{{{tags}}} {:.3} {ts}", rs.end_time)?;

        writeln!(w, "owamp_packets_sent{{{tags}}} {} {ts}", rs.sent_pkts)?;
        writeln!(w, "owamp_packets_dup{{{tags}}} {} {ts}", rs.dup_pkts)?;
        writeln!(w, "owamp_packets_lost{{{tags}}} {} {ts}", rs.lost_pkts)?;

        match self.encoding {
            HistogramEncoding::Exponential => {
                write_victoria(w, "owamp_latency", &tags, ts, &rs.latency_hist)?;
                write_victoria(w, "owamp_ttl", &tags, ts, &rs.ttl_hist)?;
                write_victoria(w, "owamp_reordering", &tags, ts, &rs.reordering_hist)?;
            }
            HistogramEncoding::Cumulative => {
                // TTL and reordering have no cumulative rendering yet.
                write_prometheus(
                    w,
                    "owamp_latency",
                    &tags,
                    ts,
                    &rs.latency_hist,
                    rs.latency_hist_width,
                    &mcfg.prom_hist_bins,
                )?;
            }
        }

        writeln!(w, "owamp_latency_min{{{tags}}} {} {ts}", fmt_exp(rs.latency_min, 6))?;
        writeln!(w, "owamp_latency_median{{{tags}}} {} {ts}", fmt_exp(rs.latency_median, 6))?;
        writeln!(w, "owamp_latency_max{{{tags}}} {} {ts}", fmt_exp(rs.latency_max, 6))?;
        writeln!(w, "owamp_time_error_estimate{{{tags}}} {} {ts}", fmt_exp(rs.max_err, 6))?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<usize, MeasurementReport>> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.reports.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
