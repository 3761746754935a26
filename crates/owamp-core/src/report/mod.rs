//! Measurement report model.
//!
//! A `SummaryReport` is one completed powstream cycle as parsed from its
//! `.sum` artifact. A `MeasurementReport` pairs it with the index of the
//! configured measurement that produced it and the sample timestamp used in
//! the exposition output.

pub mod owstats;

pub use owstats::parse_summary;

/// One histogram bucket: a quantized unit (latency bucket, TTL, reorder
/// distance) and its observed count. Histograms are unordered and may repeat
/// keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistogramEntry {
    pub key: u64,
    pub value: u64,
}

impl HistogramEntry {
    pub const fn new(key: u64, value: u64) -> Self {
        Self { key, value }
    }
}

/// Complete result of one measurement cycle. The default value is the zero
/// report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryReport {
    /// Unix time, fractional seconds.
    pub start_time: f64,
    pub end_time: f64,

    pub sent_pkts: u64,
    pub dup_pkts: u64,
    pub lost_pkts: u64,

    /// Estimated max clock error (seconds).
    pub max_err: f64,

    pub latency_min: f64,
    pub latency_median: f64,
    pub latency_max: f64,

    /// Width of one `latency_hist` key in seconds.
    pub latency_hist_width: f64,
    pub latency_hist: Vec<HistogramEntry>,
    pub ttl_hist: Vec<HistogramEntry>,
    pub reordering_hist: Vec<HistogramEntry>,
}

/// A parsed summary on its way from a worker to the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementReport {
    pub measurement_idx: usize,
    pub summary: SummaryReport,
    /// Midpoint of the run, fractional unix seconds.
    pub metrics_timestamp: f64,
}

impl MeasurementReport {
    pub fn new(measurement_idx: usize, summary: SummaryReport) -> Self {
        let metrics_timestamp = (summary.start_time + summary.end_time) / 2.0;
        Self {
            measurement_idx,
            summary,
            metrics_timestamp,
        }
    }

    /// Sample timestamp in integer milliseconds.
    pub fn timestamp_ms(&self) -> u64 {
        (self.metrics_timestamp * 1000.0) as u64
    }
}
