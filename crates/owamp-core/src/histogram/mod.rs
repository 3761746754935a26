//! Histogram exposition encoders.
//!
//! Two wire contracts are supported, selected once per process:
//! - Cumulative (`le`) buckets, Prometheus style. Keys are converted to
//!   physical units with a caller supplied `scale`, optionally re-binned onto
//!   a fixed threshold schedule (see [`bins`]).
//! - Fixed exponential (`vmrange`) buckets, VictoriaMetrics style. Keys are
//!   taken as the physical value; there is no scale.
//!
//! The two contracts emit different `_sum` units and are kept separate.

pub mod bins;
mod format;
pub mod prometheus;
pub mod victoria;

pub use bins::{make_prom_hist_bins, HistBinParams};
pub use format::{fmt_exp, fmt_general};
pub use prometheus::write_prometheus;
pub use victoria::{write_victoria, VictoriaHistogram};

/// Process-wide histogram encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistogramEncoding {
    /// Cumulative `le` buckets.
    #[default]
    Cumulative,
    /// Fixed exponential `vmrange` buckets.
    Exponential,
}

/// `{tags,<extra>}` label block; drops the separator when `tags` is empty.
pub(crate) fn labels_with(tags: &str, extra: &str) -> String {
    if tags.is_empty() {
        format!("{{{extra}}}")
    } else {
        format!("{{{tags},{extra}}}")
    }
}
