//! Cumulative (`le`) histogram encoder.

use std::io::{self, Write};

use super::format::fmt_exp;
use super::labels_with;
use crate::report::HistogramEntry;

/// Relative slack when matching `key * scale` against a threshold. Both sides
/// are computed along different float paths, so an exact hit can differ in
/// the last bits.
const LE_TOLERANCE: f64 = 1e-9;

/// Write `entries` as a cumulative histogram.
///
/// With an empty `bins` schedule every distinct input entry becomes one
/// bucket bounded by `key * scale`. Otherwise the input is merged onto the
/// schedule (thresholds in the same unit as `key * scale`). In both modes
/// the last bucket is `+Inf` and `_sum` is `sum(value * key * scale)`.
/// Nothing is written for an empty histogram.
pub fn write_prometheus<W: Write>(
    w: &mut W,
    name: &str,
    tags: &str,
    timestamp: u64,
    entries: &[HistogramEntry],
    scale: f64,
    bins: &[f64],
) -> io::Result<()> {
    if entries.is_empty() {
        return Ok(());
    }

    let mut hist = entries.to_vec();
    hist.sort_by_key(|e| e.key);

    let sum: f64 = hist
        .iter()
        .map(|e| e.value as f64 * e.key as f64 * scale)
        .sum();

    let buckets = if bins.is_empty() {
        native_buckets(&hist, scale)
    } else {
        fixed_buckets(&hist, scale, bins)
    };

    let last = buckets.len() - 1;
    let mut count = 0;
    for (i, (le, cum)) in buckets.iter().enumerate() {
        let le = if i == last { "+Inf".to_string() } else { fmt_exp(*le, 6) };
        let labels = labels_with(tags, &format!("le=\"{le}\""));
        writeln!(w, "{name}_bucket{labels} {cum} {timestamp}")?;
        count = *cum;
    }

    writeln!(w, "{name}_sum{{{tags}}} {} {timestamp}", fmt_exp(sum, 6))?;
    writeln!(w, "{name}_count{{{tags}}} {count} {timestamp}")?;
    Ok(())
}

/// One bucket per sorted input entry.
fn native_buckets(hist: &[HistogramEntry], scale: f64) -> Vec<(f64, u64)> {
    let mut cum = 0u64;
    hist.iter()
        .map(|e| {
            cum += e.value;
            (e.key as f64 * scale, cum)
        })
        .collect()
}

/// Merge the sorted input onto the threshold schedule.
///
/// An input key belongs to the first threshold it does not exceed; keys past
/// the second-to-last threshold land in the final (`+Inf`) bin.
fn fixed_buckets(hist: &[HistogramEntry], scale: f64, bins: &[f64]) -> Vec<(f64, u64)> {
    let last = bins.len() - 1;
    let mut out = vec![0u64; bins.len()];
    let mut cum = 0u64;
    let mut j = 0usize;

    for e in hist {
        let x = e.key as f64 * scale;
        while j < last && exceeds(x, bins[j]) {
            out[j] = cum;
            j += 1;
        }
        cum += e.value;
        out[j] = cum;
    }
    for slot in &mut out[j..] {
        *slot = cum;
    }

    bins.iter().copied().zip(out).collect()
}

fn exceeds(x: f64, le: f64) -> bool {
    x > le && x - le > x.abs() * LE_TOLERANCE
}
