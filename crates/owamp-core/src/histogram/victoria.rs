//! Fixed exponential (`vmrange`) histogram encoder.
//!
//! Bucket layout follows VictoriaMetrics/metrics' `Histogram`: 27 decades
//! from 10^-9 to 10^18 with 18 log-spaced buckets each, plus one underflow
//! and one overflow accumulator. A bucket's lower bound is exclusive and its
//! upper bound inclusive, which keeps it compatible with `le` semantics.

use std::io::{self, Write};
use std::sync::OnceLock;

use super::format::{fmt_exp, fmt_general};
use super::labels_with;
use crate::report::HistogramEntry;

pub const E10_MIN: i32 = -9;
pub const E10_MAX: i32 = 18;
pub const BUCKETS_PER_DECIMAL: usize = 18;
pub const DECIMAL_BUCKETS: usize = (E10_MAX - E10_MIN) as usize;
pub const BUCKETS: usize = DECIMAL_BUCKETS * BUCKETS_PER_DECIMAL;

type Decade = [u64; BUCKETS_PER_DECIMAL];

/// Sparse exponential histogram. Decades are allocated on first use.
#[derive(Debug, Default)]
pub struct VictoriaHistogram {
    decimal_buckets: [Option<Box<Decade>>; DECIMAL_BUCKETS],
    lower: u64,
    upper: u64,
    sum: f64,
}

/// Where a single value lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketSlot {
    Lower,
    Index(usize),
    Upper,
}

/// Classify `v`. Values sitting exactly on a bucket boundary go to the lower
/// bucket, except at index 0.
pub fn bucket_slot(v: f64) -> BucketSlot {
    let idx = (v.log10() - E10_MIN as f64) * BUCKETS_PER_DECIMAL as f64;
    if idx.is_nan() || idx < 0.0 {
        BucketSlot::Lower
    } else if idx >= BUCKETS as f64 {
        BucketSlot::Upper
    } else {
        let mut i = idx as usize;
        if idx == i as f64 && i > 0 {
            i -= 1;
        }
        BucketSlot::Index(i)
    }
}

impl VictoriaHistogram {
    /// Re-bin raw entries; each key is the physical value.
    pub fn from_entries(entries: &[HistogramEntry]) -> Self {
        let mut h = Self::default();
        for e in entries {
            h.update(e.key as f64, e.value);
        }
        h
    }

    pub fn update(&mut self, v: f64, count: u64) {
        self.sum += v * count as f64;
        match bucket_slot(v) {
            BucketSlot::Lower => self.lower += count,
            BucketSlot::Upper => self.upper += count,
            BucketSlot::Index(idx) => {
                let decade = self.decimal_buckets[idx / BUCKETS_PER_DECIMAL]
                    .get_or_insert_with(|| Box::new([0; BUCKETS_PER_DECIMAL]));
                decade[idx % BUCKETS_PER_DECIMAL] += count;
            }
        }
    }

    /// Unscaled `sum(value * count)`.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Number of decades holding an allocation.
    pub fn allocated_decades(&self) -> usize {
        self.decimal_buckets.iter().filter(|d| d.is_some()).count()
    }

    /// Call `f` for every non-zero bucket: underflow, ascending index,
    /// overflow.
    pub fn visit_non_zero_buckets<F: FnMut(&str, u64)>(&self, mut f: F) {
        if self.lower > 0 {
            f(ranges().lower.as_str(), self.lower);
        }
        for (decimal_idx, decade) in self.decimal_buckets.iter().enumerate() {
            let Some(decade) = decade else { continue };
            for (offset, &count) in decade.iter().enumerate() {
                if count > 0 {
                    let idx = decimal_idx * BUCKETS_PER_DECIMAL + offset;
                    f(vm_range(idx), count);
                }
            }
        }
        if self.upper > 0 {
            f(ranges().upper.as_str(), self.upper);
        }
    }

    pub fn total_count(&self) -> u64 {
        let mut total = 0;
        self.visit_non_zero_buckets(|_, c| total += c);
        total
    }
}

struct Ranges {
    lower: String,
    upper: String,
    buckets: Vec<String>,
}

fn ranges() -> &'static Ranges {
    static RANGES: OnceLock<Ranges> = OnceLock::new();
    RANGES.get_or_init(|| {
        let multiplier = 10f64.powf(1.0 / BUCKETS_PER_DECIMAL as f64);
        let mut v = 10f64.powi(E10_MIN);
        let mut start = fmt_exp(v, 3);
        let mut buckets = Vec::with_capacity(BUCKETS);
        for _ in 0..BUCKETS {
            v *= multiplier;
            let end = fmt_exp(v, 3);
            buckets.push(format!("{start}...{end}"));
            start = end;
        }
        Ranges {
            lower: format!("0...{}", fmt_exp(10f64.powi(E10_MIN), 3)),
            upper: format!("{}...+Inf", fmt_exp(10f64.powi(E10_MAX), 3)),
            buckets,
        }
    })
}

/// `"<start>...<end>"` label for bucket `idx` (`idx < BUCKETS`).
pub fn vm_range(idx: usize) -> &'static str {
    ranges().buckets.get(idx).map(String::as_str).unwrap_or("")
}

/// Write `entries` as a `vmrange` histogram. Nothing is written when the
/// total count is zero.
pub fn write_victoria<W: Write>(
    w: &mut W,
    name: &str,
    tags: &str,
    timestamp: u64,
    entries: &[HistogramEntry],
) -> io::Result<()> {
    let hist = VictoriaHistogram::from_entries(entries);

    let mut total = 0u64;
    let mut res = Ok(());
    hist.visit_non_zero_buckets(|vmrange, count| {
        if res.is_err() {
            return;
        }
        let labels = labels_with(tags, &format!("vmrange=\"{vmrange}\""));
        res = writeln!(w, "{name}_bucket{labels} {count} {timestamp}");
        total += count;
    });
    res?;

    if total == 0 {
        return Ok(());
    }

    writeln!(w, "{name}_sum{{{tags}}} {} {timestamp}", fmt_general(hist.sum))?;
    writeln!(w, "{name}_count{{{tags}}} {total} {timestamp}")?;
    Ok(())
}
