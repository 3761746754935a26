//! Threshold schedule for the cumulative encoder's fixed-bins mode.
//!
//! The schedule is dense and linear up to `max_linear_latency_ms`
//! (`linear_points_per_ms` points per millisecond starting at
//! `min_latency_ms`), then geometric with `log_points` points towards
//! `max_latency_ms`. All thresholds are returned in seconds.

use crate::error::{OwampError, Result};

/// Upper bound on the number of thresholds in one schedule.
pub const MAX_SCHEDULE_LEN: u64 = 100_000;

/// Inputs for [`make_prom_hist_bins`]; latencies in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistBinParams {
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub max_linear_latency_ms: u64,
    pub linear_points_per_ms: u64,
    pub log_points: u64,
}

impl Default for HistBinParams {
    fn default() -> Self {
        Self {
            min_latency_ms: 1,
            max_latency_ms: 1000,
            max_linear_latency_ms: 50,
            linear_points_per_ms: 4,
            log_points: 5,
        }
    }
}

impl HistBinParams {
    pub fn validate(&self) -> Result<()> {
        if self.max_linear_latency_ms <= 1 {
            return Err(OwampError::Config(
                "hist max_linear_latency_ms must be greater than 1".into(),
            ));
        }
        if self.max_latency_ms <= self.max_linear_latency_ms {
            return Err(OwampError::Config(
                "hist max_latency_ms must be greater than max_linear_latency_ms".into(),
            ));
        }
        if self.min_latency_ms > self.max_linear_latency_ms {
            return Err(OwampError::Config(
                "hist min_latency_ms must not exceed max_linear_latency_ms".into(),
            ));
        }
        self.linear_points()?
            .checked_add(self.log_points)
            .filter(|n| *n <= MAX_SCHEDULE_LEN)
            .ok_or_else(too_long)?;
        Ok(())
    }

    /// Number of points in the linear segment.
    pub fn linear_points(&self) -> Result<u64> {
        self.max_linear_latency_ms
            .saturating_sub(self.min_latency_ms)
            .checked_mul(self.linear_points_per_ms)
            .filter(|n| *n <= MAX_SCHEDULE_LEN)
            .ok_or_else(too_long)
    }
}

fn too_long() -> OwampError {
    OwampError::Config(format!("hist schedule exceeds {MAX_SCHEDULE_LEN} thresholds"))
}

/// Build the ascending threshold schedule (seconds).
///
/// The result has exactly `linear_points + log_points` entries, never more
/// than [`MAX_SCHEDULE_LEN`].
pub fn make_prom_hist_bins(params: &HistBinParams) -> Result<Vec<f64>> {
    params.validate()?;

    let num_lin = params.linear_points()?;
    let mut bins = Vec::with_capacity((num_lin + params.log_points) as usize);

    let min = params.min_latency_ms as f64;
    let per_ms = params.linear_points_per_ms as f64;
    for i in 0..num_lin {
        bins.push((min + i as f64 / per_ms) / 1000.0);
    }

    if params.log_points > 0 {
        let max_lin = params.max_linear_latency_ms as f64;
        let max = params.max_latency_ms as f64;
        let step = (max.ln() / max_lin.ln() - 1.0) / params.log_points as f64;
        for k in 0..params.log_points {
            bins.push(max_lin.powf(1.0 + k as f64 * step) / 1000.0);
        }
    }

    Ok(bins)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn strictly_ascending(v: &[f64]) -> bool {
        v.windows(2).all(|w| w[0] < w[1])
    }

    #[test]
    fn default_schedule_shape() {
        let bins = make_prom_hist_bins(&HistBinParams::default()).unwrap();
        assert_eq!(bins.len(), 196 + 5);
        assert!(strictly_ascending(&bins));
        assert!((bins[0] - 0.001).abs() < 1e-12);
        assert!((bins[195] - 0.04975).abs() < 1e-12);
        // log segment starts at max_linear and stays below max
        assert!((bins[196] - 0.050).abs() < 1e-12);
        assert!(bins[200] < 1.0);
    }

    #[test]
    fn length_follows_params() {
        let p = HistBinParams {
            min_latency_ms: 0,
            max_latency_ms: 10_000,
            max_linear_latency_ms: 20,
            linear_points_per_ms: 2,
            log_points: 12,
        };
        let bins = make_prom_hist_bins(&p).unwrap();
        assert_eq!(bins.len(), 40 + 12);
        assert!(strictly_ascending(&bins));
    }

    #[test]
    fn zero_log_points_is_linear_only() {
        let p = HistBinParams {
            log_points: 0,
            ..HistBinParams::default()
        };
        assert_eq!(make_prom_hist_bins(&p).unwrap().len(), 196);
    }

    #[test]
    fn rejects_degenerate_log_segment() {
        let p = HistBinParams {
            max_linear_latency_ms: 1,
            min_latency_ms: 0,
            ..HistBinParams::default()
        };
        assert!(make_prom_hist_bins(&p).is_err());

        let p = HistBinParams {
            max_latency_ms: 50,
            ..HistBinParams::default()
        };
        let err = make_prom_hist_bins(&p).unwrap_err();
        assert_eq!(err.class().as_str(), "CONFIG");
    }

    #[test]
    fn oversized_schedule_is_config_error() {
        let cases = [
            HistBinParams {
                linear_points_per_ms: u64::MAX / 10,
                ..HistBinParams::default()
            },
            HistBinParams {
                log_points: u64::MAX,
                ..HistBinParams::default()
            },
            HistBinParams {
                log_points: MAX_SCHEDULE_LEN,
                ..HistBinParams::default()
            },
        ];
        for p in cases {
            let err = make_prom_hist_bins(&p).unwrap_err();
            assert_eq!(err.class().as_str(), "CONFIG");
            assert!(err.to_string().contains("exceeds"), "{err}");
        }
    }
}
