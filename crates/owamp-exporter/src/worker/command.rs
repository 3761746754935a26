//! powstream invocation.

use std::path::Path;

use crate::config::{ExporterConfig, MeasurementConfig};

/// Program plus arguments for one subprocess launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn powstream(cfg: &ExporterConfig, m: &MeasurementConfig, work_dir: &Path) -> Self {
        Self {
            program: cfg.powstream_cmd.clone(),
            args: powstream_args(cfg, m, work_dir),
        }
    }
}

/// Arguments for a continuous powstream session towards `m.dst_hostname`.
pub fn powstream_args(cfg: &ExporterConfig, m: &MeasurementConfig, work_dir: &Path) -> Vec<String> {
    // bounded by config validation
    let pkt_count = m.duration_s.saturating_mul(m.pps);
    let pkt_interval = 1.0 / m.pps as f64;

    let mut args = vec![
        // client -> server direction
        "-t".to_string(),
        "-c".to_string(),
        pkt_count.to_string(),
        "-i".to_string(),
        format!("{pkt_interval:.6}"),
        "-P".to_string(),
        format!("{}-{}", cfg.port_range.min, cfg.port_range.max),
        "-d".to_string(),
        work_dir.display().to_string(),
        "-b".to_string(),
        m.bucket_width.clone(),
        // print output filenames on stdout
        "-p".to_string(),
        // include unix timestamps in the summaries
        "-U".to_string(),
        m.dst_hostname.clone(),
    ];

    // a remote source needs its owampd named explicitly
    if !m.src_local {
        args.push(m.src_hostname.clone());
    }
    args
}
