//! Exporter config loader (strict YAML) and resolution.
//!
//! The file is parsed into [`schema::ExporterFile`], validated, and then
//! resolved into an [`ExporterConfig`]: defaults folded into every
//! measurement, target references checked, bin schedules and label sets
//! precomputed. The resolved value is read-only for the process lifetime.

pub mod schema;

use std::collections::HashMap;
use std::fs;
use std::net::IpAddr;
use std::path::PathBuf;

use owamp_core::error::{OwampError, Result};
use owamp_core::histogram::make_prom_hist_bins;

pub use schema::{Afi, ExporterFile, PortRange};

#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub id: String,
    pub hostname: String,
    pub local: bool,
    pub shortname: String,
    pub afi: Afi,
}

#[derive(Debug, Clone)]
pub struct MeasurementConfig {
    pub target_src: String,
    pub target_dst: String,
    pub src_hostname: String,
    pub dst_hostname: String,
    pub src_local: bool,
    pub afi: Afi,
    pub pps: u64,
    pub duration_s: u64,
    /// Passed through to powstream `-b` verbatim.
    pub bucket_width: String,
    /// Cumulative encoder thresholds (seconds); empty selects native buckets.
    pub prom_hist_bins: Vec<f64>,
    /// `key="value"` labels attached to every sample.
    pub tags: Vec<String>,
}

impl MeasurementConfig {
    pub fn tag_string(&self) -> String {
        self.tags.join(",")
    }

    /// `<src>_<dst>`, used for the work directory and log fields.
    pub fn name(&self) -> String {
        format!("{}_{}", self.target_src, self.target_dst)
    }
}

#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub targets: HashMap<String, TargetConfig>,
    pub measurements: Vec<MeasurementConfig>,
    pub port_range: PortRange,
    pub base_workdir: PathBuf,
    pub powstream_cmd: String,
}

pub fn load_from_file(path: &str) -> Result<ExporterConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| OwampError::Config(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ExporterConfig> {
    let file: ExporterFile = serde_yaml::from_str(s)
        .map_err(|e| OwampError::Config(format!("invalid yaml: {e}")))?;
    file.validate()?;
    resolve(file)
}

fn resolve(file: ExporterFile) -> Result<ExporterConfig> {
    let mut targets = HashMap::with_capacity(file.targets.len());
    for t in file.targets {
        let afi = t.afi.unwrap_or_else(|| guess_afi(&t.hostname));
        let target = TargetConfig {
            shortname: t.shortname.unwrap_or_else(|| t.id.clone()),
            id: t.id.clone(),
            hostname: t.hostname,
            local: t.local,
            afi,
        };
        if targets.insert(t.id.clone(), target).is_some() {
            return Err(OwampError::Config(format!("duplicate target id: {}", t.id)));
        }
    }

    let defaults = &file.defaults;
    let default_hist = defaults.hist.apply(Default::default());

    let mut measurements = Vec::with_capacity(file.measurements.len());
    for m in file.measurements {
        let scope = format!("measurement {} -> {}", m.src, m.dst);
        let src = targets
            .get(&m.src)
            .ok_or_else(|| OwampError::Config(format!("{scope}: unknown source target")))?;
        let dst = targets
            .get(&m.dst)
            .ok_or_else(|| OwampError::Config(format!("{scope}: unknown destination target")))?;

        let pps = m.pps.unwrap_or(defaults.pps);
        let duration_s = m.duration_s.unwrap_or(defaults.duration_s);
        schema::check_rate(&scope, pps, duration_s)?;

        let hist = m.hist.apply(default_hist);
        let prom_hist_bins = make_prom_hist_bins(&hist).map_err(|e| match e {
            OwampError::Config(msg) => OwampError::Config(format!("{scope}: {msg}")),
            other => other,
        })?;

        let afi = src.afi;
        let tags = vec![
            tag("src_short_name", &src.shortname),
            tag("dst_short_name", &dst.shortname),
            tag("src_hostname", &src.hostname),
            tag("dst_hostname", &dst.hostname),
            tag("afi", afi.as_str()),
        ];

        measurements.push(MeasurementConfig {
            target_src: m.src.clone(),
            target_dst: m.dst.clone(),
            src_hostname: src.hostname.clone(),
            dst_hostname: dst.hostname.clone(),
            src_local: src.local,
            afi,
            pps,
            duration_s,
            bucket_width: m.bucket_width.unwrap_or_else(|| defaults.bucket_width.clone()),
            prom_hist_bins,
            tags,
        });
    }

    Ok(ExporterConfig {
        targets,
        measurements,
        port_range: file.exporter.port_range,
        base_workdir: PathBuf::from(file.exporter.workdir),
        powstream_cmd: file.exporter.powstream_cmd,
    })
}

/// IPv4 literals are `ip4`; everything else, DNS names included, is `ip6`.
fn guess_afi(hostname: &str) -> Afi {
    match hostname.parse::<IpAddr>() {
        Ok(IpAddr::V4(_)) => Afi::Ip4,
        _ => Afi::Ip6,
    }
}

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn tag(key: &str, value: &str) -> String {
    format!("{key}=\"{}\"", escape_label(value))
}
