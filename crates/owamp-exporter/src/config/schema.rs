use serde::Deserialize;

use owamp_core::error::{OwampError, Result};
use owamp_core::histogram::HistBinParams;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterFile {
    pub version: u32,

    #[serde(default)]
    pub exporter: ExporterSection,

    #[serde(default)]
    pub defaults: DefaultsSection,

    #[serde(default)]
    pub targets: Vec<TargetEntry>,

    #[serde(default)]
    pub measurements: Vec<MeasurementEntry>,
}

impl ExporterFile {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(OwampError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        if self.measurements.is_empty() {
            return Err(OwampError::Config("measurements must not be empty".into()));
        }

        self.exporter.validate()?;
        self.defaults.validate()?;

        for t in &self.targets {
            if t.hostname.trim().is_empty() {
                return Err(OwampError::Config(format!(
                    "target {}: hostname must not be empty",
                    t.id
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterSection {
    #[serde(default = "default_workdir")]
    pub workdir: String,

    #[serde(default = "default_powstream_cmd")]
    pub powstream_cmd: String,

    #[serde(default)]
    pub port_range: PortRange,
}

impl Default for ExporterSection {
    fn default() -> Self {
        Self {
            workdir: default_workdir(),
            powstream_cmd: default_powstream_cmd(),
            port_range: PortRange::default(),
        }
    }
}

impl ExporterSection {
    pub fn validate(&self) -> Result<()> {
        if self.port_range.min > self.port_range.max {
            return Err(OwampError::Config(
                "exporter.port_range.min must not exceed port_range.max".into(),
            ));
        }
        if self.powstream_cmd.trim().is_empty() {
            return Err(OwampError::Config(
                "exporter.powstream_cmd must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PortRange {
    pub min: u16,
    pub max: u16,
}

impl Default for PortRange {
    fn default() -> Self {
        Self { min: 9000, max: 9999 }
    }
}

fn default_workdir() -> String {
    ".".into()
}
fn default_powstream_cmd() -> String {
    "powstream".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsSection {
    #[serde(default = "default_pps")]
    pub pps: u64,

    #[serde(default = "default_duration_s")]
    pub duration_s: u64,

    #[serde(default = "default_bucket_width")]
    pub bucket_width: String,

    #[serde(default)]
    pub hist: HistOverrides,
}

impl Default for DefaultsSection {
    fn default() -> Self {
        Self {
            pps: default_pps(),
            duration_s: default_duration_s(),
            bucket_width: default_bucket_width(),
            hist: HistOverrides::default(),
        }
    }
}

impl DefaultsSection {
    pub fn validate(&self) -> Result<()> {
        check_rate("defaults", self.pps, self.duration_s)?;
        self.hist.apply(HistBinParams::default()).validate()
    }
}

fn default_pps() -> u64 {
    10
}
fn default_duration_s() -> u64 {
    60
}
fn default_bucket_width() -> String {
    "0.0001".into()
}

pub(crate) fn check_rate(scope: &str, pps: u64, duration_s: u64) -> Result<()> {
    if pps == 0 {
        return Err(OwampError::Config(format!("{scope}: pps must be at least 1")));
    }
    if duration_s == 0 {
        return Err(OwampError::Config(format!(
            "{scope}: duration_s must be at least 1"
        )));
    }
    if duration_s.checked_mul(pps).is_none() {
        return Err(OwampError::Config(format!(
            "{scope}: duration_s * pps overflows the packet count"
        )));
    }
    Ok(())
}

/// Partial histogram schedule settings; unset fields inherit.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistOverrides {
    pub min_latency_ms: Option<u64>,
    pub max_latency_ms: Option<u64>,
    pub max_linear_latency_ms: Option<u64>,
    pub linear_points_per_ms: Option<u64>,
    pub log_points: Option<u64>,
}

impl HistOverrides {
    pub fn apply(&self, base: HistBinParams) -> HistBinParams {
        HistBinParams {
            min_latency_ms: self.min_latency_ms.unwrap_or(base.min_latency_ms),
            max_latency_ms: self.max_latency_ms.unwrap_or(base.max_latency_ms),
            max_linear_latency_ms: self
                .max_linear_latency_ms
                .unwrap_or(base.max_linear_latency_ms),
            linear_points_per_ms: self
                .linear_points_per_ms
                .unwrap_or(base.linear_points_per_ms),
            log_points: self.log_points.unwrap_or(base.log_points),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Afi {
    Ip4,
    Ip6,
}

impl Afi {
    pub fn as_str(self) -> &'static str {
        match self {
            Afi::Ip4 => "ip4",
            Afi::Ip6 => "ip6",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetEntry {
    pub id: String,
    pub hostname: String,

    /// Source side runs on this host (no remote owampd argument).
    #[serde(default)]
    pub local: bool,

    #[serde(default)]
    pub shortname: Option<String>,

    #[serde(default)]
    pub afi: Option<Afi>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeasurementEntry {
    pub src: String,
    pub dst: String,

    #[serde(default)]
    pub pps: Option<u64>,

    #[serde(default)]
    pub duration_s: Option<u64>,

    #[serde(default)]
    pub bucket_width: Option<String>,

    #[serde(default)]
    pub hist: HistOverrides,
}
