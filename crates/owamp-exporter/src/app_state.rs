//! Shared application state for the exporter.

use std::sync::Arc;

use owamp_core::histogram::HistogramEncoding;
use owamp_core::report::MeasurementReport;
use tokio::sync::mpsc;

use crate::config::ExporterConfig;
use crate::registry::Registry;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    registry: Arc<Registry>,
}

struct AppStateInner {
    cfg: ExporterConfig,
}

impl AppState {
    /// Build state and start the registry collector. The returned sender is
    /// the hand-off channel the workers report into.
    pub fn new(
        cfg: ExporterConfig,
        encoding: HistogramEncoding,
    ) -> (Self, mpsc::Sender<MeasurementReport>) {
        let measurements = Arc::from(cfg.measurements.clone());
        let (registry, tx) = Registry::spawn(measurements, encoding);
        (Self::with_registry(cfg, registry), tx)
    }

    pub fn with_registry(cfg: ExporterConfig, registry: Arc<Registry>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { cfg }),
            registry,
        }
    }

    pub fn cfg(&self) -> &ExporterConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }
}
