//! Measurement workers.
//!
//! One worker per configured measurement supervises a powstream process
//! forever: `Starting -> Running -> Exited -> (delay) -> Starting`. While
//! running, stdout is tailed for completed `.sum` paths and each one is
//! ingested on its own task, so a slow parse never stalls the tail.
//!
//! A process that exits (for any reason) is relaunched after the fixed
//! restart delay. A process that cannot be launched abandons the
//! measurement.

pub mod command;
pub mod ingest;
pub mod launcher;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

use owamp_core::error::{OwampError, Result};
use owamp_core::report::MeasurementReport;

use crate::config::{ExporterConfig, MeasurementConfig};

pub use command::{powstream_args, CommandSpec};
pub use ingest::{ingest_summary_file, IngestOutcome, SUMMARY_SUFFIX};
pub use launcher::{Launcher, OutputStream, PowstreamLauncher, Spawned};

pub const RESTART_DELAY: Duration = Duration::from_secs(30);

/// How long a process may linger after closing stdout before it is killed.
pub const REAP_GRACE: Duration = Duration::from_secs(5);

/// Relaunch policy: fixed delay, unlimited retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    pub delay: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            delay: RESTART_DELAY,
        }
    }
}

/// Lifecycle of one subprocess instance.
pub enum WorkerState {
    Starting,
    Running(Spawned),
    Exited,
}

pub struct MeasurementWorker {
    idx: usize,
    measurement: MeasurementConfig,
    work_dir: PathBuf,
    command: CommandSpec,
    out: mpsc::Sender<MeasurementReport>,
    launcher: Arc<dyn Launcher>,
    policy: RestartPolicy,
}

impl MeasurementWorker {
    /// Prepare the worker for measurement `idx` and create its work
    /// directory. An `Io` error here is meant to be fatal for the process.
    pub fn new(
        cfg: &ExporterConfig,
        idx: usize,
        out: mpsc::Sender<MeasurementReport>,
        launcher: Arc<dyn Launcher>,
        policy: RestartPolicy,
    ) -> Result<Self> {
        let measurement = cfg
            .measurements
            .get(idx)
            .cloned()
            .ok_or_else(|| OwampError::Internal(format!("no measurement at index {idx}")))?;

        let work_dir = cfg.base_workdir.join(measurement.name());
        create_work_dir(&work_dir)?;

        let command = CommandSpec::powstream(cfg, &measurement, &work_dir);
        Ok(Self {
            idx,
            measurement,
            work_dir,
            command,
            out,
            launcher,
            policy,
        })
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn command(&self) -> &CommandSpec {
        &self.command
    }

    /// Run on its own task inside a span naming the measurement.
    pub fn spawn(self) -> JoinHandle<()> {
        let span = tracing::info_span!(
            "measurement",
            idx = self.idx,
            src = %self.measurement.target_src,
            dst = %self.measurement.target_dst,
        );
        tokio::spawn(
            async move {
                if let Err(e) = self.run().await {
                    tracing::error!(
                        error = %e,
                        class = e.class().as_str(),
                        "measurement abandoned"
                    );
                }
            }
            .instrument(span),
        )
    }

    /// Supervise forever. Returns only when a launch fails.
    pub async fn run(&self) -> Result<()> {
        loop {
            let discovered = self.run_cycle().await?;
            tracing::info!(
                discovered,
                delay_s = self.policy.delay.as_secs(),
                "powstream exited, restarting after delay"
            );
            tokio::time::sleep(self.policy.delay).await;
        }
    }

    /// One `Starting -> Running -> Exited` pass. Returns the number of
    /// summary artifacts discovered on stdout.
    pub async fn run_cycle(&self) -> Result<usize> {
        let mut state = WorkerState::Starting;
        let mut discovered = 0;
        loop {
            state = match state {
                WorkerState::Starting => {
                    tracing::info!(
                        program = %self.command.program,
                        args = ?self.command.args,
                        "running powstream"
                    );
                    match self.launcher.launch(&self.command).await {
                        Ok(spawned) => WorkerState::Running(spawned),
                        Err(e) => {
                            tracing::error!(error = %e, "powstream launch failed");
                            return Err(e);
                        }
                    }
                }
                WorkerState::Running(spawned) => {
                    discovered = self.tail(spawned).await;
                    WorkerState::Exited
                }
                WorkerState::Exited => return Ok(discovered),
            };
        }
    }

    async fn tail(&self, spawned: Spawned) -> usize {
        let Spawned {
            stdout,
            stderr,
            child,
        } = spawned;

        tokio::spawn(log_stderr(stderr).in_current_span());

        let mut lines = BufReader::new(stdout).lines();
        let mut discovered = 0;
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.ends_with(SUMMARY_SUFFIX) {
                        discovered += 1;
                        tokio::spawn(
                            ingest_summary_file(self.idx, PathBuf::from(line), self.out.clone())
                                .in_current_span(),
                        );
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "powstream stdout read failed");
                    break;
                }
            }
        }

        // stdout EOF is the exit; the process itself is reaped off the cycle
        if let Some(child) = child {
            tokio::spawn(reap(child).in_current_span());
        }
        discovered
    }
}

async fn reap(mut child: Child) {
    let status = match tokio::time::timeout(REAP_GRACE, child.wait()).await {
        Ok(status) => status,
        Err(_) => {
            tracing::warn!("powstream still running after closing stdout, killing");
            if let Err(e) = child.start_kill() {
                tracing::warn!(error = %e, "powstream kill failed");
            }
            child.wait().await
        }
    };
    match status {
        Ok(status) => tracing::info!(%status, "powstream terminated"),
        Err(e) => tracing::warn!(error = %e, "powstream wait failed"),
    }
}

async fn log_stderr(stderr: OutputStream) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::warn!("powstream stderr: {}", line.trim());
    }
}

fn create_work_dir(path: &Path) -> Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o750);
    }
    builder.create(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    fn cfg(workdir: &str) -> ExporterConfig {
        config::load_from_str(&format!(
            r#"
version: 1
exporter:
  workdir: "{workdir}"
  port_range: {{ min: 8760, max: 8769 }}
targets:
  - {{ id: lax, hostname: 192.0.2.10, local: true }}
  - {{ id: fra, hostname: 198.51.100.20 }}
measurements:
  - {{ src: lax, dst: fra, pps: 4, duration_s: 30 }}
  - {{ src: fra, dst: lax, bucket_width: "0.00005" }}
"#
        ))
        .unwrap()
    }

    #[test]
    fn args_for_local_source() {
        let cfg = cfg("/tmp/x");
        let args = powstream_args(&cfg, &cfg.measurements[0], Path::new("/tmp/x/lax_fra"));
        assert_eq!(
            args,
            [
                "-t", "-c", "120", "-i", "0.250000", "-P", "8760-8769", "-d", "/tmp/x/lax_fra",
                "-b", "0.0001", "-p", "-U", "198.51.100.20",
            ]
        );
    }

    #[test]
    fn remote_source_appends_src_host() {
        let cfg = cfg("/tmp/x");
        let args = powstream_args(&cfg, &cfg.measurements[1], Path::new("/tmp/x/fra_lax"));
        assert_eq!(args[2], "600");
        assert_eq!(args[4], "0.100000");
        assert_eq!(args[10], "0.00005");
        assert_eq!(&args[args.len() - 2..], ["192.0.2.10", "198.51.100.20"]);
    }

    #[test]
    fn default_policy_is_fixed_thirty_seconds() {
        assert_eq!(RestartPolicy::default().delay, Duration::from_secs(30));
    }
}
