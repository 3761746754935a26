#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::VecDeque;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use owamp_core::error::{OwampError, Result};
use owamp_exporter::config::{self, ExporterConfig};
use owamp_exporter::worker::{
    ingest_summary_file, CommandSpec, IngestOutcome, Launcher, MeasurementWorker,
    PowstreamLauncher, RestartPolicy, Spawned,
};

const GOOD_SUM: &str = "\
UNIX_START_TIME 1700000000.0
UNIX_END_TIME 1700000010.0
SENT 100
DUPS 1
LOST 0
<BUCKETS>
1 60
2 39
</BUCKETS>
";
const BAD_SUM: &str = "SENT 100\n<BUCKETS>\n1 60\n";

fn cfg(workdir: &Path) -> ExporterConfig {
    config::load_from_str(&format!(
        r#"
version: 1
exporter:
  workdir: "{}"
  powstream_cmd: "/usr/bin/false"
targets:
  - {{ id: a, hostname: "192.0.2.1", local: true }}
  - {{ id: b, hostname: "192.0.2.2" }}
measurements:
  - {{ src: a, dst: b }}
"#,
        workdir.display()
    ))
    .unwrap()
}

/// Hands out one canned stdout per launch; fails once the script runs dry.
struct ScriptedLauncher {
    stdouts: Mutex<VecDeque<String>>,
    launches: AtomicUsize,
}

impl ScriptedLauncher {
    fn new<I: IntoIterator<Item = String>>(stdouts: I) -> Arc<Self> {
        Arc::new(Self {
            stdouts: Mutex::new(stdouts.into_iter().collect()),
            launches: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Launcher for ScriptedLauncher {
    async fn launch(&self, cmd: &CommandSpec) -> Result<Spawned> {
        assert_eq!(cmd.program, "/usr/bin/false");
        self.launches.fetch_add(1, Ordering::SeqCst);
        let stdout = self
            .stdouts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| OwampError::Process("no such binary".into()))?;
        Ok(Spawned {
            stdout: Box::new(Cursor::new(stdout.into_bytes())),
            stderr: Box::new(Cursor::new(b"Unable to contact owampd\n".to_vec())),
            child: None,
        })
    }
}

#[tokio::test]
async fn cycle_ingests_good_artifacts_and_skips_bad_ones() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.sum");
    let bad = dir.path().join("bad.sum");
    std::fs::write(&good, GOOD_SUM).unwrap();
    std::fs::write(&bad, BAD_SUM).unwrap();

    let stdout = format!(
        "{}\nsome progress line\n  {}  \n{}\n",
        bad.display(),
        good.display(),
        dir.path().join("session.owp").display()
    );
    let launcher = ScriptedLauncher::new([stdout]);
    let (tx, mut rx) = mpsc::channel(1);
    let cfg = cfg(dir.path());
    let worker =
        MeasurementWorker::new(&cfg, 0, tx, launcher.clone(), RestartPolicy::default()).unwrap();

    let discovered = worker.run_cycle().await.unwrap();
    assert_eq!(discovered, 2);
    assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);

    let report = rx.recv().await.expect("good artifact must be reported");
    assert_eq!(report.measurement_idx, 0);
    assert_eq!(report.summary.sent_pkts, 100);
    assert_eq!(report.summary.latency_hist.len(), 2);
    assert_eq!(report.timestamp_ms(), 1_700_000_005_000);

    // the malformed artifact is skipped, not reported as a zero value
    drop(worker);
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn relaunches_after_exit_and_abandons_on_launch_failure() {
    let dir = tempfile::tempdir().unwrap();
    let launcher = ScriptedLauncher::new([String::new(), String::new()]);
    let (tx, _rx) = mpsc::channel(1);
    let policy = RestartPolicy {
        delay: Duration::from_millis(5),
    };
    let worker = MeasurementWorker::new(&cfg(dir.path()), 0, tx, launcher.clone(), policy).unwrap();

    let err = worker.run().await.expect_err("third launch must fail");
    assert_eq!(err.class().as_str(), "LIFECYCLE");
    assert_eq!(launcher.launches.load(Ordering::SeqCst), 3);
}

/// Runs a real process that closes stdout and then keeps running.
#[cfg(unix)]
struct LingeringLauncher;

#[cfg(unix)]
#[async_trait]
impl Launcher for LingeringLauncher {
    async fn launch(&self, _cmd: &CommandSpec) -> Result<Spawned> {
        let cmd = CommandSpec {
            program: "sh".into(),
            args: vec!["-c".into(), "exec >&-; sleep 60".into()],
        };
        PowstreamLauncher.launch(&cmd).await
    }
}

#[cfg(unix)]
#[tokio::test]
async fn stdout_close_ends_cycle_while_process_lingers() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, _rx) = mpsc::channel(1);
    let worker = MeasurementWorker::new(
        &cfg(dir.path()),
        0,
        tx,
        Arc::new(LingeringLauncher),
        RestartPolicy::default(),
    )
    .unwrap();

    let discovered = tokio::time::timeout(Duration::from_secs(10), worker.run_cycle())
        .await
        .expect("cycle must end when stdout closes")
        .unwrap();
    assert_eq!(discovered, 0);
}

#[tokio::test]
async fn work_dir_is_created_idempotently() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = cfg(dir.path());
    let launcher = ScriptedLauncher::new(Vec::<String>::new());

    let (tx, _rx) = mpsc::channel(1);
    let w1 = MeasurementWorker::new(
        &cfg,
        0,
        tx.clone(),
        launcher.clone(),
        RestartPolicy::default(),
    )
    .unwrap();
    assert_eq!(w1.work_dir(), dir.path().join("a_b"));
    assert!(w1.work_dir().is_dir());
    assert!(w1.command().args.contains(&w1.work_dir().display().to_string()));

    MeasurementWorker::new(&cfg, 0, tx, launcher, RestartPolicy::default())
        .expect("existing dir is fine");
}

#[tokio::test]
async fn work_dir_failure_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "x").unwrap();

    let (tx, _rx) = mpsc::channel(1);
    let err = MeasurementWorker::new(
        &cfg(&blocker),
        0,
        tx,
        ScriptedLauncher::new(Vec::<String>::new()),
        RestartPolicy::default(),
    )
    .err()
    .expect("must fail");
    assert_eq!(err.class().as_str(), "IO");
}

#[tokio::test]
async fn ingest_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("1.sum");
    std::fs::write(&good, GOOD_SUM).unwrap();

    let (tx, mut rx) = mpsc::channel(1);
    assert_eq!(
        ingest_summary_file(3, dir.path().join("missing.sum"), tx.clone()).await,
        IngestOutcome::Skipped
    );
    assert_eq!(ingest_summary_file(3, good.clone(), tx.clone()).await, IngestOutcome::Sent);
    assert_eq!(rx.recv().await.unwrap().measurement_idx, 3);

    drop(rx);
    assert_eq!(ingest_summary_file(3, good, tx).await, IngestOutcome::ChannelClosed);
}
