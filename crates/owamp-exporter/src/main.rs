//! owamp-exporter
//!
//! - one supervised powstream per configured measurement
//! - `.sum` artifacts parsed off the tail loop, funnelled into one registry
//! - `/metrics` renders the latest report per measurement

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use owamp_core::error::{OwampError, Result};
use owamp_core::histogram::HistogramEncoding;
use owamp_exporter::worker::{Launcher, MeasurementWorker, PowstreamLauncher, RestartPolicy};
use owamp_exporter::{app_state::AppState, cli::Args, config, router};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, class = e.class().as_str(), "owamp-exporter failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut cfg = config::load_from_file(&args.cfg_file)?;
    if let Some(cmd) = args.powstream_cmd {
        cfg.powstream_cmd = cmd;
    }
    if let Some(dir) = args.workdir {
        cfg.base_workdir = dir.into();
    }

    let encoding = if args.victoria_histogram {
        HistogramEncoding::Exponential
    } else {
        HistogramEncoding::Cumulative
    };

    let (state, reports_tx) = AppState::new(cfg, encoding);

    // Work directories are created up front; any failure aborts startup.
    let launcher: Arc<dyn Launcher> = Arc::new(PowstreamLauncher);
    let mut workers = Vec::with_capacity(state.cfg().measurements.len());
    for idx in 0..state.cfg().measurements.len() {
        workers.push(MeasurementWorker::new(
            state.cfg(),
            idx,
            reports_tx.clone(),
            Arc::clone(&launcher),
            RestartPolicy::default(),
        )?);
    }
    drop(reports_tx);
    for w in workers {
        w.spawn();
    }

    let listen = SocketAddr::from(([0, 0, 0, 0], args.listen_port));
    tracing::info!(
        %listen,
        measurements = state.cfg().measurements.len(),
        ?encoding,
        "owamp-exporter starting"
    );

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| OwampError::Internal(format!("failed to bind {listen}: {e}")))?;

    axum::serve(listener, router::build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| OwampError::Internal(format!("server failed: {e}")))?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, shutting down");
}
