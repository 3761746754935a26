//! Subprocess launch seam.
//!
//! Workers only see a [`Spawned`] pair of output streams, so the supervision
//! loop can be driven by an in-memory launcher in tests.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};

use owamp_core::error::{OwampError, Result};

use super::command::CommandSpec;

pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// A running measurement process.
pub struct Spawned {
    pub stdout: OutputStream,
    pub stderr: OutputStream,
    /// Reaped once stdout closes; `None` for launchers without a real process.
    pub child: Option<Child>,
}

#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, cmd: &CommandSpec) -> Result<Spawned>;
}

/// Spawns the real powstream binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct PowstreamLauncher;

#[async_trait]
impl Launcher for PowstreamLauncher {
    async fn launch(&self, cmd: &CommandSpec) -> Result<Spawned> {
        let mut child = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| OwampError::Process(format!("failed to start {}: {e}", cmd.program)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| OwampError::Process("failed to open stdout pipe".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| OwampError::Process("failed to open stderr pipe".into()))?;

        Ok(Spawned {
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
            child: Some(child),
        })
    }
}
