//! Launching the artifact as a child process.
//!
//! The child's stdout and stderr are drained line by line into the log by a
//! detached task for as long as the launcher runs. The child is never killed
//! by the launcher; dropping a [`LaunchHandle`] leaves it running.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::{error, info, warn};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout};

use crate::commands::HideWindow;

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to launch {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("executable {} has no containing directory", .0.display())]
    NoWorkingDirectory(PathBuf),
}

#[derive(Debug, Error)]
#[error("failed to set file permissions on {}: {source}", .path.display())]
pub struct PermissionError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// What the child was doing when the settling window closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Running,
    Exited { code: Option<i32> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchReport {
    pub executable: PathBuf,
    pub pid: Option<u32>,
    pub settled: Settled,
}

/// Seam between the update flow and the operating system's process API.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Start `executable` and return once it has had time to settle.
    async fn launch(&self, executable: &Path) -> Result<LaunchReport, LaunchError>;
}

pub struct ProcessSupervisor {
    settle_delay: Duration,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_DELAY)
    }
}

impl ProcessSupervisor {
    #[must_use]
    pub fn new(settle_delay: Duration) -> Self {
        Self { settle_delay }
    }

    /// Spawn the child with its working directory set to its own directory
    /// and start draining its output.
    ///
    /// # Errors
    /// Returns an error if the process cannot be started.
    pub fn spawn(&self, executable: &Path) -> Result<LaunchHandle, LaunchError> {
        let working_dir = executable
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or_else(|| LaunchError::NoWorkingDirectory(executable.to_path_buf()))?;

        if let Err(error) = widen_permissions(executable) {
            warn!("{error}");
        }

        let mut child = tokio::process::Command::new(executable)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .hide_window()
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                path: executable.to_path_buf(),
                source,
            })?;

        let pid = child.id();
        info!(
            "Started {} (pid {})",
            executable.display(),
            pid.map_or_else(|| "unknown".to_string(), |pid| pid.to_string())
        );

        if let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) {
            tokio::spawn(drain_output(stdout, stderr));
        }

        Ok(LaunchHandle { child, pid })
    }
}

#[async_trait]
impl Launcher for ProcessSupervisor {
    async fn launch(&self, executable: &Path) -> Result<LaunchReport, LaunchError> {
        info!(
            "Launching game executable from {} ({} bytes)",
            executable.display(),
            std::fs::metadata(executable).map_or(0, |metadata| metadata.len())
        );
        let mut handle = self.spawn(executable)?;

        info!("Waiting for game executable to start...");
        let settled = handle.settle(self.settle_delay).await;
        if let Settled::Exited { code } = settled {
            warn!("Game executable exited during startup (exit code {code:?})");
        }

        Ok(LaunchReport {
            executable: executable.to_path_buf(),
            pid: handle.pid(),
            settled,
        })
    }
}

/// A running child. Dropping the handle detaches from the child.
pub struct LaunchHandle {
    child: Child,
    pid: Option<u32>,
}

impl LaunchHandle {
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Wait until `delay` has passed or the child exits, whichever is first.
    pub async fn settle(&mut self, delay: Duration) -> Settled {
        tokio::select! {
            status = self.child.wait() => match status {
                Ok(status) => Settled::Exited { code: status.code() },
                Err(error) => {
                    warn!("Failed to poll game executable: {error}");
                    Settled::Running
                }
            },
            () = tokio::time::sleep(delay) => Settled::Running,
        }
    }
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

async fn drain_output(stdout: ChildStdout, stderr: ChildStderr) {
    let mut stdout = BufReader::new(stdout).lines();
    let mut stderr = BufReader::new(stderr).lines();
    let mut stdout_open = true;
    let mut stderr_open = true;

    while stdout_open || stderr_open {
        let (stream, line) = tokio::select! {
            line = stdout.next_line(), if stdout_open => (Stream::Stdout, line),
            line = stderr.next_line(), if stderr_open => (Stream::Stderr, line),
        };

        let closed = match line {
            Ok(Some(line)) => {
                info!("Game output: {line}");
                false
            }
            Ok(None) => true,
            Err(read_error) => {
                error!("Error reading game output: {read_error}");
                true
            }
        };

        if closed {
            match stream {
                Stream::Stdout => stdout_open = false,
                Stream::Stderr => stderr_open = false,
            }
        }
    }
}

/// Allow everyone to read and execute the artifact.
#[cfg(unix)]
fn widen_permissions(path: &Path) -> Result<(), PermissionError> {
    use std::os::unix::fs::PermissionsExt;

    let to_error = |source| PermissionError {
        path: path.to_path_buf(),
        source,
    };
    let mut permissions = std::fs::metadata(path).map_err(to_error)?.permissions();
    permissions.set_mode(permissions.mode() | 0o555);
    std::fs::set_permissions(path, permissions).map_err(to_error)
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn widen_permissions(_path: &Path) -> Result<(), PermissionError> {
    Ok(())
}
