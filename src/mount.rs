//! Mount executor: invokes the OS-level mount and unmount primitives.
//!
//! The driver only depends on the [`MountExecutor`] trait so its
//! reference-counting logic is testable without real system calls. The
//! production implementation, [`GlusterfsMounter`], shells out to the
//! `glusterfs` FUSE client and `umount`.

use std::path::Path;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, error};

use crate::error::VolumeError;

/// How the mounter picks volfile servers from the configured list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ServerSelection {
    /// Pass a single pseudo-randomly chosen server.
    Random,
    /// Pass every configured server as a repeated `--volfile-server` flag,
    /// letting the client fail over between them.
    All,
}

/// Capability interface for the mount/unmount primitives.
///
/// Both operations are a single attempt: no retries, no backoff, no
/// partial-success handling. Any non-zero exit is a hard failure surfaced to
/// the caller. Registry bookkeeping is entirely the caller's responsibility.
#[async_trait]
pub trait MountExecutor: Send + Sync {
    /// Mount the named volume at `mountpoint`.
    async fn mount(&self, volume: &str, mountpoint: &Path) -> Result<(), VolumeError>;

    /// Unmount whatever is attached at `mountpoint`.
    async fn unmount(&self, mountpoint: &Path) -> Result<(), VolumeError>;
}

/// Production executor: runs the `glusterfs` client binary and `umount`.
pub struct GlusterfsMounter {
    servers: Vec<String>,
    selection: ServerSelection,
}

impl GlusterfsMounter {
    pub fn new(servers: Vec<String>, selection: ServerSelection) -> Self {
        Self { servers, selection }
    }

    /// Build the `--volfile-server` arguments for one mount invocation.
    fn server_args(&self) -> Vec<String> {
        match self.selection {
            ServerSelection::Random => {
                let idx = rand::rng().random_range(0..self.servers.len());
                vec![format!("--volfile-server={}", self.servers[idx])]
            }
            ServerSelection::All => self
                .servers
                .iter()
                .map(|s| format!("--volfile-server={s}"))
                .collect(),
        }
    }
}

/// Combine a finished command's stdout and stderr into one lossy string,
/// falling back to the exit status when both streams are empty.
fn combined_output(output: &std::process::Output) -> String {
    let mut text = String::new();
    text.push_str(String::from_utf8_lossy(&output.stdout).trim());
    if !output.stderr.is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(String::from_utf8_lossy(&output.stderr).trim());
    }
    if text.is_empty() {
        text = output.status.to_string();
    }
    text
}

#[async_trait]
impl MountExecutor for GlusterfsMounter {
    async fn mount(&self, volume: &str, mountpoint: &Path) -> Result<(), VolumeError> {
        let mut cmd = Command::new("glusterfs");
        cmd.arg("--log-level=DEBUG")
            .arg(format!("--volfile-id={volume}"))
            .args(self.server_args())
            .arg(mountpoint);

        debug!(volume, mountpoint = %mountpoint.display(), "running glusterfs mount");
        let output = cmd.output().await.map_err(VolumeError::io)?;

        if !output.status.success() {
            let out = combined_output(&output);
            error!(volume, mountpoint = %mountpoint.display(), output = %out, "glusterfs mount failed");
            return Err(VolumeError::MountFailed {
                path: mountpoint.display().to_string(),
                reason: out,
            });
        }
        Ok(())
    }

    async fn unmount(&self, mountpoint: &Path) -> Result<(), VolumeError> {
        debug!(mountpoint = %mountpoint.display(), "running umount");
        let output = Command::new("umount")
            .arg(mountpoint)
            .output()
            .await
            .map_err(VolumeError::io)?;

        if !output.status.success() {
            let out = combined_output(&output);
            error!(mountpoint = %mountpoint.display(), output = %out, "umount failed");
            return Err(VolumeError::UnmountFailed {
                path: mountpoint.display().to_string(),
                reason: out,
            });
        }
        Ok(())
    }
}
