//! Volume driver trait: the lifecycle operations dispatched by the
//! orchestrator-facing transport.
//!
//! All operations are synchronous request/response; none retry internally.
//! Every failure is surfaced verbatim to the caller as a [`VolumeError`].

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::VolumeError;
use crate::types::{Capabilities, Volume};

/// The eight lifecycle operations exposed to the orchestrator.
#[async_trait]
pub trait VolumeDriver: Send + Sync {
    /// Ensure the named volume exists in the cluster.
    ///
    /// Idempotent: succeeds as a no-op when the volume is already tracked
    /// locally or already exists remotely. Never touches the local mount
    /// table.
    async fn create(&self, name: &str) -> Result<(), VolumeError>;

    /// Reclaim local bookkeeping for a volume, optionally stopping it
    /// remotely.
    ///
    /// Tolerant of unknown names (silent no-op). Never forces eviction of a
    /// multiply-held mount.
    async fn remove(&self, name: &str) -> Result<(), VolumeError>;

    /// The deterministic mountpoint for a name: `<root>/<name>`. Pure
    /// computation, regardless of mount state.
    async fn path(&self, name: &str) -> Result<PathBuf, VolumeError>;

    /// Attach the volume locally, or join an existing attachment.
    ///
    /// The underlying mount primitive runs only on the first holder; later
    /// calls increment the connection count. Fully transactional with
    /// respect to bookkeeping: a failed mount leaves no partial record.
    async fn mount(&self, name: &str) -> Result<PathBuf, VolumeError>;

    /// Release one attachment; the real unmount runs only for the last
    /// holder. A failed unmount leaves the connection count unchanged so the
    /// caller can safely retry.
    async fn unmount(&self, name: &str) -> Result<(), VolumeError>;

    /// Look up a single tracked volume.
    async fn get(&self, name: &str) -> Result<Volume, VolumeError>;

    /// Enumerate all tracked volumes.
    async fn list(&self) -> Result<Vec<Volume>, VolumeError>;

    /// Static capability declaration.
    async fn capabilities(&self) -> Result<Capabilities, VolumeError>;
}
