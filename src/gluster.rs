//! GlusterFS driver: composes the mount registry, mount executor, and REST
//! client into the [`VolumeDriver`] lifecycle operations.
//!
//! # Concurrency
//!
//! The transport serves each request on its own Tokio task, so every
//! operation that touches the registry or the real mount table takes one
//! process-wide async mutex for its whole duration. The lock is coarse on
//! purpose: mount/unmount invocations and mountpoint stat/mkdir calls are
//! not safely interleavable per path. Remote REST calls in `create`/`remove`
//! also run under the lock, so a hung cluster API blocks local mount
//! operations; call volume is expected to be low. `path` reads only derived
//! values and skips the lock.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::config::DriverConfig;
use crate::driver::VolumeDriver;
use crate::error::VolumeError;
use crate::mount::{GlusterfsMounter, MountExecutor};
use crate::registry::MountRegistry;
use crate::rest::RestClient;
use crate::types::{Capabilities, CapabilityScope, Volume};

/// Concrete driver backed by a GlusterFS cluster.
pub struct GlusterDriver {
    /// Root directory for local mountpoints.
    root: PathBuf,
    /// Cluster endpoints, used as provisioning peers.
    servers: Vec<String>,
    /// Management API client; absent when no REST address is configured.
    rest: Option<RestClient>,
    /// Mount/unmount primitive.
    mounter: Arc<dyn MountExecutor>,
    /// Mount bookkeeping, serialized by this single lock.
    state: Mutex<MountRegistry>,
}

impl GlusterDriver {
    /// Create a driver with the production [`GlusterfsMounter`].
    pub fn new(config: DriverConfig) -> Self {
        let mounter = Arc::new(GlusterfsMounter::new(
            config.servers.clone(),
            config.selection,
        ));
        Self::with_mounter(config, mounter)
    }

    /// Create a driver with a caller-supplied mount executor. Used by tests
    /// to substitute deterministic fakes for the real system calls.
    pub fn with_mounter(config: DriverConfig, mounter: Arc<dyn MountExecutor>) -> Self {
        let rest = config
            .rest_address
            .map(|addr| RestClient::new(addr, config.remote_base));
        Self {
            root: config.root,
            servers: config.servers,
            rest,
            mounter,
            state: Mutex::new(MountRegistry::new()),
        }
    }

    /// Derived local mountpoint for a volume: `<root>/<name>`.
    fn mountpoint(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[async_trait]
impl VolumeDriver for GlusterDriver {
    #[instrument(skip(self))]
    async fn create(&self, name: &str) -> Result<(), VolumeError> {
        let mountpoint = self.mountpoint(name);
        let state = self.state.lock().await;
        info!(name, "creating volume");

        // Already tracked locally: nothing to provision.
        if state.lookup(&mountpoint).is_some() {
            return Ok(());
        }

        if let Some(rest) = &self.rest {
            if !rest.volume_exists(name).await? {
                rest.create_volume(name, &self.servers).await?;
            }
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, name: &str) -> Result<(), VolumeError> {
        let mountpoint = self.mountpoint(name);
        let mut state = self.state.lock().await;
        info!(name, "removing volume");

        // Removal of a never-mounted volume is tolerated.
        let Some(connections) = state.lookup(&mountpoint).map(|rec| rec.connections) else {
            return Ok(());
        };

        if connections <= 1 {
            if let Some(rest) = &self.rest {
                // On failure the record is left behind and the error
                // surfaces to the caller.
                rest.stop_volume(name).await?;
            }
            state.remove_if_at_most(&mountpoint, 1);
        } else {
            debug!(name, connections, "volume still held, leaving record untouched");
        }
        Ok(())
    }

    async fn path(&self, name: &str) -> Result<PathBuf, VolumeError> {
        Ok(self.mountpoint(name))
    }

    #[instrument(skip(self))]
    async fn mount(&self, name: &str) -> Result<PathBuf, VolumeError> {
        let mountpoint = self.mountpoint(name);
        let mut state = self.state.lock().await;
        info!(name, mountpoint = %mountpoint.display(), "mounting volume");

        // A live record means the volume is already attached; just join it.
        // A drained (zero-count) record does not count as attached and falls
        // through to a fresh mount.
        if state
            .lookup(&mountpoint)
            .is_some_and(|rec| rec.connections > 0)
        {
            let connections = state.increment(&mountpoint);
            debug!(name, ?connections, "volume already mounted, joining");
            return Ok(mountpoint);
        }

        match tokio::fs::symlink_metadata(&mountpoint).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let mut builder = tokio::fs::DirBuilder::new();
                builder.recursive(true).mode(0o755);
                builder.create(&mountpoint).await.map_err(VolumeError::io)?;
            }
            Err(e) => return Err(VolumeError::io(e)),
            Ok(meta) if !meta.is_dir() => {
                return Err(VolumeError::NotADirectory(
                    mountpoint.display().to_string(),
                ));
            }
            Ok(_) => {}
        }

        // Registry mutation happens only after a successful mount, so a
        // failure here leaves no partial record.
        self.mounter.mount(name, &mountpoint).await?;
        state.insert(mountpoint.clone(), name.to_owned());
        Ok(mountpoint)
    }

    #[instrument(skip(self))]
    async fn unmount(&self, name: &str) -> Result<(), VolumeError> {
        let mountpoint = self.mountpoint(name);
        let mut state = self.state.lock().await;
        info!(name, mountpoint = %mountpoint.display(), "unmounting volume");

        let Some(connections) = state.lookup(&mountpoint).map(|rec| rec.connections) else {
            return Err(VolumeError::NotMounted(mountpoint.display().to_string()));
        };

        match connections {
            // Drained record awaiting `remove`: there is nothing mounted.
            0 => Err(VolumeError::NotMounted(mountpoint.display().to_string())),
            1 => {
                // Last holder: tear down the real mount first. On failure the
                // count stays at 1 so the caller can retry safely. The
                // drained record itself stays in the map until `remove`.
                self.mounter.unmount(&mountpoint).await?;
                state.decrement(&mountpoint);
                Ok(())
            }
            _ => {
                state.decrement(&mountpoint);
                Ok(())
            }
        }
    }

    async fn get(&self, name: &str) -> Result<Volume, VolumeError> {
        let mountpoint = self.mountpoint(name);
        let state = self.state.lock().await;
        match state.lookup(&mountpoint) {
            Some(rec) => Ok(Volume {
                name: rec.name.clone(),
                mountpoint: mountpoint.display().to_string(),
            }),
            None => Err(VolumeError::NotMounted(mountpoint.display().to_string())),
        }
    }

    async fn list(&self) -> Result<Vec<Volume>, VolumeError> {
        Ok(self.state.lock().await.volumes())
    }

    async fn capabilities(&self) -> Result<Capabilities, VolumeError> {
        Ok(Capabilities {
            scope: CapabilityScope::Local,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Deterministic executor recording every invocation, with switchable
    /// canned failures.
    struct FakeMounter {
        mounts: StdMutex<Vec<(String, PathBuf)>>,
        unmounts: StdMutex<Vec<PathBuf>>,
        fail_mount: AtomicBool,
        fail_unmount: AtomicBool,
    }

    impl FakeMounter {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                mounts: StdMutex::new(Vec::new()),
                unmounts: StdMutex::new(Vec::new()),
                fail_mount: AtomicBool::new(false),
                fail_unmount: AtomicBool::new(false),
            })
        }

        fn mount_calls(&self) -> usize {
            self.mounts.lock().unwrap().len()
        }

        fn unmount_calls(&self) -> usize {
            self.unmounts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MountExecutor for FakeMounter {
        async fn mount(&self, volume: &str, mountpoint: &Path) -> Result<(), VolumeError> {
            if self.fail_mount.load(Ordering::SeqCst) {
                return Err(VolumeError::MountFailed {
                    path: mountpoint.display().to_string(),
                    reason: "canned failure".into(),
                });
            }
            self.mounts
                .lock()
                .unwrap()
                .push((volume.to_owned(), mountpoint.to_owned()));
            Ok(())
        }

        async fn unmount(&self, mountpoint: &Path) -> Result<(), VolumeError> {
            if self.fail_unmount.load(Ordering::SeqCst) {
                return Err(VolumeError::UnmountFailed {
                    path: mountpoint.display().to_string(),
                    reason: "canned failure".into(),
                });
            }
            self.unmounts.lock().unwrap().push(mountpoint.to_owned());
            Ok(())
        }
    }

    fn make_driver(root: &Path) -> (GlusterDriver, Arc<FakeMounter>) {
        let mounter = FakeMounter::new();
        let config = DriverConfig {
            root: root.to_owned(),
            servers: vec!["gfs-1:24007".into()],
            ..Default::default()
        };
        (
            GlusterDriver::with_mounter(config, mounter.clone()),
            mounter,
        )
    }

    async fn connections(driver: &GlusterDriver, name: &str) -> Option<u32> {
        let mountpoint = driver.mountpoint(name);
        driver
            .state
            .lock()
            .await
            .lookup(&mountpoint)
            .map(|rec| rec.connections)
    }

    #[tokio::test]
    async fn mount_twice_runs_one_mount() {
        let tmp = tempfile::tempdir().unwrap();
        let (driver, mounter) = make_driver(tmp.path());

        let first = driver.mount("data1").await.unwrap();
        let second = driver.mount("data1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, tmp.path().join("data1"));
        assert_eq!(mounter.mount_calls(), 1);
        assert_eq!(connections(&driver, "data1").await, Some(2));
    }

    #[tokio::test]
    async fn unmount_tears_down_on_last_holder_only() {
        let tmp = tempfile::tempdir().unwrap();
        let (driver, mounter) = make_driver(tmp.path());

        driver.mount("data1").await.unwrap();
        driver.mount("data1").await.unwrap();

        driver.unmount("data1").await.unwrap();
        assert_eq!(mounter.unmount_calls(), 0);
        assert_eq!(connections(&driver, "data1").await, Some(1));

        driver.unmount("data1").await.unwrap();
        assert_eq!(mounter.unmount_calls(), 1);
        // The drained record stays in the map until `remove`.
        assert_eq!(connections(&driver, "data1").await, Some(0));
        assert_eq!(driver.list().await.unwrap().len(), 1);
        assert!(driver.get("data1").await.is_ok());
    }

    #[tokio::test]
    async fn mount_after_drain_is_a_fresh_mount() {
        let tmp = tempfile::tempdir().unwrap();
        let (driver, mounter) = make_driver(tmp.path());

        driver.mount("data1").await.unwrap();
        driver.unmount("data1").await.unwrap();
        assert_eq!(connections(&driver, "data1").await, Some(0));

        // A zero-count record must not short-circuit: the primitive runs
        // again and the count restarts at one.
        driver.mount("data1").await.unwrap();
        assert_eq!(mounter.mount_calls(), 2);
        assert_eq!(connections(&driver, "data1").await, Some(1));
    }

    #[tokio::test]
    async fn unmount_unknown_volume_is_not_mounted() {
        let tmp = tempfile::tempdir().unwrap();
        let (driver, mounter) = make_driver(tmp.path());

        let err = driver.unmount("ghost").await.unwrap_err();
        assert!(matches!(err, VolumeError::NotMounted(_)));
        assert_eq!(mounter.unmount_calls(), 0);
    }

    #[tokio::test]
    async fn unmount_on_drained_record_is_not_mounted() {
        let tmp = tempfile::tempdir().unwrap();
        let (driver, mounter) = make_driver(tmp.path());

        driver.mount("data1").await.unwrap();
        driver.unmount("data1").await.unwrap();

        // Count never goes negative.
        let err = driver.unmount("data1").await.unwrap_err();
        assert!(matches!(err, VolumeError::NotMounted(_)));
        assert_eq!(connections(&driver, "data1").await, Some(0));
        assert_eq!(mounter.unmount_calls(), 1);
    }

    #[tokio::test]
    async fn failed_unmount_keeps_count() {
        let tmp = tempfile::tempdir().unwrap();
        let (driver, mounter) = make_driver(tmp.path());

        driver.mount("data1").await.unwrap();
        mounter.fail_unmount.store(true, Ordering::SeqCst);

        let err = driver.unmount("data1").await.unwrap_err();
        assert!(matches!(err, VolumeError::UnmountFailed { .. }));
        assert_eq!(connections(&driver, "data1").await, Some(1));

        // Retry succeeds once the primitive recovers.
        mounter.fail_unmount.store(false, Ordering::SeqCst);
        driver.unmount("data1").await.unwrap();
        assert_eq!(connections(&driver, "data1").await, Some(0));
    }

    #[tokio::test]
    async fn failed_mount_leaves_no_record() {
        let tmp = tempfile::tempdir().unwrap();
        let (driver, mounter) = make_driver(tmp.path());
        mounter.fail_mount.store(true, Ordering::SeqCst);

        let err = driver.mount("data1").await.unwrap_err();
        assert!(matches!(err, VolumeError::MountFailed { .. }));
        assert_eq!(connections(&driver, "data1").await, None);
        assert!(driver.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mount_rejects_non_directory_mountpoint() {
        let tmp = tempfile::tempdir().unwrap();
        let (driver, mounter) = make_driver(tmp.path());
        std::fs::write(tmp.path().join("data1"), b"in the way").unwrap();

        let err = driver.mount("data1").await.unwrap_err();
        assert!(matches!(err, VolumeError::NotADirectory(_)));
        assert_eq!(mounter.mount_calls(), 0);
        assert_eq!(connections(&driver, "data1").await, None);
    }

    #[tokio::test]
    async fn mount_creates_missing_mountpoint_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let (driver, _mounter) = make_driver(&tmp.path().join("nested"));

        driver.mount("data1").await.unwrap();
        assert!(tmp.path().join("nested/data1").is_dir());
    }

    #[tokio::test]
    async fn remove_is_a_noop_while_multiply_held() {
        let tmp = tempfile::tempdir().unwrap();
        let (driver, _mounter) = make_driver(tmp.path());

        driver.mount("data1").await.unwrap();
        driver.mount("data1").await.unwrap();

        driver.remove("data1").await.unwrap();
        assert_eq!(connections(&driver, "data1").await, Some(2));
    }

    #[tokio::test]
    async fn remove_reclaims_singly_held_record() {
        let tmp = tempfile::tempdir().unwrap();
        let (driver, _mounter) = make_driver(tmp.path());

        driver.mount("data1").await.unwrap();
        driver.remove("data1").await.unwrap();
        assert_eq!(connections(&driver, "data1").await, None);
        assert!(driver.get("data1").await.is_err());
    }

    #[tokio::test]
    async fn remove_reclaims_drained_record() {
        let tmp = tempfile::tempdir().unwrap();
        let (driver, _mounter) = make_driver(tmp.path());

        driver.mount("data1").await.unwrap();
        driver.unmount("data1").await.unwrap();
        driver.remove("data1").await.unwrap();
        assert!(driver.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_of_unknown_volume_succeeds_silently() {
        let tmp = tempfile::tempdir().unwrap();
        let (driver, _mounter) = make_driver(tmp.path());

        driver.remove("never-mounted").await.unwrap();
        assert!(driver.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_without_rest_client_is_local_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let (driver, mounter) = make_driver(tmp.path());

        driver.create("v1").await.unwrap();
        assert_eq!(mounter.mount_calls(), 0);
        assert!(driver.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn path_is_pure_and_ignores_mount_state() {
        let (driver, _mounter) = make_driver(Path::new("/mnt/v"));
        let path = driver.path("data1").await.unwrap();
        assert_eq!(path, Path::new("/mnt/v/data1"));
        assert!(driver.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn refcount_matches_mounts_minus_unmounts() {
        let tmp = tempfile::tempdir().unwrap();
        let (driver, _mounter) = make_driver(tmp.path());

        for _ in 0..5 {
            driver.mount("data1").await.unwrap();
        }
        for _ in 0..3 {
            driver.unmount("data1").await.unwrap();
        }
        assert_eq!(connections(&driver, "data1").await, Some(2));
    }

    #[tokio::test]
    async fn capabilities_are_local_scope() {
        let (driver, _mounter) = make_driver(Path::new("/mnt/v"));
        let caps = driver.capabilities().await.unwrap();
        assert_eq!(caps.scope, CapabilityScope::Local);
    }

    #[tokio::test]
    async fn get_reports_name_and_mountpoint() {
        let tmp = tempfile::tempdir().unwrap();
        let (driver, _mounter) = make_driver(tmp.path());

        driver.mount("data1").await.unwrap();
        let vol = driver.get("data1").await.unwrap();
        assert_eq!(vol.name, "data1");
        assert_eq!(vol.mountpoint, tmp.path().join("data1").display().to_string());
    }
}
