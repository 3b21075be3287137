//! Driver configuration.

use std::path::PathBuf;

use crate::mount::ServerSelection;

/// Default root directory for local mountpoints, matching the Docker volume
/// plugin convention.
pub const DEFAULT_ROOT: &str = "/var/lib/docker/volumes/_glusterfs";

/// Default remote base directory under which brick paths are created.
pub const DEFAULT_REMOTE_BASE: &str = "/var/lib/gluster/volumes";

/// Configuration for a [`GlusterDriver`](crate::gluster::GlusterDriver)
/// instance, constructed once at startup.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Root directory for local mountpoints; a volume's mountpoint is
    /// `<root>/<name>`.
    pub root: PathBuf,
    /// GlusterFS server endpoints used both as volfile servers for mounts
    /// and as peers when provisioning new volumes.
    pub servers: Vec<String>,
    /// Base address of the cluster management REST API
    /// (`http://host:port`). When absent, `create`/`remove` skip all remote
    /// calls.
    pub rest_address: Option<String>,
    /// Remote base directory for brick paths of provisioned volumes.
    pub remote_base: PathBuf,
    /// How the mounter picks volfile servers.
    pub selection: ServerSelection,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            servers: Vec::new(),
            rest_address: None,
            remote_base: PathBuf::from(DEFAULT_REMOTE_BASE),
            selection: ServerSelection::Random,
        }
    }
}
