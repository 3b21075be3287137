//! In-memory mount registry: the authoritative record of which volumes are
//! currently mounted and by how many consumers.
//!
//! The registry performs no locking of its own. Callers (the driver) must
//! serialize access behind a single mutex; see [`crate::gluster`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::types::Volume;

/// Reference-counted record for one mountpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRecord {
    /// Caller-chosen volume name.
    pub name: String,
    /// Number of outstanding mount holders.
    pub connections: u32,
}

/// Map from mountpoint path to its [`MountRecord`].
///
/// A record exists iff at least one `mount` has succeeded and no balancing
/// `remove` has reclaimed it. A record whose count has drained to zero stays
/// in the map until `remove`; a later `mount` re-runs the full mount path
/// because of the `connections > 0` guard in the driver.
#[derive(Debug, Default)]
pub struct MountRegistry {
    volumes: HashMap<PathBuf, MountRecord>,
}

impl MountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the record for a mountpoint.
    pub fn lookup(&self, mountpoint: &Path) -> Option<&MountRecord> {
        self.volumes.get(mountpoint)
    }

    /// Create a new record with `connections = 1`, overwriting any stale
    /// zero-count entry left behind by a previous drain.
    pub fn insert(&mut self, mountpoint: PathBuf, name: String) {
        self.volumes
            .insert(mountpoint, MountRecord { name, connections: 1 });
    }

    /// Increment the count for a present mountpoint; returns the new count.
    pub fn increment(&mut self, mountpoint: &Path) -> Option<u32> {
        self.volumes.get_mut(mountpoint).map(|rec| {
            rec.connections += 1;
            rec.connections
        })
    }

    /// Decrement the count for a present mountpoint; returns the new count.
    /// Saturates at zero so the count can never go negative.
    pub fn decrement(&mut self, mountpoint: &Path) -> Option<u32> {
        self.volumes.get_mut(mountpoint).map(|rec| {
            rec.connections = rec.connections.saturating_sub(1);
            rec.connections
        })
    }

    /// Remove the record when its count is at most `threshold`. Returns true
    /// if a record was removed. Used with `threshold = 1` on `remove`,
    /// meaning "last or only remaining consumer".
    pub fn remove_if_at_most(&mut self, mountpoint: &Path, threshold: u32) -> bool {
        match self.volumes.get(mountpoint) {
            Some(rec) if rec.connections <= threshold => {
                self.volumes.remove(mountpoint);
                true
            }
            _ => false,
        }
    }

    /// Enumerate all tracked volumes as the caller-facing representation.
    pub fn volumes(&self) -> Vec<Volume> {
        self.volumes
            .iter()
            .map(|(mountpoint, rec)| Volume {
                name: rec.name.clone(),
                mountpoint: mountpoint.display().to_string(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}
