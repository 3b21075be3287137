//! Caller-facing data model shared by the driver trait, transport layer, and
//! driver implementation.
//!
//! These types are all [`Serialize`]/[`Deserialize`] so they can be
//! transmitted over QUIC as JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A volume as reported to the orchestrator: its caller-chosen name and the
/// local path its remote filesystem is (or would be) attached at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Volume {
    /// Caller-chosen unique identifier.
    pub name: String,
    /// Derived local path: `<root>/<name>`.
    pub mountpoint: String,
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.name, self.mountpoint)
    }
}

/// Visibility scope of the mounts this driver manages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityScope {
    /// Mounts are only visible on this host.
    Local,
    /// Mounts are shareable cluster-wide.
    Global,
}

impl fmt::Display for CapabilityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Global => f.write_str("global"),
        }
    }
}

/// Static capability declaration returned by the driver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capabilities {
    /// Mount visibility scope; always [`CapabilityScope::Local`] for this
    /// driver.
    pub scope: CapabilityScope,
}
