//! Volume plugin protocol messages transmitted over QUIC.
//!
//! [`PluginMessage`] is the top-level envelope for all request and response
//! variants exchanged between the orchestrator-side client and the driver
//! host via QUIC bi-directional streams.

use serde::{Deserialize, Serialize};

use crate::error::VolumeError;
use crate::types::{Capabilities, Volume};

/// Top-level message envelope for the volume plugin protocol.
///
/// Each QUIC bi-stream carries exactly one request followed by one response.
/// The client sends a *request* variant and the server replies with the
/// corresponding *response* variant (or [`PluginMessage::Error`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PluginMessage {
    // ----- Requests --------------------------------------------------------
    /// Ensure the named volume exists in the cluster.
    Create { name: String },
    /// Reclaim local bookkeeping (and optionally stop the remote volume).
    Remove { name: String },
    /// Query the deterministic mountpoint for a name.
    Path { name: String },
    /// Attach the volume locally, or join an existing attachment.
    Mount { name: String },
    /// Release one attachment; tears down the mount on the last holder.
    Unmount { name: String },
    /// Look up a single tracked volume.
    Get { name: String },
    /// Enumerate all tracked volumes.
    List,
    /// Query the driver's static capabilities.
    Capabilities,

    // ----- Responses -------------------------------------------------------
    /// The local mountpoint for a `Path` or `Mount` request.
    Mountpoint(String),
    /// A single tracked volume.
    VolumeInfo(Volume),
    /// All tracked volumes.
    VolumeList(Vec<Volume>),
    /// Driver capabilities.
    CapabilityInfo(Capabilities),
    /// Generic success acknowledgement (no payload).
    Ok,
    /// An error occurred.
    Error(VolumeError),
}

impl std::fmt::Display for PluginMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create { name } => write!(f, "Create({name})"),
            Self::Remove { name } => write!(f, "Remove({name})"),
            Self::Path { name } => write!(f, "Path({name})"),
            Self::Mount { name } => write!(f, "Mount({name})"),
            Self::Unmount { name } => write!(f, "Unmount({name})"),
            Self::Get { name } => write!(f, "Get({name})"),
            Self::List => f.write_str("List"),
            Self::Capabilities => f.write_str("Capabilities"),
            Self::Mountpoint(m) => write!(f, "Mountpoint({m})"),
            Self::VolumeInfo(v) => write!(f, "VolumeInfo({})", v.name),
            Self::VolumeList(vs) => write!(f, "VolumeList(count={})", vs.len()),
            Self::CapabilityInfo(c) => write!(f, "CapabilityInfo(scope={})", c.scope),
            Self::Ok => f.write_str("Ok"),
            Self::Error(e) => write!(f, "Error({e})"),
        }
    }
}
