//! Volume driver error types.
//!
//! All errors in the `libgluster` crate are represented by the
//! [`VolumeError`] enum, which derives [`thiserror::Error`] for ergonomic
//! error handling and also implements [`Serialize`]/[`Deserialize`] so errors
//! can travel across the QUIC transport layer back to the orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for volume driver operations.
#[derive(Debug, Error, Serialize, Deserialize, Clone)]
pub enum VolumeError {
    /// `unmount`/`get` referenced a mountpoint with no registry record.
    #[error("no volume mounted on {0}")]
    NotMounted(String),

    /// The target mountpoint path exists but is not a directory.
    #[error("{0} already exists and it's not a directory")]
    NotADirectory(String),

    /// The mount primitive exited non-zero.
    #[error("mount failed at {path}: {reason}")]
    MountFailed {
        /// Filesystem path where the mount was attempted.
        path: String,
        /// Captured output or exit status of the mount primitive.
        reason: String,
    },

    /// The unmount primitive exited non-zero.
    #[error("unmount failed at {path}: {reason}")]
    UnmountFailed {
        /// Filesystem path where the unmount was attempted.
        path: String,
        /// Captured output or exit status of the unmount primitive.
        reason: String,
    },

    /// The cluster API answered with a well-formed envelope whose `ok` flag
    /// is false; the payload is the envelope's error text.
    #[error("cluster rejected request: {0}")]
    RemoteRejected(String),

    /// An HTTP or QUIC request failed to complete, or its body failed to
    /// decode.
    #[error("transport error: {0}")]
    TransportError(String),

    /// Directory creation / stat errors other than "not found".
    #[error("i/o error: {0}")]
    Io(String),

    /// The caller supplied an invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An unclassified internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VolumeError {
    /// Create a [`VolumeError::TransportError`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn transport<E: std::fmt::Display>(e: E) -> Self {
        Self::TransportError(e.to_string())
    }

    /// Create a [`VolumeError::Io`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn io<E: std::fmt::Display>(e: E) -> Self {
        Self::Io(e.to_string())
    }

    /// Create a [`VolumeError::Internal`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }
}
