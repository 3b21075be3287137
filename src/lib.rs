//! # libgluster — GlusterFS volume driver for container orchestrators
//!
//! `libgluster` manages the lifecycle of GlusterFS mounts on a host. It
//! tracks how many concurrent consumers hold each named volume and
//! guarantees that the underlying mount/unmount invocations happen exactly
//! on the zero-crossing transitions of that reference count, under
//! concurrent access from multiple callers. Volumes can additionally be
//! provisioned and stopped on a remote cluster through its management REST
//! API.
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`types`] | Caller-facing data model: `Volume`, `Capabilities`. |
//! | [`error`] | [`VolumeError`] enum covering all failure modes. |
//! | [`message`] | [`PluginMessage`] protocol envelope for QUIC transport. |
//! | [`driver`] | [`VolumeDriver`] trait — the eight lifecycle operations. |
//! | [`registry`] | Reference-counted mountpoint bookkeeping. |
//! | [`mount`] | [`MountExecutor`] trait + the `glusterfs`/`umount` shell-out. |
//! | [`rest`] | HTTP client for the cluster management API. |
//! | [`gluster`] | [`GlusterDriver`] — the concrete driver. |
//! | [`transport`] | QUIC client/server built on `quinn`. |
//! | [`config`] | [`DriverConfig`] startup configuration. |

pub mod config;
pub mod driver;
pub mod error;
pub mod gluster;
pub mod message;
pub mod mount;
pub mod registry;
pub mod rest;
pub mod transport;
pub mod types;

// Re-export the most commonly used items at crate root for convenience.
pub use config::DriverConfig;
pub use driver::VolumeDriver;
pub use error::VolumeError;
pub use gluster::GlusterDriver;
pub use message::PluginMessage;
pub use mount::{MountExecutor, ServerSelection};
pub use types::*;
