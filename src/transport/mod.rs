//! QUIC transport layer for the volume plugin protocol.
//!
//! This module provides [`PluginClient`] and [`PluginServer`] that
//! communicate [`PluginMessage`](crate::message::PluginMessage) values over
//! QUIC bi-directional streams using `quinn`.

pub mod client;
pub mod server;

pub use client::PluginClient;
pub use server::PluginServer;
