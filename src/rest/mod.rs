//! HTTP client for the GlusterFS cluster management REST API.
//!
//! Every response from the API is wrapped in a uniform `{ok, error}`
//! envelope; [`client::RestClient`] translates that envelope into typed
//! outcomes. All calls are single synchronous attempts with no retries.

pub mod client;

pub use client::{Peer, RemoteVolume, RestClient};
