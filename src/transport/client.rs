//! QUIC client used by the orchestrator side to issue plugin requests.

use std::net::SocketAddr;
use std::sync::Arc;

use quinn::crypto::rustls::QuicClientConfig;
use tracing::{debug, instrument};

use crate::error::VolumeError;
use crate::message::PluginMessage;

/// A lightweight client that sends [`PluginMessage`] requests over a single
/// QUIC connection and returns the server's response.
pub struct PluginClient {
    connection: quinn::Connection,
}

impl PluginClient {
    /// Establish a new QUIC connection to the plugin server at `addr`.
    ///
    /// * `addr` — socket address of the remote plugin server
    /// * `server_name` — TLS SNI name that must match a SAN in the server's
    ///   certificate
    /// * `tls_config` — client TLS configuration
    pub async fn connect(
        addr: SocketAddr,
        server_name: &str,
        tls_config: rustls::ClientConfig,
    ) -> Result<Self, VolumeError> {
        let quic_client_config = QuicClientConfig::try_from(tls_config)
            .map_err(|e| VolumeError::TransportError(format!("invalid TLS config: {e}")))?;
        let client_config = quinn::ClientConfig::new(Arc::new(quic_client_config));

        let mut endpoint = quinn::Endpoint::client(
            "0.0.0.0:0"
                .parse()
                .map_err(VolumeError::internal)?,
        )
        .map_err(VolumeError::transport)?;
        endpoint.set_default_client_config(client_config);

        let connection = endpoint
            .connect(addr, server_name)
            .map_err(VolumeError::transport)?
            .await
            .map_err(VolumeError::transport)?;

        debug!(%addr, %server_name, "plugin QUIC connection established");
        Ok(Self { connection })
    }

    /// Send a request and wait for the corresponding response.
    ///
    /// Each call opens a new bi-directional QUIC stream, writes the
    /// JSON-serialized request, finishes the send side, then reads the full
    /// response and deserializes it.
    #[instrument(skip(self), fields(msg = %msg))]
    pub async fn request(&self, msg: &PluginMessage) -> Result<PluginMessage, VolumeError> {
        let (mut send, mut recv) = self
            .connection
            .open_bi()
            .await
            .map_err(VolumeError::transport)?;

        let payload = serde_json::to_vec(msg).map_err(VolumeError::internal)?;
        send.write_all(&payload)
            .await
            .map_err(VolumeError::transport)?;
        send.finish().map_err(VolumeError::transport)?;

        let buf = recv
            .read_to_end(16 * 1024 * 1024)
            .await
            .map_err(VolumeError::transport)?;

        let response: PluginMessage =
            serde_json::from_slice(&buf).map_err(VolumeError::transport)?;
        debug!(%response, "plugin response received");
        Ok(response)
    }

    /// Close the underlying QUIC connection gracefully.
    pub fn close(&self) {
        self.connection
            .close(quinn::VarInt::from_u32(0), b"client shutdown");
    }
}
