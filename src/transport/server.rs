//! QUIC server that listens for orchestrator requests and dispatches them
//! into a [`VolumeDriver`] implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use quinn::crypto::rustls::QuicServerConfig;
use tracing::{debug, error, info, instrument, warn};

use crate::driver::VolumeDriver;
use crate::error::VolumeError;
use crate::message::PluginMessage;

/// A plugin server that accepts QUIC connections and dispatches
/// [`PluginMessage`] requests to a [`VolumeDriver`] implementation.
pub struct PluginServer<T> {
    endpoint: quinn::Endpoint,
    driver: Arc<T>,
}

impl<T> PluginServer<T>
where
    T: VolumeDriver + 'static,
{
    /// Create a new server bound to `addr`.
    pub fn new(
        addr: SocketAddr,
        tls_config: rustls::ServerConfig,
        driver: Arc<T>,
    ) -> Result<Self, VolumeError> {
        let quic_server_config = QuicServerConfig::try_from(tls_config)
            .map_err(|e| VolumeError::TransportError(format!("invalid TLS config: {e}")))?;
        let server_config = quinn::ServerConfig::with_crypto(Arc::new(quic_server_config));
        let endpoint =
            quinn::Endpoint::server(server_config, addr).map_err(VolumeError::transport)?;
        info!(%addr, "volume plugin QUIC server listening");
        Ok(Self { endpoint, driver })
    }

    /// Accept connections in a loop until the endpoint is closed.
    ///
    /// Each accepted connection spawns a Tokio task, and each bi-stream
    /// within a connection is handled concurrently. The driver's internal
    /// lock serializes the registry mutations.
    pub async fn serve(&self) -> Result<(), VolumeError> {
        while let Some(incoming) = self.endpoint.accept().await {
            let driver = Arc::clone(&self.driver);
            tokio::spawn(async move {
                match incoming.await {
                    Ok(conn) => {
                        let remote = conn.remote_address();
                        debug!(%remote, "plugin connection accepted");
                        if let Err(e) = Self::handle_connection(conn, driver).await {
                            warn!(%remote, error = %e, "plugin connection error");
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "incoming plugin connection failed");
                    }
                }
            });
        }
        Ok(())
    }

    /// Handle all bi-streams on a single connection.
    async fn handle_connection(conn: quinn::Connection, driver: Arc<T>) -> Result<(), VolumeError> {
        loop {
            let (send, recv) = match conn.accept_bi().await {
                Ok(stream) => stream,
                Err(quinn::ConnectionError::ApplicationClosed(_)) => return Ok(()),
                Err(e) => return Err(VolumeError::transport(e)),
            };

            let driver = Arc::clone(&driver);
            tokio::spawn(async move {
                if let Err(e) = Self::handle_stream(send, recv, &driver).await {
                    error!(error = %e, "plugin stream handler error");
                }
            });
        }
    }

    /// Process a single bi-stream: read request → dispatch → write response.
    #[instrument(skip_all)]
    async fn handle_stream(
        mut send: quinn::SendStream,
        mut recv: quinn::RecvStream,
        driver: &T,
    ) -> Result<(), VolumeError> {
        let buf = recv
            .read_to_end(16 * 1024 * 1024)
            .await
            .map_err(VolumeError::transport)?;

        let request: PluginMessage = serde_json::from_slice(&buf)
            .map_err(|e| VolumeError::TransportError(format!("malformed request: {e}")))?;

        debug!(%request, "plugin request received");

        let response = Self::dispatch(driver, request).await;

        let payload = serde_json::to_vec(&response).map_err(VolumeError::internal)?;
        send.write_all(&payload)
            .await
            .map_err(VolumeError::transport)?;
        send.finish().map_err(VolumeError::transport)?;
        Ok(())
    }

    /// Map a [`PluginMessage`] request to the correct driver method call and
    /// wrap the result in a response [`PluginMessage`].
    async fn dispatch(driver: &T, request: PluginMessage) -> PluginMessage {
        match request {
            PluginMessage::Create { name } => match driver.create(&name).await {
                Ok(()) => PluginMessage::Ok,
                Err(e) => PluginMessage::Error(e),
            },
            PluginMessage::Remove { name } => match driver.remove(&name).await {
                Ok(()) => PluginMessage::Ok,
                Err(e) => PluginMessage::Error(e),
            },
            PluginMessage::Path { name } => match driver.path(&name).await {
                Ok(path) => PluginMessage::Mountpoint(path.display().to_string()),
                Err(e) => PluginMessage::Error(e),
            },
            PluginMessage::Mount { name } => match driver.mount(&name).await {
                Ok(path) => PluginMessage::Mountpoint(path.display().to_string()),
                Err(e) => PluginMessage::Error(e),
            },
            PluginMessage::Unmount { name } => match driver.unmount(&name).await {
                Ok(()) => PluginMessage::Ok,
                Err(e) => PluginMessage::Error(e),
            },
            PluginMessage::Get { name } => match driver.get(&name).await {
                Ok(vol) => PluginMessage::VolumeInfo(vol),
                Err(e) => PluginMessage::Error(e),
            },
            PluginMessage::List => match driver.list().await {
                Ok(vols) => PluginMessage::VolumeList(vols),
                Err(e) => PluginMessage::Error(e),
            },
            PluginMessage::Capabilities => match driver.capabilities().await {
                Ok(caps) => PluginMessage::CapabilityInfo(caps),
                Err(e) => PluginMessage::Error(e),
            },

            // Response variants should never arrive as requests.
            other => {
                warn!(msg = %other, "unexpected message variant received as request");
                PluginMessage::Error(VolumeError::InvalidArgument(format!(
                    "unexpected message: {other}"
                )))
            }
        }
    }

    /// Return a reference to the underlying QUIC endpoint, useful for
    /// obtaining the local address or shutting down.
    pub fn endpoint(&self) -> &quinn::Endpoint {
        &self.endpoint
    }
}
