//! The REST client that sends management requests to the gluster API.

use std::path::PathBuf;

use hyper::client::HttpConnector;
use hyper::{Body, Method, Request, Uri};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::VolumeError;

const VOLUMES_PATH: &str = "/api/1.0/volumes";
const PEERS_PATH: &str = "/api/1.0/peers";
const VOLUME_CREATE_PATH: &str = "/api/1.0/volume";

/// A cluster member as reported by the management API.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Peer {
    pub id: String,
    pub name: String,
    pub status: String,
}

/// A distributed volume as reported by the management API. Consumed
/// read-only; never cached beyond a single call.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RemoteVolume {
    pub name: String,
    pub uuid: String,
    #[serde(rename = "type")]
    pub volume_type: String,
    pub status: String,
    #[serde(default)]
    pub num_bricks: u32,
    #[serde(default)]
    pub distribute: u32,
    #[serde(default)]
    pub stripe: u32,
    #[serde(default)]
    pub replica: u32,
    #[serde(default)]
    pub transport: String,
}

/// Uniform `{ok, error}` wrapper around every API payload.
#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VolumeListResponse {
    #[serde(flatten)]
    envelope: Envelope,
    #[serde(default)]
    data: Vec<RemoteVolume>,
}

#[derive(Debug, Deserialize)]
struct PeerListResponse {
    #[serde(flatten)]
    envelope: Envelope,
    #[serde(default)]
    data: Vec<Peer>,
}

/// The HTTP client that sends requests to the gluster management API.
///
/// `addr` is the API base address (`http://host:port`); `base` is the remote
/// directory under which one brick per peer is created for new volumes.
pub struct RestClient {
    addr: String,
    base: PathBuf,
    http: hyper::Client<HttpConnector>,
}

impl RestClient {
    pub fn new(addr: impl Into<String>, base: impl Into<PathBuf>) -> Self {
        Self {
            addr: addr.into(),
            base: base.into(),
            http: hyper::Client::new(),
        }
    }

    /// Whether a volume with the given name exists in the cluster.
    ///
    /// Fetches the full remote volume list and matches names exactly;
    /// transport and envelope errors propagate.
    pub async fn volume_exists(&self, name: &str) -> Result<bool, VolumeError> {
        Ok(self.volumes().await?.iter().any(|v| v.name == name))
    }

    /// Fetch the full remote volume list.
    pub async fn volumes(&self) -> Result<Vec<RemoteVolume>, VolumeError> {
        let body = self.get(VOLUMES_PATH).await?;
        parse_volume_list(&body)
    }

    /// Fetch the cluster's peer list.
    pub async fn peers(&self) -> Result<Vec<Peer>, VolumeError> {
        let body = self.get(PEERS_PATH).await?;
        parse_peer_list(&body)
    }

    /// Create (and start) a new replicated volume with one brick per peer.
    ///
    /// No existence pre-check is performed here; avoiding duplicate creation
    /// is the caller's responsibility.
    #[instrument(skip(self))]
    pub async fn create_volume(&self, name: &str, peers: &[String]) -> Result<(), VolumeError> {
        let bricks: Vec<String> = peers
            .iter()
            .map(|p| format!("{}:{}", p, self.brick_path(name).display()))
            .collect();

        let form = form_encode(&[
            ("bricks", bricks.join(",")),
            ("replica", peers.len().to_string()),
            ("transport", "tcp".to_owned()),
            ("start", "true".to_owned()),
            ("force", "true".to_owned()),
        ]);

        let uri = self.uri(&format!("{VOLUME_CREATE_PATH}/{name}"))?;
        debug!(%uri, "creating remote volume");
        let req = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(hyper::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .map_err(VolumeError::transport)?;

        let body = self.send(req).await?;
        check_envelope(&body)
    }

    /// Stop the volume with the given name in the cluster.
    #[instrument(skip(self))]
    pub async fn stop_volume(&self, name: &str) -> Result<(), VolumeError> {
        let uri = self.uri(&format!("{VOLUME_CREATE_PATH}/{name}/stop"))?;
        let req = Request::builder()
            .method(Method::PUT)
            .uri(uri)
            .body(Body::empty())
            .map_err(VolumeError::transport)?;

        let body = self.send(req).await?;
        check_envelope(&body)
    }

    /// Remote brick directory for a volume: `<base>/<name>`.
    fn brick_path(&self, name: &str) -> PathBuf {
        self.base.join(name)
    }

    fn uri(&self, path: &str) -> Result<Uri, VolumeError> {
        format!("{}{}", self.addr, path)
            .parse()
            .map_err(VolumeError::transport)
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, VolumeError> {
        let uri = self.uri(path)?;
        let res = self.http.get(uri).await.map_err(VolumeError::transport)?;
        let bytes = hyper::body::to_bytes(res.into_body())
            .await
            .map_err(VolumeError::transport)?;
        Ok(bytes.to_vec())
    }

    async fn send(&self, req: Request<Body>) -> Result<Vec<u8>, VolumeError> {
        let res = self.http.request(req).await.map_err(VolumeError::transport)?;
        let bytes = hyper::body::to_bytes(res.into_body())
            .await
            .map_err(VolumeError::transport)?;
        Ok(bytes.to_vec())
    }
}

/// Decode a bare `{ok, error}` envelope, mapping `ok: false` to
/// [`VolumeError::RemoteRejected`] and undecodable bodies to
/// [`VolumeError::TransportError`].
fn check_envelope(body: &[u8]) -> Result<(), VolumeError> {
    let envelope: Envelope = serde_json::from_slice(body).map_err(VolumeError::transport)?;
    envelope_ok(envelope)
}

fn envelope_ok(envelope: Envelope) -> Result<(), VolumeError> {
    if envelope.ok {
        Ok(())
    } else {
        Err(VolumeError::RemoteRejected(
            envelope.error.unwrap_or_default(),
        ))
    }
}

fn parse_volume_list(body: &[u8]) -> Result<Vec<RemoteVolume>, VolumeError> {
    let res: VolumeListResponse = serde_json::from_slice(body).map_err(VolumeError::transport)?;
    envelope_ok(res.envelope)?;
    Ok(res.data)
}

fn parse_peer_list(body: &[u8]) -> Result<Vec<Peer>, VolumeError> {
    let res: PeerListResponse = serde_json::from_slice(body).map_err(VolumeError::transport)?;
    envelope_ok(res.envelope)?;
    Ok(res.data)
}

/// Encode key/value pairs as `application/x-www-form-urlencoded`.
fn form_encode(pairs: &[(&str, String)]) -> String {
    let mut out = String::new();
    for (key, value) in pairs {
        if !out.is_empty() {
            out.push('&');
        }
        out.push_str(key);
        out.push('=');
        out.push_str(&percent_encode(value));
    }
    out
}

fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn volume_list_with_matching_name() {
        let body = br#"{"ok":true,"data":[{"name":"v1","uuid":"u-1","type":"replicate","status":"started","num_bricks":2,"distribute":1,"stripe":1,"replica":2,"transport":"tcp"}]}"#;
        let vols = parse_volume_list(body).expect("parse");
        assert_eq!(vols.len(), 1);
        assert_eq!(vols[0].name, "v1");
        assert_eq!(vols[0].volume_type, "replicate");
        assert!(vols.iter().any(|v| v.name == "v1"));
        assert!(!vols.iter().any(|v| v.name == "v2"));
    }

    #[test]
    fn envelope_rejection_carries_error_text() {
        let body = br#"{"ok":false,"error":"down"}"#;
        let err = parse_volume_list(body).expect_err("must fail");
        assert!(err.to_string().contains("down"));
        assert!(matches!(err, VolumeError::RemoteRejected(_)));
    }

    #[test]
    fn undecodable_body_is_a_transport_error() {
        let err = check_envelope(b"<html>502 Bad Gateway</html>").expect_err("must fail");
        assert!(matches!(err, VolumeError::TransportError(_)));
    }

    #[test]
    fn check_envelope_ok() {
        assert!(check_envelope(br#"{"ok":true}"#).is_ok());
        assert!(check_envelope(br#"{"ok":false,"error":"volume exists"}"#).is_err());
    }

    #[test]
    fn peer_list_parses() {
        let body =
            br#"{"ok":true,"data":[{"id":"p-1","name":"gfs-1","status":"connected"}]}"#;
        let peers = parse_peer_list(body).expect("parse");
        assert_eq!(peers[0].name, "gfs-1");
    }

    #[test]
    fn form_encoding_escapes_brick_specs() {
        let form = form_encode(&[
            ("bricks", "gfs-1:/var/lib/gluster/volumes/v1".to_owned()),
            ("replica", "1".to_owned()),
        ]);
        assert_eq!(
            form,
            "bricks=gfs-1%3A%2Fvar%2Flib%2Fgluster%2Fvolumes%2Fv1&replica=1"
        );
    }

    #[test]
    fn brick_path_joins_base_and_name() {
        let client = RestClient::new("http://gfs-1:8080", "/var/lib/gluster/volumes");
        assert_eq!(
            client.brick_path("v1"),
            Path::new("/var/lib/gluster/volumes/v1")
        );
    }
}
