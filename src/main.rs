//! `gluster-volume-plugin` — serves the volume driver over QUIC.

use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use libgluster::config::{DEFAULT_REMOTE_BASE, DEFAULT_ROOT, DriverConfig};
use libgluster::gluster::GlusterDriver;
use libgluster::mount::ServerSelection;
use libgluster::transport::PluginServer;

#[derive(Parser, Debug)]
#[command(about = "GlusterFS volume driver for container orchestrators")]
struct Args {
    /// Comma-separated list of GlusterFS servers.
    #[arg(long)]
    servers: String,

    /// GlusterFS volumes root directory.
    #[arg(long, default_value = DEFAULT_ROOT)]
    root: PathBuf,

    /// Base address of the cluster management REST API
    /// (e.g. http://gfs-1:8080). When omitted, create/remove skip all
    /// remote provisioning calls.
    #[arg(long)]
    rest_address: Option<String>,

    /// Remote base directory for brick paths of provisioned volumes.
    #[arg(long, default_value = DEFAULT_REMOTE_BASE)]
    base_dir: PathBuf,

    /// How the mounter picks volfile servers.
    #[arg(long, value_enum, default_value_t = ServerSelection::Random)]
    selection: ServerSelection,

    /// Address the QUIC listener binds to.
    #[arg(long, default_value = "0.0.0.0:8582")]
    listen: SocketAddr,

    /// Path to the server certificate chain (PEM).
    #[arg(long)]
    cert: PathBuf,

    /// Path to the server private key (PEM).
    #[arg(long)]
    key: PathBuf,
}

fn load_tls(cert_path: &Path, key_path: &Path) -> anyhow::Result<rustls::ServerConfig> {
    let mut cert_reader = BufReader::new(
        File::open(cert_path).with_context(|| format!("open {}", cert_path.display()))?,
    );
    let certs = rustls_pemfile::certs(&mut cert_reader)
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("parse certificates from {}", cert_path.display()))?;

    let mut key_reader = BufReader::new(
        File::open(key_path).with_context(|| format!("open {}", key_path.display()))?,
    );
    let key = rustls_pemfile::private_key(&mut key_reader)
        .with_context(|| format!("parse private key from {}", key_path.display()))?
        .with_context(|| format!("no private key found in {}", key_path.display()))?;

    rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("build TLS config")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let servers: Vec<String> = args
        .servers
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();
    if servers.is_empty() {
        bail!("at least one GlusterFS server is required (--servers)");
    }

    let config = DriverConfig {
        root: args.root,
        servers,
        rest_address: args.rest_address,
        remote_base: args.base_dir,
        selection: args.selection,
    };
    info!(root = %config.root.display(), servers = ?config.servers, "starting volume driver");

    let driver = Arc::new(GlusterDriver::new(config));
    let tls = load_tls(&args.cert, &args.key)?;
    let server = PluginServer::new(args.listen, tls, driver)?;
    server.serve().await?;
    Ok(())
}
