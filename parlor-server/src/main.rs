//! parlor-server: accepts connections, runs the per-connection session
//! machine, and brokers encrypted direct messages between registered
//! clients.

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rsa::pkcs8::DecodePrivateKey;
use tokio::net::TcpListener;

use parlor_net::Server;
use parlor_net::store::memory::MemoryStore;

use config::{Args, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::resolve(args)?;

    tracing_subscriber::fmt().with_env_filter(config.log.clone()).compact().init();

    let key_pem = std::fs::read_to_string(&config.key_file)
        .with_context(|| format!("failed to read key file {:?}", config.key_file))?;
    let private_key = rsa::RsaPrivateKey::from_pkcs8_pem(&key_pem)
        .context("failed to parse PKCS#8 PEM private key")?;

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    tracing::info!(addr = %config.listen, "parlor-server listening");

    let server = Server::new(MemoryStore::new(), private_key);

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "failed to accept connection");
                continue;
            }
        };

        let server = Arc::clone(&server);
        tokio::spawn(async move {
            tracing::debug!(%peer_addr, "connection accepted");
            if let Err(e) = server.handle_connection(stream).await {
                tracing::warn!(%peer_addr, error = %e, "session ended with error");
            }
        });
    }
}
