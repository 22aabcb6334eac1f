//! CLI arguments and config-file merging.
//!
//! Precedence: CLI flags win; anything left unset falls back to the
//! `--config` TOML file; anything still unset falls back to a built-in
//! default.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

/// parlor-server: the server binary for the parlor direct-messaging
/// protocol.
#[derive(Parser, Debug)]
#[command(name = "parlor-server", version, about)]
pub struct Args {
    /// Address to listen on, e.g. `0.0.0.0:7331`.
    #[arg(long, env = "PARLOR_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Path to the server's RSA private key (PKCS#8 PEM).
    #[arg(long, env = "PARLOR_KEY_FILE")]
    pub key_file: Option<PathBuf>,

    /// Log filter override, e.g. `parlor_net=debug,info`.
    #[arg(long, env = "PARLOR_LOG")]
    pub log: Option<String>,

    /// Optional TOML config file supplying any of the above fields not
    /// given on the command line.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// The fields [`Args`] can also be supplied by, loaded from a TOML file.
#[derive(Deserialize, Default)]
struct FileConfig {
    listen: Option<SocketAddr>,
    key_file: Option<PathBuf>,
    log: Option<String>,
}

/// Fully resolved configuration: every field has a value.
pub struct Config {
    /// Address to bind the TCP listener to.
    pub listen: SocketAddr,
    /// Path to the PKCS#8 PEM-encoded RSA private key.
    pub key_file: PathBuf,
    /// The `tracing_subscriber::EnvFilter` directive string.
    pub log: String,
}

const DEFAULT_LISTEN: &str = "127.0.0.1:7331";
const DEFAULT_LOG: &str = "info";

impl Config {
    /// Resolve CLI args, a config file, and defaults into a [`Config`].
    pub fn resolve(args: Args) -> anyhow::Result<Self> {
        let file = match &args.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| anyhow::anyhow!("failed to read config file {path:?}: {e}"))?;
                toml::from_str(&text)
                    .map_err(|e| anyhow::anyhow!("failed to parse config file {path:?}: {e}"))?
            }
            None => FileConfig::default(),
        };

        let listen = args
            .listen
            .or(file.listen)
            .unwrap_or_else(|| DEFAULT_LISTEN.parse().expect("valid default listen address"));

        let key_file = args
            .key_file
            .or(file.key_file)
            .ok_or_else(|| anyhow::anyhow!("no --key-file given on the CLI or in --config"))?;

        let log = args.log.or(file.log).unwrap_or_else(|| DEFAULT_LOG.to_string());

        Ok(Self { listen, key_file, log })
    }
}
