//! Interactive `parlor-client` binary: enough to register or log in and
//! exercise the protocol end to end from a terminal.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rsa::pkcs8::DecodePublicKey;

use parlor_net::Client;

/// parlor-client: a terminal client for the parlor direct-messaging
/// protocol.
#[derive(Parser, Debug)]
#[command(name = "parlor-client", version, about)]
struct Args {
    /// Address of the parlor server, e.g. `127.0.0.1:7331`.
    #[arg(long, env = "PARLOR_SERVER")]
    server: String,

    /// Path to the server's RSA public key (SubjectPublicKeyInfo PEM).
    #[arg(long, env = "PARLOR_SERVER_KEY")]
    server_key: PathBuf,

    /// Log filter override.
    #[arg(long, env = "PARLOR_LOG", default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a new account and print the assigned client id.
    Register {
        /// Password for the new account.
        password: String,
    },
    /// Log in to an existing account and print its channel peers.
    Login {
        /// The account's client id.
        id: i64,
        /// The account's password.
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt().with_env_filter(args.log.clone()).compact().init();

    let key_pem = std::fs::read_to_string(&args.server_key)
        .with_context(|| format!("failed to read server key file {:?}", args.server_key))?;
    let server_key = rsa::RsaPublicKey::from_public_key_pem(&key_pem)
        .context("failed to parse SubjectPublicKeyInfo PEM public key")?;

    let client = Client::new();
    client
        .connect(&args.server, &server_key, |message| {
            println!("new message from {}: {} bytes", message.sender, message.content.len());
        })
        .await?;

    match args.command {
        Command::Register { password } => {
            let id = client.register(password.into_bytes()).await?;
            println!("registered as client id {id}");
        }
        Command::Login { id, password } => {
            client.login(id, password.into_bytes()).await?;
            let peers = client.get_channel_peers().await?;
            println!("logged in as {id}, channel peers: {peers:?}");
        }
    }

    client.disconnect().await;
    Ok(())
}
