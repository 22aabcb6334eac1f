//! Shared harness for the end-to-end scenario tests: spin up a real
//! `Server` behind a loopback `TcpListener` and hand back connected
//! `Client`s plus a receiver for each client's pushed messages.

use std::sync::Arc;

use rsa::RsaPrivateKey;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use parlor_net::store::memory::MemoryStore;
use parlor_net::{ClientId, Server};
use parlor_wire::WireMessage;

/// A running server plus the address clients should connect to.
pub struct TestServer {
    pub addr: String,
    pub public_key: rsa::RsaPublicKey,
}

/// Start a server on an OS-assigned loopback port and let it accept
/// connections in the background for the lifetime of the test process.
pub async fn spawn_server() -> TestServer {
    let mut rng = rand_core::OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("generate test RSA key");
    let public_key = rsa::RsaPublicKey::from(&private_key);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback listener");
    let addr = listener.local_addr().expect("local addr").to_string();

    let server = Server::new(MemoryStore::new(), private_key);
    tokio::spawn(async move {
        loop {
            let Ok((tcp, _)) = listener.accept().await else { break };
            let server = Arc::clone(&server);
            tokio::spawn(async move {
                let _ = server.handle_connection(tcp).await;
            });
        }
    });

    TestServer { addr, public_key }
}

/// A connected client plus a channel fed by its `NewMessage` pushes.
pub struct TestClient {
    pub client: parlor_net::Client,
    pub pushes: mpsc::UnboundedReceiver<WireMessage>,
}

/// Connect a fresh client to `server` and capture its pushes on an
/// unbounded channel so tests can `recv().await` them in order.
pub async fn connect_client(server: &TestServer) -> TestClient {
    let client = parlor_net::Client::new();
    let (tx, rx) = mpsc::unbounded_channel();
    client
        .connect(&server.addr, &server.public_key, move |message| {
            let _ = tx.send(message);
        })
        .await
        .expect("client connect + key exchange");
    TestClient { client, pushes: rx }
}

/// Register a fresh client and return its allocated id alongside the
/// connected handle.
pub async fn register(server: &TestServer, password: &[u8]) -> (ClientId, TestClient) {
    let tc = connect_client(server).await;
    let id = tc.client.register(password.to_vec()).await.expect("register");
    (id, tc)
}
