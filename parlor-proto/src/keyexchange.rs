//! One-shot RSA-OAEP session key exchange.
//!
//! The client generates a fresh random session key, wraps it under the
//! server's RSA public key, and sends the ciphertext as a single
//! plaintext (unencrypted) frame. The server unwraps it with its private
//! key. From that point both sides share a 32-byte AES key and the
//! nonce pair fixed by §4.2: client `(own=+1, peer=-1)`, server
//! `(own=-1, peer=+1)`.

use rand_core::OsRng;
use rsa::{RsaPrivateKey, RsaPublicKey};

use parlor_crypto::SESSION_KEY_LEN;

use crate::error::ProtoError;
use crate::frame::{FrameReader, FrameWriter};

/// The client's initial nonce for its own outbound frames.
pub const CLIENT_OWN_NONCE: i64 = 1;
/// The client's initial nonce for frames it expects from the server.
pub const CLIENT_PEER_NONCE: i64 = -1;
/// The server's initial nonce for its own outbound frames.
pub const SERVER_OWN_NONCE: i64 = -1;
/// The server's initial nonce for frames it expects from the client.
pub const SERVER_PEER_NONCE: i64 = 1;

/// Outcome of a successful key exchange: the shared session key.
#[derive(Clone)]
pub struct Exchanged {
    /// The 32-byte AES-256 key shared by both ends of the connection.
    pub session_key: [u8; SESSION_KEY_LEN],
}

/// Client side: generate a session key, wrap it for `server_key`, and
/// send it as the connection's first (unencrypted) frame.
pub async fn client_initiate(
    frame: &mut FrameWriter,
    server_key: &RsaPublicKey,
) -> Result<Exchanged, ProtoError> {
    let mut session_key = [0u8; SESSION_KEY_LEN];
    rand_core::RngCore::fill_bytes(&mut OsRng, &mut session_key);

    let wrapped = parlor_crypto::wrap_session_key(server_key, &session_key)
        .map_err(|e| ProtoError::Protocol(format!("failed to wrap session key: {e}")))?;

    frame.write(&wrapped).await?;
    Ok(Exchanged { session_key })
}

/// Server side: read the first frame off a fresh connection and unwrap
/// the session key it carries.
pub async fn server_accept(
    frame: &mut FrameReader,
    server_key: &RsaPrivateKey,
) -> Result<Exchanged, ProtoError> {
    let wrapped = frame.read().await?;
    let session_key = parlor_crypto::unwrap_session_key(server_key, &wrapped)
        .map_err(|e| ProtoError::Protocol(format!("failed to unwrap session key: {e}")))?;
    Ok(Exchanged { session_key })
}
