//! Encrypted transport: AES-256-CTR + HMAC-SHA256 "encrypt-then-MAC" over
//! the frame layer, with per-direction monotonic nonces.
//!
//! Initial nonce pairs, per §4.2: the client starts at `(our=+1, peer=-1)`;
//! the server starts at `(our=-1, peer=+1)`. Each side advances its own
//! nonce on every outbound frame and its peer's nonce on every
//! successfully-verified inbound frame.

use parlor_crypto::{SESSION_KEY_LEN, TAG_LEN, aes_ctr, compute_tag, verify_tag};
use tokio::sync::Mutex;

use crate::error::ProtoError;
use crate::frame::{FrameReader, FrameWriter};

/// Reads and decrypts frames for one direction of an established session.
///
/// Owned exclusively by the connection's reader task — no internal lock.
pub struct EncryptedReader {
    frame: FrameReader,
    key: [u8; SESSION_KEY_LEN],
    peer_nonce: i64,
}

impl EncryptedReader {
    /// Build a reader with the given session key and initial peer nonce.
    pub fn new(frame: FrameReader, key: [u8; SESSION_KEY_LEN], peer_nonce: i64) -> Self {
        Self { frame, key, peer_nonce }
    }

    /// Read, authenticate, and decrypt the next frame.
    ///
    /// A MAC failure or an undersized frame is a fatal [`ProtoError::Protocol`].
    pub async fn read(&mut self) -> Result<Vec<u8>, ProtoError> {
        let mut buf = self.frame.read().await?;
        if buf.len() < TAG_LEN {
            return Err(ProtoError::Protocol(format!(
                "frame of {} bytes shorter than the {TAG_LEN}-byte MAC tag",
                buf.len()
            )));
        }

        let split = buf.len() - TAG_LEN;
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&buf[split..]);

        if !verify_tag(&self.key, &buf[..split], &tag) {
            return Err(ProtoError::Protocol("MAC verification failed".into()));
        }

        buf.truncate(split);
        let nonce = self.peer_nonce;
        self.peer_nonce = aes_ctr::advance_nonce(nonce);
        aes_ctr::apply_ctr(&self.key, nonce, &mut buf);
        Ok(buf)
    }

    /// True once the underlying frame layer has observed a close.
    pub fn is_closed(&self) -> bool {
        self.frame.is_closed()
    }
}

struct WriterState {
    frame: FrameWriter,
    key: [u8; SESSION_KEY_LEN],
    nonce: i64,
}

/// Encrypts and writes frames for one direction of an established session.
///
/// Shared (via `Arc`) between the foreground request loop and, on the
/// server side, the concurrent push pump — both paths funnel through the
/// same mutex so nonce allocation and the write it authenticates never
/// interleave with another writer.
pub struct EncryptedWriter {
    state: Mutex<WriterState>,
}

impl EncryptedWriter {
    /// Build a writer with the given session key and initial own nonce.
    pub fn new(frame: FrameWriter, key: [u8; SESSION_KEY_LEN], nonce: i64) -> Self {
        Self { state: Mutex::new(WriterState { frame, key, nonce }) }
    }

    /// Encrypt `plaintext`, append its MAC tag, and write the frame.
    ///
    /// The nonce for this frame is captured, and the underlying write
    /// performed, while holding the writer's lock — so concurrent callers
    /// still consume nonces in the order they actually write.
    pub async fn write(&self, plaintext: &[u8]) -> Result<(), ProtoError> {
        let mut state = self.state.lock().await;
        let nonce = state.nonce;
        state.nonce = aes_ctr::advance_nonce(nonce);

        let mut buf = plaintext.to_vec();
        aes_ctr::apply_ctr(&state.key, nonce, &mut buf);
        let tag = compute_tag(&state.key, &buf);
        buf.extend_from_slice(&tag);

        state.frame.write(&buf).await
    }

    /// Close the underlying frame writer.
    pub async fn close(&self) -> Result<(), ProtoError> {
        self.state.lock().await.frame.close().await
    }

    /// True once the underlying frame layer has been closed.
    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.frame.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FrameReader, FrameWriter};

    async fn pair() -> (tokio::net::TcpStream, tokio::net::TcpStream) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connect = tokio::net::TcpStream::connect(addr);
        let (accept, connect) = tokio::join!(
            async { listener.accept().await.unwrap().0 },
            async { connect.await.unwrap() }
        );
        (accept, connect)
    }

    #[tokio::test]
    async fn encrypted_roundtrip_with_client_server_nonce_pairing() {
        let (a, b) = pair().await;
        let (ar, aw) = a.into_split();
        let (br, bw) = b.into_split();
        let key = [5u8; SESSION_KEY_LEN];

        // a = client: our=+1, peer=-1. b = server: our=-1, peer=+1.
        let client_writer = EncryptedWriter::new(FrameWriter::new(aw), key, 1);
        let mut server_reader = EncryptedReader::new(FrameReader::new(br), key, 1);

        client_writer.write(b"ping").await.unwrap();
        let got = server_reader.read().await.unwrap();
        assert_eq!(got, b"ping");

        let server_writer = EncryptedWriter::new(FrameWriter::new(bw), key, -1);
        let mut client_reader = EncryptedReader::new(FrameReader::new(ar), key, -1);

        server_writer.write(b"pong").await.unwrap();
        let got = client_reader.read().await.unwrap();
        assert_eq!(got, b"pong");
    }

    #[tokio::test]
    async fn nonces_never_repeat_across_several_frames() {
        let (a, b) = pair().await;
        let (_ar, aw) = a.into_split();
        let (br, _bw) = b.into_split();
        let key = [9u8; SESSION_KEY_LEN];

        let writer = EncryptedWriter::new(FrameWriter::new(aw), key, 1);
        let mut reader = EncryptedReader::new(FrameReader::new(br), key, 1);

        for i in 0..50u32 {
            writer.write(&i.to_le_bytes()).await.unwrap();
        }
        for i in 0..50u32 {
            let got = reader.read().await.unwrap();
            assert_eq!(got, i.to_le_bytes());
        }
    }

    #[tokio::test]
    async fn wrong_key_fails_mac_verification() {
        let (a, b) = pair().await;
        let (_ar, aw) = a.into_split();
        let (br, _bw) = b.into_split();

        let writer = EncryptedWriter::new(FrameWriter::new(aw), [2u8; SESSION_KEY_LEN], 1);
        let mut reader = EncryptedReader::new(FrameReader::new(br), [3u8; SESSION_KEY_LEN], 1);

        writer.write(b"untampered message").await.unwrap();
        let err = reader.read().await.unwrap_err();
        assert!(matches!(err, ProtoError::Protocol(_)));
    }

    #[tokio::test]
    async fn tampered_tag_byte_fails_mac_verification() {
        use tokio::io::AsyncWriteExt;

        let (a, b) = pair().await;
        let (_ar, mut aw) = a.into_split();
        let (br, _bw) = b.into_split();

        let key = [7u8; SESSION_KEY_LEN];
        let nonce = 1i64;
        let mut frame = b"untampered message".to_vec();
        aes_ctr::apply_ctr(&key, nonce, &mut frame);
        let tag = compute_tag(&key, &frame);
        frame.extend_from_slice(&tag);
        *frame.last_mut().unwrap() ^= 0xFF;

        aw.write_all(&(frame.len() as u32).to_le_bytes()).await.unwrap();
        aw.write_all(&frame).await.unwrap();
        aw.flush().await.unwrap();

        let mut reader = EncryptedReader::new(FrameReader::new(br), key, nonce);
        let err = reader.read().await.unwrap_err();
        assert!(matches!(err, ProtoError::Protocol(_)));
    }
}
