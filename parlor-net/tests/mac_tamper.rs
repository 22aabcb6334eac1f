//! Scenario 5: a single bit flipped in a frame on the wire must cause
//! the receiver to reject it and close the connection.
//!
//! This drives the key exchange by hand (bypassing `Client`) so the
//! test can build and corrupt one encrypted frame directly, the same
//! way the transport-level unit tests do, but against a real running
//! server over a real socket.

mod support;

use parlor_proto::{FrameReader, FrameWriter, ProtoError, keyexchange};
use parlor_wire::Packet;
use tokio::net::TcpStream;

#[tokio::test]
async fn tampered_tag_closes_the_connection() {
    let server = support::spawn_server().await;

    let tcp = TcpStream::connect(&server.addr).await.expect("connect");
    let (read_half, write_half) = tcp.into_split();
    let mut frame_reader = FrameReader::new(read_half);
    let mut frame_writer = FrameWriter::new(write_half);

    let exchanged = keyexchange::client_initiate(&mut frame_writer, &server.public_key)
        .await
        .expect("key exchange");
    let key = exchanged.session_key;
    let nonce = keyexchange::CLIENT_OWN_NONCE;

    let plaintext = parlor_wire::encode(&Packet::Register { password: b"whatever".to_vec() })
        .expect("encode a harmless request");
    let mut frame = plaintext;
    parlor_crypto::apply_ctr(&key, nonce, &mut frame);
    let mut tag = parlor_crypto::compute_tag(&key, &frame);
    *tag.last_mut().unwrap() ^= 0x01;
    frame.extend_from_slice(&tag);

    frame_writer.write(&frame).await.expect("write the tampered frame");

    let err = frame_reader
        .read()
        .await
        .expect_err("server must close the connection instead of replying");
    assert!(matches!(err, ProtoError::StreamClosed));
}
