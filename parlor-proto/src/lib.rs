//! Length-prefixed framing, encrypted transport and key exchange for the
//! parlor wire protocol.
//!
//! This crate is "sans-application": it knows nothing about packets,
//! requests, or the message store. It turns a raw `TcpStream` into a
//! pair of authenticated byte-frame channels.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod frame;
pub mod keyexchange;
pub mod transport;

pub use error::ProtoError;
pub use frame::{FrameReader, FrameWriter, MAX_FRAME_LEN};
pub use keyexchange::{
    CLIENT_OWN_NONCE, CLIENT_PEER_NONCE, Exchanged, SERVER_OWN_NONCE, SERVER_PEER_NONCE,
    client_initiate, server_accept,
};
pub use transport::{EncryptedReader, EncryptedWriter};
