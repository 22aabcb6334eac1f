//! The tagged packet taxonomy and MessagePack codec for the parlor wire
//! protocol.
//!
//! Sits above `parlor-proto`'s encrypted byte transport: this crate
//! turns decrypted frame payloads into typed [`Packet`] values and back.

#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod packet;

pub use codec::{decode, encode};
pub use error::CodecError;
pub use packet::{ClientId, Packet, RequestId, WireMessage};
