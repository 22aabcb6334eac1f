//! Data model, store abstraction, request multiplexer and session
//! machines for the parlor direct-messaging protocol.
//!
//! This crate sits above `parlor-proto` (framing/transport/key exchange)
//! and `parlor-wire` (the packet taxonomy and codec), and is what
//! `parlor-server`/`parlor-client` actually drive.

#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod model;
pub mod packet_stream;
pub mod server;
pub mod store;

pub use client::Client;
pub use error::{ClientError, ServerError};
pub use model::{Channel, ChannelId, ClientId, Message};
pub use packet_stream::PacketStream;
pub use server::Server;
pub use store::{Store, StoreError};
