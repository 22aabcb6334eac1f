//! The store abstraction: everything the session machines need to
//! persist, behind a trait so the volatile reference implementation can
//! later be swapped for a durable one without touching the protocol.

pub mod memory;

use thiserror::Error;

use crate::model::{ChannelId, ClientId, Message};

/// Errors the store can return. These map 1:1 onto the typed failure
/// packets in the wire protocol — anything else a `Store` impl might
/// raise is treated by the session machine as a fatal protocol error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The referenced client id is not registered.
    #[error("client does not exist")]
    ClientNotExists,
    /// The referenced channel has never had a message added to it.
    #[error("channel does not exist")]
    ChannelNotExists,
    /// A `get_messages` range was negative or ran past the end of the
    /// channel's message sequence.
    #[error("invalid message range")]
    InvalidRange,
    /// A `message_id` did not name a message actually sent by the
    /// claimed owner.
    #[error("invalid message id")]
    InvalidId,
}

/// The persistence contract the session machines drive.
///
/// Implementations must serialize mutations if shared across
/// concurrently-running sessions; `MemoryStore` does this with an
/// internal async mutex.
pub trait Store: Send + Sync {
    /// Allocate a new client id and persist `(id, password)`.
    ///
    /// Implementations should retry id generation internally on the
    /// (astronomically unlikely) collision case rather than surfacing
    /// it to the caller.
    async fn register_client(&self, password: Vec<u8>) -> ClientId;

    /// Remove a client record. Not exposed over the wire protocol, but
    /// part of the store's contract for administrative use.
    async fn delete_client(&self, id: ClientId);

    /// Check `password` against the stored credential for `id`.
    ///
    /// Returns `Ok(false)` (not an error) for a wrong password; returns
    /// `Err(ClientNotExists)` only if `id` is not registered at all.
    async fn check_password(&self, id: ClientId, password: &[u8]) -> Result<bool, StoreError>;

    /// Append a message to the channel between `sender` and `receiver`,
    /// creating the channel if this is its first message.
    async fn add_message(
        &self,
        sender: ClientId,
        receiver: ClientId,
        content: Vec<u8>,
    ) -> Result<usize, StoreError>;

    /// Number of messages stored in the channel shared by the two
    /// clients.
    async fn get_messages_count(&self, channel: ChannelId) -> Result<usize, StoreError>;

    /// The `count` messages starting at index `first`.
    ///
    /// `first < 0`, `count < 0`, or `first + count` past the end of the
    /// sequence is `Err(InvalidRange)`.
    async fn get_messages(
        &self,
        channel: ChannelId,
        first: i64,
        count: i64,
    ) -> Result<Vec<Message>, StoreError>;

    /// The ids of clients `client` shares a channel with.
    async fn get_channel_peers(&self, client: ClientId) -> Result<Vec<ClientId>, StoreError>;

    /// Record that `message_id` (a message actually sent by `owner`) in
    /// the channel shared with `owner`'s peer carries `owner`'s key
    /// bundle.
    async fn set_encryption_keys_message(
        &self,
        channel: ChannelId,
        owner: ClientId,
        message_id: usize,
    ) -> Result<(), StoreError>;

    /// The key-bundle pointer `owner` has set in the channel shared with
    /// their peer, if any.
    async fn get_encryption_keys_message(
        &self,
        channel: ChannelId,
        owner: ClientId,
    ) -> Result<Option<usize>, StoreError>;
}
