//! The packet taxonomy carried over the encrypted transport.
//!
//! Every packet is a MessagePack map with a `"type"` discriminator field
//! plus its own sibling fields. Request packets additionally carry a
//! `request_id`, a session-scoped random 64-bit signed integer used to
//! correlate the eventual reply.

use serde::{Deserialize, Serialize};

/// A signed 64-bit client identifier, as it appears on the wire.
pub type ClientId = i64;

/// A signed 64-bit request correlation id.
pub type RequestId = i64;

/// A single stored message as it appears in a `GetMessagesSuccess` reply
/// or an unsolicited `NewMessage` push.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// The id of the client that sent this message.
    pub sender: ClientId,
    /// Opaque message content, ciphertext from the client's viewpoint.
    #[serde(with = "serde_bytes")]
    pub content: Vec<u8>,
}

/// The full packet taxonomy. Serializes as a MessagePack map tagged by
/// `"type"`, with every other field as a sibling map entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Packet {
    // ── Authentication (positional, no request_id) ──────────────────────
    /// Register a new client under `password`.
    Register {
        /// Opaque credential bytes chosen by the registering client.
        #[serde(with = "serde_bytes")]
        password: Vec<u8>,
    },
    /// Reply to `Register`: the freshly allocated client id.
    RegisterSuccess {
        /// The id assigned to the new client.
        id: ClientId,
    },
    /// Authenticate as an existing client.
    Login {
        /// The client id to authenticate as.
        id: ClientId,
        /// The credential bytes to check against the stored one.
        #[serde(with = "serde_bytes")]
        password: Vec<u8>,
    },
    /// Login accepted; the session is now authenticated as `id`.
    LoginSuccess {},
    /// Login rejected: unknown id, wrong password, or id already live.
    LoginFail {},

    // ── Channel inspection ───────────────────────────────────────────────
    /// List the peers this client shares a channel with.
    GetChannelPeers {
        /// Correlates the reply.
        request_id: RequestId,
    },
    /// Reply to `GetChannelPeers`.
    GetChannelPeersSuccess {
        /// Echoes the request.
        request_id: RequestId,
        /// The ids of clients this client shares a channel with.
        peers: Vec<ClientId>,
    },

    // ── Message count ────────────────────────────────────────────────────
    /// Count the messages in the channel shared with `peer_id`.
    GetMessagesCount {
        /// Correlates the reply.
        request_id: RequestId,
        /// The other participant of the channel.
        peer_id: ClientId,
    },
    /// Reply to `GetMessagesCount`.
    GetMessagesCountSuccess {
        /// Echoes the request.
        request_id: RequestId,
        /// The number of messages stored in the channel.
        count: i64,
    },
    /// `GetMessagesCount` for a peer that does not exist.
    GetMessagesCountFailNoSuchClient {
        /// Echoes the request.
        request_id: RequestId,
    },

    // ── Send ─────────────────────────────────────────────────────────────
    /// Send `content` to `receiver_id`.
    SendMessage {
        /// Correlates the reply.
        request_id: RequestId,
        /// The intended recipient.
        receiver_id: ClientId,
        /// Opaque message content.
        #[serde(with = "serde_bytes")]
        content: Vec<u8>,
    },
    /// Reply to `SendMessage`.
    SendMessageSuccess {
        /// Echoes the request.
        request_id: RequestId,
    },
    /// `SendMessage` to a receiver that does not exist.
    SendMessageFailNoSuchClient {
        /// Echoes the request.
        request_id: RequestId,
    },

    // ── Range fetch ──────────────────────────────────────────────────────
    /// Fetch `count` messages starting at `first` from the channel shared
    /// with `peer_id`.
    GetMessages {
        /// Correlates the reply.
        request_id: RequestId,
        /// The other participant of the channel.
        peer_id: ClientId,
        /// Start index into the channel's message sequence.
        first: i64,
        /// Number of messages to fetch.
        count: i64,
    },
    /// Reply to `GetMessages`.
    GetMessagesSuccess {
        /// Echoes the request.
        request_id: RequestId,
        /// The requested slice of the channel's message sequence.
        messages: Vec<WireMessage>,
    },
    /// `GetMessages` with an out-of-bounds or negative range.
    GetMessagesFailInvalidRange {
        /// Echoes the request.
        request_id: RequestId,
    },

    // ── Key bundle pointer: set ──────────────────────────────────────────
    /// Record that the message at `message_id` in the channel shared with
    /// `peer_id` carries this client's encryption key bundle.
    SetEncryptionKeysMessage {
        /// Correlates the reply.
        request_id: RequestId,
        /// The other participant of the channel.
        peer_id: ClientId,
        /// Sequence index of the message carrying the key bundle.
        message_id: i64,
    },
    /// Reply to `SetEncryptionKeysMessage`.
    SetEncryptionKeysMessageSuccess {
        /// Echoes the request.
        request_id: RequestId,
    },
    /// `SetEncryptionKeysMessage` naming a peer/channel that does not exist.
    SetEncryptionKeysMessageFailNoSuchClient {
        /// Echoes the request.
        request_id: RequestId,
    },
    /// `SetEncryptionKeysMessage` naming a `message_id` not sent by the
    /// requesting client.
    SetEncryptionKeysMessageFailInvalidId {
        /// Echoes the request.
        request_id: RequestId,
    },

    // ── Key bundle pointer: get ──────────────────────────────────────────
    /// Fetch the key-bundle pointer that `keys_owner_id` has set in the
    /// channel shared with `peer_id`.
    GetEncryptionKeysMessage {
        /// Correlates the reply.
        request_id: RequestId,
        /// Whose key-bundle pointer to read.
        keys_owner_id: ClientId,
        /// The other participant of the channel.
        peer_id: ClientId,
    },
    /// Reply to `GetEncryptionKeysMessage`.
    GetEncryptionKeysMessageSuccess {
        /// Echoes the request.
        request_id: RequestId,
        /// The pointed-to sequence index, if one has been set.
        message_id: Option<i64>,
    },
    /// `GetEncryptionKeysMessage` naming a peer that does not exist.
    GetEncryptionKeysMessageFailNoSuchClient {
        /// Echoes the request.
        request_id: RequestId,
    },

    // ── Server push ──────────────────────────────────────────────────────
    /// Unsolicited notification of a new message. Carries no `request_id`.
    NewMessage {
        /// The message that just arrived.
        message: WireMessage,
    },
}

impl Packet {
    /// The `request_id` this packet carries, if it is a correlatable
    /// request or reply. Authentication packets and `NewMessage` push
    /// notifications return `None`.
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Packet::Register { .. }
            | Packet::RegisterSuccess { .. }
            | Packet::Login { .. }
            | Packet::LoginSuccess {}
            | Packet::LoginFail {}
            | Packet::NewMessage { .. } => None,

            Packet::GetChannelPeers { request_id }
            | Packet::GetChannelPeersSuccess { request_id, .. }
            | Packet::GetMessagesCount { request_id, .. }
            | Packet::GetMessagesCountSuccess { request_id, .. }
            | Packet::GetMessagesCountFailNoSuchClient { request_id }
            | Packet::SendMessage { request_id, .. }
            | Packet::SendMessageSuccess { request_id }
            | Packet::SendMessageFailNoSuchClient { request_id }
            | Packet::GetMessages { request_id, .. }
            | Packet::GetMessagesSuccess { request_id, .. }
            | Packet::GetMessagesFailInvalidRange { request_id }
            | Packet::SetEncryptionKeysMessage { request_id, .. }
            | Packet::SetEncryptionKeysMessageSuccess { request_id }
            | Packet::SetEncryptionKeysMessageFailNoSuchClient { request_id }
            | Packet::SetEncryptionKeysMessageFailInvalidId { request_id }
            | Packet::GetEncryptionKeysMessage { request_id, .. }
            | Packet::GetEncryptionKeysMessageSuccess { request_id, .. }
            | Packet::GetEncryptionKeysMessageFailNoSuchClient { request_id } => Some(*request_id),
        }
    }

    /// The `"type"` discriminator this packet would serialize under.
    /// Used by the multiplexer to match unsolicited-packet callbacks
    /// without decoding the whole payload twice.
    pub fn type_name(&self) -> &'static str {
        match self {
            Packet::Register { .. } => "Register",
            Packet::RegisterSuccess { .. } => "RegisterSuccess",
            Packet::Login { .. } => "Login",
            Packet::LoginSuccess {} => "LoginSuccess",
            Packet::LoginFail {} => "LoginFail",
            Packet::GetChannelPeers { .. } => "GetChannelPeers",
            Packet::GetChannelPeersSuccess { .. } => "GetChannelPeersSuccess",
            Packet::GetMessagesCount { .. } => "GetMessagesCount",
            Packet::GetMessagesCountSuccess { .. } => "GetMessagesCountSuccess",
            Packet::GetMessagesCountFailNoSuchClient { .. } => "GetMessagesCountFailNoSuchClient",
            Packet::SendMessage { .. } => "SendMessage",
            Packet::SendMessageSuccess { .. } => "SendMessageSuccess",
            Packet::SendMessageFailNoSuchClient { .. } => "SendMessageFailNoSuchClient",
            Packet::GetMessages { .. } => "GetMessages",
            Packet::GetMessagesSuccess { .. } => "GetMessagesSuccess",
            Packet::GetMessagesFailInvalidRange { .. } => "GetMessagesFailInvalidRange",
            Packet::SetEncryptionKeysMessage { .. } => "SetEncryptionKeysMessage",
            Packet::SetEncryptionKeysMessageSuccess { .. } => "SetEncryptionKeysMessageSuccess",
            Packet::SetEncryptionKeysMessageFailNoSuchClient { .. } => {
                "SetEncryptionKeysMessageFailNoSuchClient"
            }
            Packet::SetEncryptionKeysMessageFailInvalidId { .. } => {
                "SetEncryptionKeysMessageFailInvalidId"
            }
            Packet::GetEncryptionKeysMessage { .. } => "GetEncryptionKeysMessage",
            Packet::GetEncryptionKeysMessageSuccess { .. } => "GetEncryptionKeysMessageSuccess",
            Packet::GetEncryptionKeysMessageFailNoSuchClient { .. } => {
                "GetEncryptionKeysMessageFailNoSuchClient"
            }
            Packet::NewMessage { .. } => "NewMessage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_is_none_for_positional_and_push_packets() {
        assert_eq!(Packet::LoginSuccess {}.request_id(), None);
        assert_eq!(
            Packet::NewMessage {
                message: WireMessage { sender: 1, content: vec![1, 2, 3] }
            }
            .request_id(),
            None
        );
    }

    #[test]
    fn request_id_is_echoed_for_correlated_packets() {
        let p = Packet::SendMessage { request_id: 42, receiver_id: 7, content: vec![] };
        assert_eq!(p.request_id(), Some(42));
    }
}
