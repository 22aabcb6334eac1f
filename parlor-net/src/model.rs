//! The application data model: client identity, channels, and messages.

use std::collections::HashMap;

/// A randomly assigned client identifier.
///
/// Collisions during registration are not detected by this type; the
/// store is responsible for retrying allocation on collision.
pub type ClientId = i64;

/// The canonical, unordered pairing of two distinct clients sharing a
/// channel.
///
/// `ChannelId::from_pair(a, b) == ChannelId::from_pair(b, a)` for all
/// distinct `a, b` — equality and hashing derive entirely from the
/// sorted pair, never from which argument order the caller used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(ClientId, ClientId);

impl ChannelId {
    /// Build the canonical channel id for two distinct clients.
    ///
    /// Panics if `a == b` — a client cannot share a channel with itself.
    pub fn from_pair(a: ClientId, b: ClientId) -> Self {
        assert_ne!(a, b, "a channel requires two distinct clients");
        if a < b { Self(a, b) } else { Self(b, a) }
    }

    /// The two participants, in canonical (sorted) order.
    pub fn participants(&self) -> (ClientId, ClientId) {
        (self.0, self.1)
    }

    /// The other participant, given one side of the channel.
    ///
    /// Panics if `id` is not a participant of this channel.
    pub fn other(&self, id: ClientId) -> ClientId {
        if id == self.0 {
            self.1
        } else if id == self.1 {
            self.0
        } else {
            panic!("{id} is not a participant of this channel")
        }
    }
}

/// A single message stored in a channel.
///
/// `content` is opaque to the server: ciphertext from the sending
/// client's point of view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// The client that sent this message.
    pub sender: ClientId,
    /// Opaque message content.
    pub content: Vec<u8>,
}

/// One channel's stored state: its ordered messages and the key-bundle
/// pointer each participant has set.
#[derive(Clone, Debug, Default)]
pub struct Channel {
    /// Messages in insertion order; a message's index in this vector is
    /// its identity — there is no separate message id.
    pub messages: Vec<Message>,
    /// For each participant that has called `SetEncryptionKeysMessage`,
    /// the index of the message carrying their key bundle.
    ///
    /// Invariant: `key_bundle_pointers[x] = i` implies
    /// `messages[i].sender == x`.
    pub key_bundle_pointers: HashMap<ClientId, usize>,
}

impl Channel {
    /// Append a message and return its sequence index.
    pub fn push(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_id_is_symmetric() {
        assert_eq!(ChannelId::from_pair(1, 2), ChannelId::from_pair(2, 1));
        assert_eq!(ChannelId::from_pair(-5, 5), ChannelId::from_pair(5, -5));
    }

    #[test]
    fn other_resolves_the_counterpart() {
        let id = ChannelId::from_pair(1, 2);
        assert_eq!(id.other(1), 2);
        assert_eq!(id.other(2), 1);
    }

    #[test]
    #[should_panic]
    fn from_pair_rejects_self_channel() {
        ChannelId::from_pair(3, 3);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn channel_id_symmetric_for_any_distinct_pair(a: i64, b: i64) {
            prop_assume!(a != b);
            prop_assert_eq!(ChannelId::from_pair(a, b), ChannelId::from_pair(b, a));
        }
    }
}
