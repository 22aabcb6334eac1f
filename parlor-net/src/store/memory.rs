//! A volatile, in-process [`Store`] implementation.
//!
//! All state lives in a single `tokio::sync::Mutex`-guarded map; nothing
//! here survives a process restart. Sufficient to run the protocol end
//! to end and to back the integration tests.

use std::collections::HashMap;

use rand_core::RngCore;
use tokio::sync::Mutex;

use crate::model::{Channel, ChannelId, ClientId, Message};
use crate::store::{Store, StoreError};

struct ClientRecord {
    password: Vec<u8>,
}

#[derive(Default)]
struct State {
    clients: HashMap<ClientId, ClientRecord>,
    channels: HashMap<ChannelId, Channel>,
}

/// The reference in-memory store. Not durable — see the crate's
/// Non-goals: there are no disk-backed guarantees here by design.
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// An empty store with no registered clients.
    pub fn new() -> Self {
        Self { state: Mutex::new(State::default()) }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    async fn register_client(&self, password: Vec<u8>) -> ClientId {
        let mut state = self.state.lock().await;
        loop {
            let id = rand_core::OsRng.next_u64() as i64;
            if !state.clients.contains_key(&id) {
                state.clients.insert(id, ClientRecord { password });
                return id;
            }
        }
    }

    async fn delete_client(&self, id: ClientId) {
        self.state.lock().await.clients.remove(&id);
    }

    async fn check_password(&self, id: ClientId, password: &[u8]) -> Result<bool, StoreError> {
        let state = self.state.lock().await;
        let record = state.clients.get(&id).ok_or(StoreError::ClientNotExists)?;
        Ok(record.password == password)
    }

    async fn add_message(
        &self,
        sender: ClientId,
        receiver: ClientId,
        content: Vec<u8>,
    ) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;
        if !state.clients.contains_key(&sender) || !state.clients.contains_key(&receiver) {
            return Err(StoreError::ClientNotExists);
        }
        let channel_id = ChannelId::from_pair(sender, receiver);
        let channel = state.channels.entry(channel_id).or_default();
        Ok(channel.push(Message { sender, content }))
    }

    async fn get_messages_count(&self, channel: ChannelId) -> Result<usize, StoreError> {
        let state = self.state.lock().await;
        let channel = state.channels.get(&channel).ok_or(StoreError::ChannelNotExists)?;
        Ok(channel.messages.len())
    }

    async fn get_messages(
        &self,
        channel: ChannelId,
        first: i64,
        count: i64,
    ) -> Result<Vec<Message>, StoreError> {
        let state = self.state.lock().await;
        let channel = state.channels.get(&channel).ok_or(StoreError::ChannelNotExists)?;
        if first < 0 || count < 0 {
            return Err(StoreError::InvalidRange);
        }
        let len = channel.messages.len() as i64;
        if first + count > len {
            return Err(StoreError::InvalidRange);
        }
        let first = first as usize;
        let count = count as usize;
        Ok(channel.messages[first..first + count].to_vec())
    }

    async fn get_channel_peers(&self, client: ClientId) -> Result<Vec<ClientId>, StoreError> {
        let state = self.state.lock().await;
        if !state.clients.contains_key(&client) {
            return Err(StoreError::ClientNotExists);
        }
        Ok(state
            .channels
            .keys()
            .filter_map(|channel| {
                let (a, b) = channel.participants();
                if a == client {
                    Some(b)
                } else if b == client {
                    Some(a)
                } else {
                    None
                }
            })
            .collect())
    }

    async fn set_encryption_keys_message(
        &self,
        channel: ChannelId,
        owner: ClientId,
        message_id: usize,
    ) -> Result<(), StoreError> {
        let (a, b) = channel.participants();
        if owner != a && owner != b {
            return Err(StoreError::ClientNotExists);
        }
        let mut state = self.state.lock().await;
        let chan = state.channels.get_mut(&channel).ok_or(StoreError::ChannelNotExists)?;
        let sent_by_owner = chan
            .messages
            .get(message_id)
            .map(|m| m.sender == owner)
            .unwrap_or(false);
        if !sent_by_owner {
            return Err(StoreError::InvalidId);
        }
        chan.key_bundle_pointers.insert(owner, message_id);
        Ok(())
    }

    async fn get_encryption_keys_message(
        &self,
        channel: ChannelId,
        owner: ClientId,
    ) -> Result<Option<usize>, StoreError> {
        let (a, b) = channel.participants();
        if owner != a && owner != b {
            return Err(StoreError::ClientNotExists);
        }
        let state = self.state.lock().await;
        let chan = state.channels.get(&channel).ok_or(StoreError::ChannelNotExists)?;
        Ok(chan.key_bundle_pointers.get(&owner).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_check_password_roundtrips() {
        let store = MemoryStore::new();
        let id = store.register_client(b"hunter2".to_vec()).await;
        assert!(store.check_password(id, b"hunter2").await.unwrap());
        assert!(!store.check_password(id, b"wrong").await.unwrap());
    }

    #[tokio::test]
    async fn check_password_for_unknown_client_errors() {
        let store = MemoryStore::new();
        let err = store.check_password(999, b"x").await.unwrap_err();
        assert_eq!(err, StoreError::ClientNotExists);
    }

    #[tokio::test]
    async fn send_to_unknown_receiver_fails() {
        let store = MemoryStore::new();
        let a = store.register_client(b"a".to_vec()).await;
        let err = store.add_message(a, 424242, b"hi".to_vec()).await.unwrap_err();
        assert_eq!(err, StoreError::ClientNotExists);
    }

    #[tokio::test]
    async fn send_from_unknown_sender_fails() {
        let store = MemoryStore::new();
        let b = store.register_client(b"b".to_vec()).await;
        let err = store.add_message(424242, b, b"hi".to_vec()).await.unwrap_err();
        assert_eq!(err, StoreError::ClientNotExists);
    }

    #[tokio::test]
    async fn channel_created_lazily_and_counts_correctly() {
        let store = MemoryStore::new();
        let a = store.register_client(b"a".to_vec()).await;
        let b = store.register_client(b"b".to_vec()).await;
        let channel = ChannelId::from_pair(a, b);

        assert_eq!(store.get_messages_count(channel).await.unwrap_err(), StoreError::ChannelNotExists);

        store.add_message(a, b, b"hi".to_vec()).await.unwrap();
        assert_eq!(store.get_messages_count(channel).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn get_messages_range_boundaries() {
        let store = MemoryStore::new();
        let a = store.register_client(b"a".to_vec()).await;
        let b = store.register_client(b"b".to_vec()).await;
        let channel = ChannelId::from_pair(a, b);
        for i in 0..3u8 {
            store.add_message(a, b, vec![i]).await.unwrap();
        }

        assert_eq!(store.get_messages(channel, 1, 5).await.unwrap_err(), StoreError::InvalidRange);
        assert_eq!(store.get_messages(channel, -1, 1).await.unwrap_err(), StoreError::InvalidRange);
        assert_eq!(store.get_messages(channel, 0, -1).await.unwrap_err(), StoreError::InvalidRange);

        let all = store.get_messages(channel, 0, 3).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn key_bundle_pointer_must_match_sender() {
        let store = MemoryStore::new();
        let a = store.register_client(b"a".to_vec()).await;
        let b = store.register_client(b"b".to_vec()).await;
        let channel = ChannelId::from_pair(a, b);

        store.add_message(a, b, b"from a".to_vec()).await.unwrap(); // index 0
        store.add_message(b, a, b"from b".to_vec()).await.unwrap(); // index 1

        store.set_encryption_keys_message(channel, a, 0).await.unwrap();
        let err = store.set_encryption_keys_message(channel, a, 1).await.unwrap_err();
        assert_eq!(err, StoreError::InvalidId);

        assert_eq!(store.get_encryption_keys_message(channel, a).await.unwrap(), Some(0));
    }
}
