//! Server-side per-connection session machine.
//!
//! Per accepted connection: key exchange, register-or-login, a request
//! loop driven by the peer's packets, and a concurrent push pump that
//! delivers `NewMessage` notifications arriving for this client from
//! other sessions.

use std::collections::HashMap;
use std::sync::Arc;

use rsa::RsaPrivateKey;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use parlor_proto::{EncryptedReader, EncryptedWriter, FrameReader, FrameWriter, keyexchange};
use parlor_wire::{ClientId, Packet, WireMessage};

use crate::error::ServerError;
use crate::model::{ChannelId, Message};
use crate::packet_stream::PacketStream;
use crate::store::{Store, StoreError};

/// Server-wide state shared by every connection: the message store and
/// the live push queues keyed by authenticated client id.
///
/// This is the only process-wide shared state the server carries; it is
/// encapsulated here rather than kept as ambient globals.
pub struct Server<S> {
    store: S,
    private_key: RsaPrivateKey,
    push_queues: Mutex<HashMap<ClientId, mpsc::UnboundedSender<Message>>>,
}

impl<S: Store + 'static> Server<S> {
    /// Build a server around `store`, decrypting session keys with
    /// `private_key`.
    pub fn new(store: S, private_key: RsaPrivateKey) -> Arc<Self> {
        Arc::new(Self { store, private_key, push_queues: Mutex::new(HashMap::new()) })
    }

    /// Drive one accepted TCP connection through the full session
    /// lifecycle. Returns once the session ends, for any reason.
    pub async fn handle_connection(self: &Arc<Self>, tcp: TcpStream) -> Result<(), ServerError> {
        let (read_half, write_half) = tcp.into_split();
        let mut frame_reader = FrameReader::new(read_half);
        let frame_writer = FrameWriter::new(write_half);

        let exchanged = keyexchange::server_accept(&mut frame_reader, &self.private_key).await?;

        let reader = EncryptedReader::new(
            frame_reader,
            exchanged.session_key,
            keyexchange::SERVER_PEER_NONCE,
        );
        let writer = Arc::new(EncryptedWriter::new(
            frame_writer,
            exchanged.session_key,
            keyexchange::SERVER_OWN_NONCE,
        ));

        let stream = Arc::new(PacketStream::spawn(reader, writer, |packet| {
            tracing::warn!(?packet, "unsolicited packet from client, dropping");
        }));

        let client_id = match self.register_or_login(&stream).await {
            Ok(id) => id,
            Err(e) => {
                stream.close().await;
                return Err(e);
            }
        };
        tracing::debug!(client_id, "session authenticated");

        let (push_tx, push_rx) = mpsc::unbounded_channel();
        self.push_queues.lock().await.insert(client_id, push_tx);

        let pump = spawn_push_pump(Arc::clone(&stream), push_rx);

        let result = self.run_request_loop(&stream, client_id).await;

        pump.abort();
        self.push_queues.lock().await.remove(&client_id);
        stream.close().await;
        tracing::debug!(client_id, ?result, "session ended");

        result
    }

    async fn register_or_login(&self, stream: &PacketStream) -> Result<ClientId, ServerError> {
        let packet = stream.recv_generic().await?;
        match packet {
            Packet::Register { password } => {
                let id = self.store.register_client(password).await;
                stream.send(&Packet::RegisterSuccess { id }).await?;
                Ok(id)
            }
            Packet::Login { id, password } => {
                let already_live = self.push_queues.lock().await.contains_key(&id);
                let password_ok = self.store.check_password(id, &password).await.unwrap_or(false);
                if already_live || !password_ok {
                    stream.send(&Packet::LoginFail {}).await?;
                    return Err(ServerError::UnexpectedPacket("login rejected"));
                }
                stream.send(&Packet::LoginSuccess {}).await?;
                Ok(id)
            }
            _ => Err(ServerError::UnexpectedPacket("expected Register or Login")),
        }
    }

    async fn run_request_loop(
        &self,
        stream: &PacketStream,
        client_id: ClientId,
    ) -> Result<(), ServerError> {
        loop {
            let packet = stream.recv_generic().await?;
            let reply = self.handle_request(client_id, packet).await?;
            stream.send(&reply).await?;
        }
    }

    async fn handle_request(
        &self,
        client_id: ClientId,
        packet: Packet,
    ) -> Result<Packet, ServerError> {
        match packet {
            Packet::GetChannelPeers { request_id } => {
                let peers = self.store.get_channel_peers(client_id).await.unwrap_or_default();
                Ok(Packet::GetChannelPeersSuccess { request_id, peers })
            }

            Packet::GetMessagesCount { request_id, peer_id } => {
                let Some(channel) = peer_channel(client_id, peer_id) else {
                    return Ok(Packet::GetMessagesCountFailNoSuchClient { request_id });
                };
                match self.store.get_messages_count(channel).await {
                    Ok(count) => {
                        Ok(Packet::GetMessagesCountSuccess { request_id, count: count as i64 })
                    }
                    Err(StoreError::ClientNotExists) | Err(StoreError::ChannelNotExists) => {
                        Ok(Packet::GetMessagesCountFailNoSuchClient { request_id })
                    }
                    Err(other) => Err(unexpected_store_error(other)),
                }
            }

            Packet::SendMessage { request_id, receiver_id, content } => {
                if receiver_id == client_id {
                    return Ok(Packet::SendMessageFailNoSuchClient { request_id });
                }
                match self.store.add_message(client_id, receiver_id, content.clone()).await {
                    Ok(_) => {
                        self.push_to(receiver_id, Message { sender: client_id, content }).await;
                        Ok(Packet::SendMessageSuccess { request_id })
                    }
                    Err(StoreError::ClientNotExists) => {
                        Ok(Packet::SendMessageFailNoSuchClient { request_id })
                    }
                    Err(other) => Err(unexpected_store_error(other)),
                }
            }

            Packet::GetMessages { request_id, peer_id, first, count } => {
                let Some(channel) = peer_channel(client_id, peer_id) else {
                    return Ok(Packet::GetMessagesFailInvalidRange { request_id });
                };
                match self.store.get_messages(channel, first, count).await {
                    Ok(messages) => Ok(Packet::GetMessagesSuccess {
                        request_id,
                        messages: messages.into_iter().map(to_wire_message).collect(),
                    }),
                    Err(StoreError::InvalidRange) | Err(StoreError::ChannelNotExists) => {
                        Ok(Packet::GetMessagesFailInvalidRange { request_id })
                    }
                    Err(other) => Err(unexpected_store_error(other)),
                }
            }

            Packet::SetEncryptionKeysMessage { request_id, peer_id, message_id } => {
                let Some(channel) = peer_channel(client_id, peer_id) else {
                    return Ok(Packet::SetEncryptionKeysMessageFailNoSuchClient { request_id });
                };
                if message_id < 0 {
                    return Ok(Packet::SetEncryptionKeysMessageFailInvalidId { request_id });
                }
                match self
                    .store
                    .set_encryption_keys_message(channel, client_id, message_id as usize)
                    .await
                {
                    Ok(()) => Ok(Packet::SetEncryptionKeysMessageSuccess { request_id }),
                    Err(StoreError::ClientNotExists) | Err(StoreError::ChannelNotExists) => {
                        Ok(Packet::SetEncryptionKeysMessageFailNoSuchClient { request_id })
                    }
                    Err(StoreError::InvalidId) => {
                        Ok(Packet::SetEncryptionKeysMessageFailInvalidId { request_id })
                    }
                    Err(other) => Err(unexpected_store_error(other)),
                }
            }

            Packet::GetEncryptionKeysMessage { request_id, keys_owner_id, peer_id } => {
                let Some(channel) = peer_channel(client_id, peer_id) else {
                    return Ok(Packet::GetEncryptionKeysMessageFailNoSuchClient { request_id });
                };
                match self.store.get_encryption_keys_message(channel, keys_owner_id).await {
                    Ok(message_id) => {
                        let message_id = message_id.map(|i| i as i64);
                        Ok(Packet::GetEncryptionKeysMessageSuccess { request_id, message_id })
                    }
                    Err(StoreError::ClientNotExists) | Err(StoreError::ChannelNotExists) => {
                        Ok(Packet::GetEncryptionKeysMessageFailNoSuchClient { request_id })
                    }
                    Err(other) => Err(unexpected_store_error(other)),
                }
            }

            _ => Err(ServerError::UnexpectedPacket("request not valid after authentication")),
        }
    }

    async fn push_to(&self, receiver_id: ClientId, message: Message) {
        let queues = self.push_queues.lock().await;
        if let Some(tx) = queues.get(&receiver_id) {
            let _ = tx.send(message);
        }
    }
}

/// Spawn the task that drains `push_rx` and writes a `NewMessage` frame
/// for each arriving message, sharing the connection's writer with the
/// foreground request loop via the packet stream's internal lock.
fn spawn_push_pump(
    stream: Arc<PacketStream>,
    mut push_rx: mpsc::UnboundedReceiver<Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = push_rx.recv().await {
            let packet = Packet::NewMessage { message: to_wire_message(message) };
            if stream.send(&packet).await.is_err() {
                break;
            }
        }
    })
}

fn peer_channel(client_id: ClientId, peer_id: ClientId) -> Option<ChannelId> {
    if client_id == peer_id { None } else { Some(ChannelId::from_pair(client_id, peer_id)) }
}

fn to_wire_message(message: Message) -> WireMessage {
    WireMessage { sender: message.sender, content: message.content }
}

fn unexpected_store_error(e: StoreError) -> ServerError {
    ServerError::UnexpectedPacket(match e {
        StoreError::ClientNotExists => "unexpected ClientNotExists",
        StoreError::ChannelNotExists => "unexpected ChannelNotExists",
        StoreError::InvalidRange => "unexpected InvalidRange",
        StoreError::InvalidId => "unexpected InvalidId",
    })
}
