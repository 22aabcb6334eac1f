//! Client-side session machine.
//!
//! Symmetric to the server: open a TCP connection, run the key
//! exchange, install the encrypted transport and packet stream, then
//! drive `register`/`login` and the typed request methods. Tracks an
//! explicit state machine so misuse (e.g. sending a request before
//! authentication) is rejected locally rather than producing a
//! confusing wire-level failure.

use std::sync::Arc;

use rand_core::RngCore;
use rsa::RsaPublicKey;
use tokio::net::TcpStream;

use parlor_proto::{EncryptedReader, EncryptedWriter, FrameReader, FrameWriter, keyexchange};
use parlor_wire::{ClientId, Packet, RequestId, WireMessage};

use crate::error::ClientError;
use crate::packet_stream::PacketStream;

/// The client's connection lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// No TCP connection has been established yet (or it has ended).
    Disconnected,
    /// Transport is up but the session has not registered or logged in.
    Connected,
    /// Authenticated as the contained client id.
    Authenticated(ClientId),
}

/// A connected (or not-yet-connected) session to the parlor server.
pub struct Client {
    state: std::sync::Mutex<State>,
    stream: std::sync::Mutex<Option<Arc<PacketStream>>>,
}

impl Client {
    /// A fresh, unconnected client.
    pub fn new() -> Self {
        Self {
            state: std::sync::Mutex::new(State::Disconnected),
            stream: std::sync::Mutex::new(None),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        *self.state.lock().unwrap()
    }

    /// Open a TCP connection to `addr`, run the key exchange against
    /// the server's RSA public key, and install the encrypted
    /// transport. `on_new_message` is invoked, on the reader task, for
    /// every unsolicited push from the server.
    pub async fn connect(
        &self,
        addr: &str,
        server_key: &RsaPublicKey,
        on_new_message: impl Fn(WireMessage) + Send + 'static,
    ) -> Result<(), ClientError> {
        if self.state() != State::Disconnected {
            return Err(ClientError::AlreadyConnected);
        }

        let tcp = TcpStream::connect(addr).await.map_err(parlor_proto::ProtoError::from)?;
        let (read_half, write_half) = tcp.into_split();
        let frame_reader = FrameReader::new(read_half);
        let mut frame_writer = FrameWriter::new(write_half);

        let exchanged = keyexchange::client_initiate(&mut frame_writer, server_key).await?;

        let reader = EncryptedReader::new(
            frame_reader,
            exchanged.session_key,
            keyexchange::CLIENT_PEER_NONCE,
        );
        let writer = Arc::new(EncryptedWriter::new(
            frame_writer,
            exchanged.session_key,
            keyexchange::CLIENT_OWN_NONCE,
        ));

        let stream = Arc::new(PacketStream::spawn(reader, writer, move |packet| {
            if let Packet::NewMessage { message } = packet {
                on_new_message(message);
            }
        }));

        *self.stream.lock().unwrap() = Some(stream);
        *self.state.lock().unwrap() = State::Connected;
        Ok(())
    }

    /// Register a new account with `password`, becoming authenticated
    /// as the freshly allocated client id.
    pub async fn register(&self, password: Vec<u8>) -> Result<ClientId, ClientError> {
        self.require_connected()?;
        let stream = self.stream();
        stream.send(&Packet::Register { password }).await?;
        match stream.recv_generic().await? {
            Packet::RegisterSuccess { id } => {
                *self.state.lock().unwrap() = State::Authenticated(id);
                Ok(id)
            }
            _ => Err(parlor_proto::ProtoError::Protocol("expected RegisterSuccess".into()).into()),
        }
    }

    /// Authenticate as an existing account.
    pub async fn login(&self, id: ClientId, password: Vec<u8>) -> Result<(), ClientError> {
        self.require_connected()?;
        let stream = self.stream();
        stream.send(&Packet::Login { id, password }).await?;
        match stream.recv_generic().await? {
            Packet::LoginSuccess {} => {
                *self.state.lock().unwrap() = State::Authenticated(id);
                Ok(())
            }
            Packet::LoginFail {} => Err(ClientError::LoginFailed),
            _ => Err(parlor_proto::ProtoError::Protocol("expected LoginSuccess/LoginFail".into()).into()),
        }
    }

    /// The ids of clients this account shares a channel with.
    pub async fn get_channel_peers(&self) -> Result<Vec<ClientId>, ClientError> {
        self.require_authenticated()?;
        let request_id = self.fresh_request_id();
        let reply = self
            .stream()
            .make_request(Packet::GetChannelPeers { request_id })
            .await?;
        match reply {
            Packet::GetChannelPeersSuccess { peers, .. } => Ok(peers),
            _ => Err(unexpected_reply()),
        }
    }

    /// Number of messages stored in the channel shared with `peer_id`.
    pub async fn get_messages_count(&self, peer_id: ClientId) -> Result<Option<i64>, ClientError> {
        self.require_authenticated()?;
        let request_id = self.fresh_request_id();
        let reply = self
            .stream()
            .make_request(Packet::GetMessagesCount { request_id, peer_id })
            .await?;
        match reply {
            Packet::GetMessagesCountSuccess { count, .. } => Ok(Some(count)),
            Packet::GetMessagesCountFailNoSuchClient { .. } => Ok(None),
            _ => Err(unexpected_reply()),
        }
    }

    /// Send `content` to `receiver_id`. Returns `false` if the receiver
    /// does not exist.
    pub async fn send_message(
        &self,
        receiver_id: ClientId,
        content: Vec<u8>,
    ) -> Result<bool, ClientError> {
        self.require_authenticated()?;
        let request_id = self.fresh_request_id();
        let reply = self
            .stream()
            .make_request(Packet::SendMessage { request_id, receiver_id, content })
            .await?;
        match reply {
            Packet::SendMessageSuccess { .. } => Ok(true),
            Packet::SendMessageFailNoSuchClient { .. } => Ok(false),
            _ => Err(unexpected_reply()),
        }
    }

    /// Fetch `count` messages starting at `first` from the channel
    /// shared with `peer_id`. Returns `None` if the range is invalid.
    pub async fn get_messages(
        &self,
        peer_id: ClientId,
        first: i64,
        count: i64,
    ) -> Result<Option<Vec<WireMessage>>, ClientError> {
        self.require_authenticated()?;
        let request_id = self.fresh_request_id();
        let reply = self
            .stream()
            .make_request(Packet::GetMessages { request_id, peer_id, first, count })
            .await?;
        match reply {
            Packet::GetMessagesSuccess { messages, .. } => Ok(Some(messages)),
            Packet::GetMessagesFailInvalidRange { .. } => Ok(None),
            _ => Err(unexpected_reply()),
        }
    }

    /// Record that `message_id` in the channel shared with `peer_id`
    /// carries this client's key bundle.
    pub async fn set_encryption_keys_message(
        &self,
        peer_id: ClientId,
        message_id: i64,
    ) -> Result<SetKeysOutcome, ClientError> {
        self.require_authenticated()?;
        let request_id = self.fresh_request_id();
        let reply = self
            .stream()
            .make_request(Packet::SetEncryptionKeysMessage { request_id, peer_id, message_id })
            .await?;
        match reply {
            Packet::SetEncryptionKeysMessageSuccess { .. } => Ok(SetKeysOutcome::Success),
            Packet::SetEncryptionKeysMessageFailNoSuchClient { .. } => {
                Ok(SetKeysOutcome::NoSuchClient)
            }
            Packet::SetEncryptionKeysMessageFailInvalidId { .. } => Ok(SetKeysOutcome::InvalidId),
            _ => Err(unexpected_reply()),
        }
    }

    /// Fetch the key-bundle pointer `keys_owner_id` has set in the
    /// channel shared with `peer_id`.
    pub async fn get_encryption_keys_message(
        &self,
        keys_owner_id: ClientId,
        peer_id: ClientId,
    ) -> Result<Option<Option<i64>>, ClientError> {
        self.require_authenticated()?;
        let request_id = self.fresh_request_id();
        let reply = self
            .stream()
            .make_request(Packet::GetEncryptionKeysMessage { request_id, keys_owner_id, peer_id })
            .await?;
        match reply {
            Packet::GetEncryptionKeysMessageSuccess { message_id, .. } => Ok(Some(message_id)),
            Packet::GetEncryptionKeysMessageFailNoSuchClient { .. } => Ok(None),
            _ => Err(unexpected_reply()),
        }
    }

    /// Close the transport and return to `Disconnected`.
    pub async fn disconnect(&self) {
        if let Some(stream) = self.stream.lock().unwrap().take() {
            stream.close().await;
        }
        *self.state.lock().unwrap() = State::Disconnected;
    }

    fn stream(&self) -> Arc<PacketStream> {
        self.stream.lock().unwrap().clone().expect("connected state implies a stream")
    }

    fn fresh_request_id(&self) -> RequestId {
        loop {
            let id = random_request_id();
            if id != 0 {
                return id;
            }
        }
    }

    fn require_connected(&self) -> Result<(), ClientError> {
        match self.state() {
            State::Disconnected => Err(ClientError::NotConnected),
            State::Connected => Ok(()),
            State::Authenticated(_) => Err(ClientError::AlreadyAuthorized),
        }
    }

    fn require_authenticated(&self) -> Result<(), ClientError> {
        match self.state() {
            State::Disconnected => Err(ClientError::NotConnected),
            State::Connected => Err(ClientError::NotAuthorized),
            State::Authenticated(_) => Ok(()),
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of [`Client::set_encryption_keys_message`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetKeysOutcome {
    /// The pointer was recorded.
    Success,
    /// `peer_id` does not share a channel with this client.
    NoSuchClient,
    /// `message_id` was not sent by this client.
    InvalidId,
}

fn unexpected_reply() -> ClientError {
    parlor_proto::ProtoError::Protocol("reply did not match the request".into()).into()
}

/// Draw a single random `request_id` from the OS CSPRNG, per the wire
/// protocol's "random 64-bit signed integer" requirement. Used by
/// `Client::fresh_request_id` for every outbound request, and exposed
/// here for callers that want to draw one up front.
pub fn random_request_id() -> RequestId {
    let mut bytes = [0u8; 8];
    rand_core::OsRng.fill_bytes(&mut bytes);
    i64::from_le_bytes(bytes)
}
