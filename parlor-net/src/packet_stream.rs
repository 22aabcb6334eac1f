//! The request/response multiplexer.
//!
//! Owns exactly one background reader per connection. Every decoded
//! inbound packet is routed, in order:
//!
//! 1. to a pending [`make_request`](PacketStream::make_request) waiter,
//!    if its `request_id` matches one that is registered;
//! 2. to the unsolicited-packet callback, if its type is `NewMessage`;
//! 3. to a generic inbound queue otherwise — used during authentication,
//!    where packets carry no `request_id`, and on the server side for
//!    every incoming request (the server never calls `make_request`
//!    against its own client).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;

use parlor_proto::{EncryptedReader, EncryptedWriter, ProtoError};
use parlor_wire::{Packet, RequestId};

#[derive(Clone)]
enum Terminal {
    Closed,
    Protocol(String),
}

impl Terminal {
    fn into_proto_error(self) -> ProtoError {
        match self {
            Terminal::Closed => ProtoError::StreamClosed,
            Terminal::Protocol(msg) => ProtoError::Protocol(msg),
        }
    }

    fn from_proto_error(e: &ProtoError) -> Self {
        match e {
            ProtoError::StreamClosed => Terminal::Closed,
            ProtoError::Protocol(msg) => Terminal::Protocol(msg.clone()),
            ProtoError::Io(err) => Terminal::Protocol(err.to_string()),
        }
    }
}

type PendingMap = Arc<Mutex<HashMap<RequestId, oneshot::Sender<Result<Packet, ProtoError>>>>>;

/// A single full-duplex, packet-level connection: a shared writer plus
/// the reader task's dispatch machinery.
pub struct PacketStream {
    writer: Arc<EncryptedWriter>,
    pending: PendingMap,
    generic_rx: Mutex<mpsc::UnboundedReceiver<Packet>>,
    terminal: Arc<Mutex<Option<Terminal>>>,
    closed: Arc<AtomicBool>,
    reader_task: JoinHandle<()>,
}

impl PacketStream {
    /// Spawn the background reader and build the multiplexer around it.
    ///
    /// `on_unsolicited` is invoked, on the reader task, for every inbound
    /// `NewMessage` push — it must not block.
    pub fn spawn(
        mut reader: EncryptedReader,
        writer: Arc<EncryptedWriter>,
        on_unsolicited: impl Fn(Packet) + Send + 'static,
    ) -> Self {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (generic_tx, generic_rx) = mpsc::unbounded_channel();
        let terminal = Arc::new(Mutex::new(None));
        let closed = Arc::new(AtomicBool::new(false));

        let task_pending = pending.clone();
        let task_terminal = terminal.clone();
        let task_closed = closed.clone();

        let reader_task = tokio::spawn(async move {
            loop {
                let frame = match reader.read().await {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::debug!(error = %e, "packet stream reader terminated");
                        *task_terminal.lock().await = Some(Terminal::from_proto_error(&e));
                        break;
                    }
                };

                let packet = match parlor_wire::decode(&frame) {
                    Ok(packet) => packet,
                    Err(e) => {
                        tracing::warn!(error = %e, "malformed packet, closing connection");
                        *task_terminal.lock().await =
                            Some(Terminal::Protocol(format!("malformed packet: {e}")));
                        break;
                    }
                };

                if let Some(request_id) = packet.request_id() {
                    let mut pend = task_pending.lock().await;
                    if let Some(tx) = pend.remove(&request_id) {
                        drop(pend);
                        let _ = tx.send(Ok(packet));
                        continue;
                    }
                }

                if matches!(packet, Packet::NewMessage { .. }) {
                    on_unsolicited(packet);
                    continue;
                }

                if generic_tx.send(packet).is_err() {
                    break;
                }
            }

            task_closed.store(true, Ordering::Release);
            let err = task_terminal
                .lock()
                .await
                .clone()
                .unwrap_or(Terminal::Closed)
                .into_proto_error();
            for (_, tx) in task_pending.lock().await.drain() {
                let _ = tx.send(Err(match &err {
                    ProtoError::StreamClosed => ProtoError::StreamClosed,
                    ProtoError::Protocol(m) => ProtoError::Protocol(m.clone()),
                    ProtoError::Io(e) => ProtoError::Protocol(e.to_string()),
                }));
            }
        });

        Self { writer, pending, generic_rx: Mutex::new(generic_rx), terminal, closed, reader_task }
    }

    /// Write a packet with no reply expected: either a positional
    /// authentication packet, a typed reply the server is sending to a
    /// client request, or an unsolicited `NewMessage` push.
    pub async fn send(&self, packet: &Packet) -> Result<(), ProtoError> {
        let bytes = parlor_wire::encode(packet)
            .map_err(|e| ProtoError::Protocol(format!("failed to encode packet: {e}")))?;
        self.writer.write(&bytes).await
    }

    /// Write `packet` (which must carry a fresh, unique `request_id`)
    /// and await the reply correlated to that id.
    pub async fn make_request(&self, packet: Packet) -> Result<Packet, ProtoError> {
        let request_id = packet
            .request_id()
            .expect("make_request requires a packet carrying a request_id");

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            assert!(
                !pending.contains_key(&request_id),
                "request_id {request_id} is already pending"
            );
            pending.insert(request_id, tx);
        }

        if let Err(e) = self.send(&packet).await {
            self.pending.lock().await.remove(&request_id);
            return Err(e);
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(self.current_terminal_error().await),
        }
    }

    /// Read the next packet off the generic inbound queue (one with no
    /// matching pending request and not a `NewMessage` push). Used for
    /// authentication packets and, on the server, for every request.
    pub async fn recv_generic(&self) -> Result<Packet, ProtoError> {
        let mut rx = self.generic_rx.lock().await;
        match rx.recv().await {
            Some(packet) => Ok(packet),
            None => Err(self.current_terminal_error().await),
        }
    }

    async fn current_terminal_error(&self) -> ProtoError {
        self.terminal
            .lock()
            .await
            .clone()
            .unwrap_or(Terminal::Closed)
            .into_proto_error()
    }

    /// True once the reader task has observed a terminal condition.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the underlying transport and stop the reader task.
    pub async fn close(&self) {
        let _ = self.writer.close().await;
        self.reader_task.abort();
    }
}
