//! Error taxonomy for the framing, transport and key-exchange layers.

use std::fmt;

/// Errors raised by the frame layer, encrypted transport, or key exchange.
///
/// Both variants are fatal: on either one, callers must close the
/// underlying connection. `StreamClosed` is a clean peer/local close;
/// `Protocol` is a violation of the wire contract (bad length prefix,
/// failed MAC, schema mismatch, OAEP failure, …) and must never be
/// reported back to the peer as a typed reply.
#[derive(Debug)]
pub enum ProtoError {
    /// The peer closed the connection, or it was closed locally.
    StreamClosed,
    /// The peer violated the wire protocol.
    Protocol(String),
    /// Underlying I/O failure not attributable to a clean close.
    Io(std::io::Error),
}

impl fmt::Display for ProtoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StreamClosed => write!(f, "stream closed"),
            Self::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for ProtoError {}

impl From<std::io::Error> for ProtoError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::BrokenPipe => Self::StreamClosed,
            _ => Self::Io(e),
        }
    }
}
