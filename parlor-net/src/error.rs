//! Aggregate error types for the session machines.

use parlor_proto::ProtoError;
use thiserror::Error;

/// Errors that can terminate a server-side session.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The transport or packet stream hit a fatal condition.
    #[error(transparent)]
    Proto(#[from] ProtoError),
    /// The peer sent something other than `Register`/`Login` as its
    /// first packet, or a request packet this session cannot service.
    #[error("unexpected packet: {0}")]
    UnexpectedPacket(&'static str),
}

/// Errors surfaced locally by the client session machine.
///
/// These never cross the wire — they describe misuse of the client API
/// (calling an operation in the wrong state) or a fatal transport
/// failure.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport or packet stream hit a fatal condition.
    #[error(transparent)]
    Proto(#[from] ProtoError),
    /// An operation that requires an open connection was called before
    /// one was established.
    #[error("not connected")]
    NotConnected,
    /// `connect` was called on a client that is already connected.
    #[error("already connected")]
    AlreadyConnected,
    /// An operation that requires authentication was called before
    /// `register`/`login` succeeded.
    #[error("not authorized")]
    NotAuthorized,
    /// `register`/`login` was called on a client that is already
    /// authorized.
    #[error("already authorized")]
    AlreadyAuthorized,
    /// The server rejected a `Login` attempt.
    #[error("login failed")]
    LoginFailed,
}
