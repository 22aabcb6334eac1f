//! Codec-level errors.

use std::fmt;

/// A packet failed to encode or decode.
///
/// Both directions are treated identically by callers: a codec failure
/// is always a fatal protocol violation, never a typed reply.
#[derive(Debug)]
pub enum CodecError {
    /// The payload could not be parsed as a valid packet.
    Decode(rmp_serde::decode::Error),
    /// The packet could not be serialized.
    Encode(rmp_serde::encode::Error),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(e) => write!(f, "packet decode error: {e}"),
            Self::Encode(e) => write!(f, "packet encode error: {e}"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<rmp_serde::decode::Error> for CodecError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Self::Decode(e)
    }
}

impl From<rmp_serde::encode::Error> for CodecError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Self::Encode(e)
    }
}
