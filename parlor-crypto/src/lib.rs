//! Cryptographic primitives for the parlor wire protocol.
//!
//! Provides:
//! - AES-256-CTR encryption/decryption
//! - HMAC-SHA256 tag computation and constant-time verification
//! - RSA-OAEP(SHA-256) session-key wrapping, used once per connection during
//!   key exchange
//!
//! This crate is intentionally session-agnostic: nonce bookkeeping and frame
//! layout live in `parlor-proto`, which builds the encrypted transport on
//! top of these primitives.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod aes_ctr;
pub mod hmac_sha256;
pub mod rsa_oaep;

pub use aes_ctr::apply_ctr;
pub use hmac_sha256::{compute_tag, verify_tag};
pub use rsa_oaep::{unwrap_session_key, wrap_session_key};

/// Length in bytes of the AES-256 session key shared by both directions.
pub const SESSION_KEY_LEN: usize = 32;

/// Length in bytes of the HMAC-SHA256 tag appended to every encrypted frame.
pub const TAG_LEN: usize = 32;
