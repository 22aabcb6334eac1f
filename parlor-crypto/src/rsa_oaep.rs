//! One-shot RSA-OAEP(SHA-256/MGF1) wrapping of the session key.
//!
//! Used exactly once per connection, during key exchange (`parlor-proto`'s
//! `keyexchange` module): the client wraps a freshly generated 32-byte
//! session key under the server's RSA public key; the server unwraps it
//! with its private key.

use rand_core::OsRng;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::SESSION_KEY_LEN;

/// Errors from [`wrap_session_key`] / [`unwrap_session_key`].
#[derive(Debug)]
pub enum Error {
    /// The underlying RSA operation failed (bad padding, key too small, …).
    Rsa(rsa::Error),
    /// The server returned (or would encrypt) a plaintext of the wrong
    /// length — never a valid 32-byte session key.
    WrongLength { got: usize },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsa(e) => write!(f, "RSA-OAEP error: {e}"),
            Self::WrongLength { got } => {
                write!(f, "unwrapped key has length {got}, expected {SESSION_KEY_LEN}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<rsa::Error> for Error {
    fn from(e: rsa::Error) -> Self { Self::Rsa(e) }
}

/// Encrypt `session_key` under `server_key` using RSA-OAEP(SHA-256).
pub fn wrap_session_key(
    server_key: &RsaPublicKey,
    session_key: &[u8; SESSION_KEY_LEN],
) -> Result<Vec<u8>, Error> {
    let padding = Oaep::new::<Sha256>();
    Ok(server_key.encrypt(&mut OsRng, padding, session_key)?)
}

/// Decrypt `ciphertext` with `server_key` and recover the 32-byte session key.
pub fn unwrap_session_key(
    server_key: &RsaPrivateKey,
    ciphertext: &[u8],
) -> Result<[u8; SESSION_KEY_LEN], Error> {
    let padding = Oaep::new::<Sha256>();
    let plain = server_key.decrypt(padding, ciphertext)?;
    plain
        .try_into()
        .map_err(|v: Vec<u8>| Error::WrongLength { got: v.len() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::RsaPrivateKey;

    fn test_key() -> RsaPrivateKey {
        RsaPrivateKey::new(&mut OsRng, 2048).expect("keygen")
    }

    #[test]
    fn wrap_then_unwrap_roundtrips() {
        let priv_key = test_key();
        let pub_key = RsaPublicKey::from(&priv_key);
        let session_key = [42u8; SESSION_KEY_LEN];

        let wrapped = wrap_session_key(&pub_key, &session_key).unwrap();
        let unwrapped = unwrap_session_key(&priv_key, &wrapped).unwrap();

        assert_eq!(unwrapped, session_key);
    }

    #[test]
    fn unwrap_with_wrong_key_fails() {
        let priv_key = test_key();
        let pub_key = RsaPublicKey::from(&priv_key);
        let other_priv_key = test_key();
        let session_key = [9u8; SESSION_KEY_LEN];

        let wrapped = wrap_session_key(&pub_key, &session_key).unwrap();
        assert!(unwrap_session_key(&other_priv_key, &wrapped).is_err());
    }
}
