//! HMAC-SHA256 tag computation and constant-time verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{SESSION_KEY_LEN, TAG_LEN};

type HmacSha256 = Hmac<Sha256>;

/// Compute the HMAC-SHA256 tag over `ciphertext` under `key`.
pub fn compute_tag(key: &[u8; SESSION_KEY_LEN], ciphertext: &[u8]) -> [u8; TAG_LEN] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(ciphertext);
    mac.finalize().into_bytes().into()
}

/// Verify `tag` against `ciphertext` under `key` in constant time.
///
/// Returns `false` on mismatch without leaking which byte differed.
pub fn verify_tag(key: &[u8; SESSION_KEY_LEN], ciphertext: &[u8], tag: &[u8; TAG_LEN]) -> bool {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(ciphertext);
    mac.verify_slice(tag).is_ok()
}
