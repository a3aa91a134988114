//! Salted digests for builder and user passwords.
//!
//! Stored form is `<salt hex>$<hmac hex>`, where the HMAC-SHA256 is keyed
//! with the salt and computed over the password.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const SEPARATOR: char = '$';

/// Digest a password under a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4();
    let mut mac =
        HmacSha256::new_from_slice(salt.as_bytes()).expect("HMAC can take any size key");
    mac.update(password.as_bytes());
    let tag = mac.finalize().into_bytes();
    format!("{}{}{}", hex::encode(salt.as_bytes()), SEPARATOR, hex::encode(tag))
}

/// Check a plaintext password against a stored digest in constant time.
pub fn verify_password(password: &str, digest: &str) -> bool {
    let Some((salt_hex, tag_hex)) = digest.split_once(SEPARATOR) else {
        return false;
    };
    let (Ok(salt), Ok(tag)) = (hex::decode(salt_hex), hex::decode(tag_hex)) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(&salt) else {
        return false;
    };
    mac.update(password.as_bytes());

    mac.verify_slice(&tag).is_ok()
}
