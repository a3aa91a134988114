//! Armored public key import.

use async_trait::async_trait;
use debile_core::{Error, KeyId, KeyImporter, Result};
use sha2::{Digest, Sha256};

const BEGIN: &str = "-----BEGIN PGP PUBLIC KEY BLOCK-----";
const END: &str = "-----END PGP PUBLIC KEY BLOCK-----";

/// Accepts ASCII-armored public key blocks and derives a stable key id
/// from the armored body.
///
/// This checks framing only; signature verification stays with the
/// external keyring that consumes the key id.
#[derive(Debug, Default, Clone, Copy)]
pub struct FingerprintKeyring;

impl FingerprintKeyring {
    fn armored_body(key: &str) -> Result<String> {
        let key = key.trim();
        let inner = key
            .strip_prefix(BEGIN)
            .and_then(|rest| rest.strip_suffix(END))
            .ok_or_else(|| Error::Credential("not an armored public key block".to_string()))?;

        // Armor headers ("Version: ...") run up to the first blank line.
        let lines = inner.lines().map(str::trim).skip_while(|l| l.is_empty());
        let mut body = String::new();
        let mut in_headers = true;
        for line in lines {
            if in_headers {
                if line.is_empty() {
                    in_headers = false;
                    continue;
                }
                if line.contains(": ") {
                    continue;
                }
                in_headers = false;
            }
            body.push_str(line);
        }

        if body.is_empty() {
            return Err(Error::Credential("empty public key block".to_string()));
        }
        if !body
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=' | '-'))
        {
            return Err(Error::Credential(
                "public key block is not radix-64".to_string(),
            ));
        }
        Ok(body)
    }
}

#[async_trait]
impl KeyImporter for FingerprintKeyring {
    async fn import(&self, key: &str) -> Result<KeyId> {
        let body = Self::armored_body(key)?;
        let digest = hex::encode_upper(Sha256::digest(body.as_bytes()));
        Ok(KeyId::new(&digest[digest.len() - 16..]))
    }
}
