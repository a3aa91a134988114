//! Key import seam.
//!
//! Builders are registered together with their public key. Verifying and
//! storing keys belongs to an external keyring; the master only needs the
//! key id it hands back.

use async_trait::async_trait;
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Identifier of an imported key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
#[serde(transparent)]
pub struct KeyId(String);

impl KeyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Imports key material and returns its id.
///
/// Implementations return [`crate::Error::Credential`] when the material
/// cannot be imported.
#[async_trait]
pub trait KeyImporter: Send + Sync {
    async fn import(&self, key: &str) -> Result<KeyId>;
}
