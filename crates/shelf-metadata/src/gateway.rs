// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Gateway port: how the store reaches whatever actually persists records.

use async_trait::async_trait;
use thiserror::Error;

use crate::record::MetadataRecord;

/// Error surface of a metadata gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No record exists for the key.
    #[error("metadata key not found: {key}")]
    NotFound {
        /// Key that was requested.
        key: String,
    },
    /// A record already exists for the key (create on existing key).
    #[error("metadata key already exists: {key}")]
    Conflict {
        /// Key that collided.
        key: String,
    },
    /// Non-success status reported by the API.
    #[error("api error {status}: {message}")]
    Status {
        /// HTTP-like status code.
        status: u16,
        /// Message from the API (may be empty).
        message: String,
    },
    /// Connection, timeout, or other transport failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// A stored record exists but cannot be read back (e.g. a damaged file).
    /// Rewriting the key repairs it.
    #[error("stored record for {key} is corrupt: {source}")]
    Corrupt {
        /// Key whose record is damaged.
        key: String,
        /// Parse failure.
        #[source]
        source: serde_json::Error,
    },
    /// Key is not acceptable to this gateway.
    #[error("invalid metadata key: {0:?}")]
    InvalidKey(String),
    /// Local I/O failure (filesystem-backed gateways).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Shorthand for [`GatewayError::NotFound`].
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// True for the "key does not exist" case, however the gateway spelled it.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Status { status: 404, .. })
    }
}

/// Port for raw metadata record access.
///
/// Implementations map their transport's failure modes onto [`GatewayError`];
/// in particular "no such key" must come back as something
/// [`GatewayError::is_not_found`] recognises, since the store's repair path
/// depends on it.
#[async_trait]
pub trait MetadataGateway: Send + Sync {
    /// Fetch the record stored under `key`.
    async fn fetch(&self, key: &str) -> Result<MetadataRecord, GatewayError>;
    /// Create a new record. Fails with `Conflict` if the key exists.
    async fn create(&self, key: &str, value: &str) -> Result<MetadataRecord, GatewayError>;
    /// Replace the value of an existing record.
    async fn update(&self, key: &str, value: &str) -> Result<MetadataRecord, GatewayError>;
    /// Delete the record stored under `key`.
    async fn delete(&self, key: &str) -> Result<(), GatewayError>;
}
