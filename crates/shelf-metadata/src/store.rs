// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Typed façade over a [`MetadataGateway`].
//!
//! Values are JSON-encoded into the record's `value` string. Reads collapse
//! every failure to "nothing there" through [`MetadataStore::get`], or keep
//! the distinction through [`MetadataStore::lookup`]. Writes check first and
//! then update or create, so the store itself never produces two records for
//! one key.

use std::fmt;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::gateway::{GatewayError, MetadataGateway};
use crate::record::MetadataRecord;

/// Result of a tagged read.
#[derive(Debug)]
pub enum Lookup<T> {
    /// Record exists and its value decoded as `T`.
    Found(T),
    /// No record for the key.
    NotFound,
    /// Record exists but its value is not valid JSON for `T`, or the
    /// gateway reported the stored record itself as corrupt.
    Malformed(serde_json::Error),
    /// The gateway failed for some other reason.
    Unavailable(GatewayError),
}

impl<T> Lookup<T> {
    /// Collapse to the plain `get` behaviour: anything but `Found` is `None`.
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(v) => Some(v),
            _ => None,
        }
    }

    /// True when the key is absent or unreadable, i.e. a rewrite would repair it.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::NotFound | Self::Malformed(_))
    }
}

/// Which fetch failures make [`MetadataStore::write`] fall back to create.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RepairPolicy {
    /// Any fetch error triggers a create attempt. Relies on the backend
    /// rejecting a create on an existing key.
    #[default]
    AnyError,
    /// Only a not-found fetch triggers a create; other errors fail the write.
    NotFoundOnly,
}

impl RepairPolicy {
    fn allows_create(self, err: &GatewayError) -> bool {
        match self {
            Self::AnyError => true,
            Self::NotFoundOnly => err.is_not_found(),
        }
    }
}

/// Which path a successful write took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Existing record was updated.
    Updated,
    /// Record was missing and has been created.
    Created,
}

/// Error type for [`MetadataStore::write`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Value could not be encoded as JSON.
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),
    /// Fetch failed and the repair policy did not allow a create.
    #[error("fetch failed: {0}")]
    Fetch(#[source] GatewayError),
    /// Record existed but the update failed.
    #[error("update failed: {0}")]
    Update(#[source] GatewayError),
    /// Record was missing and the create failed.
    #[error("create failed: {0}")]
    Create(#[source] GatewayError),
}

/// Typed get/set/delete over a metadata gateway.
///
/// Cloning is cheap; clones share the gateway.
pub struct MetadataStore<G> {
    gateway: Arc<G>,
    policy: RepairPolicy,
}

impl<G> Clone for MetadataStore<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            policy: self.policy,
        }
    }
}

impl<G> fmt::Debug for MetadataStore<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataStore")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<G> MetadataStore<G> {
    /// Create a store over `gateway` with the default repair policy.
    pub fn new(gateway: G) -> Self {
        Self::from_shared(Arc::new(gateway))
    }

    /// Create a store over an already shared gateway.
    pub fn from_shared(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            policy: RepairPolicy::default(),
        }
    }

    /// Replace the repair policy.
    pub fn with_repair_policy(mut self, policy: RepairPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Active repair policy.
    pub fn repair_policy(&self) -> RepairPolicy {
        self.policy
    }

    /// Borrow the underlying gateway.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

impl<G> MetadataStore<G>
where
    G: MetadataGateway,
{
    /// Fetch the raw record for `key`.
    pub async fn record(&self, key: &str) -> Result<MetadataRecord, GatewayError> {
        self.gateway.fetch(key).await
    }

    /// Fetch and decode `key`, keeping the failure kind.
    pub async fn lookup<T>(&self, key: &str) -> Lookup<T>
    where
        T: DeserializeOwned,
    {
        match self.gateway.fetch(key).await {
            Ok(record) => match serde_json::from_str(&record.value) {
                Ok(value) => Lookup::Found(value),
                Err(err) => {
                    warn!(key = %key, error = %err, "metadata value is not valid JSON");
                    Lookup::Malformed(err)
                }
            },
            Err(err) if err.is_not_found() => {
                debug!(key = %key, "metadata key not found");
                Lookup::NotFound
            }
            Err(GatewayError::Corrupt { source, .. }) => {
                warn!(key = %key, error = %source, "stored metadata record is corrupt");
                Lookup::Malformed(source)
            }
            Err(err) => {
                warn!(key = %key, error = %err, "metadata fetch failed");
                Lookup::Unavailable(err)
            }
        }
    }

    /// Fetch and decode `key`. Missing, malformed, and unreachable all yield `None`.
    pub async fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        self.lookup(key).await.found()
    }

    /// Encode `value` and store it under `key`, creating the record if the
    /// fetch fails in a way the repair policy accepts.
    pub async fn write<T>(&self, key: &str, value: &T) -> Result<WriteOutcome, StoreError>
    where
        T: Serialize + ?Sized,
    {
        let encoded = serde_json::to_string(value).map_err(StoreError::Encode)?;
        match self.gateway.fetch(key).await {
            Ok(_) => {
                self.gateway
                    .update(key, &encoded)
                    .await
                    .map_err(StoreError::Update)?;
                Ok(WriteOutcome::Updated)
            }
            Err(err) if self.policy.allows_create(&err) => {
                debug!(key = %key, error = %err, "metadata fetch failed; creating record");
                self.gateway
                    .create(key, &encoded)
                    .await
                    .map_err(StoreError::Create)?;
                Ok(WriteOutcome::Created)
            }
            Err(err) => Err(StoreError::Fetch(err)),
        }
    }

    /// Boolean form of [`write`](Self::write). Failures are logged, not returned.
    pub async fn set<T>(&self, key: &str, value: &T) -> bool
    where
        T: Serialize + ?Sized,
    {
        match self.write(key, value).await {
            Ok(_) => true,
            Err(err) => {
                warn!(key = %key, error = %err, "metadata write failed");
                false
            }
        }
    }

    /// Delete the record for `key`. Any failure yields `false`.
    pub async fn delete(&self, key: &str) -> bool {
        match self.gateway.delete(key).await {
            Ok(()) => true,
            Err(err) => {
                warn!(key = %key, error = %err, "metadata delete failed");
                false
            }
        }
    }
}
