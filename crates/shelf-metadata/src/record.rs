// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wire shapes exchanged with the metadata API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A server-persisted metadata record.
///
/// `value` is an opaque JSON string; the store never looks inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    /// Server-assigned row id.
    pub id: u64,
    /// Unique key (flat namespace).
    pub key: String,
    /// JSON encoding of the caller's value.
    pub value: String,
    /// Creation time (server clock).
    pub created_at: DateTime<Utc>,
    /// Last update time (server clock).
    pub updated_at: DateTime<Utc>,
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMetadata {
    /// Key for the new record.
    pub key: String,
    /// JSON-encoded value.
    pub value: String,
}

/// Body of an update request. The value is replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMetadata {
    /// Replacement JSON-encoded value.
    pub value: String,
}

/// Error entry inside an [`ApiEnvelope`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// HTTP-like status, when the API reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `{ data, errors }` envelope wrapping every API response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    /// Payload on success.
    #[serde(default)]
    pub data: Option<T>,
    /// Errors reported by the API, if any.
    #[serde(default)]
    pub errors: Option<Vec<ApiErrorBody>>,
}

impl<T> ApiEnvelope<T> {
    /// Successful envelope carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            errors: None,
        }
    }

    /// Failed envelope carrying a single error.
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            data: None,
            errors: Some(vec![ApiErrorBody {
                status: Some(status),
                message: Some(message.into()),
            }]),
        }
    }

    /// First reported error, ignoring an empty `errors` array.
    pub fn first_error(&self) -> Option<&ApiErrorBody> {
        self.errors.as_ref().and_then(|errs| errs.first())
    }
}
