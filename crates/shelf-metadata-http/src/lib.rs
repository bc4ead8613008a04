// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! HTTP gateway for the Shelf metadata API.
//!
//! Speaks the `{ data, errors }` envelope over four routes:
//! `GET/PUT/DELETE {base}/metadata/{key}` and `POST {base}/metadata`.
//! No retries; the only timeout is the client-level one from [`HttpConfig`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use shelf_metadata::{
    ApiEnvelope, CreateMetadata, GatewayError, MetadataGateway, MetadataRecord, UpdateMetadata,
};
use tracing::debug;

const METADATA_SEGMENT: &str = "metadata";

/// Connection settings for [`HttpMetadataGateway`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// API root, e.g. `http://localhost:3000/api`.
    pub base_url: Url,
    /// Whole-request timeout.
    pub timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl HttpConfig {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Parse `base_url` and fill in defaults.
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| GatewayError::Transport(format!("invalid api url {base_url:?}: {e}")))?;
        Ok(Self {
            base_url,
            timeout: Self::DEFAULT_TIMEOUT,
            user_agent: format!("shelf/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Metadata gateway backed by the REST API.
#[derive(Debug, Clone)]
pub struct HttpMetadataGateway {
    http: reqwest::Client,
    base: Url,
}

impl HttpMetadataGateway {
    /// Build a client for `config`.
    pub fn new(config: HttpConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            base: config.base_url,
        })
    }

    /// API root this gateway talks to.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn collection_url(&self) -> Result<Url, GatewayError> {
        self.url_with(&[METADATA_SEGMENT])
    }

    fn key_url(&self, key: &str) -> Result<Url, GatewayError> {
        if key.is_empty() {
            return Err(GatewayError::InvalidKey(String::new()));
        }
        self.url_with(&[METADATA_SEGMENT, key])
    }

    fn url_with(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| GatewayError::Transport(format!("api url cannot be a base: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T>(&self, req: RequestBuilder, key: &str) -> Result<ApiEnvelope<T>, GatewayError>
    where
        T: DeserializeOwned,
    {
        let resp = req
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        debug!(key = %key, status = status.as_u16(), bytes = body.len(), "metadata api response");
        decode_envelope(status, &body, key)
    }

    async fn send_for_record(
        &self,
        req: RequestBuilder,
        key: &str,
    ) -> Result<MetadataRecord, GatewayError> {
        self.send::<MetadataRecord>(req, key)
            .await?
            .data
            .ok_or_else(|| GatewayError::Decode("response envelope has no data".into()))
    }
}

/// Turn a status + body into an envelope, mapping every failure shape onto
/// [`GatewayError`]. An empty success body counts as an empty envelope.
fn decode_envelope<T>(
    status: StatusCode,
    body: &[u8],
    key: &str,
) -> Result<ApiEnvelope<T>, GatewayError>
where
    T: DeserializeOwned,
{
    let parsed = if body.iter().all(u8::is_ascii_whitespace) {
        Ok(ApiEnvelope {
            data: None,
            errors: None,
        })
    } else {
        serde_json::from_slice::<ApiEnvelope<T>>(body)
    };

    if !status.is_success() {
        let message = parsed
            .as_ref()
            .ok()
            .and_then(|env| env.first_error())
            .and_then(|err| err.message.clone())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_string());
        return Err(status_error(status.as_u16(), key, message));
    }

    let envelope = parsed.map_err(|e| GatewayError::Decode(e.to_string()))?;
    if let Some(err) = envelope.first_error() {
        return Err(status_error(
            err.status.unwrap_or(500),
            key,
            err.message.clone().unwrap_or_default(),
        ));
    }
    Ok(envelope)
}

fn status_error(status: u16, key: &str, message: String) -> GatewayError {
    match status {
        404 => GatewayError::not_found(key),
        409 => GatewayError::Conflict { key: key.into() },
        _ => GatewayError::Status { status, message },
    }
}

#[async_trait]
impl MetadataGateway for HttpMetadataGateway {
    async fn fetch(&self, key: &str) -> Result<MetadataRecord, GatewayError> {
        let url = self.key_url(key)?;
        self.send_for_record(self.http.get(url), key).await
    }

    async fn create(&self, key: &str, value: &str) -> Result<MetadataRecord, GatewayError> {
        let url = self.collection_url()?;
        let body = CreateMetadata {
            key: key.to_string(),
            value: value.to_string(),
        };
        self.send_for_record(self.http.post(url).json(&body), key)
            .await
    }

    async fn update(&self, key: &str, value: &str) -> Result<MetadataRecord, GatewayError> {
        let url = self.key_url(key)?;
        let body = UpdateMetadata {
            value: value.to_string(),
        };
        self.send_for_record(self.http.put(url).json(&body), key)
            .await
    }

    async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        let url = self.key_url(key)?;
        self.send::<serde_json::Value>(self.http.delete(url), key)
            .await
            .map(|_| ())
    }
}
