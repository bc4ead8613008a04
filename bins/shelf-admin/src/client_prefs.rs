// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Locally persisted client settings (API endpoint, timeout, last list filter).

use serde::{Deserialize, Serialize};
use shelf_metadata::{Lookup, MetadataGateway, MetadataStore};
use std::time::Duration;
use tracing::debug;

/// Key of the client record in the local store.
pub const CLIENT_KEY: &str = "client";

const DEFAULT_API_URL: &str = "http://localhost:3000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientPrefs {
    pub api_url: String,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl Default for ClientPrefs {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            filter: None,
        }
    }
}

impl ClientPrefs {
    /// Endpoint and timeout after applying command-line overrides.
    pub fn resolve(&self, api_url: Option<&str>, timeout_secs: Option<u64>) -> (String, Duration) {
        let url = api_url.unwrap_or(&self.api_url).to_string();
        let secs = timeout_secs.unwrap_or(self.timeout_secs);
        (url, Duration::from_secs(secs))
    }
}

/// Load client prefs, persisting defaults once if the record is absent.
pub async fn load_or_init<G>(store: &MetadataStore<G>) -> ClientPrefs
where
    G: MetadataGateway,
{
    match store.lookup::<ClientPrefs>(CLIENT_KEY).await {
        Lookup::Found(prefs) => prefs,
        other => {
            let prefs = ClientPrefs::default();
            if other.is_missing() && !store.set(CLIENT_KEY, &prefs).await {
                debug!("client defaults not persisted; continuing with defaults");
            }
            prefs
        }
    }
}

/// Replace the stored filter string (`None` clears it).
pub async fn save_filter<G>(store: &MetadataStore<G>, filter: Option<String>) -> bool
where
    G: MetadataGateway,
{
    let mut prefs = load_or_init(store).await;
    prefs.filter = filter;
    store.set(CLIENT_KEY, &prefs).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use shelf_dry_tests::InMemoryMetadataGateway;

    #[test]
    fn overrides_win_over_stored_values() {
        let prefs = ClientPrefs::default();
        let (url, timeout) = prefs.resolve(Some("http://shelf.lan/api"), None);
        assert_eq!(url, "http://shelf.lan/api");
        assert_eq!(timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let (url, timeout) = prefs.resolve(None, Some(2));
        assert_eq!(url, DEFAULT_API_URL);
        assert_eq!(timeout, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn defaults_are_persisted_once() {
        let gw = InMemoryMetadataGateway::new();
        let store = MetadataStore::new(gw.clone());

        assert_eq!(load_or_init(&store).await, ClientPrefs::default());
        assert_eq!(load_or_init(&store).await, ClientPrefs::default());
        assert_eq!(gw.create_count(), 1);
        assert_eq!(gw.update_count(), 0);
    }

    #[tokio::test]
    async fn unreachable_store_is_not_overwritten() {
        let gw = InMemoryMetadataGateway::new();
        gw.set_fail_reads(true);
        let store = MetadataStore::new(gw.clone());

        assert_eq!(load_or_init(&store).await, ClientPrefs::default());
        assert_eq!(gw.create_count(), 0);
    }

    #[tokio::test]
    async fn failed_default_persist_still_yields_defaults() {
        let gw = InMemoryMetadataGateway::new();
        gw.set_fail_writes(true);
        let store = MetadataStore::new(gw.clone());

        assert_eq!(load_or_init(&store).await, ClientPrefs::default());
        assert_eq!(gw.create_count(), 1);
        assert!(gw.is_empty());
    }

    #[tokio::test]
    async fn filter_round_trips_and_clears() {
        let gw = InMemoryMetadataGateway::new();
        let store = MetadataStore::new(gw);

        assert!(save_filter(&store, Some("zelda".into())).await);
        assert_eq!(load_or_init(&store).await.filter.as_deref(), Some("zelda"));

        assert!(save_filter(&store, None).await);
        assert_eq!(load_or_init(&store).await.filter, None);
    }
}
