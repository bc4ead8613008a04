// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-entity default sort preferences, stored as one map under
//! `default-sort-filters`.
//!
//! Writes are confirmed-only: the cache and broadcast advance after the store
//! accepts the new map, never before. Writers within one service are
//! serialised, so concurrent edits to different entities cannot drop each
//! other. Another process writing the same key can still overwrite the map.

use serde::{Deserialize, Serialize};
use shelf_metadata::{Lookup, MetadataGateway, MetadataStore};
use std::collections::BTreeMap;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

/// Metadata key holding the [`DefaultSortMap`].
pub const DEFAULT_SORT_KEY: &str = "default-sort-filters";

/// Sort field and direction for one entity list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortPreference {
    /// Field to sort by (e.g. `title`).
    pub field: String,
    /// Sort operand (e.g. `asc`, `desc`).
    pub operand: String,
}

impl SortPreference {
    /// Build a preference from anything string-like.
    pub fn new(field: impl Into<String>, operand: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operand: operand.into(),
        }
    }
}

/// Entity type name → sort preference. An absent entry means "no preference".
pub type DefaultSortMap = BTreeMap<String, SortPreference>;

/// Cached, broadcasting wrapper around the `default-sort-filters` key.
pub struct DefaultSortService<G> {
    store: MetadataStore<G>,
    state: watch::Sender<DefaultSortMap>,
    write_lock: Mutex<()>,
}

impl<G> DefaultSortService<G>
where
    G: MetadataGateway,
{
    /// Build the service and load the map once. Any failure yields an empty map.
    pub async fn load(store: MetadataStore<G>) -> Self {
        let map = match store.lookup::<DefaultSortMap>(DEFAULT_SORT_KEY).await {
            Lookup::Found(map) => map,
            Lookup::NotFound => {
                debug!("no default sort preferences stored yet");
                DefaultSortMap::new()
            }
            Lookup::Malformed(err) => {
                warn!(error = %err, "default sort preferences unreadable; starting empty");
                DefaultSortMap::new()
            }
            Lookup::Unavailable(err) => {
                warn!(error = %err, "default sort preferences unavailable; starting empty");
                DefaultSortMap::new()
            }
        };
        let (state, _) = watch::channel(map);
        Self {
            store,
            state,
            write_lock: Mutex::new(()),
        }
    }

    /// Cached preference for `entity_type`. No network call.
    pub fn default_sort(&self, entity_type: &str) -> Option<SortPreference> {
        self.state.borrow().get(entity_type).cloned()
    }

    /// Copy of the whole cached map.
    pub fn snapshot(&self) -> DefaultSortMap {
        self.state.borrow().clone()
    }

    /// Subscribe to map changes.
    pub fn subscribe(&self) -> watch::Receiver<DefaultSortMap> {
        self.state.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.state.receiver_count()
    }

    /// Store a preference for `entity_type`. The cache only changes if the
    /// write succeeds.
    pub async fn set_default_sort(
        &self,
        entity_type: &str,
        field: &str,
        operand: &str,
    ) -> bool {
        let pref = SortPreference::new(field, operand);
        self.commit(|map| {
            map.insert(entity_type.to_string(), pref);
        })
        .await
    }

    /// Drop the preference for `entity_type`. The cache only changes if the
    /// write succeeds.
    pub async fn remove_default_sort(&self, entity_type: &str) -> bool {
        self.commit(|map| {
            map.remove(entity_type);
        })
        .await
    }

    async fn commit(&self, edit: impl FnOnce(&mut DefaultSortMap)) -> bool {
        let _guard = self.write_lock.lock().await;
        let mut next = self.snapshot();
        edit(&mut next);
        if self.store.set(DEFAULT_SORT_KEY, &next).await {
            self.state.send_replace(next);
            true
        } else {
            warn!("default sort persist failed; cache unchanged");
            false
        }
    }
}
