// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory metadata gateway fake for testing without a metadata API.

use async_trait::async_trait;
use chrono::Utc;
use shelf_metadata::{GatewayError, MetadataGateway, MetadataRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;

/// In-memory implementation of [`MetadataGateway`] for testing.
///
/// Behaves like the real API: create on an existing key is a `Conflict`,
/// fetch/update/delete on a missing key is `NotFound`. Clones share state, so
/// a test can keep one handle for assertions while the code under test owns
/// another.
///
/// # Example
///
/// ```
/// use shelf_dry_tests::InMemoryMetadataGateway;
/// use shelf_metadata::MetadataStore;
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let gateway = InMemoryMetadataGateway::new();
/// let store = MetadataStore::new(gateway.clone());
///
/// assert!(store.set("greeting", &"hello").await);
/// assert_eq!(gateway.create_count(), 1);
/// assert_eq!(gateway.value_of("greeting").as_deref(), Some("\"hello\""));
/// # });
/// ```
#[derive(Clone, Default)]
pub struct InMemoryMetadataGateway {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    records: HashMap<String, MetadataRecord>,
    next_id: u64,
    fetch_count: usize,
    create_count: usize,
    update_count: usize,
    delete_count: usize,
    fail_reads: bool,
    fail_writes: bool,
    gate: Option<Arc<Semaphore>>,
}

/// Handle that holds back gated writes until permits are released.
#[derive(Clone)]
pub struct WriteGate {
    semaphore: Arc<Semaphore>,
}

impl WriteGate {
    /// Let `n` pending or future writes through.
    pub fn release(&self, n: usize) {
        self.semaphore.add_permits(n);
    }
}

impl InMemoryMetadataGateway {
    /// Create an empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a record with a raw (possibly malformed) value, bypassing counters.
    pub fn insert_raw(&self, key: &str, value: &str) {
        let mut inner = self.lock();
        let record = inner.new_record(key, value);
        inner.records.insert(key.to_string(), record);
    }

    /// Raw value stored under `key`.
    pub fn value_of(&self, key: &str) -> Option<String> {
        self.lock().records.get(key).map(|r| r.value.clone())
    }

    /// Full record stored under `key`.
    pub fn record_of(&self, key: &str) -> Option<MetadataRecord> {
        self.lock().records.get(key).cloned()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// True when no records are stored.
    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Number of `fetch` calls attempted (including failed ones).
    pub fn fetch_count(&self) -> usize {
        self.lock().fetch_count
    }

    /// Number of `create` calls attempted (including failed ones).
    pub fn create_count(&self) -> usize {
        self.lock().create_count
    }

    /// Number of `update` calls attempted (including failed ones).
    pub fn update_count(&self) -> usize {
        self.lock().update_count
    }

    /// Number of `delete` calls attempted (including failed ones).
    pub fn delete_count(&self) -> usize {
        self.lock().delete_count
    }

    /// Make every `fetch` fail with a transport error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Make every `create`/`update`/`delete` fail with a 500 status.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Hold all subsequent writes until the returned gate releases them.
    pub fn hold_writes(&self) -> WriteGate {
        let semaphore = Arc::new(Semaphore::new(0));
        self.lock().gate = Some(Arc::clone(&semaphore));
        WriteGate { semaphore }
    }

    /// Drop the write gate; writes already waiting stay blocked until released.
    pub fn open_writes(&self) {
        self.lock().gate = None;
    }

    /// Counts a write attempt, then waits on the gate if one is installed.
    async fn enter_write(&self, bump: fn(&mut Inner)) -> Result<(), GatewayError> {
        let gate = {
            let mut inner = self.lock();
            bump(&mut inner);
            inner.gate.clone()
        };
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| GatewayError::Transport("write gate closed".into()))?;
            permit.forget();
        }
        if self.lock().fail_writes {
            return Err(GatewayError::Status {
                status: 500,
                message: "simulated write failure".into(),
            });
        }
        Ok(())
    }
}

impl Inner {
    fn new_record(&mut self, key: &str, value: &str) -> MetadataRecord {
        self.next_id += 1;
        let now = Utc::now();
        MetadataRecord {
            id: self.next_id,
            key: key.to_string(),
            value: value.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl MetadataGateway for InMemoryMetadataGateway {
    async fn fetch(&self, key: &str) -> Result<MetadataRecord, GatewayError> {
        let mut inner = self.lock();
        inner.fetch_count += 1;
        if inner.fail_reads {
            return Err(GatewayError::Transport("simulated fetch failure".into()));
        }
        inner
            .records
            .get(key)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(key))
    }

    async fn create(&self, key: &str, value: &str) -> Result<MetadataRecord, GatewayError> {
        self.enter_write(|i| i.create_count += 1).await?;
        let mut inner = self.lock();
        if inner.records.contains_key(key) {
            return Err(GatewayError::Conflict { key: key.into() });
        }
        let record = inner.new_record(key, value);
        inner.records.insert(key.to_string(), record.clone());
        Ok(record)
    }

    async fn update(&self, key: &str, value: &str) -> Result<MetadataRecord, GatewayError> {
        self.enter_write(|i| i.update_count += 1).await?;
        let mut inner = self.lock();
        let record = inner
            .records
            .get_mut(key)
            .ok_or_else(|| GatewayError::not_found(key))?;
        record.value = value.to_string();
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete(&self, key: &str) -> Result<(), GatewayError> {
        self.enter_write(|i| i.delete_count += 1).await?;
        self.lock()
            .records
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| GatewayError::not_found(key))
    }
}
