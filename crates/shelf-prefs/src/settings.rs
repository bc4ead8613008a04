// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! UI settings (dark mode, mass-input mode) backed by the `ui_settings` key.
//!
//! Updates are optimistic: the new value is broadcast before the write is
//! attempted, and a failed write is logged without rolling anything back.
//! Background writes run one at a time and each persists the settings current
//! when it starts, so the last write to land carries the latest value.

use serde::{Deserialize, Serialize};
use shelf_metadata::{Lookup, MetadataGateway, MetadataStore};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::watch::FieldWatch;

/// Metadata key holding [`UiSettings`].
pub const SETTINGS_KEY: &str = "ui_settings";

/// UI toggles shared across the admin surfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiSettings {
    /// Render with the dark theme.
    pub dark_mode: bool,
    /// Keep entry forms open after save for rapid bulk entry.
    pub mass_input_mode: bool,
}

/// Whether settings have been loaded from the store yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsPhase {
    /// Holding defaults; `load_settings` has not completed.
    Uninitialized,
    /// `load_settings` has resolved a value at least once.
    Loaded,
}

/// Background persist started by an optimistic update.
///
/// Resolves to `true` if the write succeeded. Dropping it does not cancel the
/// write. Outside a tokio runtime nothing is spawned and it resolves to `false`.
#[derive(Debug)]
#[must_use = "await the write to learn whether it persisted"]
pub struct PendingWrite(Option<JoinHandle<bool>>);

impl PendingWrite {
    /// True if no background write was started.
    pub fn is_detached(&self) -> bool {
        self.0.is_none()
    }
}

impl Future for PendingWrite {
    type Output = bool;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        let Some(handle) = self.get_mut().0.as_mut() else {
            return Poll::Ready(false);
        };
        Pin::new(handle).poll(cx).map(|res| match res {
            Ok(ok) => ok,
            Err(err) => {
                warn!(error = %err, "settings writer task failed");
                false
            }
        })
    }
}

/// Cached, broadcasting wrapper around the `ui_settings` key.
pub struct SettingsService<G> {
    store: MetadataStore<G>,
    state: Arc<watch::Sender<UiSettings>>,
    loaded: AtomicBool,
    write_lock: Arc<Mutex<()>>,
}

impl<G> SettingsService<G> {
    /// Create the service holding defaults. Nothing is fetched until
    /// [`load_settings`](Self::load_settings) is called.
    pub fn new(store: MetadataStore<G>) -> Self {
        let (state, _) = watch::channel(UiSettings::default());
        Self {
            store,
            state: Arc::new(state),
            loaded: AtomicBool::new(false),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SettingsPhase {
        if self.loaded.load(Ordering::Acquire) {
            SettingsPhase::Loaded
        } else {
            SettingsPhase::Uninitialized
        }
    }

    /// Cached settings.
    pub fn current(&self) -> UiSettings {
        *self.state.borrow()
    }

    /// Subscribe to the full settings broadcast.
    pub fn subscribe(&self) -> watch::Receiver<UiSettings> {
        self.state.subscribe()
    }

    /// Number of live subscribers (receivers not yet dropped).
    pub fn subscriber_count(&self) -> usize {
        self.state.receiver_count()
    }

    /// Dark-mode projection of the settings broadcast.
    pub fn dark_mode(&self) -> FieldWatch<UiSettings, bool> {
        FieldWatch::new(self.subscribe(), |s| s.dark_mode)
    }

    /// Mass-input-mode projection of the settings broadcast.
    pub fn mass_input_mode(&self) -> FieldWatch<UiSettings, bool> {
        FieldWatch::new(self.subscribe(), |s| s.mass_input_mode)
    }

    fn publish(&self, settings: UiSettings) {
        self.state.send_replace(settings);
        self.loaded.store(true, Ordering::Release);
    }
}

impl<G> SettingsService<G>
where
    G: MetadataGateway + 'static,
{
    /// Load settings from the store, creating the record with defaults when
    /// it is missing or unreadable. Broadcasts the resolved value once.
    pub async fn load_settings(&self) -> UiSettings {
        let resolved = match self.store.lookup::<UiSettings>(SETTINGS_KEY).await {
            Lookup::Found(settings) => settings,
            Lookup::NotFound | Lookup::Malformed(_) => self.repair().await,
            Lookup::Unavailable(err) => {
                warn!(error = %err, "settings unavailable; using defaults");
                UiSettings::default()
            }
        };
        self.publish(resolved);
        resolved
    }

    async fn repair(&self) -> UiSettings {
        let defaults = UiSettings::default();
        info!(key = SETTINGS_KEY, "creating settings record with defaults");
        if !self.store.set(SETTINGS_KEY, &defaults).await {
            return defaults;
        }
        match self.store.get::<UiSettings>(SETTINGS_KEY).await {
            Some(settings) => settings,
            None => {
                debug!("settings re-fetch after create failed; using defaults");
                defaults
            }
        }
    }

    /// Set dark mode, broadcast immediately, then persist in the background.
    pub fn update_dark_mode(&self, enabled: bool) -> PendingWrite {
        self.update(|s| s.dark_mode = enabled)
    }

    /// Set mass-input mode, broadcast immediately, then persist in the background.
    pub fn update_mass_input_mode(&self, enabled: bool) -> PendingWrite {
        self.update(|s| s.mass_input_mode = enabled)
    }

    fn update(&self, apply: impl FnOnce(&mut UiSettings)) -> PendingWrite {
        self.state.send_modify(apply);
        let Ok(runtime) = Handle::try_current() else {
            warn!("no tokio runtime; settings change kept locally only");
            return PendingWrite(None);
        };
        let store = self.store.clone();
        let state = Arc::clone(&self.state);
        let write_lock = Arc::clone(&self.write_lock);
        PendingWrite(Some(runtime.spawn(async move {
            let _guard = write_lock.lock().await;
            let latest = *state.borrow();
            let ok = store.set(SETTINGS_KEY, &latest).await;
            if !ok {
                warn!(settings = ?latest, "settings persist failed; keeping local value");
            }
            ok
        })))
    }
}
