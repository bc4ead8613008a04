// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Preference services for Shelf tools.
//! Each service owns one metadata key, caches its value, and broadcasts the
//! current value over a `tokio::sync::watch` channel. Subscribers hold a
//! receiver and unsubscribe by dropping it.

pub mod default_sort;
pub mod settings;
pub mod watch;

pub use default_sort::{DefaultSortMap, DefaultSortService, SortPreference, DEFAULT_SORT_KEY};
pub use settings::{PendingWrite, SettingsPhase, SettingsService, UiSettings, SETTINGS_KEY};
pub use watch::FieldWatch;
