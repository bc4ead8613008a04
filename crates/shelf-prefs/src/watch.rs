// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Projection of a single field out of a broadcast value.

use std::fmt;
use tokio::sync::watch;

/// Receiver that yields one field of a watched value.
///
/// Wakes on every change of the source value, even when the projected field
/// is unchanged. Dropping it releases the underlying subscription.
pub struct FieldWatch<S, T> {
    rx: watch::Receiver<S>,
    project: fn(&S) -> T,
}

impl<S, T> FieldWatch<S, T> {
    pub(crate) fn new(rx: watch::Receiver<S>, project: fn(&S) -> T) -> Self {
        Self { rx, project }
    }

    /// Field value as of the latest broadcast, without marking it seen.
    pub fn current(&self) -> T {
        (self.project)(&self.rx.borrow())
    }

    /// Wait for the next broadcast and return the projected field.
    /// Returns `None` once the owning service is gone.
    pub async fn changed(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some((self.project)(&self.rx.borrow_and_update()))
    }

    /// True if a broadcast arrived that `changed` has not consumed yet.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }
}

impl<S, T> fmt::Debug for FieldWatch<S, T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldWatch")
            .field("current", &self.current())
            .finish()
    }
}
