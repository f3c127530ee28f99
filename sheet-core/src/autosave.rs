//! Debounced local saves.
//!
//! [`Autosave`] holds at most one pending record. Scheduling replaces the
//! pending record and restarts the timer, so a burst of edits produces a
//! single write of the newest state once the burst has been quiet for the
//! configured delay.

use crate::persist::{LocalCharacter, LocalStore, PersistError};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Default quiet period before a scheduled save is written.
pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(500);

pub struct Autosave {
    backend: Arc<dyn LocalStore>,
    delay: Duration,
    pending: Arc<Mutex<Option<LocalCharacter>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    last_saved_at: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl Autosave {
    pub fn new(backend: Arc<dyn LocalStore>, delay: Duration) -> Self {
        Self {
            backend,
            delay,
            pending: Arc::new(Mutex::new(None)),
            timer: Mutex::new(None),
            last_saved_at: Arc::new(Mutex::new(None)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace the pending record and restart the timer.
    ///
    /// Outside a tokio runtime there is nothing to drive the timer, so the
    /// record is written immediately.
    pub fn schedule(&self, character: LocalCharacter) {
        *lock(&self.pending) = Some(character);

        let mut timer = lock(&self.timer);
        if let Some(previous) = timer.take() {
            previous.abort();
        }

        match Handle::try_current() {
            Ok(handle) => {
                let pending = Arc::clone(&self.pending);
                let backend = Arc::clone(&self.backend);
                let last_saved_at = Arc::clone(&self.last_saved_at);
                let delay = self.delay;

                *timer = Some(handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Err(e) = write_pending(&pending, backend.as_ref(), &last_saved_at) {
                        tracing::warn!(error = %e, "autosave failed; will retry on next save");
                    }
                }));
            }
            Err(_) => {
                drop(timer);
                if let Err(e) = self.flush() {
                    tracing::warn!(error = %e, "autosave failed");
                }
            }
        }
    }

    /// Write any pending record now. Returns whether a write happened.
    pub fn flush(&self) -> Result<bool, PersistError> {
        if let Some(timer) = lock(&self.timer).take() {
            timer.abort();
        }
        write_pending(&self.pending, self.backend.as_ref(), &self.last_saved_at)
    }

    /// Drop the pending record without writing it.
    pub fn cancel(&self) {
        if let Some(timer) = lock(&self.timer).take() {
            timer.abort();
        }
        lock(&self.pending).take();
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.pending).is_some()
    }

    /// `updatedAt` of the most recent successful write.
    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        *lock(&self.last_saved_at)
    }

    /// Record a write performed outside the timer.
    pub(crate) fn note_saved(&self, at: DateTime<Utc>) {
        *lock(&self.last_saved_at) = Some(at);
    }

    pub(crate) fn reset_last_saved(&self) {
        lock(&self.last_saved_at).take();
    }
}

impl Drop for Autosave {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, "failed to flush autosave on shutdown");
        }
    }
}

// The pending slot stays locked across take and write, so a newer schedule
// waits for an in-progress write instead of racing it to the backend.
fn write_pending(
    pending: &Mutex<Option<LocalCharacter>>,
    backend: &dyn LocalStore,
    last_saved_at: &Mutex<Option<DateTime<Utc>>>,
) -> Result<bool, PersistError> {
    let mut slot = lock(pending);
    let Some(character) = slot.take() else {
        return Ok(false);
    };

    match backend.save(&character) {
        Ok(()) => {
            tracing::debug!(id = %character.id, "autosaved character");
            *lock(last_saved_at) = Some(character.updated_at);
            Ok(true)
        }
        Err(e) => {
            *slot = Some(character);
            Err(e)
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
