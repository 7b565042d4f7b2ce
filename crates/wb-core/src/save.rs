//! Debounced persistence controller
//!
//! Coalesces a high-frequency stream of canvas change notifications into
//! infrequent document writes:
//! - every change cancels the pending timer and schedules a new one after
//!   the quiet interval; only the snapshot pending when it fires is written
//! - a write already dispatched is never cancelled by later edits
//! - title edits take a separate, immediate path that shares the indicator
//! - teardown cancels the pending timer so nothing is written afterwards
//!
//! The save indicator moves `Idle -> Saving -> Saved -> Idle` on success and
//! `Idle -> Saving -> Idle` on failure.

use crate::config::SaveTimings;
use crate::error::SyncError;
use crate::event::{EventSink, SyncEvent};
use crate::task::{TaskScope, TimerHandle};
use crate::types::SaveStatus;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use wb_remote::{DocumentId, DocumentPatch, DocumentSnapshot, RemoteApi, RemoteError};

/// Snapshot waiting for its quiet interval to elapse
#[derive(Debug)]
struct PendingWrite {
    generation: u64,
    snapshot: DocumentSnapshot,
    timer: TimerHandle,
}

#[derive(Debug, Default)]
struct SaveState {
    pending: Option<PendingWrite>,
    revert: Option<TimerHandle>,
    in_flight: usize,
    generation: u64,
    closed: bool,
}

struct SaveInner {
    document_id: DocumentId,
    remote: Arc<dyn RemoteApi>,
    timings: SaveTimings,
    events: EventSink,
    scope: TaskScope,
    status: watch::Sender<SaveStatus>,
    state: Mutex<SaveState>,
}

/// Debounced writer for one editable document
///
/// Owns the pending-write timer and the save indicator of its document.
/// Dropping the controller tears it down.
pub struct SaveController {
    inner: Arc<SaveInner>,
}

impl SaveController {
    /// Create controller for a document
    #[must_use]
    pub fn new(
        document_id: DocumentId,
        remote: Arc<dyn RemoteApi>,
        timings: SaveTimings,
        events: EventSink,
    ) -> Self {
        let (status, _) = watch::channel(SaveStatus::Idle);
        Self {
            inner: Arc::new(SaveInner {
                document_id,
                remote,
                timings,
                events,
                scope: TaskScope::new(),
                status,
                state: Mutex::new(SaveState::default()),
            }),
        }
    }

    /// Accept a change notification carrying the full current snapshot
    ///
    /// Supersedes any snapshot still waiting for its quiet interval. Ignored
    /// after [`close`](Self::close).
    pub fn on_change(&self, snapshot: DocumentSnapshot) {
        let mut snapshot = snapshot;
        snapshot.strip_presence();

        let mut state = self.inner.state.lock();
        if state.closed {
            tracing::warn!("Ignoring change for closed document {}", self.inner.document_id);
            return;
        }
        if let Some(previous) = state.pending.take() {
            previous.timer.cancel();
            tracing::trace!(
                "Superseded pending write {} for {}",
                previous.generation,
                self.inner.document_id
            );
        }

        state.generation += 1;
        let generation = state.generation;
        let inner = Arc::clone(&self.inner);
        let timer = self
            .inner
            .scope
            .spawn_after(self.inner.timings.quiet_period(), async move {
                inner.fire(generation).await;
            });
        state.pending = Some(PendingWrite {
            generation,
            snapshot,
            timer,
        });
    }

    /// Write a new title immediately
    ///
    /// Not debounced and not coalesced with body writes; drives the same
    /// save indicator.
    ///
    /// # Errors
    /// - `SyncError::Closed` after teardown
    /// - `SyncError::Remote` if the write fails (the indicator returns to `Idle`)
    pub async fn rename(&self, title: impl Into<String>) -> Result<(), SyncError> {
        if self.is_closed() {
            return Err(SyncError::Closed);
        }
        let title = title.into();
        tracing::info!("Renaming document {} to {:?}", self.inner.document_id, title);
        Arc::clone(&self.inner)
            .write(DocumentPatch::title(title), "title")
            .await
            .map_err(SyncError::from)
    }

    /// Dispatch the pending snapshot now instead of waiting for its timer
    ///
    /// Returns `Ok(())` without writing when nothing is pending.
    ///
    /// # Errors
    /// - `SyncError::Closed` after teardown
    /// - `SyncError::Remote` if the write fails
    pub async fn flush(&self) -> Result<(), SyncError> {
        let snapshot = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(SyncError::Closed);
            }
            match state.pending.take() {
                Some(pending) => {
                    pending.timer.cancel();
                    pending.snapshot
                }
                None => return Ok(()),
            }
        };
        Arc::clone(&self.inner)
            .write(DocumentPatch::snapshot(snapshot), "flush")
            .await
            .map_err(SyncError::from)
    }

    /// Tear down: cancel the pending write and the indicator timer
    ///
    /// Writes already dispatched complete normally. The indicator settles at
    /// `Idle` once nothing is in flight. Idempotent.
    pub fn close(&self) {
        let mut state = self.inner.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        if let Some(pending) = state.pending.take() {
            pending.timer.cancel();
            tracing::info!(
                "Discarded unsaved changes of document {} on close",
                self.inner.document_id
            );
        }
        if let Some(revert) = state.revert.take() {
            revert.cancel();
        }
        if state.in_flight == 0 {
            self.inner.set_status(SaveStatus::Idle);
        }
        self.inner.scope.cancel();
        tracing::debug!("Closed save controller for {}", self.inner.document_id);
    }

    /// Current save indicator
    #[inline]
    #[must_use]
    pub fn status(&self) -> SaveStatus {
        *self.inner.status.borrow()
    }

    /// Watch the save indicator
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.inner.status.subscribe()
    }

    /// Check whether a snapshot is waiting for its quiet interval
    #[inline]
    #[must_use]
    pub fn has_pending_write(&self) -> bool {
        self.inner.state.lock().pending.is_some()
    }

    /// Check whether the controller was torn down
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Document this controller writes to
    #[inline]
    #[must_use]
    pub fn document_id(&self) -> &DocumentId {
        &self.inner.document_id
    }
}

impl Drop for SaveController {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SaveController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveController")
            .field("document_id", &self.inner.document_id)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl SaveInner {
    /// Timer callback: write the pending snapshot if it is still ours
    async fn fire(self: Arc<Self>, generation: u64) {
        let snapshot = {
            let mut state = self.state.lock();
            match state.pending.take() {
                Some(pending) if pending.generation == generation => pending.snapshot,
                other => {
                    state.pending = other;
                    return;
                }
            }
        };
        // Failure is already reflected in the indicator and logged.
        let _ = self.write(DocumentPatch::snapshot(snapshot), "body").await;
    }

    async fn write(
        self: Arc<Self>,
        patch: DocumentPatch,
        kind: &'static str,
    ) -> Result<(), RemoteError> {
        self.begin_write();
        tracing::debug!("Dispatching {} write for {}", kind, self.document_id);
        let result = self
            .remote
            .update_document(&self.document_id, patch)
            .await
            .map(drop);
        self.finish_write(&result, kind);
        result
    }

    fn begin_write(&self) {
        let mut state = self.state.lock();
        state.in_flight += 1;
        if let Some(revert) = state.revert.take() {
            revert.cancel();
        }
        self.set_status(SaveStatus::Saving);
    }

    fn finish_write(self: &Arc<Self>, result: &Result<(), RemoteError>, kind: &'static str) {
        let mut state = self.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        if let Err(err) = result {
            tracing::error!("Failed to save document {} ({}): {}", self.document_id, kind, err);
        }
        if state.in_flight > 0 {
            return;
        }
        // A closed controller settles at Idle with no revert timer.
        if state.closed {
            self.set_status(SaveStatus::Idle);
            return;
        }

        match result {
            Ok(()) => {
                tracing::debug!("Saved document {} ({})", self.document_id, kind);
                self.set_status(SaveStatus::Saved);
                let inner = Arc::clone(self);
                let revert = self
                    .scope
                    .spawn_after(self.timings.saved_display(), async move {
                        inner.revert_to_idle();
                    });
                state.revert = Some(revert);
            }
            Err(_) => self.set_status(SaveStatus::Idle),
        }
    }

    fn revert_to_idle(&self) {
        let mut state = self.state.lock();
        state.revert = None;
        if state.in_flight == 0 && *self.status.borrow() == SaveStatus::Saved {
            self.set_status(SaveStatus::Idle);
        }
    }

    /// Publish a new indicator value; no-op when unchanged
    fn set_status(&self, status: SaveStatus) {
        let changed = self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
        if changed {
            self.events.emit(SyncEvent::SaveStatusChanged {
                document_id: self.document_id.clone(),
                status,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::always;
    use std::time::Duration;
    use tokio::time::sleep;
    use wb_remote::{DocumentRecord, MockRemoteApi};

    fn record(id: &str) -> DocumentRecord {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "user_id": "u",
            "title": "t",
            "excalidraw_data": {},
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn single_edit_writes_once_after_quiet_period() {
        let mut remote = MockRemoteApi::new();
        remote
            .expect_update_document()
            .with(always(), always())
            .times(1)
            .returning(|id, _| Ok(record(id.as_str())));

        let controller = SaveController::new(
            DocumentId::from("wb-1"),
            Arc::new(remote),
            SaveTimings::default(),
            EventSink::none(),
        );
        controller.on_change(DocumentSnapshot::default());
        assert!(controller.has_pending_write());

        sleep(Duration::from_millis(999)).await;
        assert_eq!(controller.status(), SaveStatus::Idle);

        sleep(Duration::from_millis(2)).await;
        assert!(!controller.has_pending_write());
        assert_eq!(controller.status(), SaveStatus::Saved);

        sleep(Duration::from_millis(2000)).await;
        assert_eq!(controller.status(), SaveStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn rename_after_close_is_rejected() {
        let remote = MockRemoteApi::new();
        let controller = SaveController::new(
            DocumentId::from("wb-1"),
            Arc::new(remote),
            SaveTimings::default(),
            EventSink::none(),
        );
        controller.close();
        assert!(matches!(controller.rename("x").await, Err(SyncError::Closed)));
        assert!(matches!(controller.flush().await, Err(SyncError::Closed)));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_without_pending_is_noop() {
        let remote = MockRemoteApi::new();
        let controller = SaveController::new(
            DocumentId::from("wb-1"),
            Arc::new(remote),
            SaveTimings::default(),
            EventSink::none(),
        );
        controller.flush().await.unwrap();
        assert_eq!(controller.status(), SaveStatus::Idle);
    }
}
