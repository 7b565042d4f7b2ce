//! Editing session for one document

use crate::config::SaveTimings;
use crate::error::SyncError;
use crate::event::EventSink;
use crate::save::SaveController;
use std::sync::Arc;
use wb_remote::{DocumentId, DocumentRecord, DocumentSnapshot, RemoteApi};

/// Loaded document plus the controller that persists its edits
#[derive(Debug)]
pub struct DocumentSession {
    record: DocumentRecord,
    initial: DocumentSnapshot,
    controller: SaveController,
}

impl DocumentSession {
    /// Load a document and bind a save controller to it
    ///
    /// # Errors
    /// - `SyncError::Remote` if the record cannot be fetched
    pub async fn open(
        remote: Arc<dyn RemoteApi>,
        id: &DocumentId,
        timings: SaveTimings,
        events: EventSink,
    ) -> Result<Self, SyncError> {
        let record = remote.get_document(id).await?;
        tracing::info!(
            "Opened document {} ({:?}, {} elements)",
            record.id,
            record.title,
            record.snapshot.elements.len()
        );
        let initial = record.snapshot.for_editing();
        let controller = SaveController::new(record.id.clone(), remote, timings, events);
        Ok(Self {
            record,
            initial,
            controller,
        })
    }

    /// Record as loaded
    #[inline]
    #[must_use]
    pub fn record(&self) -> &DocumentRecord {
        &self.record
    }

    /// Snapshot to hand to the canvas, with presence reset
    #[inline]
    #[must_use]
    pub fn initial_snapshot(&self) -> &DocumentSnapshot {
        &self.initial
    }

    /// Save controller of this session
    #[inline]
    #[must_use]
    pub fn controller(&self) -> &SaveController {
        &self.controller
    }

    /// Tear down the session
    pub fn close(&self) {
        self.controller.close();
    }
}
