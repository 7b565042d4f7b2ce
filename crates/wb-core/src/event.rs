//! Observer channel for UI-facing state changes
//!
//! Orchestrators publish every status, phase and transcript change as a
//! [`SyncEvent`]. The renderer (or a test) drains the receiving end. A sink
//! without a receiver, or whose receiver is gone, silently drops events.

use crate::types::{JobKey, JobPhase, SaveStatus, TranscriptEntry};
use tokio::sync::mpsc;
use wb_remote::DocumentId;

/// State change published by an orchestrator
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Save indicator of a document changed
    SaveStatusChanged {
        /// Document whose indicator changed
        document_id: DocumentId,
        /// New status
        status: SaveStatus,
    },
    /// Ingestion job entered a new phase
    JobPhaseChanged {
        /// Local job key
        key: JobKey,
        /// File name
        file_name: String,
        /// New phase
        phase: JobPhase,
    },
    /// Ingestion job was dismissed by the user
    JobDismissed {
        /// Local job key
        key: JobKey,
        /// File name
        file_name: String,
    },
    /// Entry appended to a query transcript
    TranscriptAppended(TranscriptEntry),
}

/// Sending half of the event channel
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<SyncEvent>>,
}

impl EventSink {
    /// Create sink and its receiver
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Sink that discards everything
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Publish an event
    pub fn emit(&self, event: SyncEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                tracing::trace!("event receiver dropped");
            }
        }
    }
}
