//! Whiteboard Sync Core - client-side orchestration over the remote backend
//!
//! Owns the asynchronous state that sits between the canvas and the backend:
//! - Debounced persistence of document edits with a save indicator
//! - Tracking of concurrently running ingestion jobs through polling
//! - A query transcript with optimistic appends
//!
//! Every state change is published on an [`EventSink`]; transport failures
//! are recovered locally and surface as state, not as errors.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wb_core::{DocumentSession, EventSink, SyncConfig};
//! use wb_remote::{DocumentId, HttpRemote, RemoteConfig, StaticSession};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let remote = Arc::new(HttpRemote::new(
//!     &RemoteConfig::new(),
//!     Arc::new(StaticSession::new("access-token")),
//! )?);
//! let config = SyncConfig::new();
//! let (events, mut rx) = EventSink::channel();
//!
//! let session = DocumentSession::open(remote, &DocumentId::from("wb-1"), config.save, events).await?;
//! session.controller().on_change(session.initial_snapshot().clone());
//! session.controller().flush().await?;
//!
//! while let Ok(event) = rx.try_recv() {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod document;
pub mod error;
pub mod event;
pub mod ingest;
pub mod query;
pub mod save;
pub mod task;
pub mod types;

pub use config::{IngestConfig, QueryConfig, SaveTimings, SyncConfig};
pub use document::DocumentSession;
pub use error::SyncError;
pub use event::{EventSink, SyncEvent};
pub use ingest::IngestionTracker;
pub use query::{QuerySession, QUERY_ERROR_TEXT};
pub use save::SaveController;
pub use task::{TaskScope, TimerHandle};
pub use types::{
    AskOutcome, IngestionJob, JobKey, JobPhase, Role, SaveStatus, TranscriptEntry,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the sync core
    pub use crate::{
        AskOutcome, DocumentSession, EventSink, IngestionTracker, JobPhase, QuerySession,
        SaveController, SaveStatus, SyncConfig, SyncError, SyncEvent,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
