//! Whiteboard Remote - typed facade over the whiteboard backend
//!
//! Provides:
//! - Document CRUD (create, get, list, update, delete)
//! - Ingestion job submission and status polling
//! - Free-text queries against ingested material
//! - Normalization of the backend's open status vocabulary
//!
//! Every call carries a bearer credential obtained from a
//! [`SessionProvider`] and fails with [`RemoteError::NotAuthenticated`]
//! when no session is active.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wb_remote::{HttpRemote, RemoteApi, RemoteConfig, StaticSession};
//!
//! # async fn example() -> Result<(), wb_remote::RemoteError> {
//! let session = Arc::new(StaticSession::new("access-token"));
//! let remote = HttpRemote::new(&RemoteConfig::new(), session)?;
//!
//! for doc in remote.list_documents().await? {
//!     println!("{} {}", doc.id, doc.title);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod status;
pub mod types;

pub use api::RemoteApi;
#[cfg(feature = "mock")]
pub use api::MockRemoteApi;
pub use config::{RemoteConfig, DEFAULT_BASE_URL};
pub use error::RemoteError;
pub use http::HttpRemote;
pub use session::{SessionProvider, StaticSession};
pub use status::{IngestionStatus, FAILURE_LABELS, SUCCESS_LABELS};
pub use types::{
    DocumentId, DocumentPatch, DocumentRecord, DocumentSnapshot, JobId, QueryAnswer, UploadFile,
    PRESENCE_KEY,
};
