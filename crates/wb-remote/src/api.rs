//! Remote facade trait
//!
//! One typed async function per backend operation. Implementations attach
//! the session credential to every call and fail with
//! [`RemoteError::NotAuthenticated`] when there is no active session.

use crate::error::RemoteError;
use crate::status::IngestionStatus;
use crate::types::{DocumentId, DocumentPatch, DocumentRecord, JobId, QueryAnswer, UploadFile};

/// Typed request functions consumed by the orchestration layer
///
/// Shared as `Arc<dyn RemoteApi>` by the save controller, the ingestion
/// tracker and the query session.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait::async_trait]
pub trait RemoteApi: Send + Sync {
    /// Create a new document, optionally titled
    async fn create_document(&self, title: Option<String>) -> Result<DocumentRecord, RemoteError>;

    /// Fetch one document
    async fn get_document(&self, id: &DocumentId) -> Result<DocumentRecord, RemoteError>;

    /// Fetch all documents of the current user, most recently updated first
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, RemoteError>;

    /// Apply a partial update
    ///
    /// Used by both the debounced body path and the immediate title path.
    async fn update_document(
        &self,
        id: &DocumentId,
        patch: DocumentPatch,
    ) -> Result<DocumentRecord, RemoteError>;

    /// Delete one document
    async fn delete_document(&self, id: &DocumentId) -> Result<(), RemoteError>;

    /// Upload a file and start server-side ingestion
    async fn submit_ingestion_job(&self, file: UploadFile) -> Result<JobId, RemoteError>;

    /// Current normalized status of an ingestion job
    async fn poll_ingestion_status(&self, job: &JobId) -> Result<IngestionStatus, RemoteError>;

    /// Ask a question against ingested material
    async fn query(&self, question: &str, top_k: usize) -> Result<QueryAnswer, RemoteError>;
}
