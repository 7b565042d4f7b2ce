//! HTTP implementation of the remote facade
//!
//! Talks JSON to the whiteboard backend:
//! - `/api/whiteboards[/{id}]` for document CRUD
//! - `/api/rag/upload`, `/api/rag/status/{id}`, `/api/rag/query` for ingestion and Q&A

use crate::api::RemoteApi;
use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::session::SessionProvider;
use crate::status::IngestionStatus;
use crate::types::{DocumentId, DocumentPatch, DocumentRecord, JobId, QueryAnswer, UploadFile};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct DocumentEnvelope {
    whiteboard: DocumentRecord,
}

#[derive(Debug, Deserialize)]
struct DocumentListEnvelope {
    #[serde(default)]
    whiteboards: Vec<DocumentRecord>,
}

#[derive(Debug, Serialize)]
struct CreateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    event_id: JobId,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    question: &'a str,
    top_k: usize,
}

/// [`RemoteApi`] over HTTP with bearer authentication
#[derive(Clone)]
pub struct HttpRemote {
    http: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionProvider>,
}

impl HttpRemote {
    /// Create client for the configured backend
    ///
    /// # Errors
    /// - `RemoteError::Http` if the underlying client cannot be built
    pub fn new(
        config: &RemoteConfig,
        session: Arc<dyn SessionProvider>,
    ) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    /// Backend base URL
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn bearer(&self) -> Result<String, RemoteError> {
        self.session
            .access_token()
            .await
            .ok_or(RemoteError::NotAuthenticated)
    }

    async fn send(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, RemoteError> {
        let token = self.bearer().await?;
        tracing::debug!("{} -> {}", operation, self.base_url);
        let resp = request.bearer_auth(token).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        tracing::debug!("{} failed with {}", operation, status);
        Err(RemoteError::Status {
            operation,
            status: status.as_u16(),
            body,
        })
    }
}

impl std::fmt::Debug for HttpRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRemote")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, RemoteError> {
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn not_found_as(id: &DocumentId) -> impl FnOnce(RemoteError) -> RemoteError + '_ {
    move |err| match err {
        RemoteError::Status { status, .. } if status == StatusCode::NOT_FOUND.as_u16() => {
            RemoteError::NotFound(format!("document {id}"))
        }
        other => other,
    }
}

fn upload_part(file: UploadFile) -> Result<Part, RemoteError> {
    let mime = if file.has_extension("pdf") {
        "application/pdf"
    } else {
        "application/octet-stream"
    };
    let name = file.name;
    Ok(Part::bytes(file.bytes).file_name(name).mime_str(mime)?)
}

#[async_trait::async_trait]
impl RemoteApi for HttpRemote {
    async fn create_document(&self, title: Option<String>) -> Result<DocumentRecord, RemoteError> {
        let request = self
            .http
            .post(self.url("/api/whiteboards"))
            .json(&CreateRequest { title });
        let resp = self.send("create_document", request).await?;
        Ok(decode::<DocumentEnvelope>(resp).await?.whiteboard)
    }

    async fn get_document(&self, id: &DocumentId) -> Result<DocumentRecord, RemoteError> {
        let request = self.http.get(self.url(&format!("/api/whiteboards/{id}")));
        let resp = self
            .send("get_document", request)
            .await
            .map_err(not_found_as(id))?;
        Ok(decode::<DocumentEnvelope>(resp).await?.whiteboard)
    }

    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, RemoteError> {
        let request = self.http.get(self.url("/api/whiteboards"));
        let resp = self.send("list_documents", request).await?;
        Ok(decode::<DocumentListEnvelope>(resp).await?.whiteboards)
    }

    async fn update_document(
        &self,
        id: &DocumentId,
        patch: DocumentPatch,
    ) -> Result<DocumentRecord, RemoteError> {
        if patch.is_empty() {
            return Err(RemoteError::EmptyPatch);
        }
        let request = self
            .http
            .put(self.url(&format!("/api/whiteboards/{id}")))
            .json(&patch);
        let resp = self
            .send("update_document", request)
            .await
            .map_err(not_found_as(id))?;
        Ok(decode::<DocumentEnvelope>(resp).await?.whiteboard)
    }

    async fn delete_document(&self, id: &DocumentId) -> Result<(), RemoteError> {
        let request = self.http.delete(self.url(&format!("/api/whiteboards/{id}")));
        self.send("delete_document", request)
            .await
            .map_err(not_found_as(id))?;
        Ok(())
    }

    async fn submit_ingestion_job(&self, file: UploadFile) -> Result<JobId, RemoteError> {
        let form = Form::new().part("file", upload_part(file)?);
        let request = self.http.post(self.url("/api/rag/upload")).multipart(form);
        let resp = self.send("submit_ingestion_job", request).await?;
        Ok(decode::<UploadResponse>(resp).await?.event_id)
    }

    async fn poll_ingestion_status(&self, job: &JobId) -> Result<IngestionStatus, RemoteError> {
        let request = self.http.get(self.url(&format!("/api/rag/status/{job}")));
        let resp = self.send("poll_ingestion_status", request).await?;
        let body = decode::<StatusResponse>(resp).await?;
        Ok(body
            .status
            .as_deref()
            .map_or(IngestionStatus::InProgress, IngestionStatus::from_label))
    }

    async fn query(&self, question: &str, top_k: usize) -> Result<QueryAnswer, RemoteError> {
        let request = self
            .http
            .post(self.url("/api/rag/query"))
            .json(&QueryRequest { question, top_k });
        let resp = self.send("query", request).await?;
        decode(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::StaticSession;
    use serde_json::json;

    fn remote(session: StaticSession) -> HttpRemote {
        // Port 9 (discard) on loopback; tests below must never reach it.
        let config = RemoteConfig::new().with_base_url("http://127.0.0.1:9/");
        HttpRemote::new(&config, Arc::new(session)).unwrap()
    }

    #[test]
    fn url_joins_base_and_path() {
        let remote = remote(StaticSession::new("t"));
        assert_eq!(remote.base_url(), "http://127.0.0.1:9");
        assert_eq!(
            remote.url("/api/rag/status/ev-1"),
            "http://127.0.0.1:9/api/rag/status/ev-1"
        );
    }

    #[tokio::test]
    async fn calls_fail_without_session() {
        let remote = remote(StaticSession::signed_out());

        let err = remote.list_documents().await.unwrap_err();
        assert!(matches!(err, RemoteError::NotAuthenticated));

        let err = remote
            .poll_ingestion_status(&JobId::new("ev-1"))
            .await
            .unwrap_err();
        assert!(err.is_auth());

        let err = remote.query("what?", 5).await.unwrap_err();
        assert!(matches!(err, RemoteError::NotAuthenticated));
    }

    #[tokio::test]
    async fn empty_patch_is_rejected_locally() {
        let remote = remote(StaticSession::new("t"));
        let err = remote
            .update_document(&DocumentId::from("wb-1"), DocumentPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::EmptyPatch));
    }

    #[test]
    fn not_found_mapping() {
        let id = DocumentId::from("wb-9");
        let err = not_found_as(&id)(RemoteError::Status {
            operation: "get_document",
            status: 404,
            body: String::new(),
        });
        assert!(matches!(err, RemoteError::NotFound(ref what) if what == "document wb-9"));

        let err = not_found_as(&id)(RemoteError::Status {
            operation: "get_document",
            status: 500,
            body: String::new(),
        });
        assert!(matches!(err, RemoteError::Status { status: 500, .. }));
    }

    #[test]
    fn status_response_decoding() {
        let body: StatusResponse =
            serde_json::from_value(json!({"status": "pending", "output": null})).unwrap();
        assert_eq!(body.status.as_deref(), Some("pending"));

        let body: StatusResponse = serde_json::from_value(json!({})).unwrap();
        assert!(body.status.is_none());
    }

    #[test]
    fn list_envelope_decoding() {
        let body: DocumentListEnvelope = serde_json::from_value(json!({
            "whiteboards": [{
                "id": "wb-1",
                "user_id": "u",
                "title": "One",
                "excalidraw_data": null,
                "created_at": "2024-05-01T10:00:00Z",
                "updated_at": "2024-05-01T10:00:00Z"
            }]
        }))
        .unwrap();
        assert_eq!(body.whiteboards.len(), 1);
        assert!(body.whiteboards[0].snapshot.elements.is_empty());
    }
}
