//! Wire types exchanged with the remote backend
//!
//! Defines:
//! - Document snapshots and records
//! - Partial document updates
//! - Ingestion job identifiers and upload payloads
//! - Query answers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// View-state key holding runtime collaborator presence
///
/// Never persisted: stripped before every write, reset to empty on load.
pub const PRESENCE_KEY: &str = "collaborators";

/// Remote document identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    /// Create new document ID
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque identifier the backend assigns to a submitted ingestion job
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create new job ID
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Full persisted state of one canvas document
///
/// `elements` and the values of `files` are opaque to this layer; they are
/// round-tripped as-is.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// Drawable elements, in z-order
    #[serde(default, deserialize_with = "null_as_default")]
    pub elements: Vec<Value>,
    /// Transient view state
    #[serde(rename = "appState", default, deserialize_with = "null_as_default")]
    pub app_state: Map<String, Value>,
    /// Embedded resource id -> payload
    #[serde(default, deserialize_with = "null_as_default")]
    pub files: Map<String, Value>,
}

impl DocumentSnapshot {
    /// Create snapshot from elements with empty view state
    #[inline]
    #[must_use]
    pub fn with_elements(elements: Vec<Value>) -> Self {
        Self {
            elements,
            ..Self::default()
        }
    }

    /// Copy suitable for handing to the canvas: presence reset to empty
    #[must_use]
    pub fn for_editing(&self) -> Self {
        let mut snapshot = self.clone();
        snapshot
            .app_state
            .insert(PRESENCE_KEY.to_string(), Value::Object(Map::new()));
        snapshot
    }

    /// Remove presence state in place
    #[inline]
    pub fn strip_presence(&mut self) {
        self.app_state.remove(PRESENCE_KEY);
    }

    /// Check whether presence state is attached
    #[inline]
    #[must_use]
    pub fn has_presence(&self) -> bool {
        self.app_state.contains_key(PRESENCE_KEY)
    }
}

/// Document record as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Document ID
    pub id: DocumentId,
    /// Owning user
    pub user_id: String,
    /// Display title
    pub title: String,
    /// Persisted snapshot
    #[serde(rename = "excalidraw_data", default, deserialize_with = "null_as_default")]
    pub snapshot: DocumentSnapshot,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a document
///
/// Absent fields are left untouched by the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentPatch {
    /// New title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New snapshot
    #[serde(
        rename = "excalidraw_data",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub snapshot: Option<DocumentSnapshot>,
}

impl DocumentPatch {
    /// Patch that only replaces the title
    #[inline]
    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            snapshot: None,
        }
    }

    /// Patch that only replaces the snapshot
    #[inline]
    #[must_use]
    pub fn snapshot(snapshot: DocumentSnapshot) -> Self {
        Self {
            title: None,
            snapshot: Some(snapshot),
        }
    }

    /// Check whether the patch carries no change
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.snapshot.is_none()
    }
}

/// A file accepted from the picker or drop target
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// File name, used as display key
    pub name: String,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Create new upload payload
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Check that the file name ends in `.{extension}`, ASCII case-insensitively
    ///
    /// `extension` is given without the leading dot. A bare `.pdf` matches.
    #[must_use]
    pub fn has_extension(&self, extension: &str) -> bool {
        self.name
            .len()
            .checked_sub(extension.len() + 1)
            .and_then(|start| self.name.get(start..))
            .and_then(|tail| tail.strip_prefix('.'))
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Answer to a free-text question
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryAnswer {
    /// Generated answer text
    pub answer: String,
    /// Source citations, in backend order
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources: Vec<String>,
    /// Number of retrieved context passages
    #[serde(default)]
    pub num_contexts: usize,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn strip_presence_keeps_other_view_state() {
        let snapshot: DocumentSnapshot = serde_json::from_value(json!({
            "elements": [{"id": "a", "type": "rectangle"}],
            "appState": {"viewBackgroundColor": "#fff", "collaborators": {"u1": {}}},
            "files": {}
        }))
        .unwrap();
        assert!(snapshot.has_presence());

        let mut stored = snapshot.clone();
        stored.strip_presence();
        assert!(!stored.has_presence());
        assert_eq!(stored.app_state["viewBackgroundColor"], json!("#fff"));
        assert_eq!(stored.elements, snapshot.elements);
    }

    #[test]
    fn snapshot_for_editing_resets_presence() {
        let mut snapshot = DocumentSnapshot::default();
        snapshot
            .app_state
            .insert(PRESENCE_KEY.to_string(), json!({"stale": {"x": 1}}));

        let editing = snapshot.for_editing();
        assert_eq!(editing.app_state[PRESENCE_KEY], json!({}));
    }

    #[test]
    fn snapshot_tolerates_null_fields() {
        let snapshot: DocumentSnapshot =
            serde_json::from_value(json!({"elements": null, "appState": null})).unwrap();
        assert!(snapshot.elements.is_empty());
        assert!(snapshot.app_state.is_empty());
        assert!(snapshot.files.is_empty());
    }

    #[test]
    fn record_decodes_backend_shape() {
        let record: DocumentRecord = serde_json::from_value(json!({
            "id": "wb-1",
            "user_id": "user-1",
            "title": "Untitled Whiteboard",
            "excalidraw_data": {"elements": [], "appState": {}, "files": {}},
            "created_at": "2024-05-01T10:00:00.123456+00:00",
            "updated_at": "2024-05-01T10:05:00+00:00"
        }))
        .unwrap();
        assert_eq!(record.id, DocumentId::from("wb-1"));
        assert_eq!(record.title, "Untitled Whiteboard");
        assert!(record.snapshot.elements.is_empty());
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let value = serde_json::to_value(DocumentPatch::title("Notes")).unwrap();
        assert_eq!(value, json!({"title": "Notes"}));

        let value = serde_json::to_value(DocumentPatch::snapshot(DocumentSnapshot::default()))
            .unwrap();
        assert_eq!(
            value,
            json!({"excalidraw_data": {"elements": [], "appState": {}, "files": {}}})
        );
        assert!(DocumentPatch::default().is_empty());
    }

    #[test]
    fn upload_extension_check() {
        assert!(UploadFile::new("notes.pdf", vec![]).has_extension("pdf"));
        assert!(UploadFile::new("SLIDES.PDF", vec![]).has_extension("pdf"));
        assert!(!UploadFile::new("notes.pdf.txt", vec![]).has_extension("pdf"));
        assert!(!UploadFile::new("pdf", vec![]).has_extension("pdf"));
        assert!(!UploadFile::new("notespdf", vec![]).has_extension("pdf"));
        assert!(UploadFile::new(".pdf", vec![]).has_extension("pdf"));
        assert!(UploadFile::new("report.v2.Pdf", vec![]).has_extension("pdf"));
        assert!(UploadFile::new("archive.tar.gz", vec![]).has_extension("tar.gz"));
        assert!(!UploadFile::new("résumé", vec![]).has_extension("pdf"));
    }
}
