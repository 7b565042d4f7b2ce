//! Core types for the sync layer
//!
//! Defines the state owned by each orchestrator:
//! - Save status of a document session
//! - Ingestion jobs and their phases
//! - Transcript entries of a query session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use wb_remote::JobId;

/// Save indicator of one document session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SaveStatus {
    /// Nothing in flight, nothing to report
    #[default]
    Idle,
    /// At least one write is in flight
    Saving,
    /// Last write succeeded; reverts to `Idle` after the display interval
    Saved,
}

impl std::fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Saving => "saving",
            Self::Saved => "saved",
        };
        f.write_str(label)
    }
}

/// Local identifier of a tracked ingestion job (ULID for sortability)
///
/// Assigned when the file is accepted, before the backend has issued a
/// [`JobId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobKey(pub Ulid);

impl JobKey {
    /// Generate new job key
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for JobKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client-side phase of an ingestion job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobPhase {
    /// File accepted, submission in flight
    Uploading,
    /// Submitted; the poll loop is waiting for a terminal status
    Processing,
    /// Material is queryable
    Ready,
    /// Submission or processing failed
    Error,
}

impl JobPhase {
    /// Check if no further transition can occur
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Error)
    }
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Uploading => "uploading",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// One uploaded file's lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionJob {
    /// Local key
    pub key: JobKey,
    /// File name, used for display
    pub file_name: String,
    /// Current phase
    pub phase: JobPhase,
    /// Backend job identifier, set once submission succeeds
    pub job_id: Option<JobId>,
}

impl IngestionJob {
    /// Create job in the `Uploading` phase
    #[inline]
    #[must_use]
    pub fn new(key: JobKey, file_name: impl Into<String>) -> Self {
        Self {
            key,
            file_name: file_name.into(),
            phase: JobPhase::Uploading,
            job_id: None,
        }
    }
}

/// Author of a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking
    User,
    /// The answering backend
    Assistant,
}

/// One immutable conversational turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Entry identity
    pub id: Ulid,
    /// Author
    pub role: Role,
    /// Message text
    pub text: String,
    /// Ordered source citations, assistant entries only
    pub sources: Option<Vec<String>>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl TranscriptEntry {
    /// Create user entry
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text.into(), None)
    }

    /// Create assistant entry
    #[must_use]
    pub fn assistant(text: impl Into<String>, sources: Option<Vec<String>>) -> Self {
        Self::new(Role::Assistant, text.into(), sources)
    }

    fn new(role: Role, text: String, sources: Option<Vec<String>>) -> Self {
        Self {
            id: Ulid::new(),
            role,
            text,
            sources,
            created_at: Utc::now(),
        }
    }
}

/// Result of [`crate::QuerySession::ask`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskOutcome {
    /// Blank text or a query already outstanding; nothing appended
    Ignored,
    /// Answer appended
    Answered,
    /// Canned error entry appended
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_phase_terminal() {
        assert!(!JobPhase::Uploading.is_terminal());
        assert!(!JobPhase::Processing.is_terminal());
        assert!(JobPhase::Ready.is_terminal());
        assert!(JobPhase::Error.is_terminal());
    }

    #[test]
    fn new_job_is_uploading_without_id() {
        let job = IngestionJob::new(JobKey::new(), "notes.pdf");
        assert_eq!(job.phase, JobPhase::Uploading);
        assert!(job.job_id.is_none());
    }

    #[test]
    fn transcript_entry_constructors() {
        let user = TranscriptEntry::user("hi");
        assert_eq!(user.role, Role::User);
        assert!(user.sources.is_none());

        let assistant = TranscriptEntry::assistant("hello", Some(vec!["a.pdf".into()]));
        assert_eq!(assistant.role, Role::Assistant);
        assert_eq!(assistant.sources.as_deref(), Some(&["a.pdf".to_string()][..]));
        assert_ne!(user.id, assistant.id);
    }

    #[test]
    fn save_status_default_is_idle() {
        assert_eq!(SaveStatus::default(), SaveStatus::Idle);
        assert_eq!(SaveStatus::Saved.to_string(), "saved");
    }
}
