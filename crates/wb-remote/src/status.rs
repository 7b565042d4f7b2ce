//! Ingestion status normalization
//!
//! The backend reports job status as an open vocabulary of labels with
//! several synonyms for success and failure. This module collapses it into
//! a tagged [`IngestionStatus`] so the job tracker never sees raw strings.

use serde::{Deserialize, Serialize};

/// Labels meaning the job finished successfully
pub const SUCCESS_LABELS: &[&str] = &["Completed", "Succeeded", "Success", "Finished"];

/// Labels meaning the job ended without producing output
pub const FAILURE_LABELS: &[&str] = &["Failed", "Cancelled"];

/// Normalized status of a remote ingestion job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IngestionStatus {
    /// Not terminal yet, or status unknown
    InProgress,
    /// Job finished, material is queryable
    Succeeded,
    /// Job failed or was cancelled
    Failed,
}

impl IngestionStatus {
    /// Map a raw status label onto the tagged status
    ///
    /// Matching is ASCII case-insensitive and ignores surrounding whitespace.
    /// Anything unrecognised, including `"pending"` and `"unknown"`, is
    /// `InProgress`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if SUCCESS_LABELS.iter().any(|l| l.eq_ignore_ascii_case(label)) {
            Self::Succeeded
        } else if FAILURE_LABELS.iter().any(|l| l.eq_ignore_ascii_case(label)) {
            Self::Failed
        } else {
            Self::InProgress
        }
    }

    /// Check if no further transition can occur
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}
