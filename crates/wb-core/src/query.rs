//! Query session: a transcript of questions and answers
//!
//! At most one question is outstanding at a time. The question is appended
//! to the transcript before the answer arrives; the answer (or a fixed
//! apology on failure) is appended as a separate entry. Entries are never
//! edited or removed.

use crate::config::QueryConfig;
use crate::event::{EventSink, SyncEvent};
use crate::types::{AskOutcome, TranscriptEntry};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use wb_remote::RemoteApi;

/// Assistant text appended when a query fails
pub const QUERY_ERROR_TEXT: &str =
    "Sorry, I encountered an error while processing your question. Please try again.";

/// Conversational query session over ingested material
pub struct QuerySession {
    remote: Arc<dyn RemoteApi>,
    config: QueryConfig,
    events: EventSink,
    transcript: Mutex<Vec<TranscriptEntry>>,
    loading: AtomicBool,
}

/// Clears the loading flag on every exit path
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl QuerySession {
    /// Create session with an empty transcript
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteApi>, config: QueryConfig, events: EventSink) -> Self {
        Self {
            remote,
            config,
            events,
            transcript: Mutex::new(Vec::new()),
            loading: AtomicBool::new(false),
        }
    }

    /// Ask a question
    ///
    /// Blank input and input arriving while another question is outstanding
    /// are ignored. Remote failures are logged and turned into an apology
    /// entry; they are never returned.
    pub async fn ask(&self, text: &str) -> AskOutcome {
        let question = text.trim();
        if question.is_empty() {
            return AskOutcome::Ignored;
        }
        let Some(_loading) = LoadingGuard::acquire(&self.loading) else {
            tracing::debug!("Ignoring question while another is outstanding");
            return AskOutcome::Ignored;
        };

        self.append(TranscriptEntry::user(question));
        match self.remote.query(question, self.config.top_k).await {
            Ok(answer) => {
                tracing::info!(
                    "Answered with {} sources from {} contexts",
                    answer.sources.len(),
                    answer.num_contexts
                );
                self.append(TranscriptEntry::assistant(answer.answer, Some(answer.sources)));
                AskOutcome::Answered
            }
            Err(err) => {
                tracing::error!("Query failed: {}", err);
                self.append(TranscriptEntry::assistant(QUERY_ERROR_TEXT, None));
                AskOutcome::Failed
            }
        }
    }

    /// Copy of the transcript in append order
    #[must_use]
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.transcript.lock().clone()
    }

    /// Check if a question is outstanding
    #[inline]
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Number of transcript entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.transcript.lock().len()
    }

    /// Check if the transcript is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transcript.lock().is_empty()
    }

    fn append(&self, entry: TranscriptEntry) {
        self.transcript.lock().push(entry.clone());
        self.events.emit(SyncEvent::TranscriptAppended(entry));
    }
}

impl std::fmt::Debug for QuerySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySession")
            .field("entries", &self.len())
            .field("loading", &self.is_loading())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use pretty_assertions::assert_eq;
    use wb_remote::{MockRemoteApi, QueryAnswer, RemoteError};

    fn session(remote: MockRemoteApi) -> QuerySession {
        QuerySession::new(Arc::new(remote), QueryConfig::default(), EventSink::none())
    }

    #[tokio::test]
    async fn blank_questions_are_ignored() {
        let mut remote = MockRemoteApi::new();
        remote.expect_query().never();
        let session = session(remote);

        assert_eq!(session.ask("").await, AskOutcome::Ignored);
        assert_eq!(session.ask("   \t").await, AskOutcome::Ignored);
        assert!(session.is_empty());
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn answer_is_appended_with_sources_verbatim() {
        let mut remote = MockRemoteApi::new();
        remote
            .expect_query()
            .withf(|question, top_k| question.to_string() == "what is X?" && *top_k == 5)
            .times(1)
            .returning(|_, _| {
                Ok(QueryAnswer {
                    answer: "X is Y.".to_string(),
                    sources: vec!["b.pdf".to_string(), "a.pdf".to_string()],
                    num_contexts: 2,
                })
            });
        let session = session(remote);

        assert_eq!(session.ask("  what is X? ").await, AskOutcome::Answered);
        let transcript = session.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].role, Role::User);
        assert_eq!(transcript[0].text, "what is X?");
        assert_eq!(transcript[0].sources, None);
        assert_eq!(transcript[1].role, Role::Assistant);
        assert_eq!(transcript[1].text, "X is Y.");
        assert_eq!(
            transcript[1].sources,
            Some(vec!["b.pdf".to_string(), "a.pdf".to_string()])
        );
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn failure_appends_apology() {
        let mut remote = MockRemoteApi::new();
        remote
            .expect_query()
            .times(1)
            .returning(|_, _| Err(RemoteError::Unavailable("offline".into())));
        let session = session(remote);

        assert_eq!(session.ask("hello").await, AskOutcome::Failed);
        let transcript = session.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].text, QUERY_ERROR_TEXT);
        assert_eq!(transcript[1].sources, None);
        assert!(!session.is_loading());
    }
}
