//! Testing utilities for the whiteboard sync workspace
//!
//! Scripted remote double, fixtures and call logs.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use wb_remote::{
    DocumentId, DocumentPatch, DocumentRecord, DocumentSnapshot, IngestionStatus, JobId,
    QueryAnswer, RemoteApi, RemoteError, UploadFile, PRESENCE_KEY,
};

/// One scripted answer to a status poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    Status(IngestionStatus),
    TransportError,
}

#[derive(Debug, Clone)]
pub struct UpdateCall {
    pub id: DocumentId,
    pub patch: DocumentPatch,
    pub at: Instant,
}

#[derive(Debug, Clone)]
pub struct PollCall {
    pub job: JobId,
    pub at: Instant,
}

#[derive(Debug, Default)]
struct ScriptState {
    documents: HashMap<DocumentId, DocumentRecord>,
    next_document: u64,
    poll_scripts: HashMap<JobId, VecDeque<PollStep>>,
    failing_submissions: HashSet<String>,
    submit_delay: Duration,
    update_delay: Duration,
    fail_updates: bool,
    query_delay: Duration,
    query_results: VecDeque<Result<QueryAnswer, String>>,
    updates: Vec<UpdateCall>,
    polls: Vec<PollCall>,
    submissions: Vec<String>,
    questions: Vec<(String, usize)>,
}

/// In-memory [`RemoteApi`] driven by per-test scripts
///
/// Jobs are issued ids of the form `job-<file name>`. A job without a poll
/// script (or whose script is exhausted) reports `InProgress` forever.
#[derive(Debug, Default)]
pub struct ScriptedRemote {
    state: Mutex<ScriptState>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_id_for(file_name: &str) -> JobId {
        JobId::new(format!("job-{file_name}"))
    }

    pub fn insert_document(&self, record: DocumentRecord) {
        self.state.lock().documents.insert(record.id.clone(), record);
    }

    pub fn document(&self, id: &DocumentId) -> Option<DocumentRecord> {
        self.state.lock().documents.get(id).cloned()
    }

    pub fn script_polls(&self, file_name: &str, steps: impl IntoIterator<Item = PollStep>) {
        self.state
            .lock()
            .poll_scripts
            .insert(Self::job_id_for(file_name), steps.into_iter().collect());
    }

    pub fn fail_submission(&self, file_name: &str) {
        self.state.lock().failing_submissions.insert(file_name.to_string());
    }

    pub fn set_submit_delay(&self, delay: Duration) {
        self.state.lock().submit_delay = delay;
    }

    pub fn set_update_delay(&self, delay: Duration) {
        self.state.lock().update_delay = delay;
    }

    pub fn set_fail_updates(&self, fail: bool) {
        self.state.lock().fail_updates = fail;
    }

    pub fn set_query_delay(&self, delay: Duration) {
        self.state.lock().query_delay = delay;
    }

    /// Queue the next query outcome; `Err` text becomes `RemoteError::Unavailable`
    pub fn push_query_result(&self, result: Result<QueryAnswer, String>) {
        self.state.lock().query_results.push_back(result);
    }

    pub fn updates(&self) -> Vec<UpdateCall> {
        self.state.lock().updates.clone()
    }

    /// Snapshots written by body saves, in dispatch order
    pub fn written_snapshots(&self) -> Vec<DocumentSnapshot> {
        self.state
            .lock()
            .updates
            .iter()
            .filter_map(|call| call.patch.snapshot.clone())
            .collect()
    }

    pub fn polls(&self, file_name: &str) -> Vec<PollCall> {
        let job = Self::job_id_for(file_name);
        self.state
            .lock()
            .polls
            .iter()
            .filter(|call| call.job == job)
            .cloned()
            .collect()
    }

    pub fn poll_count(&self, file_name: &str) -> usize {
        self.polls(file_name).len()
    }

    pub fn submissions(&self) -> Vec<String> {
        self.state.lock().submissions.clone()
    }

    pub fn questions(&self) -> Vec<(String, usize)> {
        self.state.lock().questions.clone()
    }
}

#[async_trait]
impl RemoteApi for ScriptedRemote {
    async fn create_document(&self, title: Option<String>) -> Result<DocumentRecord, RemoteError> {
        let mut state = self.state.lock();
        state.next_document += 1;
        let id = format!("wb-{}", state.next_document);
        let record = record(&id, title.as_deref().unwrap_or("Untitled"), DocumentSnapshot::default());
        state.documents.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_document(&self, id: &DocumentId) -> Result<DocumentRecord, RemoteError> {
        self.document(id)
            .ok_or_else(|| RemoteError::NotFound(format!("document {id}")))
    }

    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, RemoteError> {
        let mut records: Vec<_> = self.state.lock().documents.values().cloned().collect();
        records.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(records)
    }

    async fn update_document(
        &self,
        id: &DocumentId,
        patch: DocumentPatch,
    ) -> Result<DocumentRecord, RemoteError> {
        if patch.is_empty() {
            return Err(RemoteError::EmptyPatch);
        }
        let delay = {
            let mut state = self.state.lock();
            state.updates.push(UpdateCall {
                id: id.clone(),
                patch: patch.clone(),
                at: Instant::now(),
            });
            state.update_delay
        };
        tokio::time::sleep(delay).await;

        let mut state = self.state.lock();
        if state.fail_updates {
            return Err(RemoteError::Unavailable("scripted update failure".into()));
        }
        let entry = state
            .documents
            .entry(id.clone())
            .or_insert_with(|| record(id.as_str(), "Untitled", DocumentSnapshot::default()));
        if let Some(title) = patch.title {
            entry.title = title;
        }
        if let Some(snapshot) = patch.snapshot {
            entry.snapshot = snapshot;
        }
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn delete_document(&self, id: &DocumentId) -> Result<(), RemoteError> {
        self.state
            .lock()
            .documents
            .remove(id)
            .map(drop)
            .ok_or_else(|| RemoteError::NotFound(format!("document {id}")))
    }

    async fn submit_ingestion_job(&self, file: UploadFile) -> Result<JobId, RemoteError> {
        let (delay, fail) = {
            let mut state = self.state.lock();
            state.submissions.push(file.name.clone());
            (state.submit_delay, state.failing_submissions.contains(&file.name))
        };
        tokio::time::sleep(delay).await;
        if fail {
            return Err(RemoteError::Unavailable("scripted submission failure".into()));
        }
        Ok(Self::job_id_for(&file.name))
    }

    async fn poll_ingestion_status(&self, job: &JobId) -> Result<IngestionStatus, RemoteError> {
        let mut state = self.state.lock();
        state.polls.push(PollCall {
            job: job.clone(),
            at: Instant::now(),
        });
        let step = state
            .poll_scripts
            .get_mut(job)
            .and_then(VecDeque::pop_front)
            .unwrap_or(PollStep::Status(IngestionStatus::InProgress));
        match step {
            PollStep::Status(status) => Ok(status),
            PollStep::TransportError => {
                Err(RemoteError::Unavailable("scripted poll failure".into()))
            }
        }
    }

    async fn query(&self, question: &str, top_k: usize) -> Result<QueryAnswer, RemoteError> {
        let (delay, result) = {
            let mut state = self.state.lock();
            state.questions.push((question.to_string(), top_k));
            (state.query_delay, state.query_results.pop_front())
        };
        tokio::time::sleep(delay).await;
        match result {
            Some(Ok(answer)) => Ok(answer),
            Some(Err(message)) => Err(RemoteError::Unavailable(message)),
            None => Ok(answer("ok", &[])),
        }
    }
}

// Fixtures

/// Snapshot with one element tagged `n`
pub fn snapshot(n: usize) -> DocumentSnapshot {
    DocumentSnapshot::with_elements(vec![json!({ "id": format!("el-{n}"), "type": "rectangle" })])
}

/// Snapshot carrying presence state for two peers
pub fn snapshot_with_presence(n: usize) -> DocumentSnapshot {
    let mut snapshot = snapshot(n);
    let mut peers = Map::new();
    peers.insert("peer-a".into(), json!({ "pointer": { "x": 1, "y": 2 } }));
    peers.insert("peer-b".into(), json!({ "pointer": { "x": 3, "y": 4 } }));
    snapshot
        .app_state
        .insert(PRESENCE_KEY.to_string(), Value::Object(peers));
    snapshot
        .app_state
        .insert("viewBackgroundColor".into(), json!("#ffffff"));
    snapshot
}

pub fn record(id: &str, title: &str, snapshot: DocumentSnapshot) -> DocumentRecord {
    let now = Utc::now();
    DocumentRecord {
        id: DocumentId::new(id),
        user_id: "user-1".to_string(),
        title: title.to_string(),
        snapshot,
        created_at: now,
        updated_at: now,
    }
}

pub fn pdf(name: &str) -> UploadFile {
    UploadFile::new(name, b"%PDF-1.7".to_vec())
}

pub fn answer(text: &str, sources: &[&str]) -> QueryAnswer {
    QueryAnswer {
        answer: text.to_string(),
        sources: sources.iter().map(|s| (*s).to_string()).collect(),
        num_contexts: sources.len(),
    }
}
