//! Ingestion job tracker
//!
//! Each accepted file gets its own record and its own background task:
//! submit, wait the initial delay, then poll until the backend reports a
//! terminal status. Jobs never share a loop, so one job's latency or
//! failure cannot affect another.
//!
//! Phase transitions:
//! - `Uploading -> Processing` on successful submission
//! - `Uploading -> Error` on failed submission (no polling)
//! - `Processing -> Ready` / `Processing -> Error` on a terminal poll
//!
//! A poll that fails in transport leaves the job in `Processing`. There is
//! no retry cap and no overall timeout; dismissal or shutdown is the only
//! way to stop a loop early.

use crate::config::IngestConfig;
use crate::event::{EventSink, SyncEvent};
use crate::task::TaskScope;
use crate::types::{IngestionJob, JobKey, JobPhase};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use wb_remote::{IngestionStatus, JobId, RemoteApi, UploadFile};

#[derive(Debug)]
struct JobEntry {
    job: IngestionJob,
    scope: TaskScope,
}

struct TrackerInner {
    remote: Arc<dyn RemoteApi>,
    config: IngestConfig,
    events: EventSink,
    scope: TaskScope,
    jobs: Mutex<IndexMap<JobKey, JobEntry>>,
    changed: watch::Sender<u64>,
}

/// Tracker of concurrently running ingestion jobs
pub struct IngestionTracker {
    inner: Arc<TrackerInner>,
}

impl IngestionTracker {
    /// Create empty tracker
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteApi>, config: IngestConfig, events: EventSink) -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            inner: Arc::new(TrackerInner {
                remote,
                config,
                events,
                scope: TaskScope::new(),
                jobs: Mutex::new(IndexMap::new()),
                changed,
            }),
        }
    }

    /// Accept a file and start tracking it
    ///
    /// Returns `None` without creating a job when the file does not carry
    /// the accepted extension or the tracker was shut down.
    pub fn submit(&self, file: UploadFile) -> Option<JobKey> {
        if !file.has_extension(&self.inner.config.accepted_extension) {
            tracing::debug!(
                "Ignoring {}: not a .{} file",
                file.name,
                self.inner.config.accepted_extension
            );
            return None;
        }
        if self.inner.scope.is_cancelled() {
            tracing::warn!("Ignoring {}: tracker shut down", file.name);
            return None;
        }

        let key = JobKey::new();
        let scope = self.inner.scope.child();
        let job = IngestionJob::new(key, file.name.clone());
        tracing::info!("Tracking ingestion job {} for {}", key, file.name);
        {
            let mut jobs = self.inner.jobs.lock();
            jobs.insert(
                key,
                JobEntry {
                    job,
                    scope: scope.clone(),
                },
            );
            self.inner.events.emit(SyncEvent::JobPhaseChanged {
                key,
                file_name: file.name.clone(),
                phase: JobPhase::Uploading,
            });
        }
        self.inner.notify();

        let inner = Arc::clone(&self.inner);
        scope.spawn(move |token| inner.run_job(key, file, token));
        Some(key)
    }

    /// Accept several files at once; returns keys of the accepted ones
    pub fn submit_all<I>(&self, files: I) -> Vec<JobKey>
    where
        I: IntoIterator<Item = UploadFile>,
    {
        files.into_iter().filter_map(|file| self.submit(file)).collect()
    }

    /// Remove a job from the list and stop its loop
    ///
    /// Returns `false` if the key is unknown.
    pub fn dismiss(&self, key: JobKey) -> bool {
        let entry = {
            let mut jobs = self.inner.jobs.lock();
            let Some(entry) = jobs.shift_remove(&key) else {
                return false;
            };
            entry.scope.cancel();
            self.inner.events.emit(SyncEvent::JobDismissed {
                key,
                file_name: entry.job.file_name.clone(),
            });
            entry
        };
        tracing::info!(
            "Dismissed ingestion job {} ({}, {})",
            key,
            entry.job.file_name,
            entry.job.phase
        );
        self.inner.notify();
        true
    }

    /// Snapshot of all jobs in submission order
    #[must_use]
    pub fn jobs(&self) -> Vec<IngestionJob> {
        self.inner
            .jobs
            .lock()
            .values()
            .map(|entry| entry.job.clone())
            .collect()
    }

    /// Get one job
    #[must_use]
    pub fn job(&self, key: JobKey) -> Option<IngestionJob> {
        self.inner.jobs.lock().get(&key).map(|entry| entry.job.clone())
    }

    /// Number of tracked jobs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.jobs.lock().len()
    }

    /// Check if no job is tracked
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.jobs.lock().is_empty()
    }

    /// Check if every tracked job reached `Ready` or `Error`
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.inner.all_terminal()
    }

    /// Resolve once every tracked job is terminal or the tracker shut down
    pub async fn wait_settled(&self) {
        let mut changed = self.inner.changed.subscribe();
        loop {
            if self.inner.scope.is_cancelled() || self.inner.all_terminal() {
                return;
            }
            tokio::select! {
                () = self.inner.scope.cancelled() => return,
                result = changed.changed() => {
                    if result.is_err() {
                        return;
                    }
                }
            }
        }
    }

    /// Stop every loop; records are kept
    pub fn shutdown(&self) {
        if self.inner.scope.is_cancelled() {
            return;
        }
        self.inner.scope.cancel();
        tracing::debug!("Ingestion tracker shut down");
        self.inner.notify();
    }
}

impl Drop for IngestionTracker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for IngestionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionTracker")
            .field("jobs", &self.len())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl TrackerInner {
    async fn run_job(self: Arc<Self>, key: JobKey, file: UploadFile, token: CancellationToken) {
        let file_name = file.name.clone();
        let submitted = tokio::select! {
            biased;
            () = token.cancelled() => return,
            result = self.remote.submit_ingestion_job(file) => result,
        };
        let job_id = match submitted {
            Ok(job_id) => job_id,
            Err(err) => {
                tracing::error!("Failed to submit {}: {}", file_name, err);
                self.set_phase(key, JobPhase::Error, None);
                return;
            }
        };
        tracing::info!("Submitted {} as job {}", file_name, job_id);
        if !self.set_phase(key, JobPhase::Processing, Some(job_id.clone())) {
            return;
        }

        let mut delay = self.config.initial_delay();
        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }
            let polled = tokio::select! {
                biased;
                () = token.cancelled() => return,
                result = self.remote.poll_ingestion_status(&job_id) => result,
            };
            match polled {
                Ok(IngestionStatus::Succeeded) => {
                    tracing::info!("Job {} ({}) is ready", job_id, file_name);
                    self.set_phase(key, JobPhase::Ready, None);
                    return;
                }
                Ok(IngestionStatus::Failed) => {
                    tracing::warn!("Job {} ({}) failed remotely", job_id, file_name);
                    self.set_phase(key, JobPhase::Error, None);
                    return;
                }
                Ok(IngestionStatus::InProgress) => {
                    tracing::debug!("Job {} still processing", job_id);
                }
                Err(err) => {
                    tracing::warn!("Status check for job {} failed: {}", job_id, err);
                }
            }
            delay = self.config.poll_interval();
        }
    }

    /// Update a job's phase; returns `false` if it was dismissed meanwhile
    ///
    /// The event is emitted under the jobs lock so it cannot trail a
    /// `JobDismissed` for the same key.
    fn set_phase(&self, key: JobKey, phase: JobPhase, job_id: Option<JobId>) -> bool {
        {
            let mut jobs = self.jobs.lock();
            let Some(entry) = jobs.get_mut(&key) else {
                return false;
            };
            entry.job.phase = phase;
            if job_id.is_some() {
                entry.job.job_id = job_id;
            }
            self.events.emit(SyncEvent::JobPhaseChanged {
                key,
                file_name: entry.job.file_name.clone(),
                phase,
            });
        }
        self.notify();
        true
    }

    fn all_terminal(&self) -> bool {
        self.jobs
            .lock()
            .values()
            .all(|entry| entry.job.phase.is_terminal())
    }

    fn notify(&self) {
        self.changed.send_modify(|version| *version = version.wrapping_add(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wb_remote::MockRemoteApi;

    fn tracker(remote: MockRemoteApi) -> IngestionTracker {
        IngestionTracker::new(Arc::new(remote), IngestConfig::default(), EventSink::none())
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_extensions_never_create_jobs() {
        let tracker = tracker(MockRemoteApi::new());
        assert!(tracker.submit(UploadFile::new("notes.txt", b"x".to_vec())).is_none());
        assert!(tracker.submit(UploadFile::new("pdf", b"x".to_vec())).is_none());
        assert!(tracker.submit(UploadFile::new("slides.pdf.bak", b"x".to_vec())).is_none());
        assert!(tracker.is_empty());
        assert!(tracker.is_settled());
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_unknown_key_is_false() {
        let tracker = tracker(MockRemoteApi::new());
        assert!(!tracker.dismiss(JobKey::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn submit_after_shutdown_is_ignored() {
        let tracker = tracker(MockRemoteApi::new());
        tracker.shutdown();
        assert!(tracker.submit(UploadFile::new("a.pdf", b"x".to_vec())).is_none());
        tracker.wait_settled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn submission_failure_is_error_without_polling() {
        let mut remote = MockRemoteApi::new();
        remote
            .expect_submit_ingestion_job()
            .times(1)
            .returning(|_| Err(wb_remote::RemoteError::Unavailable("offline".into())));
        remote.expect_poll_ingestion_status().never();

        let tracker = tracker(remote);
        let key = tracker.submit(UploadFile::new("a.PDF", b"x".to_vec())).unwrap();
        tracker.wait_settled().await;

        let job = tracker.job(key).unwrap();
        assert_eq!(job.phase, JobPhase::Error);
        assert!(job.job_id.is_none());
    }
}
