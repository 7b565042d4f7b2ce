//! Cancellable timers and background loops
//!
//! Every delayed action in the sync layer is spawned through a [`TaskScope`]
//! owned by the entity it belongs to (a document session, a job record, a
//! tracker). Cancelling the scope stops everything spawned from it and from
//! its child scopes; a [`TimerHandle`] stops a single task.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Owner of a tree of cancellable tasks
#[derive(Debug, Clone, Default)]
pub struct TaskScope {
    root: CancellationToken,
}

impl TaskScope {
    /// Create new root scope
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope cancelled together with this one, but cancellable on its own
    #[inline]
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            root: self.root.child_token(),
        }
    }

    /// Run `action` once `delay` has elapsed, unless cancelled first
    ///
    /// Cancellation only prevents the action from starting. Once the delay
    /// has elapsed the action runs to completion.
    pub fn spawn_after<F>(&self, delay: Duration, action: F) -> TimerHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.root.child_token();
        let guard = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = guard.cancelled() => {}
                () = tokio::time::sleep(delay) => action.await,
            }
        });
        TimerHandle { token }
    }

    /// Spawn a task that observes its own cancellation token
    ///
    /// Used for loops that must stop at any suspension point.
    pub fn spawn<F, Fut>(&self, task: F) -> TimerHandle
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.root.child_token();
        tokio::spawn(task(token.clone()));
        TimerHandle { token }
    }

    /// Cancel every task spawned from this scope and its children
    #[inline]
    pub fn cancel(&self) {
        self.root.cancel();
    }

    /// Check if the scope was cancelled
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Resolve once the scope is cancelled
    pub async fn cancelled(&self) {
        self.root.cancelled().await;
    }
}

/// Handle to one spawned timer or loop
#[derive(Debug, Clone)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    /// Stop the task if it has not started (timer) or at its next suspension point (loop)
    #[inline]
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if the handle was cancelled
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
