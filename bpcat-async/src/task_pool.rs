//! Task pool for managing cancellable worker tasks with graceful shutdown.
//!
//! The reference surface (spec §5) spawns four long-running workers
//! (CLA-in, CLA-out, app-in, app-out) plus the maintenance loop. `TaskPool`
//! gives each of those a shared cancellation token and a tracker that lets
//! shutdown block until every worker has actually exited, rather than just
//! firing the cancellation signal and hoping.
//!
//! Three-phase shutdown:
//! 1. **Signal** — cancel all tasks via the cancellation token.
//! 2. **Close** — stop accepting new tasks.
//! 3. **Wait** — block until every spawned task has completed.

pub struct TaskPool {
    cancel_token: tokio_util::sync::CancellationToken,
    task_tracker: tokio_util::task::TaskTracker,
}

impl TaskPool {
    pub fn new() -> Self {
        Self {
            cancel_token: tokio_util::sync::CancellationToken::new(),
            task_tracker: tokio_util::task::TaskTracker::new(),
        }
    }

    /// Reference to the pool's cancellation token, for tasks that need to
    /// check cancellation status without being spawned by this pool.
    pub fn cancel_token(&self) -> &tokio_util::sync::CancellationToken {
        &self.cancel_token
    }

    /// A child token that cancels when the pool does, but can also be
    /// cancelled independently (e.g. to stop one worker without tearing
    /// down the whole channel).
    pub fn child_token(&self) -> tokio_util::sync::CancellationToken {
        self.cancel_token.child_token()
    }

    /// Spawns a task tracked by this pool.
    ///
    /// Panics if called after [`shutdown()`](Self::shutdown), since the
    /// tracker is closed at that point.
    pub fn spawn<F>(&self, task: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: std::future::Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.task_tracker.spawn(task)
    }

    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::new()
    }
}
