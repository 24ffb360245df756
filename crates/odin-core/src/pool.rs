// ── Bounded worker pool ──
//
// Fire-and-forget execution for the asynchronous halves of a handoff.
// Jobs share no completion signal; the tracker exists so shutdown and
// tests can wait for quiescence.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// Runs independent jobs on the tokio runtime, at most `size` at a time.
#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size.max(1))),
            tracker: TaskTracker::new(),
        }
    }

    /// Schedule `job` and return immediately.
    ///
    /// Outside a tokio runtime the job runs inline on the caller's thread.
    pub fn spawn<F>(&self, label: &'static str, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Ok(handle) = Handle::try_current() else {
            debug!(task = label, "no runtime available, running inline");
            job();
            return;
        };

        let permits = Arc::clone(&self.permits);
        self.tracker.spawn_on(
            async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    warn!(task = label, "worker pool closed, job dropped");
                    return;
                };
                job();
            },
            &handle,
        );
    }

    /// Number of scheduled jobs that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every job scheduled so far has finished.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(10)
    }
}
