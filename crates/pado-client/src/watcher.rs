//! Task completion polling
//!
//! The watcher polls the task registry at a fixed interval until the task
//! shows up as completed, the timeout elapses, or the caller cancels. The
//! timeout is checked after each poll returns and before the next wait is
//! scheduled, so a slow registry slows the loop down rather than stacking
//! requests.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use pado_core::{Error, Result, Task};

use crate::metrics;
use crate::remote::TaskRegistry;

/// Cancellation signal shared between a waiting call and its owner
#[derive(Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Signal every clone of this token
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once `cancel` has been called on any clone
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as `self`, so this only returns on cancel
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls a task until it completes
pub struct CompletionWatcher {
    tasks: Arc<dyn TaskRegistry>,
    interval: Duration,
}

impl CompletionWatcher {
    pub fn new(tasks: Arc<dyn TaskRegistry>, interval: Duration) -> Self {
        Self { tasks, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for `task_id` to complete, giving up after `timeout`
    pub async fn wait(&self, task_id: &str, timeout: Duration, cancel: &CancelToken) -> Result<Task> {
        let start = Instant::now();
        let mut polls: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled(task_id.to_string()));
            }

            polls += 1;
            let response = self.tasks.get_completed_by_id(task_id).await?;

            if let Some(task) = response.filter(Task::is_completed) {
                metrics::record_polls(polls, start.elapsed());
                info!(task_id, polls, elapsed_ms = start.elapsed().as_millis() as u64, "Task completed");
                return Ok(task);
            }

            let waited = start.elapsed();
            if waited > timeout {
                metrics::record_polls(polls, waited);
                return Err(Error::Timeout {
                    task_id: task_id.to_string(),
                    waited,
                });
            }

            debug!(task_id, polls, waited_ms = waited.as_millis() as u64, "Task pending");

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = cancel.cancelled() => {
                    return Err(Error::Cancelled(task_id.to_string()));
                }
            }
        }
    }
}
