//! Spawned requests that can lose a race without being killed.
//!
//! `AbandonableTask` runs a future on the tokio runtime. Racing it against
//! a deadline either yields its output or a `Timeout`; on timeout the task
//! is detached rather than aborted, so the underlying request may still
//! finish in the background and its result is dropped.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::ClientError;

pub struct AbandonableTask<T> {
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> AbandonableTask<T> {
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
        }
    }

    /// Stop waiting for the task. It keeps running to completion.
    pub fn abandon(self) {
        drop(self.handle);
    }

    /// Wait for the task or the deadline, whichever settles first. A task
    /// that finishes exactly at the deadline wins.
    pub async fn race(self, deadline: Duration) -> Result<T, ClientError> {
        let mut handle = self.handle;
        tokio::select! {
            biased;
            joined = &mut handle => {
                joined.map_err(|e| ClientError::Network(format!("request task failed: {e}")))
            }
            () = tokio::time::sleep(deadline) => {
                warn!(timeout_secs = deadline.as_secs_f64(), "request abandoned after deadline");
                AbandonableTask { handle }.abandon();
                Err(ClientError::Timeout(deadline))
            }
        }
    }
}
