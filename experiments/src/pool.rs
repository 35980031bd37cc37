//! Fixed-size worker pool with joinable task handles.
//!
//! Backed by a dedicated rayon pool. Every spawned task is queued
//! immediately; at most `size` run at once. A panicking task is caught on
//! its worker and surfaced through its [`TaskHandle`], so sibling tasks keep
//! running.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use anyhow::{Context, Result, anyhow};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    /// Start `size` worker threads.
    pub fn new(size: usize) -> Result<Self> {
        // rayon reads 0 as "pick a default".
        if size == 0 {
            return Err(anyhow!("worker pool size must be > 0"));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|id| format!("experiment-worker-{id}"))
            .build()
            .context("start worker threads")?;
        debug!(size, "worker pool started");
        Ok(Self { pool })
    }

    /// Queue `task` and return a handle to its result.
    pub fn spawn<T, F>(&self, task: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = mpsc::channel();
        // An uncaught panic in a rayon spawn aborts the process.
        self.pool.spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(task));
            // The handle may have been dropped; nobody is waiting then.
            let _ = result_tx.send(result);
        });
        TaskHandle {
            receiver: result_rx,
        }
    }
}

/// Handle to a task queued on a [`WorkerPool`].
#[must_use = "a task handle must be joined to observe the task's result"]
pub struct TaskHandle<T> {
    receiver: Receiver<thread::Result<T>>,
}

impl<T> TaskHandle<T> {
    /// Block until the task finishes. A panic inside the task becomes an error.
    ///
    /// Must not be called from inside the pool: a worker blocked here cannot
    /// run the task it waits for.
    pub fn join(self) -> Result<T> {
        match self.receiver.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => Err(anyhow!("task panicked: {}", panic_message(&*payload))),
            Err(_) => Err(anyhow!("task was dropped before completing")),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
