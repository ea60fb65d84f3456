//! Where completions run.
//!
//! Every service that delivers results asynchronously hands them to a
//! [`CompletionExecutor`], so callers get all their callbacks on one
//! well-known context instead of whatever task happened to finish the call.

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// A unit of work handed to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub trait Executor: Send + Sync + 'static {
    fn execute(&self, job: Job);
}

/// Runs jobs inline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl Executor for Immediate {
    fn execute(&self, job: Job) {
        job()
    }
}

/// Runs jobs one at a time, in submission order, on a dedicated tokio task.
#[derive(Debug, Clone)]
pub struct SerialQueue {
    sender: mpsc::UnboundedSender<Job>,
}

impl SerialQueue {
    /// Starts the queue on `handle`.
    pub fn start(handle: &Handle) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        handle.spawn(async move {
            while let Some(job) = receiver.recv().await {
                job();
            }
        });
        Self { sender }
    }
}

impl Executor for SerialQueue {
    fn execute(&self, job: Job) {
        if self.sender.send(job).is_err() {
            #[cfg(feature = "tracing")]
            tracing::warn!("completion queue is gone, dropping completion");
        }
    }
}

/// Spawns each job as its own task.
#[derive(Debug, Clone)]
pub struct Spawn(Handle);

impl Executor for Spawn {
    fn execute(&self, job: Job) {
        self.0.spawn(async move { job() });
    }
}

/// Shared handle to the executor a service delivers completions on.
#[derive(Clone)]
pub struct CompletionExecutor(Arc<dyn Executor>);

impl CompletionExecutor {
    pub fn new(executor: impl Executor) -> Self {
        Self(Arc::new(executor))
    }

    /// Completions run inline, on the task that resolved the call.
    pub fn immediate() -> Self {
        Self::new(Immediate)
    }

    /// Completions run one by one, in order, on a single background task.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn serial() -> Self {
        Self::new(SerialQueue::start(&Handle::current()))
    }

    /// Each completion is spawned on `handle`.
    pub fn tokio(handle: Handle) -> Self {
        Self::new(Spawn(handle))
    }

    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.0.execute(Box::new(job));
    }
}

impl Default for CompletionExecutor {
    fn default() -> Self {
        Self::immediate()
    }
}

impl fmt::Debug for CompletionExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompletionExecutor").finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn immediate_runs_inline() {
        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);
        CompletionExecutor::immediate().execute(move || *flag.lock().unwrap() = true);
        assert!(*ran.lock().unwrap());
    }

    #[tokio::test]
    async fn serial_queue_keeps_order() {
        let executor = CompletionExecutor::serial();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();

        for i in 0..5 {
            let seen = Arc::clone(&seen);
            executor.execute(move || seen.lock().unwrap().push(i));
        }
        executor.execute(move || {
            let _ = done_tx.send(());
        });

        done_rx.await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }
}
