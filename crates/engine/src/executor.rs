use std::sync::mpsc::{self, Receiver};
use std::thread;

use quill_core::CasOutcome;
use tracing::trace;

use crate::error::EngineError;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Worker pool on which asynchronous writes run their execution, CAS
/// interpretation and post-write callbacks.
pub trait Executor: Send + Sync {
    fn spawn(&self, task: Task);
}

/// One OS thread per task.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPerTask;

impl Executor for ThreadPerTask {
    fn spawn(&self, task: Task) {
        thread::spawn(task);
    }
}

/// Runs the task on the submitting thread before `spawn` returns.
#[derive(Debug, Default, Clone, Copy)]
pub struct Inline;

impl Executor for Inline {
    fn spawn(&self, task: Task) {
        task();
    }
}

/// Handle on the outcome of an asynchronous write.
#[derive(Debug)]
pub struct WriteFuture {
    receiver: Receiver<Result<CasOutcome, EngineError>>,
}

impl WriteFuture {
    /// Block until the write completes.
    pub fn wait(self) -> Result<CasOutcome, EngineError> {
        self.receiver.recv().map_err(|_| EngineError::TaskDropped)?
    }

    /// The outcome if the write has already completed.
    pub fn try_wait(&self) -> Option<Result<CasOutcome, EngineError>> {
        self.receiver.try_recv().ok()
    }
}

pub fn submit<F>(executor: &dyn Executor, job: F) -> WriteFuture
where
    F: FnOnce() -> Result<CasOutcome, EngineError> + Send + 'static,
{
    let (sender, receiver) = mpsc::channel();
    executor.spawn(Box::new(move || {
        // The caller may have dropped the future; the result is then discarded.
        if sender.send(job()).is_err() {
            trace!("write future dropped before completion");
        }
    }));
    WriteFuture { receiver }
}
