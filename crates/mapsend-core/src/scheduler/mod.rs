//! Batched upload scheduler.
//!
//! Runs one retry-wrapped upload per task. With a batch size, tasks are cut
//! into consecutive groups that run one after another; tasks inside a group
//! run concurrently on the calling task. Without one, everything runs at once.

mod batch;
mod run;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::retry::{RetryError, RetryPolicy};

pub use batch::BatchPlan;
pub use run::run_uploads;

/// One file to transmit plus the form fields sent alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub source_path: PathBuf,
    pub metadata: BTreeMap<String, String>,
}

impl UploadTask {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Scheduling knobs for `run_uploads`.
#[derive(Debug, Clone, Copy)]
pub struct UploadOptions {
    /// Group size; `None` (or 0) runs every task concurrently.
    pub batch_size: Option<usize>,
    /// Policy each task is retried with.
    pub retry: RetryPolicy,
}

/// What a successful `run_uploads` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadReport {
    /// No tasks were given; nothing was sent.
    NothingToDo,
    Completed { uploaded: usize, batches: usize },
}

/// First task failure observed; the task's terminal retry error plus its path.
#[derive(Debug)]
pub struct UploadFailure<E> {
    pub source_path: PathBuf,
    pub error: RetryError<E>,
}

impl<E: fmt::Display> fmt::Display for UploadFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "uploading {}: {}", self.source_path.display(), self.error)
    }
}

impl<E> std::error::Error for UploadFailure<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
