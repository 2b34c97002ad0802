//! Run upload tasks group by group with per-task retry.

use futures::stream::{FuturesUnordered, StreamExt};
use std::fmt;
use std::future::Future;

use crate::control::CancelSignal;
use crate::retry::{Classify, Retry};

use super::batch::BatchPlan;
use super::{UploadFailure, UploadOptions, UploadReport, UploadTask};

/// Uploads every task, each wrapped in its own retry run.
///
/// Groups run sequentially; group k+1 starts only after every task of group
/// k has settled. When a task fails for good, the rest of its group still
/// finishes, no later group is started, and the first failure observed is
/// returned.
pub async fn run_uploads<E, F, Fut>(
    tasks: &[UploadTask],
    upload_one: F,
    options: &UploadOptions,
    cancel: Option<&CancelSignal>,
) -> Result<UploadReport, UploadFailure<E>>
where
    E: Classify + fmt::Display,
    F: Fn(&UploadTask) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    if tasks.is_empty() {
        tracing::debug!("no upload tasks, nothing to do");
        return Ok(UploadReport::NothingToDo);
    }

    let plan = BatchPlan::new(tasks, options.batch_size);
    let batches = plan.len();
    let upload_one = &upload_one;

    for (index, group) in plan.groups().iter().enumerate() {
        tracing::debug!(batch = index + 1, of = batches, size = group.len(), "starting batch");

        let mut in_flight: FuturesUnordered<_> = group
            .iter()
            .map(|task| async move {
                let path = task.source_path.display().to_string();
                let result = Retry::new(&options.retry)
                    .cancel_on(cancel)
                    .on_failed_attempt(move |e: &E, ctx| {
                        tracing::warn!(
                            path = %path,
                            attempt = ctx.attempt_number,
                            remaining = ctx.attempts_remaining,
                            "upload failed: {}",
                            e
                        );
                        Ok(())
                    })
                    .run(|| upload_one(task))
                    .await;
                (task, result)
            })
            .collect();

        let mut first_failure: Option<UploadFailure<E>> = None;
        while let Some((task, result)) = in_flight.next().await {
            if let Err(error) = result {
                if first_failure.is_none() {
                    first_failure = Some(UploadFailure {
                        source_path: task.source_path.clone(),
                        error,
                    });
                }
            }
        }
        if let Some(failure) = first_failure {
            return Err(failure);
        }
    }

    Ok(UploadReport::Completed {
        uploaded: tasks.len(),
        batches,
    })
}
