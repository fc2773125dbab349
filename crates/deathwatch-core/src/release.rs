//! Mass-release coordinator.
//!
//! Every resource in a batch is closed on its own Tokio task. Completions fan
//! in over a bounded channel sized to the batch, tagged with the resource's
//! ordinal, and the coordinator races them against a single deadline.
//!
//! Attempts still running at the deadline are abandoned, not aborted. The
//! caller is expected to exit the process shortly after.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::emit;
use crate::error::ReleaseError;
use crate::logger::LoggerRef;
use crate::metrics::events::{
    ReleaseBatchDuration, ReleaseBatchTimedOut, ResourceReleaseFailed, ResourceReleased,
};
use crate::resource::{CloseableRef, ResourceLabel};

/// One resource's release attempt within a batch.
struct ReleaseTask {
    index: usize,
    resource: CloseableRef,
    label: ResourceLabel,
}

/// Release every resource concurrently, giving the whole batch `timeout`.
///
/// Errors returned by a resource's `close` (or a panic inside it) are logged
/// and the resource counts as released. Only resources that have not returned
/// by the deadline make the batch fail, and each of them is logged at error
/// severity before the error is returned.
pub async fn release_all<I>(
    resources: I,
    timeout: Duration,
    logger: LoggerRef,
) -> Result<(), ReleaseError>
where
    I: IntoIterator<Item = CloseableRef>,
{
    let tasks: Vec<ReleaseTask> = resources
        .into_iter()
        .enumerate()
        .map(|(index, resource)| {
            let label = resource.describe();
            ReleaseTask {
                index,
                resource,
                label,
            }
        })
        .collect();

    if tasks.is_empty() {
        return Ok(());
    }

    let started = Instant::now();
    let result = release_batch(tasks, timeout, &logger).await;
    emit!(ReleaseBatchDuration {
        duration: started.elapsed(),
    });
    result
}

async fn release_batch(
    tasks: Vec<ReleaseTask>,
    timeout: Duration,
    logger: &LoggerRef,
) -> Result<(), ReleaseError> {
    let mut remaining = tasks.len();
    let (done_tx, mut done_rx) = mpsc::channel::<usize>(remaining);
    let mut pending: BTreeMap<usize, ResourceLabel> = BTreeMap::new();

    for task in tasks {
        pending.insert(task.index, task.label.clone());
        tokio::spawn(close_one(task, done_tx.clone(), LoggerRef::clone(logger)));
    }
    // Only the attempts hold senders now, so the channel closes if they all
    // vanish without reporting.
    drop(done_tx);

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            // Completions already queued at the deadline still count.
            biased;

            done = done_rx.recv() => match done {
                Some(index) => {
                    if pending.remove(&index).is_some() {
                        remaining -= 1;
                    }
                    emit!(ResourceReleased { remaining });
                    logger.debug(format_args!("{remaining} object(s) left"));
                    if remaining == 0 && pending.is_empty() {
                        logger.debug(format_args!("Finished closing objects"));
                        return Ok(());
                    }
                }
                None => {
                    logger.warn(format_args!(
                        "{remaining} object(s) remaining but release tasks were dropped."
                    ));
                    return Err(unresolved(pending, timeout, logger));
                }
            },
            _ = &mut deadline => {
                logger.warn(format_args!(
                    "{remaining} object(s) remaining but timer expired."
                ));
                return Err(unresolved(pending, timeout, logger));
            }
        }
    }
}

async fn close_one(task: ReleaseTask, done: mpsc::Sender<usize>, logger: LoggerRef) {
    let ReleaseTask {
        index,
        resource,
        label,
    } = task;

    let outcome = AssertUnwindSafe(resource.close()).catch_unwind().await;
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            emit!(ResourceReleaseFailed);
            logger.error(format_args!("Error closing {label}: {err}"));
        }
        Err(panic) => {
            emit!(ResourceReleaseFailed);
            logger.error(format_args!(
                "Panic while closing {label}: {}",
                panic_message(&*panic)
            ));
        }
    }

    // Capacity equals the batch size and each attempt sends once, so this
    // never waits. A closed receiver means the batch already timed out.
    let _ = done.send(index).await;
}

fn unresolved(
    pending: BTreeMap<usize, ResourceLabel>,
    timeout: Duration,
    logger: &LoggerRef,
) -> ReleaseError {
    let unresolved: Vec<ResourceLabel> = pending.into_values().collect();
    for label in &unresolved {
        logger.error(format_args!("Failed to close: {label}"));
    }
    emit!(ReleaseBatchTimedOut {
        unresolved: unresolved.len(),
    });
    ReleaseError::Timeout {
        timeout,
        unresolved,
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}
