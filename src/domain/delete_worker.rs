//! Asynchronous batch-delete pipeline.
//!
//! Delete requests are queued as [`DeleteTask`]s on a bounded channel and
//! processed by a background worker:
//!
//! 1. The codes of a task are partitioned across up to `max_workers` validation
//!    workers, each checking ownership and emitting owned codes on its own channel
//! 2. A fan-in stage drains every worker channel until all of them are closed
//! 3. If any code passed, exactly one `delete_batch` call is made
//!
//! Callers only learn that the request was accepted. Persistence failures are
//! logged and not retried.

use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};

use crate::domain::ownership::OwnershipValidator;
use crate::domain::repositories::UrlRepository;
use crate::error::AppError;

/// Tuning for the delete pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteSettings {
    /// Upper bound on validation workers per task.
    pub max_workers: usize,
    /// Capacity of the task queue.
    pub queue_capacity: usize,
    /// Tasks processed at the same time.
    pub task_concurrency: usize,
}

impl Default for DeleteSettings {
    fn default() -> Self {
        Self {
            max_workers: 4,
            queue_capacity: 1024,
            task_concurrency: 4,
        }
    }
}

/// Outcome of a processed task, reported to tracked submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub requested: usize,
    pub valid: usize,
    pub persisted: bool,
}

/// A queued delete request.
#[derive(Debug)]
pub struct DeleteTask {
    pub codes: Vec<String>,
    pub owner_id: String,
    done: Option<oneshot::Sender<DeleteReport>>,
}

/// Handle for submitting delete requests to the worker.
///
/// The worker stops once every clone of the queue has been dropped and the
/// tasks already accepted have finished.
#[derive(Debug, Clone)]
pub struct DeleteQueue {
    sender: mpsc::Sender<DeleteTask>,
}

impl DeleteQueue {
    /// Enqueues a delete request and returns once it is accepted.
    ///
    /// Waits for queue capacity when the queue is full. Empty code lists are
    /// accepted and dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::DeletionUnavailable`] if the worker has stopped.
    pub async fn submit(&self, codes: Vec<String>, owner_id: &str) -> Result<(), AppError> {
        if codes.is_empty() {
            return Ok(());
        }

        self.enqueue(DeleteTask {
            codes,
            owner_id: owner_id.to_string(),
            done: None,
        })
        .await
    }

    /// Enqueues a request and returns a receiver completed when it was processed.
    #[cfg(test)]
    pub(crate) async fn submit_tracked(
        &self,
        codes: Vec<String>,
        owner_id: &str,
    ) -> Result<oneshot::Receiver<DeleteReport>, AppError> {
        let (done, rx) = oneshot::channel();
        self.enqueue(DeleteTask {
            codes,
            owner_id: owner_id.to_string(),
            done: Some(done),
        })
        .await?;
        Ok(rx)
    }

    /// A queue whose worker has already stopped.
    #[cfg(test)]
    pub(crate) fn closed() -> Self {
        let (sender, _) = mpsc::channel(1);
        Self { sender }
    }

    async fn enqueue(&self, task: DeleteTask) -> Result<(), AppError> {
        self.sender
            .send(task)
            .await
            .map_err(|_| AppError::DeletionUnavailable)
    }
}

/// Starts the delete worker on the current runtime.
///
/// Returns the submission handle and the worker's join handle; awaiting the
/// latter after dropping every queue handle waits for pending deletions.
pub fn spawn_delete_worker<R>(
    repository: Arc<R>,
    settings: DeleteSettings,
) -> (DeleteQueue, JoinHandle<()>)
where
    R: UrlRepository + ?Sized + 'static,
{
    let (sender, rx) = mpsc::channel(settings.queue_capacity.max(1));
    let handle = tokio::spawn(run_delete_worker(rx, repository, settings));
    tracing::info!(
        max_workers = settings.max_workers,
        task_concurrency = settings.task_concurrency,
        "Delete worker started"
    );
    (DeleteQueue { sender }, handle)
}

/// Consumes delete tasks until the queue is closed.
pub async fn run_delete_worker<R>(
    mut rx: mpsc::Receiver<DeleteTask>,
    repository: Arc<R>,
    settings: DeleteSettings,
) where
    R: UrlRepository + ?Sized + 'static,
{
    let permits = Arc::new(Semaphore::new(settings.task_concurrency.max(1)));
    let mut in_flight = JoinSet::new();

    while let Some(task) = rx.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let repository = Arc::clone(&repository);
        let max_workers = settings.max_workers;

        in_flight.spawn(async move {
            let _permit = permit;
            let report =
                process_delete_task(repository, task.codes, &task.owner_id, max_workers).await;
            if let Some(done) = task.done {
                let _ = done.send(report);
            }
        });

        while in_flight.try_join_next().is_some() {}
    }

    while in_flight.join_next().await.is_some() {}
    tracing::info!("Delete worker stopped");
}

/// Validates ownership of `codes` concurrently, then soft-deletes the owned ones
/// in a single storage call.
pub async fn process_delete_task<R>(
    repository: Arc<R>,
    codes: Vec<String>,
    owner_id: &str,
    max_workers: usize,
) -> DeleteReport
where
    R: UrlRepository + ?Sized + 'static,
{
    let requested = codes.len();
    let validator = OwnershipValidator::new(Arc::clone(&repository));
    let valid = validate_in_parallel(&validator, codes, owner_id, max_workers).await;

    if valid.is_empty() {
        tracing::debug!(owner_id, requested, "No deletable URLs in batch");
        return DeleteReport {
            requested,
            valid: 0,
            persisted: false,
        };
    }

    let valid_count = valid.len();
    let persisted = match repository.delete_batch(valid, owner_id).await {
        Ok(()) => {
            tracing::info!(owner_id, requested, valid_count, "Deleted URLs batch");
            true
        }
        Err(e) => {
            tracing::error!(
                owner_id,
                requested,
                valid_count,
                error = %e,
                "Failed to delete URLs batch"
            );
            false
        }
    };

    DeleteReport {
        requested,
        valid: valid_count,
        persisted,
    }
}

/// Fan-out/fan-in ownership validation.
///
/// Codes are dealt round-robin to `min(max_workers, codes.len())` workers. The
/// result is only returned after every worker channel has closed and every
/// worker has been joined; its order is unspecified. Codes handled by a worker
/// that panics count as not owned.
async fn validate_in_parallel<R>(
    validator: &OwnershipValidator<R>,
    codes: Vec<String>,
    owner_id: &str,
    max_workers: usize,
) -> Vec<String>
where
    R: UrlRepository + ?Sized + 'static,
{
    if codes.is_empty() {
        return Vec::new();
    }

    let workers = max_workers.clamp(1, codes.len());
    let mut partitions: Vec<Vec<String>> = vec![Vec::new(); workers];
    for (i, code) in codes.into_iter().enumerate() {
        partitions[i % workers].push(code);
    }

    let mut outputs = Vec::with_capacity(workers);
    let mut checkers = JoinSet::new();
    for partition in partitions {
        let (tx, rx) = mpsc::channel(partition.len().max(1));
        let validator = validator.clone();
        let owner_id = owner_id.to_string();

        checkers.spawn(async move {
            for code in partition {
                if validator.is_owned(&code, &owner_id).await && tx.send(code).await.is_err() {
                    break;
                }
            }
        });

        outputs.push(rx);
    }

    let mut valid = Vec::new();
    for mut rx in outputs {
        while let Some(code) = rx.recv().await {
            valid.push(code);
        }
    }

    // A panicked checker only loses its own partition.
    while let Some(joined) = checkers.join_next().await {
        if let Err(e) = joined {
            tracing::error!(owner_id, error = %e, "Ownership check worker failed");
        }
    }
    valid
}
