//! ABOUTME: Concurrency Executor: runs independently-ready DAG steps in parallel, fail-fast

use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use wave_core::{Result, WaveError};

/// A step eligible to run concurrently with its siblings.
pub struct ConcurrentStep {
    pub id: String,
    pub optional: bool,
}

pub type StepTask = Arc<dyn Fn(String, CancellationToken) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Run `steps` concurrently, bounded by `max_concurrency`. The first
/// non-optional failure cancels every sibling that hasn't started yet
/// (checked cooperatively via `CancellationToken`) and is returned as the
/// overall error; optional-step failures are logged and otherwise ignored.
pub async fn run_concurrent(steps: Vec<ConcurrentStep>, max_concurrency: usize, task: StepTask) -> Result<()> {
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let cancellation = CancellationToken::new();
    let mut handles = Vec::with_capacity(steps.len());

    for step in steps {
        let semaphore = semaphore.clone();
        let cancellation = cancellation.clone();
        let task = task.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("concurrency executor semaphore should never be closed");
            if cancellation.is_cancelled() {
                return (step.id, step.optional, Err(WaveError::Cancelled));
            }
            let result = task(step.id.clone(), cancellation.clone()).await;
            if result.is_err() && !step.optional {
                cancellation.cancel();
            }
            (step.id, step.optional, result)
        }));
    }

    let mut first_fatal: Option<WaveError> = None;
    for handle in handles {
        let (id, optional, result) = handle.await.map_err(|e| WaveError::Internal {
            message: format!("concurrency worker panicked: {e}"),
        })?;
        if let Err(err) = result {
            if optional {
                warn!(step_id = %id, error = %err, "optional step failed, continuing");
            } else if first_fatal.is_none() {
                first_fatal = Some(err);
            }
        }
    }

    match first_fatal {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
