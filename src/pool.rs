use std::future::Future;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::TaskError;

/// What became of one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl StageReport {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Done => self.succeeded += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
    }

    pub fn merge(&mut self, other: StageReport) {
        self.succeeded += other.succeeded;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Runs `worker` over `items` with at most `concurrency` tasks in flight and
/// waits for all of them. Results come back in input order; a task that panics
/// yields `Err` in its slot instead of tearing down the batch.
pub async fn run_bounded<I, T, F, Fut>(
    items: Vec<I>,
    concurrency: usize,
    mut worker: F,
) -> Vec<Result<T, TaskError>>
where
    F: FnMut(I) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let total = items.len();
    let concurrency = concurrency.max(1).min(total.max(1));
    let mut results: Vec<Option<Result<T, TaskError>>> = (0..total).map(|_| None).collect();
    let mut pending = items.into_iter().enumerate();
    let mut join_set = tokio::task::JoinSet::new();
    let mut done = 0usize;
    let started_at = Instant::now();
    let mut last_progress_log_at = started_at;

    loop {
        while join_set.len() < concurrency {
            let Some((idx, item)) = pending.next() else {
                break;
            };
            let fut = worker(item);
            join_set.spawn(async move {
                let joined = tokio::spawn(fut).await;
                (idx, joined.map_err(|err| TaskError::Panicked(err.to_string())))
            });
        }

        let Some(joined) = join_set.join_next().await else {
            break;
        };
        match joined {
            Ok((idx, result)) => results[idx] = Some(result),
            Err(err) => tracing::error!(?err, "worker pool task lost"),
        }

        done += 1;
        if done == total || last_progress_log_at.elapsed() >= Duration::from_secs(2) {
            tracing::info!(
                done,
                total,
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                "worker pool: progress"
            );
            last_progress_log_at = Instant::now();
        }
    }

    results
        .into_iter()
        .map(|slot| slot.unwrap_or(Err(TaskError::Lost)))
        .collect()
}
