use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info};

use super::client::DownloadOutcome;
use crate::core::progress::{SharedProgress, StageProgress};

/// Split `items` into at most `workers` contiguous batches of
/// `ceil(len / workers)` items each. Order is preserved.
pub fn split_into_batches<T>(items: Vec<T>, workers: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let workers = workers.max(1);
    let batch_size = items.len().div_ceil(workers);

    let mut batches = Vec::with_capacity(workers);
    let mut current = Vec::with_capacity(batch_size);
    for item in items {
        current.push(item);
        if current.len() == batch_size {
            batches.push(std::mem::replace(&mut current, Vec::with_capacity(batch_size)));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Per-stage tally of fetch outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: Vec<DownloadOutcome>,
}

impl BatchReport {
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty() && self.succeeded == self.total
    }

    fn record(&mut self, outcome: DownloadOutcome) {
        if outcome.is_ok() {
            self.succeeded += 1;
        } else {
            self.failed.push(outcome);
        }
    }
}

/// Runs a stage's work items on a fixed number of workers.
///
/// Items are partitioned into contiguous batches, one tokio task per batch,
/// each walking its batch sequentially. Individual failures are tallied in the
/// [`BatchReport`]; they never abort the stage.
#[derive(Debug, Clone, Copy)]
pub struct BatchScheduler {
    workers: usize,
}

impl BatchScheduler {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Process `items` with `job`, reporting progress under `stage`.
    ///
    /// Emits 0.0 up front and 1.0 exactly once when every batch is done,
    /// including for an empty item list.
    pub async fn run<T, F, Fut>(
        &self,
        stage: &str,
        items: Vec<T>,
        progress: SharedProgress,
        job: F,
    ) -> BatchReport
    where
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DownloadOutcome> + Send + 'static,
    {
        let total = items.len();
        let tracker = StageProgress::start(stage, total, progress);
        let batches = split_into_batches(items, self.workers);
        info!(
            "{}: {} items across {} batches ({} workers)",
            stage,
            total,
            batches.len(),
            self.workers
        );

        let job = Arc::new(job);
        let mut set = JoinSet::new();
        for batch in batches {
            let job = job.clone();
            let tracker = tracker.clone();
            set.spawn(async move {
                let mut outcomes = Vec::with_capacity(batch.len());
                for item in batch {
                    let outcome = job(item).await;
                    tracker.tick();
                    outcomes.push(outcome);
                }
                outcomes
            });
        }

        let mut report = BatchReport {
            total,
            ..Default::default()
        };
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcomes) => outcomes.into_iter().for_each(|o| report.record(o)),
                Err(e) => error!("{}: worker aborted: {}", stage, e),
            }
        }

        tracker.finish();
        if !report.failed.is_empty() {
            info!(
                "{}: {} of {} items failed",
                stage,
                report.failed.len(),
                total
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn batches_are_contiguous_and_ceil_sized() {
        let batches = split_into_batches((0..10).collect(), 4);
        assert_eq!(batches, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8], vec![9]]);
    }

    #[test]
    fn fewer_items_than_workers() {
        let batches = split_into_batches(vec!['a', 'b'], 8);
        assert_eq!(batches, vec![vec!['a'], vec!['b']]);
    }

    #[test]
    fn zero_workers_means_one_batch() {
        let batches = split_into_batches(vec![1, 2, 3], 0);
        assert_eq!(batches, vec![vec![1, 2, 3]]);
    }

    #[test]
    fn empty_input_has_no_batches() {
        assert!(split_into_batches(Vec::<u8>::new(), 4).is_empty());
    }

    fn recording() -> (SharedProgress, Arc<Mutex<Vec<f32>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = events.clone();
        let sink: SharedProgress = Arc::new(move |_: &str, f: f32| {
            sink_events.lock().unwrap().push(f);
        });
        (sink, events)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn progress_is_monotonic_and_completes_once() {
        let (sink, events) = recording();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let report = BatchScheduler::new(4)
            .run("Installing Assets", (0..37).collect(), sink, move |i: u32| {
                let counter = counter.clone();
                async move {
                    tokio::task::yield_now().await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    if i % 10 == 3 {
                        DownloadOutcome::HttpError(500)
                    } else {
                        DownloadOutcome::Success
                    }
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 37);
        assert_eq!(report.total, 37);
        assert_eq!(report.succeeded, 33);
        assert_eq!(report.failed.len(), 4);

        let events = events.lock().unwrap();
        assert_eq!(events.first(), Some(&0.0));
        assert!(events.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(events.iter().filter(|f| **f >= 1.0).count(), 1);
        assert_eq!(events.last(), Some(&1.0));
    }

    #[tokio::test]
    async fn empty_stage_still_reports_completion() {
        let (sink, events) = recording();
        let report = BatchScheduler::new(3)
            .run("Installing Runtime", Vec::<u8>::new(), sink, |_| async {
                DownloadOutcome::Success
            })
            .await;
        assert!(report.all_ok());
        assert_eq!(*events.lock().unwrap(), vec![0.0, 1.0]);
    }
}
