//! Weather Background Scheduler (spec §4.5): an in-memory priority queue of
//! prefetch/analysis tasks drained by a bounded pool of workers, with
//! exponential backoff retry and a start/stop/pause/resume/destroy
//! lifecycle. Grounded in the teacher's `export::scheduler::CronScheduler`
//! shutdown-broadcast-channel idiom, generalized from cron ticks to a
//! priority-ordered work queue.

mod queue;
mod state;

pub use queue::{TaskKind, TaskId, SchedulerStats};
pub use state::SchedulerState;

use std::collections::BinaryHeap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{broadcast, RwLock, Semaphore};
use tracing::{info, warn};
use uuid::Uuid;

use crate::weather::{RetryPolicy, WeatherFetcher};
use queue::{QueuedTask, dedup_key};

/// Handle used by callers to enqueue tasks and control the scheduler's
/// lifecycle. Cloning shares the same underlying queue and worker pool.
#[derive(Clone)]
pub struct WeatherScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    queue: Mutex<BinaryHeap<QueuedTask>>,
    dedup: Mutex<std::collections::HashSet<String>>,
    stats: Mutex<SchedulerStats>,
    state: RwLock<SchedulerState>,
    semaphore: Semaphore,
    fetcher: Arc<dyn WeatherFetcher>,
    retry_policy: RetryPolicy,
    max_concurrent_tasks: usize,
    retry_attempts: u32,
    shutdown_tx: broadcast::Sender<()>,
}

impl WeatherScheduler {
    pub fn new(fetcher: Arc<dyn WeatherFetcher>, max_concurrent_tasks: usize, retry_policy: RetryPolicy) -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);
        let retry_attempts = retry_policy.attempts;
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(BinaryHeap::new()),
                dedup: Mutex::new(std::collections::HashSet::new()),
                stats: Mutex::new(SchedulerStats::default()),
                state: RwLock::new(SchedulerState::Stopped),
                semaphore: Semaphore::new(max_concurrent_tasks.max(1)),
                fetcher,
                retry_policy,
                max_concurrent_tasks: max_concurrent_tasks.max(1),
                retry_attempts,
                shutdown_tx,
            }),
        }
    }

    /// Enqueues a task, deduplicated by `(type, region, years)`. Returns
    /// `None` if an equivalent task is already queued.
    pub fn enqueue(&self, kind: TaskKind, region: String, years: Vec<i32>, priority: u8) -> Option<TaskId> {
        let key = dedup_key(kind, &region, &years);
        let mut dedup = self.inner.dedup.lock();
        if dedup.contains(&key) {
            return None;
        }
        dedup.insert(key.clone());
        drop(dedup);

        let id = TaskId(Uuid::new_v4());
        let task = QueuedTask {
            id,
            kind,
            region,
            years,
            priority: priority.clamp(1, 3),
            attempts: 0,
            next_run_at: Utc::now(),
            enqueued_at: Utc::now(),
            dedup_key: key,
        };
        self.inner.queue.lock().push(task);
        self.inner.stats.lock().total_tasks += 1;
        Some(id)
    }

    /// Starts the worker loop. Idempotent: calling `start` while already
    /// running is a no-op.
    pub async fn start(&self) {
        {
            let mut state = self.inner.state.write().await;
            if *state == SchedulerState::Running {
                return;
            }
            *state = SchedulerState::Running;
        }

        let inner = Arc::clone(&self.inner);
        let mut shutdown_rx = self.inner.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut tick = tokio::time::interval(std::time::Duration::from_millis(200));
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        Self::drain_ready_tasks(&inner).await;
                    }
                    _ = shutdown_rx.recv() => {
                        info!("weather scheduler worker loop shutting down");
                        break;
                    }
                }
            }
        });

        info!("weather scheduler started");
    }

    async fn drain_ready_tasks(inner: &Arc<Inner>) {
        if *inner.state.read().await != SchedulerState::Running {
            return;
        }

        loop {
            let next_ready = {
                let mut queue = inner.queue.lock();
                match queue.peek() {
                    Some(task) if task.next_run_at <= Utc::now() => queue.pop(),
                    _ => None,
                }
            };

            let Some(task) = next_ready else { break };

            let permit = match inner.semaphore.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    inner.queue.lock().push(task);
                    break;
                }
            };

            let inner = Arc::clone(inner);
            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_task(&inner, task).await;
            });
        }
    }

    async fn execute_task(inner: &Arc<Inner>, mut task: QueuedTask) {
        let year = task.years.first().copied().unwrap_or_else(|| Utc::now().year());
        let result = inner.fetcher.fetch(&task.region, year, None).await;

        match result {
            Ok(_) => {
                inner.stats.lock().successful_tasks += 1;
                inner.dedup.lock().remove(&task.dedup_key);
            }
            Err(err) => {
                task.attempts += 1;
                if task.attempts >= inner.retry_attempts {
                    warn!(
                        region = %task.region,
                        attempts = task.attempts,
                        error = %err,
                        "weather scheduler task exhausted retries, dropping"
                    );
                    inner.stats.lock().failed_tasks += 1;
                    inner.dedup.lock().remove(&task.dedup_key);
                } else {
                    let delay = inner.retry_policy.delay_for_attempt(task.attempts);
                    task.next_run_at = Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default();
                    inner.queue.lock().push(task);
                }
            }
        }
    }

    /// Stops the worker loop; any in-flight tasks are allowed to finish.
    pub async fn stop(&self) {
        *self.inner.state.write().await = SchedulerState::Stopped;
        let _ = self.inner.shutdown_tx.send(());
    }

    /// Workers finish their current task, then idle until `resume`.
    pub async fn pause(&self) {
        let mut state = self.inner.state.write().await;
        if *state == SchedulerState::Running {
            *state = SchedulerState::Paused;
        }
    }

    pub async fn resume(&self) {
        let mut state = self.inner.state.write().await;
        if *state == SchedulerState::Paused {
            *state = SchedulerState::Running;
        }
    }

    /// Drains the queue and releases the underlying fetcher handle.
    pub async fn destroy(&self) {
        *self.inner.state.write().await = SchedulerState::Destroyed;
        let _ = self.inner.shutdown_tx.send(());
        self.inner.queue.lock().clear();
        self.inner.dedup.lock().clear();
    }

    pub async fn stats(&self) -> SchedulerStats {
        let mut stats = self.inner.stats.lock().clone();
        stats.queue_size = self.inner.queue.lock().len();
        stats.is_running = *self.inner.state.read().await == SchedulerState::Running;
        stats.is_paused = *self.inner.state.read().await == SchedulerState::Paused;
        stats
    }

    pub fn max_concurrent_tasks(&self) -> usize {
        self.inner.max_concurrent_tasks
    }
}

use chrono::Datelike;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WeatherAnalysis;
    use crate::error::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFetcher {
        calls: AtomicUsize,
        fail_first_n: usize,
    }

    #[async_trait]
    impl WeatherFetcher for CountingFetcher {
        async fn fetch(
            &self,
            _region_token: &str,
            _year: i32,
            _vineyard_alias: Option<&str>,
        ) -> Result<Option<WeatherAnalysis>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first_n {
                return Err(crate::error::CellarError::ServiceUnavailable("down".to_string()));
            }
            Ok(None)
        }
    }

    #[test]
    fn dedup_prevents_enqueuing_equivalent_tasks() {
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            fail_first_n: 0,
        });
        let scheduler = WeatherScheduler::new(fetcher, 2, RetryPolicy::default());
        let first = scheduler.enqueue(TaskKind::Prefetch, "bordeaux".to_string(), vec![2015], 1);
        let second = scheduler.enqueue(TaskKind::Prefetch, "bordeaux".to_string(), vec![2015], 1);
        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn start_stop_transitions_state() {
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            fail_first_n: 0,
        });
        let scheduler = WeatherScheduler::new(fetcher, 2, RetryPolicy::default());
        scheduler.start().await;
        assert!(scheduler.stats().await.is_running);
        scheduler.pause().await;
        assert!(scheduler.stats().await.is_paused);
        scheduler.resume().await;
        assert!(scheduler.stats().await.is_running);
        scheduler.stop().await;
    }
}
