//! Task and statistics types for the weather background scheduler queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Prefetch,
    Analysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

pub(super) fn dedup_key(kind: TaskKind, region: &str, years: &[i32]) -> String {
    let mut years = years.to_vec();
    years.sort_unstable();
    format!("{kind:?}:{region}:{years:?}")
}

#[derive(Debug, Clone)]
pub(super) struct QueuedTask {
    pub id: TaskId,
    pub kind: TaskKind,
    pub region: String,
    pub years: Vec<i32>,
    /// 1 = highest precedence, 3 = lowest.
    pub priority: u8,
    pub attempts: u32,
    pub next_run_at: DateTime<Utc>,
    pub enqueued_at: DateTime<Utc>,
    pub dedup_key: String,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.enqueued_at == other.enqueued_at
    }
}
impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    /// `BinaryHeap` is a max-heap; we want lower `priority` values and
    /// earlier `enqueued_at` timestamps to pop first, so the comparison is
    /// inverted relative to natural field ordering.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.enqueued_at.cmp(&self.enqueued_at))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub total_tasks: u64,
    pub successful_tasks: u64,
    pub failed_tasks: u64,
    pub queue_size: usize,
    pub is_running: bool,
    pub is_paused: bool,
}
