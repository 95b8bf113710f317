//! Scheduler lifecycle state machine (§4.5).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
    /// Workers finish their current task, then idle until `resume`.
    Paused,
    /// Terminal: the queue has been drained and the fetcher handle released.
    Destroyed,
}
