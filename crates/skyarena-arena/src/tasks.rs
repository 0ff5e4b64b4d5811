//! Recurring rule tasks, armed after each reset and cleared on shutdown.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::logic::RecurringTask;

const MIN_TASK_PERIOD: Duration = Duration::from_millis(1);

/// The arena's armed recurring tasks. Dropping the set cancels them.
pub struct TaskSet {
    runtime: Handle,
    running: Vec<(String, JoinHandle<()>)>,
}

impl TaskSet {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            running: Vec::new(),
        }
    }

    /// Arm `task`: first run after `grace`, then every `task.period`.
    pub fn schedule(&mut self, task: RecurringTask, grace: Duration) {
        let RecurringTask {
            name,
            period,
            mut job,
        } = task;
        let period = period.max(MIN_TASK_PERIOD);

        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(grace).await;
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                job();
            }
        });

        debug!(task = %name, ?period, ?grace, "recurring task armed");
        self.running.push((name, handle));
    }

    /// Cancel every armed task.
    pub fn clear(&mut self) {
        for (name, handle) in self.running.drain(..) {
            handle.abort();
            debug!(task = %name, "recurring task cancelled");
        }
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.running.iter().map(|(name, _)| name.as_str())
    }
}

impl Drop for TaskSet {
    fn drop(&mut self) {
        self.clear();
    }
}
