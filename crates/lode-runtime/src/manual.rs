use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::PoisonError;

use crate::{Priority, Task, TaskPool};

/// Pool that only runs tasks when asked. High-priority tasks go first.
/// Used for deterministic tests and single-threaded tools.
pub struct ManualPool {
    lanes: Mutex<(VecDeque<Task>, VecDeque<Task>)>,
    workers: usize,
}

impl ManualPool {
    /// `workers` is what the pool reports to schedulers sizing their parallelism.
    pub fn new(workers: usize) -> Self {
        Self {
            lanes: Mutex::new((VecDeque::new(), VecDeque::new())),
            workers: workers.max(1),
        }
    }

    fn pop(&self) -> Option<Task> {
        let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
        lanes.0.pop_front().or_else(|| lanes.1.pop_front())
    }

    /// Runs one task. The lock is released before the task runs so it may submit more.
    pub fn run_next(&self) -> bool {
        match self.pop() {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Runs until both lanes are empty, including tasks submitted along the way.
    pub fn run_all(&self) -> usize {
        let mut n = 0;
        while self.run_next() {
            n += 1;
        }
        n
    }

    /// `(high, low)` queue lengths.
    pub fn pending(&self) -> (usize, usize) {
        let lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
        (lanes.0.len(), lanes.1.len())
    }
}

impl TaskPool for ManualPool {
    fn submit(&self, task: Task, priority: Priority) {
        let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
        match priority {
            Priority::High => lanes.0.push_back(task),
            Priority::Low => lanes.1.push_back(task),
        }
    }

    fn worker_count(&self) -> usize {
        self.workers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn high_lane_runs_first() {
        let pool = ManualPool::new(2);
        let order = Arc::new(Mutex::new(Vec::new()));
        for (tag, prio) in [("low", Priority::Low), ("high", Priority::High)] {
            let order = order.clone();
            pool.submit(Box::new(move || order.lock().unwrap().push(tag)), prio);
        }
        assert_eq!(pool.pending(), (1, 1));
        assert_eq!(pool.run_all(), 2);
        assert_eq!(*order.lock().unwrap(), vec!["high", "low"]);
    }
}
