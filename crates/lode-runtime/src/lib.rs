//! Worker pool with two priority lanes, plus cooperative cancellation.
#![forbid(unsafe_code)]

mod cancel;
mod manual;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TryRecvError, select, unbounded};
use rayon::{ThreadPool, ThreadPoolBuilder};
use thiserror::Error;

pub use cancel::CancelToken;
pub use manual::ManualPool;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Priority {
    High,
    Low,
}

/// Something that runs tasks off the calling thread.
pub trait TaskPool: Send + Sync {
    fn submit(&self, task: Task, priority: Priority);

    fn worker_count(&self) -> usize;
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Snapshot of the pool's queue depths.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolCounts {
    pub queued_high: usize,
    pub queued_low: usize,
    pub inflight: usize,
}

#[derive(Default)]
struct Counters {
    q_high: AtomicUsize,
    q_low: AtomicUsize,
    inflight: AtomicUsize,
}

/// Rayon-backed pool. Every worker drains the high lane before touching the
/// low one and parks on both when idle.
pub struct Runtime {
    tx_high: Sender<Task>,
    tx_low: Sender<Task>,
    counters: Arc<Counters>,
    workers: usize,
    _pool: Arc<ThreadPool>,
}

/// Machine parallelism, falling back to 4 when unknown.
pub fn available_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn run_task(task: Task, lane: Priority, counters: &Counters) {
    let queued = match lane {
        Priority::High => &counters.q_high,
        Priority::Low => &counters.q_low,
    };
    queued.fetch_sub(1, Ordering::Relaxed);
    counters.inflight.fetch_add(1, Ordering::Relaxed);
    if catch_unwind(AssertUnwindSafe(task)).is_err() {
        log::error!(target: "runtime", "{:?} task panicked", lane);
    }
    counters.inflight.fetch_sub(1, Ordering::Relaxed);
}

fn worker_loop(high: Receiver<Task>, low: Receiver<Task>, counters: Arc<Counters>) {
    loop {
        match high.try_recv() {
            Ok(task) => {
                run_task(task, Priority::High, &counters);
                continue;
            }
            Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }
        match low.try_recv() {
            Ok(task) => {
                run_task(task, Priority::Low, &counters);
                continue;
            }
            Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }
        select! {
            recv(high) -> res => match res {
                Ok(task) => run_task(task, Priority::High, &counters),
                Err(_) => break,
            },
            recv(low) -> res => match res {
                Ok(task) => run_task(task, Priority::Low, &counters),
                Err(_) => break,
            },
        }
    }
}

impl Runtime {
    pub fn new(workers: usize) -> Result<Self, RuntimeError> {
        let workers = workers.max(1);
        let (tx_high, rx_high) = unbounded::<Task>();
        let (tx_low, rx_low) = unbounded::<Task>();
        let counters = Arc::new(Counters::default());
        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("lode-mesh-{i}"))
                .build()?,
        );
        for _ in 0..workers {
            let high = rx_high.clone();
            let low = rx_low.clone();
            let counters = counters.clone();
            pool.spawn(move || worker_loop(high, low, counters));
        }
        log::info!(target: "runtime", "started {} mesh workers", workers);
        Ok(Self {
            tx_high,
            tx_low,
            counters,
            workers,
            _pool: pool,
        })
    }

    pub fn counts(&self) -> PoolCounts {
        PoolCounts {
            queued_high: self.counters.q_high.load(Ordering::Relaxed),
            queued_low: self.counters.q_low.load(Ordering::Relaxed),
            inflight: self.counters.inflight.load(Ordering::Relaxed),
        }
    }
}

impl TaskPool for Runtime {
    fn submit(&self, task: Task, priority: Priority) {
        let (tx, queued) = match priority {
            Priority::High => (&self.tx_high, &self.counters.q_high),
            Priority::Low => (&self.tx_low, &self.counters.q_low),
        };
        queued.fetch_add(1, Ordering::Relaxed);
        if tx.send(task).is_err() {
            queued.fetch_sub(1, Ordering::Relaxed);
        }
    }

    fn worker_count(&self) -> usize {
        self.workers
    }
}

impl<P: TaskPool + ?Sized> TaskPool for Arc<P> {
    fn submit(&self, task: Task, priority: Priority) {
        (**self).submit(task, priority)
    }

    fn worker_count(&self) -> usize {
        (**self).worker_count()
    }
}
