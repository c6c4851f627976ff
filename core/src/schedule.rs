//! One-shot deferred tasks.
//!
//! Used for the error auto-hide. There is no cancellation: a task that fires
//! after its target changed simply re-applies its effect.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tracing::warn;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub trait Scheduler: Send + Sync {
    /// Run `task` once, no earlier than `delay` from now.
    fn schedule_once(&self, delay: Duration, task: Task);
}

/// Runs each task on its own sleeping thread. If the OS refuses the thread,
/// the task is dropped and a warning is logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadScheduler;

impl Scheduler for ThreadScheduler {
    fn schedule_once(&self, delay: Duration, task: Task) {
        let spawned = std::thread::Builder::new()
            .name("cep-error-hide".to_string())
            .spawn(move || {
                std::thread::sleep(delay);
                task();
            });
        // The task is dropped with the closure, so the element stays shown.
        if let Err(e) = spawned {
            warn!(error = %e, ?delay, "could not start the error auto-hide timer");
        }
    }
}

/// Queues tasks until the host drains them, for hosts that own an event loop.
#[derive(Default)]
pub struct QueuedScheduler {
    queue: Mutex<Vec<(Duration, Task)>>,
}

impl QueuedScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Delays of the queued tasks, in scheduling order.
    pub fn delays(&self) -> Vec<Duration> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(delay, _)| *delay)
            .collect()
    }

    /// Run every queued task in scheduling order. Returns how many ran.
    pub fn run_all(&self) -> usize {
        let tasks = std::mem::take(&mut *self.queue.lock().unwrap_or_else(PoisonError::into_inner));
        let count = tasks.len();
        for (_, task) in tasks {
            task();
        }
        count
    }
}

impl Scheduler for QueuedScheduler {
    fn schedule_once(&self, delay: Duration, task: Task) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((delay, task));
    }
}
