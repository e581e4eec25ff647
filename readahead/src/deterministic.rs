//! A deterministic [Scheduler] for tests.
//!
//! Instead of executing work, the context queues it: background tasks and
//! deferred tasks land in separate FIFO queues, and the test decides when
//! (and whether) each queue drains. This makes every interleaving of
//! refills, completions, aborts, and new requests reproducible without
//! threads or timing.
//!
//! # Example
//!
//! ```
//! use readahead::{deterministic::Context, Scheduler};
//! use std::sync::{
//!     atomic::{AtomicUsize, Ordering},
//!     Arc,
//! };
//!
//! let context = Context::new();
//! let ran = Arc::new(AtomicUsize::new(0));
//! let task = ran.clone();
//! context.run(Box::new(move || {
//!     task.fetch_add(1, Ordering::SeqCst);
//! }));
//!
//! // Nothing happens until the test releases the queue.
//! assert_eq!(ran.load(Ordering::SeqCst), 0);
//! assert_eq!(context.run_background(), 1);
//! assert_eq!(ran.load(Ordering::SeqCst), 1);
//! ```

use crate::{Scheduler, Task};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

#[derive(Default)]
struct Queues {
    background: VecDeque<Task>,
    deferred: VecDeque<Task>,
}

/// A [Scheduler] that queues work until the test releases it.
///
/// Clones share the same queues. The thread calling [Context::run_deferred]
/// plays the role of the owner execution context.
#[derive(Clone, Default)]
pub struct Context {
    queues: Arc<Mutex<Queues>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executes queued background tasks, including any enqueued while
    /// draining, and returns how many ran.
    pub fn run_background(&self) -> usize {
        let mut executed = 0;
        loop {
            // Pop one task at a time and release the lock before executing,
            // since tasks enqueue more work.
            let task = self.queues.lock().unwrap().background.pop_front();
            let Some(task) = task else {
                break;
            };
            task();
            executed += 1;
        }
        executed
    }

    /// Executes queued deferred tasks, including any enqueued while
    /// draining, and returns how many ran.
    pub fn run_deferred(&self) -> usize {
        let mut executed = 0;
        loop {
            let task = self.queues.lock().unwrap().deferred.pop_front();
            let Some(task) = task else {
                break;
            };
            task();
            executed += 1;
        }
        executed
    }

    /// Alternates between both queues until no task remains.
    pub fn run_until_idle(&self) {
        loop {
            if self.run_background() == 0 && self.run_deferred() == 0 {
                break;
            }
        }
    }
}

impl Scheduler for Context {
    fn run(&self, task: Task) {
        self.queues.lock().unwrap().background.push_back(task);
    }

    fn defer(&self, task: Task) {
        self.queues.lock().unwrap().deferred.push_back(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_queues_are_independent() {
        let context = Context::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let log = order.clone();
        context.run(Box::new(move || log.lock().unwrap().push("background")));
        let log = order.clone();
        context.defer(Box::new(move || log.lock().unwrap().push("deferred")));

        // Draining one queue leaves the other untouched.
        assert_eq!(context.run_deferred(), 1);
        assert_eq!(order.lock().unwrap().as_slice(), &["deferred"]);
        assert_eq!(context.run_background(), 1);
        assert_eq!(order.lock().unwrap().as_slice(), &["deferred", "background"]);
    }

    #[test]
    fn test_tasks_run_in_fifo_order() {
        let context = Context::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let log = order.clone();
            context.defer(Box::new(move || log.lock().unwrap().push(i)));
        }
        assert_eq!(context.run_deferred(), 3);
        assert_eq!(order.lock().unwrap().as_slice(), &[0, 1, 2]);
    }

    #[test]
    fn test_tasks_can_enqueue_tasks() {
        let context = Context::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let chained = context.clone();
        let counter = ran.clone();
        context.run(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let counter = counter.clone();
            chained.defer(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }));

        context.run_until_idle();
        assert_eq!(ran.load(Ordering::SeqCst), 2);
    }
}
