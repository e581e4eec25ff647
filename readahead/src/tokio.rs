//! A production [Scheduler] backed by [Tokio](https://tokio.rs).
//!
//! [Context::new] pairs a cloneable scheduler with a [Driver]: background
//! reads go to tokio's blocking pool, while deferred completions are queued
//! onto a channel the driver drains. The task that runs the driver is the
//! owner execution context; every completion callback fires there, serially,
//! so that task should also be the one issuing `peek`/`request` calls.

use crate::{Scheduler, Task};
use futures::{channel::mpsc, StreamExt};
use tokio::runtime::Handle;
use tracing::warn;

/// A [Scheduler] bound to a tokio runtime.
#[derive(Clone)]
pub struct Context {
    runtime: Handle,
    deferred: mpsc::UnboundedSender<Task>,
}

impl Context {
    /// Creates a context bound to the current tokio runtime, along with the
    /// [Driver] that must run on the owner's task.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new() -> (Self, Driver) {
        let (sender, receiver) = mpsc::unbounded();
        (
            Self {
                runtime: Handle::current(),
                deferred: sender,
            },
            Driver { deferred: receiver },
        )
    }
}

impl Scheduler for Context {
    fn run(&self, task: Task) {
        self.runtime.spawn_blocking(task);
    }

    fn defer(&self, task: Task) {
        if self.deferred.unbounded_send(task).is_err() {
            warn!("driver gone, dropping deferred task");
        }
    }
}

/// Drains deferred tasks on the owner's task.
pub struct Driver {
    deferred: mpsc::UnboundedReceiver<Task>,
}

impl Driver {
    /// Runs deferred tasks as they arrive, returning once every [Context]
    /// clone has been dropped.
    pub async fn run(mut self) {
        while let Some(task) = self.deferred.next().await {
            task();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Reader;
    use rand::Rng as _;
    use std::{env, fs, num::NonZeroUsize};

    fn temp_file(contents: &[u8]) -> std::path::PathBuf {
        let mut rng = rand::thread_rng();
        let path = env::temp_dir().join(format!("readahead_tokio_{}", rng.gen::<u64>()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_request_delivered_via_driver() {
        let data: Vec<u8> = (0..100).map(|i| (i % 251) as u8).collect();
        let path = temp_file(&data);

        let (context, driver) = Context::new();
        let driver = tokio::spawn(driver.run());
        let reader = Reader::new(context, &path, NonZeroUsize::new(64).unwrap()).unwrap();

        assert_eq!(reader.peek(0).unwrap().as_ref(), &data[..64]);

        let (sender, receiver) = futures::channel::oneshot::channel();
        reader
            .request(64, move |result| {
                let _ = sender.send(result);
            })
            .unwrap();
        let chunk = receiver.await.unwrap().unwrap();
        assert_eq!(chunk.as_ref(), &data[64..100]);
        assert_eq!(reader.peek(64).unwrap().as_ref(), &data[64..100]);

        // Dropping the reader closes the channel and ends the driver.
        drop(reader);
        driver.await.unwrap();
    }

    #[tokio::test]
    async fn test_abort_via_driver() {
        let data = vec![7u8; 256];
        let path = temp_file(&data);

        let (context, driver) = Context::new();
        tokio::spawn(driver.run());
        let reader = Reader::new(context, &path, NonZeroUsize::new(64).unwrap()).unwrap();

        reader
            .request(64, |_| panic!("aborted callback must not run"))
            .unwrap();
        reader.abort();

        // A fresh request still completes after the abort.
        let (sender, receiver) = futures::channel::oneshot::channel();
        reader
            .request(128, move |result| {
                let _ = sender.send(result);
            })
            .unwrap();
        let chunk = receiver.await.unwrap().unwrap();
        assert_eq!(chunk.as_ref(), &data[128..192]);
    }
}
