//! Serve byte ranges from a file through a single-slot read-ahead cache.
//!
//! This crate coordinates a synchronously-populated cache window, at most one
//! in-flight background refill, and the handoff of refilled data back to the
//! execution context that owns the cache. A streaming consumer (e.g., an HTTP
//! response body producer) calls [`Reader::peek`] to serve bytes already
//! cached and [`Reader::request`] to schedule a refill at a new offset; the
//! completion callback fires later on the owner context with a zero-copy view
//! of the new window.
//!
//! Scheduling is an injected capability: [`Scheduler::run`] executes blocking
//! work on an independent context and [`Scheduler::defer`] schedules work back
//! onto the owner context. For production use, the `tokio` module provides a
//! scheduler backed by [Tokio](https://tokio.rs). For testing, the
//! `deterministic` module provides a scheduler with explicit task queues so
//! tests control exactly when background reads and completions run.
//!
//! # Example
//!
//! ```
//! use readahead::{deterministic, Reader};
//! use std::num::NonZeroUsize;
//!
//! let path = std::env::temp_dir().join("readahead_docs.bin");
//! std::fs::write(&path, b"hello, world").unwrap();
//!
//! let context = deterministic::Context::new();
//! let reader = Reader::new(context.clone(), &path, NonZeroUsize::new(8).unwrap()).unwrap();
//!
//! // The first window is primed synchronously at construction.
//! assert_eq!(reader.peek(0).unwrap().as_ref(), b"hello, w");
//!
//! // Later ranges are refilled in the background and delivered on the
//! // owner context.
//! reader
//!     .request(8, |result| {
//!         assert_eq!(result.unwrap().as_ref(), b"orld");
//!     })
//!     .unwrap();
//! context.run_until_idle();
//! ```

use bytes::Bytes;
use std::io::Error as IoError;
use thiserror::Error;

mod bridge;
pub mod deterministic;
mod reader;
mod refill;
mod slot;
pub mod tokio;

pub use reader::Reader;

/// Errors that can occur when interacting with a [Reader].
#[derive(Error, Debug)]
pub enum Error {
    /// The file could not be opened or primed. Fatal to construction.
    #[error("open failed: {0}")]
    OpenFailed(IoError),
    /// A refill is already in flight. The caller should retry once the
    /// pending request's callback has been delivered.
    #[error("already pending")]
    AlreadyPending,
    /// The background read failed or returned fewer bytes than the file
    /// size promised. Delivered through the pending request's callback.
    #[error("read failed")]
    ReadFailed,
}

/// A unit of work passed to a [Scheduler].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Completion callback invoked with the outcome of a [Reader::request].
pub type Callback = Box<dyn FnOnce(Result<Bytes, Error>) + Send + 'static>;

/// Capability to schedule work on behalf of a [Reader], injected at
/// construction.
///
/// Implementations must uphold one guarantee: tasks passed to [`Scheduler::defer`]
/// run serially on the execution context that owns the reader, never
/// concurrently with the owner's own calls into it. Tasks passed to
/// [`Scheduler::run`] may block and must not run on the owner context.
pub trait Scheduler: Clone + Send + Sync + 'static {
    /// Runs `task` on an execution context independent of the owner,
    /// suitable for blocking I/O.
    fn run(&self, task: Task);

    /// Schedules `task` to run later on the owner's execution context.
    fn defer(&self, task: Task);
}
