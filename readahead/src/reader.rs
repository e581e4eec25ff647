use crate::{
    bridge::CompletionBridge,
    refill::{self, Outcome},
    slot::CacheSlot,
    Callback, Error, Scheduler,
};
use bytes::{Bytes, BytesMut};
use std::{
    fs::File,
    num::NonZeroUsize,
    path::Path,
    sync::{Arc, Mutex},
};
use tracing::{debug, trace};

/// The request outstanding while a refill is in flight. At most one exists
/// at any time; it is destroyed the instant its callback is delivered.
struct Pending {
    /// The offset the caller asked for, which becomes the new window start.
    offset: u64,
    /// Invoked exactly once with the outcome, on the owner context.
    callback: Callback,
}

/// State owned by the [Reader] and mutated only on the owner execution
/// context: directly by `peek`/`request`/`abort`, and via the deferred
/// completion scheduled by [CompletionBridge].
pub(crate) struct State {
    slot: CacheSlot,
    pending: Option<Pending>,
    /// Incremented on every request and abort. Completions carry the
    /// generation they were dispatched under; a mismatch means the request
    /// was aborted and the outcome must be discarded.
    generation: u64,
}

/// A single-slot read-ahead cache over one open file.
///
/// The reader holds a fixed-capacity window of the file in memory, primed at
/// offset 0 during construction. [Reader::peek] serves cached bytes
/// synchronously; on a miss, [Reader::request] invalidates the window and
/// schedules one background refill, delivering the new window to the given
/// callback on the owner context. At most one refill is in flight at a time;
/// an overlapping request fails with [Error::AlreadyPending] rather than
/// being queued.
///
/// The file is opened read-only and assumed externally immutable for the
/// reader's lifetime. Dropping the reader while a refill is in flight is
/// safe: the completion finds no reader to deliver to and is discarded.
pub struct Reader<S: Scheduler> {
    scheduler: S,
    file: Arc<File>,
    size: u64,
    capacity: NonZeroUsize,
    state: Arc<Mutex<State>>,
}

impl<S: Scheduler> Reader<S> {
    /// Opens `path` read-only and synchronously primes the cache with the
    /// first `min(capacity, size)` bytes of the file.
    ///
    /// Fails with [Error::OpenFailed] if the file cannot be opened, stat'd,
    /// or primed.
    pub fn new(scheduler: S, path: impl AsRef<Path>, capacity: NonZeroUsize) -> Result<Self, Error> {
        let file = File::open(path).map_err(Error::OpenFailed)?;
        let size = file.metadata().map_err(Error::OpenFailed)?.len();

        // Prime the window before any request can be issued.
        let chunk_len = std::cmp::min(capacity.get() as u64, size) as usize;
        let buf = refill::fill(&file, 0, chunk_len, BytesMut::with_capacity(chunk_len))
            .map_err(Error::OpenFailed)?;
        let mut slot = CacheSlot::new();
        slot.install(0, buf.freeze());

        Ok(Self {
            scheduler,
            file: Arc::new(file),
            size,
            capacity,
            state: Arc::new(Mutex::new(State {
                slot,
                pending: None,
                generation: 0,
            })),
        })
    }

    /// Returns the cached bytes starting at `offset`, or `None` on a miss
    /// (including whenever a refill is in flight).
    pub fn peek(&self, offset: u64) -> Option<Bytes> {
        self.state.lock().unwrap().slot.peek(offset)
    }

    /// Schedules a background refill of the window at `offset` and returns
    /// immediately.
    ///
    /// On success, `callback` is later invoked exactly once on the owner
    /// context with a view of `min(capacity, size - offset)` bytes (empty
    /// when `offset` is at or past end-of-file) or with
    /// [Error::ReadFailed]. While the refill is in flight the window is
    /// invalid and every [Reader::peek] misses.
    ///
    /// Fails with [Error::AlreadyPending] if a refill is already in flight;
    /// the rejected `callback` is dropped without being invoked and the
    /// outstanding request is unaffected.
    pub fn request(
        &self,
        offset: u64,
        callback: impl FnOnce(Result<Bytes, Error>) + Send + 'static,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        if state.pending.is_some() {
            return Err(Error::AlreadyPending);
        }

        // Stale data must never be served while the refill is in flight.
        state.slot.invalidate();

        let chunk_len = self.chunk_len(offset);
        let buf = state.slot.recycle(chunk_len);
        state.pending = Some(Pending {
            offset,
            callback: Box::new(callback),
        });
        state.generation += 1;
        let generation = state.generation;
        drop(state);

        let bridge = CompletionBridge::new(
            Arc::downgrade(&self.state),
            self.scheduler.clone(),
            generation,
        );
        let file = self.file.clone();
        debug!(offset, chunk_len, "refill started");
        self.scheduler.run(Box::new(move || {
            let result = refill::fill(&file, offset, chunk_len, buf);
            bridge.deliver(Outcome { offset, result });
        }));
        Ok(())
    }

    /// Cancels the in-flight refill, if any.
    ///
    /// The pending request's callback is dropped without being invoked, and
    /// a completion that arrives later is discarded. The window stays
    /// invalid until the next successful request.
    pub fn abort(&self) {
        let mut state = self.state.lock().unwrap();
        if state.pending.take().is_some() {
            state.generation += 1;
            debug!("pending refill aborted");
        }
    }

    /// Total size of the file in bytes, fixed at construction.
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Capacity of the cache window in bytes.
    pub const fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// How many bytes a window starting at `offset` holds: the full
    /// capacity, truncated at end-of-file.
    fn chunk_len(&self, offset: u64) -> usize {
        std::cmp::min(self.capacity.get() as u64, self.size.saturating_sub(offset)) as usize
    }
}

impl State {
    /// Completes the pending request with `outcome`. Driven by
    /// [CompletionBridge] on the owner context.
    pub(crate) fn complete(state: &Mutex<State>, generation: u64, outcome: Outcome) {
        let (callback, result) = {
            let mut state = state.lock().unwrap();
            if state.generation != generation {
                trace!(generation, "superseded completion discarded");
                return;
            }
            let Some(pending) = state.pending.take() else {
                trace!("no pending request, discarding completion");
                return;
            };
            let result = match outcome.result {
                Ok(buf) => {
                    let window = buf.freeze();
                    state.slot.install(outcome.offset, window.clone());
                    Ok(window)
                }
                Err(err) => {
                    debug!(?err, offset = pending.offset, "refill failed");
                    Err(Error::ReadFailed)
                }
            };
            (pending.callback, result)
        };

        // Invoke outside the lock so the callback can immediately peek or
        // issue the next request.
        callback(result);
    }
}
