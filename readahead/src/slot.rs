use bytes::{Bytes, BytesMut};

/// A fixed-capacity cache over one contiguous byte range of the file.
///
/// When valid, `window` holds exactly the bytes of the file in
/// `[window_start, window_start + window.len())`. The slot is invalidated
/// before every refill so stale data is never served as a hit.
pub(crate) struct CacheSlot {
    /// The cached bytes, frozen for zero-copy views.
    window: Bytes,
    /// Byte offset of `window[0]` within the file.
    window_start: u64,
    /// Whether `window` reflects the file. False while a refill is in flight.
    valid: bool,
}

impl CacheSlot {
    pub fn new() -> Self {
        Self {
            window: Bytes::new(),
            window_start: 0,
            valid: false,
        }
    }

    /// Returns the cached bytes from `offset` to the end of the window, or
    /// `None` on a miss (invalid slot, offset before the window, or offset at
    /// or past the window end).
    pub fn peek(&self, offset: u64) -> Option<Bytes> {
        if !self.valid || offset < self.window_start {
            return None;
        }
        let relative = offset - self.window_start;
        if relative >= self.window.len() as u64 {
            return None;
        }
        Some(self.window.slice(relative as usize..))
    }

    /// Replaces the window contents and marks the slot valid.
    pub fn install(&mut self, window_start: u64, window: Bytes) {
        self.window = window;
        self.window_start = window_start;
        self.valid = true;
    }

    /// Marks the slot invalid; every subsequent [CacheSlot::peek] misses
    /// until the next [CacheSlot::install].
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Releases the window buffer for reuse by a refill.
    ///
    /// Reuses the existing allocation when uniquely owned. If consumers still
    /// hold views from previous peeks, allocates a replacement and leaves the
    /// old memory alive until those views are dropped.
    pub fn recycle(&mut self, min_capacity: usize) -> BytesMut {
        let window = std::mem::take(&mut self.window);
        match window.try_into_mut() {
            Ok(mut reusable) if reusable.capacity() >= min_capacity => {
                reusable.clear();
                reusable
            }
            Ok(_) | Err(_) => BytesMut::with_capacity(min_capacity),
        }
    }
}
