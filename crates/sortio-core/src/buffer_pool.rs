use std::collections::VecDeque;
use std::sync::Mutex;

/// Fixed-capacity byte buffer, one of the `B` slots in a [`BufferPool`].
///
/// Allocated once at pool construction and zero-initialized; its contents
/// are overwritten in place by the Reader and read in place by the
/// Transferrer, never reallocated.
pub struct Buffer {
    data: Vec<u8>,
}

impl Buffer {
    fn zeroed(capacity: usize) -> Self {
        Self { data: vec![0u8; capacity] }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }
}

struct Inner {
    buffers: Vec<Buffer>,
    empty: VecDeque<usize>,
    full: VecDeque<usize>,
    /// Valid byte count of each buffer while it sits on `full` — a file
    /// rarely fills a buffer to its `file_size_max` capacity, so the
    /// Transferrer needs this to avoid sending trailing zero padding.
    valid_len: Vec<usize>,
}

/// Bounded producer/consumer buffer pool shared by the Read thread
/// (producer) and the Transfer thread (consumer) on one IO host (§4.1).
///
/// All bookkeeping runs under a single mutex; `peek_full_prefix` holds the
/// lock across its whole scan so the coalescing it performs sees a
/// consistent prefix of `full` (§9, "coalescing under a lock" — do not
/// relax this to a per-pop lock).
pub struct BufferPool {
    inner: Mutex<Inner>,
}

impl BufferPool {
    /// Allocate `count` buffers of `buffer_size` bytes each, all starting
    /// on the `empty` list (§3, "initially all indices").
    pub fn new(count: usize, buffer_size: usize) -> Self {
        let buffers = (0..count).map(|_| Buffer::zeroed(buffer_size)).collect();
        let empty = (0..count).collect();
        Self {
            inner: Mutex::new(Inner { buffers, empty, full: VecDeque::new(), valid_len: vec![0; count] }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap().buffers.len()
    }

    /// Non-blocking `acquireEmpty`. Returns `None` if `empty` is drained;
    /// the caller (the Reader, per §4.2/§5) owns the bounded-backoff spin
    /// loop around this call — the pool itself never sleeps.
    pub fn try_acquire_empty(&self) -> Option<usize> {
        self.inner.lock().unwrap().empty.pop_front()
    }

    /// `releaseFull(index)`, recording how many bytes of the buffer the
    /// Reader actually filled (the rest is stale padding from a previous
    /// occupant or the initial zero-fill).
    pub fn release_full(&self, index: usize, valid_len: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.valid_len[index] = valid_len;
        inner.full.push_back(index);
    }

    /// Valid byte count of buffer `index`, as recorded by the
    /// [`Self::release_full`] call that last placed it on `full`.
    pub fn valid_len(&self, index: usize) -> usize {
        self.inner.lock().unwrap().valid_len[index]
    }

    /// `peekFullPrefix(max)`: pops the front of `full`, then while the next
    /// front is exactly `prev + 1` and fewer than `max` indices have been
    /// taken, pops it too. Returns the contiguous run, or an empty vec if
    /// `full` was empty. The returned indices are logically owned by the
    /// caller until passed back through [`BufferPool::release_empty`].
    pub fn peek_full_prefix(&self, max: usize) -> Vec<usize> {
        if max == 0 {
            return Vec::new();
        }
        let mut inner = self.inner.lock().unwrap();
        let mut run = Vec::with_capacity(max);
        let Some(first) = inner.full.pop_front() else {
            return run;
        };
        run.push(first);
        while run.len() < max {
            match inner.full.front() {
                Some(&next) if next == run.last().copied().unwrap() + 1 => {
                    inner.full.pop_front();
                    run.push(next);
                }
                _ => break,
            }
        }
        run
    }

    /// `releaseEmpty(index)`.
    pub fn release_empty(&self, index: usize) {
        self.inner.lock().unwrap().empty.push_back(index);
    }

    pub fn len_empty(&self) -> usize {
        self.inner.lock().unwrap().empty.len()
    }

    pub fn len_full(&self) -> usize {
        self.inner.lock().unwrap().full.len()
    }

    /// Run `f` with shared read access to buffer `index`'s bytes.
    pub fn with_buffer<R>(&self, index: usize, f: impl FnOnce(&Buffer) -> R) -> R {
        let inner = self.inner.lock().unwrap();
        f(&inner.buffers[index])
    }

    /// Run `f` with exclusive write access to buffer `index`'s bytes.
    pub fn with_buffer_mut<R>(&self, index: usize, f: impl FnOnce(&mut Buffer) -> R) -> R {
        let mut inner = self.inner.lock().unwrap();
        f(&mut inner.buffers[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_conservation_holds_at_start() {
        let pool = BufferPool::new(4, 16);
        assert_eq!(pool.len_empty(), 4);
        assert_eq!(pool.len_full(), 0);
        assert_eq!(pool.capacity(), 4);
    }

    #[test]
    fn acquire_release_round_trips_through_full_and_back_to_empty() {
        let pool = BufferPool::new(2, 16);
        let idx = pool.try_acquire_empty().unwrap();
        assert_eq!(pool.len_empty(), 1);
        pool.release_full(idx, 10);
        assert_eq!(pool.len_full(), 1);
        assert_eq!(pool.valid_len(idx), 10);
        let taken = pool.peek_full_prefix(4);
        assert_eq!(taken, vec![idx]);
        assert_eq!(pool.len_full(), 0);
        pool.release_empty(idx);
        assert_eq!(pool.len_empty(), 2);
    }

    #[test]
    fn try_acquire_empty_returns_none_when_drained() {
        let pool = BufferPool::new(1, 16);
        assert!(pool.try_acquire_empty().is_some());
        assert!(pool.try_acquire_empty().is_none());
    }

    #[test]
    fn peek_full_prefix_coalesces_only_contiguous_indices() {
        let pool = BufferPool::new(5, 16);
        // Fill indices 0,1,2 then skip to 4 (simulating 3 released out of
        // order after some buffer churn).
        for i in [0usize, 1, 2, 4] {
            pool.release_full(i, 16);
        }
        let run = pool.peek_full_prefix(10);
        assert_eq!(run, vec![0, 1, 2]);
        assert_eq!(pool.len_full(), 1); // index 4 remains
    }

    #[test]
    fn peek_full_prefix_respects_max_coalesce_bound() {
        let pool = BufferPool::new(5, 16);
        for i in 0..5 {
            pool.release_full(i, 16);
        }
        let run = pool.peek_full_prefix(2);
        assert_eq!(run, vec![0, 1]);
        assert_eq!(pool.len_full(), 3);
    }

    #[test]
    fn peek_full_prefix_on_empty_full_list_returns_empty() {
        let pool = BufferPool::new(2, 16);
        assert!(pool.peek_full_prefix(4).is_empty());
    }
}
