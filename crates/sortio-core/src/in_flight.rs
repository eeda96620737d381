use std::collections::VecDeque;

/// Completion state of a transport handle, as returned by a non-blocking
/// poll (§9, "model it as `{indices: list, handle: Handle}` with a
/// `poll(handle) -> {Done, Pending}` operation").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Done,
    Pending,
}

/// An opaque, pollable outstanding transport operation (an MPI request in
/// the network transport, but this trait keeps the queue logic transport
/// agnostic — no inheritance needed, per §9).
pub trait TransferHandle {
    /// Non-blocking completion test.
    fn poll(&mut self) -> TransferStatus;

    /// Block until complete.
    fn wait(&mut self);
}

/// Record of a currently outstanding network send: the coalesced group of
/// buffer indices it carries, and the handle that reports its completion
/// (§3 "InFlightMessage").
pub struct InFlightMessage<H> {
    pub indices: Vec<usize>,
    pub handle: H,
}

impl<H> InFlightMessage<H> {
    pub fn new(indices: Vec<usize>, handle: H) -> Self {
        debug_assert!(!indices.is_empty(), "in-flight message must carry at least one buffer");
        Self { indices, handle }
    }
}

/// FIFO of outstanding sends for one Transferrer. Thread-local to the
/// Transferrer (§5, "In-flight records are thread-local to the Transferrer
/// and need no lock").
#[derive(Default)]
pub struct InFlightQueue<H> {
    queue: VecDeque<InFlightMessage<H>>,
}

impl<H: TransferHandle> InFlightQueue<H> {
    pub fn new() -> Self {
        Self { queue: VecDeque::new() }
    }

    pub fn push(&mut self, msg: InFlightMessage<H>) {
        self.queue.push_back(msg);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// `drainInFlight(block, waterMark)` (§4.4).
    ///
    /// No-op if the queue is already at or below `water_mark`. Otherwise
    /// walks the queue in insertion order: a completed record is removed
    /// and its buffers passed to `on_release`; an incomplete record is
    /// waited on (and then released) when `block` is set, or left in the
    /// queue otherwise. `on_release` is called once per buffer index of
    /// every completed record, in index order.
    pub fn drain_in_flight(&mut self, block: bool, water_mark: usize, mut on_release: impl FnMut(usize)) {
        if self.queue.len() <= water_mark {
            return;
        }
        let mut remaining = VecDeque::with_capacity(self.queue.len());
        while let Some(mut msg) = self.queue.pop_front() {
            let done = match msg.handle.poll() {
                TransferStatus::Done => true,
                TransferStatus::Pending if block => {
                    msg.handle.wait();
                    true
                }
                TransferStatus::Pending => false,
            };
            if done {
                for idx in msg.indices {
                    on_release(idx);
                }
            } else {
                remaining.push_back(msg);
            }
        }
        self.queue = remaining;
    }

    /// All buffer indices currently tracked as in flight, across every
    /// outstanding record — used by the buffer-conservation property test.
    pub fn all_indices(&self) -> Vec<usize> {
        self.queue.iter().flat_map(|m| m.indices.iter().copied()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedHandle {
        done: bool,
    }

    impl TransferHandle for ScriptedHandle {
        fn poll(&mut self) -> TransferStatus {
            if self.done { TransferStatus::Done } else { TransferStatus::Pending }
        }

        fn wait(&mut self) {
            self.done = true;
        }
    }

    #[test]
    fn below_watermark_is_a_no_op() {
        let mut q: InFlightQueue<ScriptedHandle> = InFlightQueue::new();
        q.push(InFlightMessage::new(vec![0], ScriptedHandle { done: false }));
        let mut released = Vec::new();
        q.drain_in_flight(false, 5, |i| released.push(i));
        assert!(released.is_empty());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn blocking_drain_empties_the_queue_and_releases_everything() {
        let mut q: InFlightQueue<ScriptedHandle> = InFlightQueue::new();
        q.push(InFlightMessage::new(vec![0, 1], ScriptedHandle { done: false }));
        q.push(InFlightMessage::new(vec![2], ScriptedHandle { done: true }));
        let mut released = Vec::new();
        q.drain_in_flight(true, 0, |i| released.push(i));
        assert!(q.is_empty());
        released.sort();
        assert_eq!(released, vec![0, 1, 2]);
    }

    #[test]
    fn nonblocking_drain_skips_pending_and_releases_only_completed() {
        let mut q: InFlightQueue<ScriptedHandle> = InFlightQueue::new();
        q.push(InFlightMessage::new(vec![0], ScriptedHandle { done: true }));
        q.push(InFlightMessage::new(vec![1], ScriptedHandle { done: false }));
        let mut released = Vec::new();
        q.drain_in_flight(false, 0, |i| released.push(i));
        assert_eq!(released, vec![0]);
        assert_eq!(q.len(), 1);
        assert_eq!(q.all_indices(), vec![1]);
    }

    #[test]
    fn watermark_respected_after_blocking_drain() {
        let mut q: InFlightQueue<ScriptedHandle> = InFlightQueue::new();
        for i in 0..5 {
            q.push(InFlightMessage::new(vec![i], ScriptedHandle { done: true }));
        }
        q.drain_in_flight(true, 2, |_| {});
        assert!(q.len() <= 2);
    }
}
