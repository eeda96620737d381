use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

use sortio_core::{TransferHandle, TransferStatus};

/// `Send + Sync` wrapper around a rank's communicator handle so it can be
/// shared with the background sender threads [`MpiTransferHandle`] spawns.
///
/// Safety: an `mpi` communicator is a thin wrapper around an opaque
/// `MPI_Comm` handle, and every rank running this pipeline initializes MPI
/// at `Threading::Multiple` (see `sortio-run::main`), so concurrent calls
/// into the same communicator from this process's sender threads and its
/// main Transfer thread are permitted by the MPI implementation.
pub struct TransferComm(SimpleCommunicator);

unsafe impl Send for TransferComm {}
unsafe impl Sync for TransferComm {}

impl TransferComm {
    pub fn new(comm: SimpleCommunicator) -> Arc<Self> {
        Arc::new(Self(comm))
    }
}

/// Completion handle for one coalesced batch's two-message send (§4.4 step
/// d: a header send under `tag` followed by the bulk payload under
/// `tag + 1`).
///
/// The source models both as asynchronous sends tracked by a pollable
/// request. `rsmpi`'s non-blocking requests borrow either a lexically
/// bounded `Scope` or a `'static` buffer, neither of which fits an
/// `InFlightMessage` that must outlive the tick that created it and be
/// polled by later ticks. Instead this issues both sends, in order, from a
/// dedicated background thread and signals completion with an atomic flag
/// — which gives [`TransferHandle::poll`]/[`TransferHandle::wait`] exactly
/// the contract the in-flight queue already depends on (§9 "In-flight
/// tracking"), without unsafely extending a buffer's lifetime to `'static`.
pub struct MpiTransferHandle {
    done: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl MpiTransferHandle {
    /// Spawns the sender thread and returns immediately. `payload` is the
    /// already-concatenated bytes of the coalesced buffer group (§4.4 step
    /// c/d); ownership moves into the worker thread so no lifetime needs
    /// to span the send.
    pub fn spawn(comm: Arc<TransferComm>, dest_rank: i32, tag: i32, payload: Vec<u8>) -> Self {
        let done = Arc::new(AtomicBool::new(false));
        let done_writer = Arc::clone(&done);

        let worker = thread::spawn(move || {
            let world = &comm.0;
            let payload_len = payload.len() as i32;
            // Header send: payload byte count under `tag` (§4.4 step d,
            // "buffered-send semantics" — the header is a single word, so
            // a plain blocking send never meaningfully blocks the worker).
            world.process_at_rank(dest_rank).send_with_tag(&payload_len, tag);
            // Bulk send: the concatenated bytes under `tag + 1`.
            world.process_at_rank(dest_rank).send_with_tag(&payload[..], tag + 1);
            done_writer.store(true, Ordering::Release);
        });

        Self { done, worker: Some(worker) }
    }
}

impl TransferHandle for MpiTransferHandle {
    fn poll(&mut self) -> TransferStatus {
        if self.done.load(Ordering::Acquire) {
            self.join_worker();
            TransferStatus::Done
        } else {
            TransferStatus::Pending
        }
    }

    fn wait(&mut self) {
        self.join_worker();
    }
}

impl MpiTransferHandle {
    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.join().expect("payload sender thread panicked");
        }
    }
}

impl Drop for MpiTransferHandle {
    fn drop(&mut self) {
        self.join_worker();
    }
}
