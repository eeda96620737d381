use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mpi::topology::SimpleCommunicator;

use sortio_core::{BufferPool, DispatchCoordinator, HostTopology, InFlightMessage, InFlightQueue, RunConfig, SortioError};
use sortio_net::{IoGroupRound, MpiTransferHandle, TransferComm, TransferrerByHost, notify_relay_done};

/// Per-tick idle delay when exactly one buffer is full (§4.4 step 2: wait
/// briefly rather than coalescing a lone buffer immediately).
const SINGLE_BUFFER_DELAY: Duration = Duration::from_millis(100);

fn concat_buffers(pool: &BufferPool, indices: &[usize]) -> Vec<u8> {
    let mut payload = Vec::new();
    for &idx in indices {
        let valid_len = pool.valid_len(idx);
        pool.with_buffer(idx, |buffer| payload.extend_from_slice(&buffer.as_slice()[..valid_len]));
    }
    payload
}

/// Runs the Transferrer's main tick loop (§4.4) to completion: each tick,
/// coalesces as many full buffers as `max_coalesce` allows, runs the
/// Dispatch Coordinator's collectives over the IO group, and — if this
/// rank receives an assignment — spawns an asynchronous send routed to
/// the assigned Sorter-master's host. Terminates once the IO group's
/// fleet-wide file count reaches `N` and every rank's in-flight queue is
/// empty, then announces to every peer Transferrer that it will send no
/// more payloads (§9, DESIGN.md "relay termination").
pub fn run_transfer_loop(
    world: &SimpleCommunicator,
    io_round: &IoGroupRound,
    mut coordinator: Option<DispatchCoordinator>,
    pool: &BufferPool,
    cfg: &RunConfig,
    topo: &HostTopology,
    routing: &TransferrerByHost,
    comm: &Arc<TransferComm>,
    num_io_ranks: i32,
) -> Result<(), SortioError> {
    let mut in_flight: InFlightQueue<MpiTransferHandle> = InFlightQueue::new();
    let mut files_delivered: u64 = 0;

    loop {
        if files_delivered >= cfg.num_files {
            let total_in_flight = io_round.all_reduce_sum(in_flight.len() as u64);
            if total_in_flight == 0 {
                break;
            }
        }

        if pool.len_full() == 1 {
            thread::sleep(SINGLE_BUFFER_DELAY);
        }

        let batch = pool.peek_full_prefix(cfg.max_coalesce);
        let files_sent_this_tick = batch.len() as u64;
        let assignment = io_round.run_dispatch(batch.len(), coordinator.as_mut());

        if let Some(assignment) = assignment {
            // Flush watermark (§4.4 step 3a, §9 "Watermark backpressure" —
            // "not optional, without it memory grows unbounded"): block
            // until the in-flight queue is back at or below `W` before
            // adding the batch this tick is about to send.
            in_flight.drain_in_flight(true, cfg.max_in_flight, |idx| pool.release_empty(idx));

            let payload = concat_buffers(pool, &batch);
            let dest = routing.transferrer_for_sorter(assignment.dest_rank, topo);
            let handle = MpiTransferHandle::spawn(Arc::clone(comm), dest, assignment.tag, payload);
            in_flight.push(InFlightMessage::new(batch, handle));
        }

        files_delivered += io_round.all_reduce_sum(files_sent_this_tick);

        // Opportunistic reclaim (§4.4 step 5): just harvest whatever has
        // already completed, distinct from the blocking flush to `W` above.
        in_flight.drain_in_flight(false, 0, |idx| pool.release_empty(idx));
    }

    notify_relay_done(world, num_io_ranks);
    in_flight.drain_in_flight(true, 0, |idx| pool.release_empty(idx));
    Ok(())
}

#[cfg(test)]
mod tests {
    // `run_transfer_loop` drives real MPI collectives and background
    // sender threads; it is exercised under a real launcher (§8's
    // scenarios). `concat_buffers` is covered indirectly by
    // `sortio_core::buffer_pool`'s valid-length tests.
}
