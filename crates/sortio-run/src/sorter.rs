use std::thread;
use std::time::Duration;

use mpi::topology::SimpleCommunicator;

use sortio_core::{SortConsumer, SortioError, TimeoutKind};
use sortio_net::{HandshakeValue, send_handshake, try_recv_handshake};
use sortio_shm::ShmConsumer;

/// Sorter-master poll cadence while watching both the shared-memory channel
/// and the Transferrer's `AllSent` handshake (§4.6). Deliberately shorter
/// than the Reader's empty-pool backoff — this rank has nothing else to do
/// while waiting.
const SHM_POLL_INTERVAL: Duration = Duration::from_micros(200);

/// Backoff cadence while waiting for the colocated Transferrer to create
/// the shared-memory regions this rank will open (§4.5: the Transferrer
/// creates them independently of any signal from its Sorter-master, so the
/// only way to know they exist yet is to retry the open).
const SHM_OPEN_RETRY_INTERVAL: Duration = Duration::from_millis(20);
const SHM_OPEN_MAX_ATTEMPTS: u32 = 500;

/// Open this host's shared-memory channel as a consumer, retrying until the
/// Transferrer has created it or `SHM_OPEN_MAX_ATTEMPTS` is exceeded.
pub fn open_shm_with_retry(data_capacity: usize, rank: i32) -> Result<ShmConsumer, SortioError> {
    let mut last_err = None;
    for _ in 0..SHM_OPEN_MAX_ATTEMPTS {
        match ShmConsumer::open(data_capacity) {
            Ok(consumer) => return Ok(consumer),
            Err(err) => last_err = Some(err),
        }
        thread::sleep(SHM_OPEN_RETRY_INTERVAL);
    }
    Err(last_err.unwrap_or_else(|| SortioError::timeout(rank, TimeoutKind::ShmWait, "shared-memory region never appeared")))
}

/// Runs a Sorter-master's whole receive loop (§4.6): posts `Ready` once its
/// shared-memory regions are open, then alternates between a non-blocking
/// shared-memory check and a non-blocking check for the Transferrer's
/// `AllSent` handshake, handing every payload it receives to `consumer`.
/// Once `AllSent` arrives, drains whatever is left in the channel and posts
/// `Done`.
///
/// `local_transferrer` is the global rank of the Transferrer colocated on
/// this Sorter-master's host (§4.5, §4.7) — the only rank this loop ever
/// talks to.
pub fn run_sorter_master_loop(
    world: &SimpleCommunicator,
    local_transferrer: i32,
    mut shm: ShmConsumer,
    consumer: &mut dyn SortConsumer,
    rank: i32,
) -> Result<(), SortioError> {
    send_handshake(world, local_transferrer, HandshakeValue::Ready);

    loop {
        if let Some(value) = try_recv_handshake(world, local_transferrer)? {
            if value != HandshakeValue::AllSent {
                return Err(SortioError::protocol(rank, format!("expected AllSent handshake, got {value:?}")));
            }
            break;
        }

        match shm.try_read(rank)? {
            Some(payload) => consumer.consume(&payload),
            None => thread::sleep(SHM_POLL_INTERVAL),
        }
    }

    while let Some(payload) = shm.try_read(rank)? {
        consumer.consume(&payload);
    }

    send_handshake(world, local_transferrer, HandshakeValue::Done);
    Ok(())
}

#[cfg(test)]
mod tests {
    // `run_sorter_master_loop` drives real MPI point-to-point handshakes;
    // it is exercised under a real launcher (§8's scenarios), the same way
    // `sortio_net::relay::run_relay_loop` and `run_transfer_loop` are. The
    // shared-memory half of this loop is covered by
    // `sortio_shm::channel`'s `try_read` tests.
}
