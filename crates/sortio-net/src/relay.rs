use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

use sortio_core::SortioError;
use sortio_shm::ShmProducer;

use crate::handshake::{HandshakeValue, recv_handshake, send_handshake};

/// Tag a Transferrer uses to tell every peer Transferrer it has sent its
/// last payload (§9, DESIGN.md "relay termination"). Distinct from the
/// handshake tag (1) and the payload tag range (>= 1000).
pub const RELAY_DONE_TAG: i32 = 2;

/// Announce, to every IO rank including self, that this rank's main tick
/// loop (§4.4) has reached its termination condition and will never spawn
/// another [`crate::MpiTransferHandle`]. Called once, right after that
/// check fires.
pub fn notify_relay_done(world: &SimpleCommunicator, num_io_ranks: i32) {
    let done = 1i32;
    for dest in 0..num_io_ranks {
        world.process_at_rank(dest).send_with_tag(&done, RELAY_DONE_TAG);
    }
}

/// Runs on its own thread inside every Transferrer process (§4.5
/// "Production"). Relays inbound payloads sent by peer Transferrers (via
/// the routed address from [`crate::routing::TransferrerByHost`]) into
/// this host's shared-memory channel, until every IO rank has announced
/// it is done sending.
///
/// MPI guarantees messages between a given ordered pair of ranks arrive
/// in send order, so once a rank's `RELAY_DONE_TAG` notice has been
/// matched here, no further payload headers from that rank can still be
/// in flight — this loop does not need a separate drain phase.
///
/// Once every peer has reported done, posts [`HandshakeValue::AllSent`] to
/// the local Sorter-master so its receive loop knows to stop polling the
/// shared-memory channel, then blocks for the `Done` it posts back (§4.5,
/// §4.6) before returning.
pub fn run_relay_loop(
    world: &SimpleCommunicator,
    num_io_ranks: i32,
    shm: &mut ShmProducer,
    local_sorter_master: i32,
) -> Result<(), SortioError> {
    let mut remaining_senders = num_io_ranks;

    while remaining_senders > 0 {
        let (message, status) = world.any_process().matched_probe();

        if status.tag() == RELAY_DONE_TAG {
            let (_ack, _): (i32, _) = message.matched_receive();
            remaining_senders -= 1;
            continue;
        }

        let (payload_len, _): (i32, _) = message.matched_receive();
        let source = status.source_rank();
        let tag = status.tag();

        let mut payload = vec![0u8; payload_len as usize];
        world.process_at_rank(source).receive_into_with_tag(&mut payload[..], tag + 1);
        shm.write(world.rank(), &payload)?;
    }

    send_handshake(world, local_sorter_master, HandshakeValue::AllSent);

    match recv_handshake(world, local_sorter_master)? {
        HandshakeValue::Done => Ok(()),
        other => Err(SortioError::protocol(world.rank(), format!("expected Done handshake, got {other:?}"))),
    }
}
