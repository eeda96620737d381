use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

use sortio_core::SortioError;

/// Tag shared by both halves of the Transferrer ↔ Sorter-master handshake
/// (§4.5, §6 "under tag 1") — distinct from the per-batch payload tags,
/// which start at 1000 and never collide with it.
pub const HANDSHAKE_TAG: i32 = 1;

/// The two point-to-point handshake values exchanged on the global
/// communicator (§4.5, §1B).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeValue {
    /// Posted by the Sorter-master before the Transferrer's first write,
    /// proving its shared-memory regions are mapped.
    Ready = 1,
    /// Posted by the Sorter-master after its receive loop completes.
    Done = 2,
    /// Posted by the Transferrer's relay thread once it has confirmed
    /// every peer Transferrer has sent its last payload — tells the local
    /// Sorter-master no further shared-memory writes are coming, so it can
    /// stop polling and post its own `Done` (§9, DESIGN.md "relay
    /// termination").
    AllSent = 3,
}

impl HandshakeValue {
    fn from_wire(value: i32) -> Option<Self> {
        match value {
            1 => Some(HandshakeValue::Ready),
            2 => Some(HandshakeValue::Done),
            3 => Some(HandshakeValue::AllSent),
            _ => None,
        }
    }
}

/// Post a handshake value to `dest_rank` (blocking send; the payload is a
/// single integer, so this never meaningfully blocks).
pub fn send_handshake(comm: &SimpleCommunicator, dest_rank: i32, value: HandshakeValue) {
    let wire = value as i32;
    comm.process_at_rank(dest_rank).send_with_tag(&wire, HANDSHAKE_TAG);
}

/// Block for a handshake value from `src_rank`. A value outside `{1, 2, 3}`
/// is a protocol violation (§7).
pub fn recv_handshake(comm: &SimpleCommunicator, src_rank: i32) -> Result<HandshakeValue, SortioError> {
    let (wire, _status): (i32, _) = comm.process_at_rank(src_rank).receive_with_tag(HANDSHAKE_TAG);
    HandshakeValue::from_wire(wire)
        .ok_or_else(|| SortioError::protocol(comm.rank(), format!("unexpected handshake value {wire}")))
}

/// Non-blocking check for a handshake value from `src_rank`: `Ok(None)` if
/// nothing has arrived yet. Used by the Sorter-master's receive loop, which
/// must interleave watching for `AllSent` with polling the shared-memory
/// channel rather than blocking on either alone (§9, DESIGN.md "relay
/// termination").
pub fn try_recv_handshake(comm: &SimpleCommunicator, src_rank: i32) -> Result<Option<HandshakeValue>, SortioError> {
    if comm.process_at_rank(src_rank).immediate_probe_with_tag(HANDSHAKE_TAG).is_none() {
        return Ok(None);
    }
    recv_handshake(comm, src_rank).map(Some)
}
