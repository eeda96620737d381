//! Transport glue between the transport-agnostic pipeline logic in
//! `sortio-core` and the `mpi` crate: host-topology discovery, the per-tick
//! IO-group collectives the Dispatch Coordinator runs (§4.3), the
//! READY/DONE handshake (§4.5), and the async payload send (§4.4 step d).

pub mod comm;
pub mod groups;
pub mod handshake;
pub mod io_group;
pub mod relay;
pub mod routing;
pub mod topology;
pub mod transfer;

pub use comm::SharedWorld;
pub use groups::PipelineGroups;
pub use handshake::{HANDSHAKE_TAG, HandshakeValue, recv_handshake, send_handshake, try_recv_handshake};
pub use io_group::IoGroupRound;
pub use relay::{RELAY_DONE_TAG, notify_relay_done, run_relay_loop};
pub use routing::TransferrerByHost;
pub use topology::gather_host_topology;
pub use transfer::{MpiTransferHandle, TransferComm};
