use mpi::topology::SimpleCommunicator;

/// `Send + Sync` wrapper that lets a whole communicator handle cross a
/// thread boundary, for the same reason [`crate::transfer::TransferComm`]
/// does: every rank in this pipeline initializes MPI at `Threading::Multiple`
/// (see `sortio-run::main`), so concurrent use of the same communicator
/// from more than one thread in a process is permitted by the MPI
/// implementation. Used to hand the global communicator to a Transferrer's
/// relay thread, which needs arbitrary point-to-point and probe operations
/// rather than just the fire-and-forget send [`crate::transfer::TransferComm`]
/// supports.
pub struct SharedWorld(pub SimpleCommunicator);

unsafe impl Send for SharedWorld {}
unsafe impl Sync for SharedWorld {}
