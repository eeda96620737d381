use mpi::topology::{Color, SimpleCommunicator};
use mpi::traits::*;

use sortio_core::{GroupRanges, Role};

/// The named sub-communicators of §6 "Collective group topology": the
/// global group (the caller's `world`), the IO group (Dispatch Coordinator
/// collectives, §4.3), the Transfer group (Transferrers ∪ Sorter-masters),
/// and the Sort group. Built once at startup from a rank's own [`Role`].
pub struct PipelineGroups {
    /// `Some` only on ranks that belong to the IO group.
    pub io_group: Option<SimpleCommunicator>,
    /// `Some` only on ranks that belong to the Sort group.
    pub sort_group: Option<SimpleCommunicator>,
    /// `Some` only on ranks that belong to the Transfer group (every IO
    /// rank plus every Sorter-master). Not used by any collective in this
    /// crate today — payload sends and shared-memory handshakes address
    /// ranks directly on the global communicator (§6 "Handshakes on the
    /// global group") — but built for parity with the four named groups
    /// §6 specifies.
    pub transfer_group: Option<SimpleCommunicator>,
}

impl PipelineGroups {
    pub fn build(world: &SimpleCommunicator, groups: &GroupRanges, is_sorter_master: bool) -> Self {
        let rank = world.rank();
        let role = groups.role_of(rank);

        let io_color = if matches!(role, Role::Reader | Role::Transferrer) {
            Color::with_value(0)
        } else {
            Color::undefined()
        };
        let io_group = world.split_by_color(io_color);

        let sort_color = if role == Role::Sorter { Color::with_value(0) } else { Color::undefined() };
        let sort_group = world.split_by_color(sort_color);

        let in_transfer_group = matches!(role, Role::Reader | Role::Transferrer) || is_sorter_master;
        let transfer_color = if in_transfer_group { Color::with_value(0) } else { Color::undefined() };
        let transfer_group = world.split_by_color(transfer_color);

        Self { io_group, sort_group, transfer_group }
    }
}
