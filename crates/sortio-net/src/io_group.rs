use mpi::collective::SystemOperation;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

use sortio_core::{DispatchAssignment, DispatchCoordinator};

/// Sentinel scattered to an IO rank with no assignment this tick (§4.3
/// step 4: "If `K > 0`, scatter"). MPI's fixed-width scatter can't carry
/// an `Option`, so ranks below every real rank number stand in for `None`.
const NO_ASSIGNMENT: i32 = -1;

/// Runs the Dispatch Coordinator's per-tick collectives (§4.3, §6) over
/// the IO-group communicator. Every IO rank calls [`Self::run_dispatch`]
/// once per tick; only the master-IO rank's `coordinator` argument is
/// consulted (the others may pass `None`).
pub struct IoGroupRound<'c> {
    comm: &'c SimpleCommunicator,
    io_rank: i32,
    master_io_rank: i32,
    num_io_ranks: i32,
}

impl<'c> IoGroupRound<'c> {
    pub fn new(comm: &'c SimpleCommunicator, master_io_rank: i32) -> Self {
        Self { comm, io_rank: comm.rank(), master_io_rank, num_io_ranks: comm.size() }
    }

    pub fn is_master(&self) -> bool {
        self.io_rank == self.master_io_rank
    }

    /// §4.3 steps 1-4: gather `|full|` to master-IO, have it run the pure
    /// [`DispatchCoordinator::assign`], broadcast the active-producer count
    /// `K`, then (if `K > 0`) scatter `destRank`/`tag` back out. Returns
    /// this rank's assignment, if any.
    pub fn run_dispatch(
        &self,
        my_full_count: usize,
        coordinator: Option<&mut DispatchCoordinator>,
    ) -> Option<DispatchAssignment> {
        let root = self.comm.process_at_rank(self.master_io_rank);

        let mut counts = vec![0i32; self.num_io_ranks as usize];
        let my_count = my_full_count as i32;
        if self.is_master() {
            root.gather_into_root(&my_count, &mut counts[..]);
        } else {
            root.gather_into(&my_count);
        }

        let (dest_ranks, tags, k) = if self.is_master() {
            let coordinator = coordinator.expect("master-IO rank must supply a DispatchCoordinator");
            let counts_usize: Vec<usize> = counts.iter().map(|&c| c.max(0) as usize).collect();
            let assignments = coordinator.assign(&counts_usize);
            let k = assignments.iter().filter(|a| a.is_some()).count() as i32;
            let dest_ranks: Vec<i32> = assignments.iter().map(|a| a.map_or(NO_ASSIGNMENT, |x| x.dest_rank)).collect();
            let tags: Vec<i32> = assignments.iter().map(|a| a.map_or(NO_ASSIGNMENT, |x| x.tag)).collect();
            (dest_ranks, tags, k)
        } else {
            (Vec::new(), Vec::new(), 0)
        };

        let mut k_bcast = k;
        root.broadcast_into(&mut k_bcast);
        if k_bcast == 0 {
            return None;
        }

        let mut my_dest = NO_ASSIGNMENT;
        let mut my_tag = NO_ASSIGNMENT;
        if self.is_master() {
            root.scatter_into_root(&dest_ranks[..], &mut my_dest);
            root.scatter_into_root(&tags[..], &mut my_tag);
        } else {
            root.scatter_into(&mut my_dest);
            root.scatter_into(&mut my_tag);
        }

        if my_dest == NO_ASSIGNMENT { None } else { Some(DispatchAssignment { dest_rank: my_dest, tag: my_tag }) }
    }

    /// All-reduce sum of `value` across the IO group (§4.3/§4.4: the
    /// in-flight-count termination check and the per-tick files-sent
    /// delta both use this shape).
    pub fn all_reduce_sum(&self, value: u64) -> u64 {
        let mut total = 0u64;
        self.comm.all_reduce_into(&value, &mut total, SystemOperation::sum());
        total
    }

    /// Broadcast records-per-file `P` from the master-IO rank to the rest
    /// of the IO group (§1B "first-read discovery"). The master passes the
    /// value it measured (or waited on via `FirstReadGate`); everyone else
    /// passes `None` and receives the broadcast value back.
    pub fn broadcast_record_count(&self, value: Option<u64>) -> u64 {
        let mut wire = value.unwrap_or(0);
        self.comm.process_at_rank(self.master_io_rank).broadcast_into(&mut wire);
        wire
    }
}

#[cfg(test)]
mod tests {
    // `IoGroupRound` is exercised end-to-end only under a real MPI launcher
    // (§8's scenarios require multiple ranks); its pure per-tick assignment
    // logic is already covered by `sortio_core::dispatch`'s unit tests.
}
