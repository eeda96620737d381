use crate::error::SortioError;

/// Which of the three disjoint pipeline stages a global rank belongs to
/// (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Reader,
    Transferrer,
    Sorter,
}

/// Contiguous rank ranges for the three role groups: Readers `[0, R)`,
/// Transferrers `[R, R+X)`, Sorters `[R+X, R+X+S)` (§4.7).
#[derive(Debug, Clone, Copy)]
pub struct GroupRanges {
    pub r: i32,
    pub x: i32,
    pub s: i32,
}

impl GroupRanges {
    pub fn new(r: i32, x: i32, s: i32) -> Self {
        Self { r, x, s }
    }

    pub fn total_ranks(&self) -> i32 {
        self.r + self.x + self.s
    }

    pub fn role_of(&self, rank: i32) -> Role {
        if rank < self.r {
            Role::Reader
        } else if rank < self.r + self.x {
            Role::Transferrer
        } else {
            Role::Sorter
        }
    }

    /// Rank within the IO group (Readers then Transferrers, ordered by
    /// global rank). The IO group spans the same contiguous prefix as the
    /// global communicator, so this is the identity for IO ranks.
    pub fn io_rank(&self, global_rank: i32) -> Option<i32> {
        if global_rank < self.r + self.x { Some(global_rank) } else { None }
    }

    pub fn num_io_ranks(&self) -> i32 {
        self.r + self.x
    }

    /// First global rank in the Sorter group.
    pub fn first_sorter_rank(&self) -> i32 {
        self.r + self.x
    }

    /// One past the last Sorter rank.
    pub fn past_last_sorter_rank(&self) -> i32 {
        self.r + self.x + self.s
    }

    /// The master-IO rank: the lowest-ranked IO rank (§1B).
    pub fn master_io_rank(&self) -> i32 {
        0
    }

    /// The master-Sort rank: the lowest-ranked Sorter rank (§1B).
    pub fn master_sort_rank(&self) -> i32 {
        self.first_sorter_rank()
    }

    pub fn sorter_local_index(&self, global_rank: i32) -> Option<i32> {
        if global_rank >= self.first_sorter_rank() && global_rank < self.past_last_sorter_rank() {
            Some(global_rank - self.first_sorter_rank())
        } else {
            None
        }
    }
}

/// Deterministic mapping from global rank to host id, built from a
/// fleet-wide hostname gather (§4.7/§1B): every rank's hostname is
/// deduplicated and sorted, and a rank's host id is that sorted list's
/// index of its hostname.
pub struct HostTopology {
    host_of_rank: Vec<i32>,
    num_hosts: i32,
}

impl HostTopology {
    pub fn from_hostnames(hostnames: &[String]) -> Self {
        let mut unique: Vec<&String> = hostnames.iter().collect();
        unique.sort();
        unique.dedup();
        let host_of_rank = hostnames
            .iter()
            .map(|h| unique.binary_search(&h).expect("hostname present by construction") as i32)
            .collect();
        Self { host_of_rank, num_hosts: unique.len() as i32 }
    }

    pub fn host_of(&self, rank: i32) -> i32 {
        self.host_of_rank[rank as usize]
    }

    pub fn num_hosts(&self) -> i32 {
        self.num_hosts
    }

    /// Validate that every host has exactly `readers_per_host` Readers, one
    /// Transferrer, and the configured count of Sorters (§4.7). Returns a
    /// `Config` error naming the first violation found.
    ///
    /// `readers_per_host` is a parameter rather than a hardcoded `1` because
    /// a deployment may fold the Reader role into the Transferrer process as
    /// its internal Read thread (see `sortio-run`'s rank layout, DESIGN.md)
    /// and never hand out `Role::Reader` at all — in which case every host
    /// legitimately has zero standalone Reader ranks.
    pub fn validate(&self, groups: &GroupRanges, readers_per_host: i32, sorters_per_host: i32) -> Result<(), SortioError> {
        let mut readers = vec![0i32; self.num_hosts as usize];
        let mut transferrers = vec![0i32; self.num_hosts as usize];
        let mut sorters = vec![0i32; self.num_hosts as usize];

        for rank in 0..groups.total_ranks() {
            let host = self.host_of(rank) as usize;
            match groups.role_of(rank) {
                Role::Reader => readers[host] += 1,
                Role::Transferrer => transferrers[host] += 1,
                Role::Sorter => sorters[host] += 1,
            }
        }

        for host in 0..self.num_hosts as usize {
            if readers[host] != readers_per_host || transferrers[host] != 1 {
                return Err(SortioError::Config(format!(
                    "host {host} must colocate exactly {readers_per_host} Reader(s) and one Transferrer, found {} reader(s) and {} transferrer(s)",
                    readers[host], transferrers[host]
                )));
            }
            if sorters[host] != sorters_per_host {
                return Err(SortioError::Config(format!(
                    "host {host} has {} Sorter(s), expected {sorters_per_host}",
                    sorters[host]
                )));
            }
        }
        Ok(())
    }

    /// True if `rank` is the lowest-ranked Sorter on its host (§4.7
    /// "Sorter-master").
    pub fn is_sorter_master(&self, rank: i32, groups: &GroupRanges) -> bool {
        if groups.sorter_local_index(rank).is_none() {
            return false;
        }
        let host = self.host_of(rank);
        let first_sorter = groups.first_sorter_rank();
        !(first_sorter..rank).any(|other| self.host_of(other) == host)
    }
}

/// Advances the current receiving Sorter rank (local index within the
/// Sort group) by `stride` per file, wrapping at `len` (§4.6: "advancing by
/// `S/hosts` per file and wrapping at `S`").
pub struct SorterReceiveCycle {
    current: i32,
    stride: i32,
    len: i32,
}

impl SorterReceiveCycle {
    pub fn new(stride: i32, len: i32) -> Self {
        assert!(stride > 0 && len > 0);
        Self { current: 0, stride, len }
    }

    pub fn next(&mut self) -> i32 {
        let current = self.current;
        self.current += self.stride;
        if self.current >= self.len {
            self.current = 0;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_of_partitions_contiguous_ranges() {
        let g = GroupRanges::new(2, 2, 2);
        assert_eq!(g.role_of(0), Role::Reader);
        assert_eq!(g.role_of(1), Role::Reader);
        assert_eq!(g.role_of(2), Role::Transferrer);
        assert_eq!(g.role_of(3), Role::Transferrer);
        assert_eq!(g.role_of(4), Role::Sorter);
        assert_eq!(g.role_of(5), Role::Sorter);
    }

    #[test]
    fn master_io_and_master_sort_are_lowest_ranked() {
        let g = GroupRanges::new(2, 2, 2);
        assert_eq!(g.master_io_rank(), 0);
        assert_eq!(g.master_sort_rank(), 4);
    }

    #[test]
    fn host_topology_dedupes_and_sorts_hostnames() {
        let hostnames = vec!["hostB".to_string(), "hostA".to_string(), "hostB".to_string(), "hostA".to_string()];
        let topo = HostTopology::from_hostnames(&hostnames);
        assert_eq!(topo.num_hosts(), 2);
        assert_eq!(topo.host_of(0), topo.host_of(2)); // both "hostB"
        assert_eq!(topo.host_of(1), topo.host_of(3)); // both "hostA"
        assert_ne!(topo.host_of(0), topo.host_of(1));
    }

    #[test]
    fn validate_accepts_one_reader_one_transferrer_per_host() {
        // R=X=2, S=2, two hosts: ranks (0 reader,2 xfer,4 sorter) on hostA,
        // (1 reader,3 xfer,5 sorter) on hostB.
        let groups = GroupRanges::new(2, 2, 2);
        let hostnames = vec!["hostA", "hostB", "hostA", "hostB", "hostA", "hostB"]
            .into_iter().map(String::from).collect::<Vec<_>>();
        let topo = HostTopology::from_hostnames(&hostnames);
        assert!(topo.validate(&groups, 1, 1).is_ok());
    }

    #[test]
    fn validate_rejects_unbalanced_host_assignment() {
        let groups = GroupRanges::new(2, 2, 2);
        // Both readers on the same host: invalid.
        let hostnames = vec!["hostA", "hostA", "hostA", "hostB", "hostA", "hostB"]
            .into_iter().map(String::from).collect::<Vec<_>>();
        let topo = HostTopology::from_hostnames(&hostnames);
        assert!(topo.validate(&groups, 1, 1).is_err());
    }

    #[test]
    fn is_sorter_master_identifies_lowest_ranked_sorter_per_host() {
        let groups = GroupRanges::new(1, 1, 4);
        // Sorters at global ranks 2,3,4,5; hosts A,B,A,B -> masters are 2 and 3.
        let hostnames = vec!["h0", "h0", "A", "B", "A", "B"]
            .into_iter().map(String::from).collect::<Vec<_>>();
        let topo = HostTopology::from_hostnames(&hostnames);
        assert!(topo.is_sorter_master(2, &groups));
        assert!(topo.is_sorter_master(3, &groups));
        assert!(!topo.is_sorter_master(4, &groups));
        assert!(!topo.is_sorter_master(5, &groups));
    }

    #[test]
    fn sorter_receive_cycle_wraps_at_len() {
        let mut cycle = SorterReceiveCycle::new(2, 4);
        assert_eq!(cycle.next(), 0);
        assert_eq!(cycle.next(), 2);
        assert_eq!(cycle.next(), 0);
        assert_eq!(cycle.next(), 2);
    }
}
