use sortio_core::{GroupRanges, HostTopology, Role};

/// Maps a host id to the global rank of that host's Transferrer process.
///
/// §2 states every host hosts "exactly one Reader, one Transferrer, and
/// one or more Sorters" — so a payload the Dispatch Coordinator addresses
/// to a destination *Sorter-master* rank (§4.3) still has to be delivered
/// over the network to that Sorter-master's host, and only a Transferrer
/// ever writes the host-local shared-memory channel (§4.5 "Production").
/// This table resolves "which Sorter-master" into "which Transferrer to
/// actually `send_with_tag` to" — `HostTopology::validate` already
/// guarantees exactly one Transferrer rank per host, so the lookup never
/// misses.
pub struct TransferrerByHost {
    rank_of_host: Vec<i32>,
}

impl TransferrerByHost {
    pub fn build(topo: &HostTopology, groups: &GroupRanges) -> Self {
        let mut rank_of_host = vec![-1i32; topo.num_hosts() as usize];
        for rank in 0..groups.total_ranks() {
            if groups.role_of(rank) == Role::Transferrer {
                rank_of_host[topo.host_of(rank) as usize] = rank;
            }
        }
        Self { rank_of_host }
    }

    /// The Transferrer rank colocated with Sorter rank `sorter_rank`.
    pub fn transferrer_for_sorter(&self, sorter_rank: i32, topo: &HostTopology) -> i32 {
        self.rank_of_host[topo.host_of(sorter_rank) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_the_transferrer_colocated_with_a_sorter_rank() {
        // R=0 (folded into Transferrer), X=2, S=2: ranks 0,1 Transferrers
        // on hostA/hostB, ranks 2,3 Sorter-masters on hostA/hostB.
        let groups = GroupRanges::new(0, 2, 2);
        let hostnames = vec!["hostA", "hostB", "hostA", "hostB"].into_iter().map(String::from).collect::<Vec<_>>();
        let topo = HostTopology::from_hostnames(&hostnames);
        let routing = TransferrerByHost::build(&topo, &groups);

        assert_eq!(routing.transferrer_for_sorter(2, &topo), 0); // hostA
        assert_eq!(routing.transferrer_for_sorter(3, &topo), 1); // hostB
    }
}
