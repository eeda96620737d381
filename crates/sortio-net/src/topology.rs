use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

use sortio_core::HostTopology;

/// Fixed-width hostname buffer used for the fleet-wide `all_gather` (§1B,
/// §4.7 "gethostname(2)"). 64 bytes comfortably covers `HOST_NAME_MAX` on
/// Linux; a name that doesn't fit is truncated, which only risks a false
/// host-collision, not a crash.
const HOSTNAME_BUF_LEN: usize = 64;

fn local_hostname_buf() -> [u8; HOSTNAME_BUF_LEN] {
    let mut buf = [0u8; HOSTNAME_BUF_LEN];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, HOSTNAME_BUF_LEN) };
    assert_eq!(rc, 0, "gethostname(2) failed");
    buf
}

fn decode_hostname(buf: &[u8]) -> String {
    let nul = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..nul]).into_owned()
}

/// Gather every rank's hostname over `world` and build the fleet-wide
/// [`HostTopology`] (§4.7, §1B). Every rank ends up with the same
/// topology, since role/host validation and the Sorter-master test both
/// need it from ranks outside the Dispatch Coordinator.
pub fn gather_host_topology(world: &SimpleCommunicator) -> HostTopology {
    let mine = local_hostname_buf();
    let size = world.size() as usize;
    let mut all = vec![0u8; size * HOSTNAME_BUF_LEN];
    world.all_gather_into(&mine[..], &mut all[..]);

    let hostnames: Vec<String> = all.chunks(HOSTNAME_BUF_LEN).map(decode_hostname).collect();
    HostTopology::from_hostnames(&hostnames)
}
