mod cli;
mod reader;
mod sorter;
mod transferrer;

use std::sync::Arc;
use std::thread;

use clap::Parser;
use mpi::Threading;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

use cli::CliArgs;
use sortio_core::{
    BufferPool, DispatchCoordinator, FirstReadGate, GroupRanges, HostTopology, NullSortConsumer, Role, RunConfig, SortConsumer,
    SortioError, TimeoutKind, fatal,
};
use sortio_net::{IoGroupRound, PipelineGroups, SharedWorld, TransferComm, TransferrerByHost, gather_host_topology, recv_handshake, run_relay_loop};
use sortio_shm::ShmProducer;

fn main() {
    tracing_subscriber::fmt().init();

    // §6 "MPI init": Threading::Multiple, since every Transferrer process
    // has its Transfer thread (the main thread, below) and its relay
    // thread both call into MPI concurrently, and the Transfer thread's
    // async payload sends each run from their own background worker
    // thread (`sortio_net::transfer::MpiTransferHandle`).
    let (universe, threading) = mpi::initialize_with_threading(Threading::Multiple).expect("MPI initialization failed");
    if threading != Threading::Multiple {
        eprintln!("WARNING: MPI provided {threading:?}, requested Multiple; proceeding anyway");
    }
    let world = universe.world();
    let rank = world.rank();
    let world_size = world.size();

    let cfg = Arc::new(CliArgs::parse().into_run_config());

    if cfg.num_io_hosts <= 0 || cfg.num_io_hosts >= world_size {
        let err = SortioError::Config(format!("num_io_hosts ({}) must be in [1, world_size) = [1, {world_size})", cfg.num_io_hosts));
        fatal(rank, &err, |code| universe_abort(&world, code));
    }

    // Every host runs exactly one Reader/Transferrer pair, folded into a
    // single process (§4.7, DESIGN.md "process folding"): the Reader role
    // never gets its own rank range, so `R = 0` and `X = num_io_hosts`.
    // Every remaining rank is a Sorter-master, one per host, since this
    // deployment always runs with exactly one Sorter per host.
    let groups = GroupRanges::new(0, cfg.num_io_hosts, world_size - cfg.num_io_hosts);

    let topo = gather_host_topology(&world);
    if let Err(err) = topo.validate(&groups, 0, 1) {
        fatal(rank, &err, |code| universe_abort(&world, code));
    }

    if rank == 0 {
        print_config(&cfg, &groups, world_size);
    }

    let is_sorter_master = groups.role_of(rank) == Role::Sorter && topo.is_sorter_master(rank, &groups);
    let pipeline_groups = PipelineGroups::build(&world, &groups, is_sorter_master);
    let routing = TransferrerByHost::build(&topo, &groups);

    let result = match groups.role_of(rank) {
        Role::Transferrer => run_transferrer_rank(&universe, &world, &pipeline_groups, &groups, &topo, &routing, &cfg, rank),
        Role::Sorter => run_sorter_rank(&world, &routing, &topo, &cfg, rank),
        Role::Reader => unreachable!("R = 0; no standalone Reader ranks exist in this deployment"),
    };

    if let Err(err) = result {
        fatal(rank, &err, |code| universe_abort(&world, code));
    }

    world.barrier();
}

fn universe_abort(world: &SimpleCommunicator, code: i32) -> ! {
    world.abort(code);
    unreachable!("MPI_Abort does not return")
}

fn print_config(cfg: &RunConfig, groups: &GroupRanges, world_size: i32) {
    println!("sortio-run (Rust distribution pipeline)");
    println!("  num_files      = {}", cfg.num_files);
    println!("  num_io_hosts   = {}", cfg.num_io_hosts);
    println!("  num_sorters    = {}", groups.s);
    println!("  world_size     = {world_size}");
    println!("  max_buffers    = {}", cfg.max_buffers);
    println!("  max_in_flight  = {}", cfg.max_in_flight);
    println!("  max_coalesce   = {}", cfg.max_coalesce);
    println!("  file_size_max  = {} bytes", cfg.file_size_max());
    println!("  input_dir      = {}", cfg.input_dir);
    println!("  output_dir     = {}", cfg.output_dir);
}

/// Runs everything that happens on a Transferrer rank: the Read thread
/// (§4.2), the relay thread (§4.5 "Production" on the receiving side), and
/// the main Transfer tick loop (§4.4) on the thread `main` is already
/// running on.
fn run_transferrer_rank(
    universe: &mpi::environment::Universe,
    world: &SimpleCommunicator,
    pipeline_groups: &PipelineGroups,
    groups: &GroupRanges,
    topo: &HostTopology,
    routing: &TransferrerByHost,
    cfg: &Arc<RunConfig>,
    rank: i32,
) -> Result<(), SortioError> {
    let io_comm = pipeline_groups.io_group.as_ref().expect("Transferrer ranks always belong to the IO group");
    let io_rank = groups.io_rank(rank).expect("Transferrer rank must map to an IO rank");
    let num_io_ranks = groups.num_io_ranks();

    let pool = Arc::new(BufferPool::new(cfg.max_buffers, cfg.file_size_max()));

    // The local Sorter-master is whichever Sorter rank our own host's
    // routing entry maps back to — i.e. the sorter colocated with us.
    let local_sorter_master = (groups.first_sorter_rank()..groups.past_last_sorter_rank())
        .find(|&s| routing.transferrer_for_sorter(s, topo) == rank)
        .expect("every Transferrer host has exactly one colocated Sorter-master");

    // Create the shared-memory regions up front; the Sorter-master opens
    // them independently (retrying until they exist) and posts READY once
    // it has (§4.5).
    let mut shm = ShmProducer::create(cfg.file_size_max() * cfg.max_coalesce)?;

    let first_read_gate = if io_rank == groups.master_io_rank() { Some(Arc::new(FirstReadGate::new())) } else { None };

    let reader_pool = Arc::clone(&pool);
    let reader_cfg = Arc::clone(cfg);
    let reader_gate = first_read_gate.clone();
    let reader_handle = thread::spawn(move || reader::run_reader_thread(reader_pool, reader_cfg, io_rank, num_io_ranks, reader_gate));

    let relay_world = SharedWorld(universe.world());
    let relay_handle = thread::spawn(move || {
        let relay_comm = &relay_world.0;
        recv_handshake(relay_comm, local_sorter_master)?;
        run_relay_loop(relay_comm, num_io_ranks, &mut shm, local_sorter_master)
    });

    let measured = first_read_gate
        .as_ref()
        .and_then(|gate| gate.wait(sortio_core::FIRST_READ_POLL_INTERVAL, sortio_core::FIRST_READ_MAX_ATTEMPTS));
    let io_round = IoGroupRound::new(io_comm, groups.master_io_rank());

    if io_round.is_master() && measured.is_none() {
        let err = SortioError::timeout(rank, TimeoutKind::FirstRead, "no file read within FIRST_READ_MAX_ATTEMPTS attempts");
        fatal(rank, &err, |code| universe_abort(world, code));
    }

    let records_per_file = if io_round.is_master() { io_round.broadcast_record_count(measured) } else { io_round.broadcast_record_count(None) };
    tracing::info!(rank, records_per_file, "fleet-wide records-per-file discovered");

    let mut coordinator = io_round.is_master().then(|| DispatchCoordinator::new(groups.first_sorter_rank(), groups.past_last_sorter_rank()));

    let comm = TransferComm::new(universe.world());
    transferrer::run_transfer_loop(world, &io_round, coordinator.take(), &pool, cfg, topo, routing, &comm, num_io_ranks)?;

    reader_handle.join().expect("reader thread panicked")?;
    relay_handle.join().expect("relay thread panicked")?;
    Ok(())
}

/// Runs a Sorter-master's whole receive loop (§4.6). Non-master Sorter
/// ranks don't exist in this deployment (`sorters_per_host = 1`), so every
/// Sorter rank reaching this function is, by construction, its host's
/// master.
fn run_sorter_rank(
    world: &SimpleCommunicator,
    routing: &TransferrerByHost,
    topo: &HostTopology,
    cfg: &RunConfig,
    rank: i32,
) -> Result<(), SortioError> {
    let local_transferrer = routing.transferrer_for_sorter(rank, topo);

    // Every rank runs the same binary with the same command line (§6, as
    // with the teacher's own benchmark binaries), so this rank already
    // knows the data-region size the Transferrer used without needing to
    // ask for it.
    let shm = sorter::open_shm_with_retry(cfg.file_size_max() * cfg.max_coalesce, rank)?;

    let mut consumer: Box<dyn SortConsumer> = Box::new(NullSortConsumer::default());
    sorter::run_sorter_master_loop(world, local_transferrer, shm, consumer.as_mut(), rank)
}
