use clap::Parser;
use sortio_core::RunConfig;

/// Distributed data-distribution engine for external sorts: moves
/// fixed-record binary files from disk through Reader, Transferrer, and
/// Sorter ranks with bounded buffering and overlapped I/O.
#[derive(Parser, Debug)]
#[command(name = "sortio-run", about = "MPI distribution pipeline for external sorts")]
pub struct CliArgs {
    /// Total number of input files (N)
    #[arg(short = 'n', long = "num-files", default_value_t = 0)]
    pub num_files: u64,

    /// Number of IO hosts; each hosts a Reader/Transferrer pair
    #[arg(short = 'x', long = "num-io-hosts", default_value_t = 1)]
    pub num_io_hosts: i32,

    /// Sort threads used by the external sort kernel
    #[arg(long = "sort-threads", default_value_t = 1)]
    pub num_sort_threads: i32,

    /// Sort groups used by the external sort kernel's binning
    #[arg(long = "sort-groups", default_value_t = 1)]
    pub num_sort_groups: i32,

    /// Maximum individual input file size, in megabytes
    #[arg(long = "max-file-mb", default_value_t = 1024)]
    pub max_file_mb: u64,

    /// Buffers per IO host buffer pool (B)
    #[arg(short = 'b', long = "max-buffers", default_value_t = 8)]
    pub max_buffers: usize,

    /// Max in-flight network sends per IO rank before drainInFlight blocks (W)
    #[arg(short = 'w', long = "max-in-flight", default_value_t = 4)]
    pub max_in_flight: usize,

    /// Max buffers coalesced into a single batch (M)
    #[arg(short = 'm', long = "max-coalesce", default_value_t = 4)]
    pub max_coalesce: usize,

    /// Directory holding input files
    #[arg(long = "input-dir", default_value = "in")]
    pub input_dir: String,

    /// Input file basename; file f is <input-dir>/<file-base><f>
    #[arg(long = "file-base", default_value = "data")]
    pub file_base: String,

    /// Directory for final sorted output
    #[arg(long = "output-dir", default_value = "out")]
    pub output_dir: String,

    /// Scratch directory for temporary files
    #[arg(long = "tmp-dir", default_value = "/tmp")]
    pub tmp_dir: String,

    /// Sort mode selector; 0 disables the external sort kernel entirely
    #[arg(long = "sort-mode", default_value_t = 1)]
    pub sort_mode: i32,

    /// Verification mode selector; 0 disables verification side channels
    #[arg(long = "verify-mode", default_value_t = 0)]
    pub verify_mode: i32,
}

impl CliArgs {
    pub fn into_run_config(self) -> RunConfig {
        RunConfig {
            num_files: self.num_files,
            num_io_hosts: self.num_io_hosts,
            num_sort_threads: self.num_sort_threads,
            num_sort_groups: self.num_sort_groups,
            max_file_mb: self.max_file_mb,
            max_buffers: self.max_buffers,
            max_in_flight: self.max_in_flight,
            max_coalesce: self.max_coalesce,
            input_dir: self.input_dir,
            file_base: self.file_base,
            output_dir: self.output_dir,
            tmp_dir: self.tmp_dir,
            sort_mode: self.sort_mode,
            verify_mode: self.verify_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_into_a_run_config() {
        let args = CliArgs::parse_from(["sortio-run"]);
        let cfg = args.into_run_config();
        assert_eq!(cfg.num_io_hosts, 1);
        assert_eq!(cfg.max_buffers, 8);
        assert_eq!(cfg.input_dir, "in");
    }

    #[test]
    fn explicit_flags_override_defaults() {
        let args = CliArgs::parse_from(["sortio-run", "-n", "16", "-x", "4", "--max-coalesce", "2"]);
        let cfg = args.into_run_config();
        assert_eq!(cfg.num_files, 16);
        assert_eq!(cfg.num_io_hosts, 4);
        assert_eq!(cfg.max_coalesce, 2);
    }
}
