/// Record size in bytes. Compile-time constant across the whole system
/// (§3 "Record size `REC` is a compile-time constant").
pub const REC: usize = 100;

/// Run-wide configuration, the data-bearing counterpart of the options
/// enumerated in §6 ("Configuration"). Constructed once at startup and never
/// mutated afterward — no component holds a `&mut RunConfig`.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Total number of input files (`N`).
    pub num_files: u64,
    /// Number of IO hosts; each hosts one Reader + one Transferrer (`R = X`).
    pub num_io_hosts: i32,
    /// Number of sort threads used by the (external) sort kernel.
    pub num_sort_threads: i32,
    /// Number of sort groups used by the (external) sort kernel's binning.
    pub num_sort_groups: i32,
    /// Maximum individual input file size, in megabytes.
    pub max_file_mb: u64,
    /// Buffers per IO host buffer pool (`B`).
    pub max_buffers: usize,
    /// Max in-flight network sends per IO rank before `drainInFlight` blocks (`W`).
    pub max_in_flight: usize,
    /// Max buffers coalesced into a single batch (`M`).
    pub max_coalesce: usize,
    /// Directory holding input files.
    pub input_dir: String,
    /// Input file basename; file `f` is `<input_dir>/<file_base><f>`.
    pub file_base: String,
    /// Directory for final sorted output (external sort kernel's concern).
    pub output_dir: String,
    /// Scratch directory for temporary files.
    pub tmp_dir: String,
    /// Sort mode selector; `0` disables the (external) sort kernel entirely.
    pub sort_mode: i32,
    /// Verification mode selector; `0` disables verification side channels.
    pub verify_mode: i32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            num_files: 0,
            num_io_hosts: 1,
            num_sort_threads: 1,
            num_sort_groups: 1,
            max_file_mb: 1024,
            max_buffers: 8,
            max_in_flight: 4,
            max_coalesce: 4,
            input_dir: "in".to_string(),
            file_base: "data".to_string(),
            output_dir: "out".to_string(),
            tmp_dir: "/tmp".to_string(),
            sort_mode: 1,
            verify_mode: 0,
        }
    }
}

impl RunConfig {
    /// Maximum bytes a single buffer must hold: one whole input file.
    pub fn file_size_max(&self) -> usize {
        self.max_file_mb as usize * 1024 * 1024
    }

    /// Path for input file index `f`.
    pub fn input_path(&self, f: u64) -> String {
        format!("{}/{}{}", self.input_dir, self.file_base, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_path_matches_inputdir_base_index_contract() {
        let mut cfg = RunConfig::default();
        cfg.input_dir = "/data/in".to_string();
        cfg.file_base = "rec.".to_string();
        assert_eq!(cfg.input_path(7), "/data/in/rec.7");
    }

    #[test]
    fn file_size_max_is_megabytes() {
        let mut cfg = RunConfig::default();
        cfg.max_file_mb = 2;
        assert_eq!(cfg.file_size_max(), 2 * 1024 * 1024);
    }
}
