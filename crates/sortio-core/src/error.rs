use thiserror::Error;

/// Error kinds produced by the distribution pipeline.
///
/// Every fatal variant is meant to be logged once, at the rank that detected
/// it, then turned into a global abort — there is no local recovery path.
#[derive(Debug, Error)]
pub enum SortioError {
    /// Bad configuration: inconsistent counts, unreadable paths, a host that
    /// doesn't colocate exactly one Reader/Transferrer/`S` Sorters.
    #[error("config error: {0}")]
    Config(String),

    /// Input file could not be opened. Fatal: global abort.
    #[error("failed to open input file {path} (rank {rank}): {source}")]
    IoOpen {
        path: String,
        rank: i32,
        #[source]
        source: std::io::Error,
    },

    /// Short or long read against the discovered records-per-file. Logged,
    /// never propagated as a hard failure.
    #[error("file {path} read {got} records, expected {expected} (rank {rank})")]
    IoRead {
        path: String,
        rank: i32,
        got: u64,
        expected: u64,
    },

    /// An internal bookkeeping assertion failed: queue accounting,
    /// shared-memory state, or a handshake value out of protocol.
    #[error("protocol violation (rank {rank}): {detail}")]
    Protocol { rank: i32, detail: String },

    /// A bounded wait expired: first-read discovery, or the shared-memory
    /// consumer's spin-poll. `kind` distinguishes the two for `exit_code`
    /// (§6: first-read timeout is `3`, shared-memory wait timeout is `4`,
    /// mirroring the original's two separate `MPI_Abort` codes).
    #[error("timeout (rank {rank}): {detail}")]
    Timeout { rank: i32, kind: TimeoutKind, detail: String },

    /// Underlying MPI failure surfaced through the `mpi` crate or raw FFI.
    #[error("MPI error: {0}")]
    Mpi(String),
}

/// Which bounded wait expired (§6 "Exit codes").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    FirstRead,
    ShmWait,
}

impl SortioError {
    pub fn protocol(rank: i32, detail: impl Into<String>) -> Self {
        SortioError::Protocol { rank, detail: detail.into() }
    }

    pub fn timeout(rank: i32, kind: TimeoutKind, detail: impl Into<String>) -> Self {
        SortioError::Timeout { rank, kind, detail: detail.into() }
    }

    /// Process exit code for this error's kind (§6).
    pub fn exit_code(&self) -> i32 {
        match self {
            SortioError::Config(_) => 1,
            SortioError::IoOpen { .. } => 2,
            SortioError::Timeout { kind: TimeoutKind::FirstRead, .. } => 3,
            SortioError::Timeout { kind: TimeoutKind::ShmWait, .. } => 4,
            SortioError::Protocol { .. } => 5,
            SortioError::IoRead { .. } => 0,
            SortioError::Mpi(_) => 1,
        }
    }

    /// True if this kind requires a global abort rather than a log line.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SortioError::IoRead { .. })
    }
}

/// Log a fatal error with its rank and kind, as the single required
/// diagnostic line (§7), then call the supplied abort function. `abort`
/// never returns; it is expected to terminate every rank (e.g. an MPI
/// global abort).
pub fn fatal<R>(rank: i32, err: &SortioError, abort: impl FnOnce(i32) -> R) -> R {
    tracing::error!(rank, kind = %err, "fatal error, aborting run");
    abort(err.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_read_is_not_fatal() {
        let err = SortioError::IoRead {
            path: "in/data3".into(),
            rank: 2,
            got: 99,
            expected: 100,
        };
        assert!(!err.is_fatal());
        assert_eq!(err.exit_code(), 0);
    }

    #[test]
    fn io_open_is_fatal_with_exit_code_two() {
        let err = SortioError::IoOpen {
            path: "in/data3".into(),
            rank: 0,
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.is_fatal());
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn protocol_violation_is_fatal_with_exit_code_five() {
        let err = SortioError::protocol(1, "syncFlags[0] != 1 after timeout");
        assert!(err.is_fatal());
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn first_read_and_shm_wait_timeouts_carry_distinct_exit_codes() {
        let first_read = SortioError::timeout(0, TimeoutKind::FirstRead, "no file read within 50 attempts");
        let shm_wait = SortioError::timeout(1, TimeoutKind::ShmWait, "shared-memory region never appeared");
        assert_eq!(first_read.exit_code(), 3);
        assert_eq!(shm_wait.exit_code(), 4);
    }
}
