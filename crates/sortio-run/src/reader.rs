use std::fs::File;
use std::io::Read;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sortio_core::{BufferPool, FirstReadGate, RunConfig, SortioError, file_index, file_iteration_count, record_count_mismatch};

/// Backoff cadence the Read thread spins at while the buffer pool is
/// drained (§4.2 step 1, §5 "bounded-backoff spin" — unbounded in count,
/// since an exhausted pool is ordinary backpressure, not a failure).
const EMPTY_POOL_BACKOFF: Duration = Duration::from_millis(10);

fn acquire_empty_with_backoff(pool: &BufferPool) -> usize {
    loop {
        if let Some(idx) = pool.try_acquire_empty() {
            return idx;
        }
        thread::sleep(EMPTY_POOL_BACKOFF);
    }
}

/// Read whole `rec`-byte records from `file` into `buf`, stopping at EOF
/// or once `buf` is full. A trailing partial record is treated as EOF and
/// dropped, which the caller surfaces as a non-fatal count mismatch.
fn read_records(file: &mut File, buf: &mut [u8], rec: usize) -> std::io::Result<u64> {
    let mut count = 0usize;
    while (count + 1) * rec <= buf.len() {
        let start = count * rec;
        match file.read_exact(&mut buf[start..start + rec]) {
            Ok(()) => count += 1,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }
    }
    Ok(count as u64)
}

/// Runs the Read thread's whole file-striping loop (§4.2): each IO rank
/// strides over `input_dir/file_base<f>` for the files `file_index`
/// assigns it, filling one buffer per file. On this host's very first
/// file, if `first_read_gate` is `Some` (this is the master IO rank),
/// publishes the measured records-per-file for the Transfer thread to
/// broadcast fleet-wide (§1B, §9 "isFirstRead coupling").
pub fn run_reader_thread(
    pool: Arc<BufferPool>,
    cfg: Arc<RunConfig>,
    io_rank: i32,
    num_io_ranks: i32,
    first_read_gate: Option<Arc<FirstReadGate>>,
) -> Result<(), SortioError> {
    let iterations = file_iteration_count(cfg.num_files, num_io_ranks);
    let mut local_records_per_file: Option<u64> = None;

    for iteration in 0..iterations {
        let Some(f) = file_index(iteration, io_rank, num_io_ranks, cfg.num_files) else { break };

        let idx = acquire_empty_with_backoff(&pool);
        let path = cfg.input_path(f);

        let mut file = File::open(&path).map_err(|source| SortioError::IoOpen { path: path.clone(), rank: io_rank, source })?;

        let got = pool
            .with_buffer_mut(idx, |buffer| read_records(&mut file, buffer.as_mut_slice(), sortio_core::REC))
            .map_err(|source| SortioError::IoOpen { path: path.clone(), rank: io_rank, source })?;

        match local_records_per_file {
            None => {
                local_records_per_file = Some(got);
                if let Some(gate) = &first_read_gate {
                    gate.publish(got);
                }
            }
            Some(expected) if record_count_mismatch(got, expected) => {
                tracing::warn!(rank = io_rank, path = %path, got, expected, "record count mismatch");
            }
            Some(_) => {}
        }

        pool.release_full(idx, got as usize * sortio_core::REC);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_test_file(dir: &std::path::Path, name: &str, records: usize, rec: usize) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(&vec![7u8; records * rec]).unwrap();
        path
    }

    #[test]
    fn read_records_stops_cleanly_at_exact_eof() {
        let dir = std::env::temp_dir();
        let path = write_test_file(&dir, &format!("sortio-reader-test-{}", std::process::id()), 3, sortio_core::REC);
        let mut file = File::open(&path).unwrap();
        let mut buf = vec![0u8; 10 * sortio_core::REC];
        let got = read_records(&mut file, &mut buf, sortio_core::REC).unwrap();
        assert_eq!(got, 3);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn read_records_drops_a_trailing_partial_record() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("sortio-reader-partial-{}", std::process::id()));
        let mut file = File::create(&path).unwrap();
        file.write_all(&vec![7u8; 2 * sortio_core::REC + 40]).unwrap();
        drop(file);

        let mut file = File::open(&path).unwrap();
        let mut buf = vec![0u8; 10 * sortio_core::REC];
        let got = read_records(&mut file, &mut buf, sortio_core::REC).unwrap();
        assert_eq!(got, 2);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn reader_loop_publishes_first_read_and_fills_buffers() {
        let dir = std::env::temp_dir().join(format!("sortio-reader-loop-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        write_test_file(&dir, "data0", 2, sortio_core::REC);
        write_test_file(&dir, "data1", 2, sortio_core::REC);

        let mut cfg = RunConfig::default();
        cfg.num_files = 2;
        cfg.num_io_hosts = 1;
        cfg.input_dir = dir.to_string_lossy().into_owned();
        cfg.max_buffers = 4;
        let cfg = Arc::new(cfg);

        let pool = Arc::new(BufferPool::new(4, 10 * sortio_core::REC));
        let gate = Arc::new(FirstReadGate::new());

        run_reader_thread(Arc::clone(&pool), Arc::clone(&cfg), 0, 1, Some(Arc::clone(&gate))).unwrap();

        assert_eq!(pool.len_full(), 2);
        assert_eq!(gate.wait(Duration::from_millis(1), 1), Some(2));

        std::fs::remove_dir_all(&dir).ok();
    }
}
