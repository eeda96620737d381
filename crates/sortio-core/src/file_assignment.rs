/// Number of iterations a Reader rank must run to cover `num_files` files
/// striped across `num_readers` ranks (§3 "FileAssignment", §4.2).
pub fn file_iteration_count(num_files: u64, num_readers: i32) -> u64 {
    let num_readers = num_readers as u64;
    num_files.div_ceil(num_readers)
}

/// File index assigned to `rank` in iteration `iteration` (`f = i*R + rank`).
/// Returns `None` once `f >= num_files` — the Reader should stop.
pub fn file_index(iteration: u64, rank: i32, num_readers: i32, num_files: u64) -> Option<u64> {
    let f = iteration * num_readers as u64 + rank as u64;
    (f < num_files).then_some(f)
}

/// True when a file's measured record count disagrees with the
/// fleet-wide discovered `P` — a diagnostic, never fatal (§3, §7 `io-read`).
pub fn record_count_mismatch(got: u64, expected: u64) -> bool {
    got != expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_count_rounds_up() {
        assert_eq!(file_iteration_count(8, 2), 4);
        assert_eq!(file_iteration_count(9, 2), 5);
        assert_eq!(file_iteration_count(0, 2), 0);
    }

    #[test]
    fn file_index_stripes_by_rank_then_stops_past_n() {
        // N=8, R=2: rank 0 reads 0,2,4,6; rank 1 reads 1,3,5,7
        let mut rank0 = Vec::new();
        for i in 0..file_iteration_count(8, 2) {
            if let Some(f) = file_index(i, 0, 2, 8) {
                rank0.push(f);
            }
        }
        assert_eq!(rank0, vec![0, 2, 4, 6]);

        assert_eq!(file_index(2, 1, 2, 5), None); // f = 5, N = 5
    }

    #[test]
    fn mismatch_detects_unequal_counts_only() {
        assert!(record_count_mismatch(99, 100));
        assert!(!record_count_mismatch(100, 100));
    }
}
