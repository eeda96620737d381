use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Poll cadence for the Transfer thread waiting on first-read discovery
/// (§1B "first-read timeout"): ~5s total at 50 polls of 100ms.
pub const FIRST_READ_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const FIRST_READ_MAX_ATTEMPTS: u32 = 50;

/// One-shot, cross-thread handshake for records-per-file discovery (§3,
/// §9 "isFirstRead coupling"). The master host's Read thread calls
/// [`Self::publish`] exactly once, right after measuring `P` from the very
/// first file it opens; the Transfer thread on that same host calls
/// [`Self::wait`] to pick it up before it can size any buffer or compute a
/// batch's byte count.
pub struct FirstReadGate {
    value: Mutex<Option<u64>>,
    condvar: Condvar,
}

impl FirstReadGate {
    pub fn new() -> Self {
        Self { value: Mutex::new(None), condvar: Condvar::new() }
    }

    /// Publish the measured records-per-file. Only the first call has any
    /// effect; later calls (there should be none, by construction) are
    /// silently ignored rather than overwriting an already-observed value.
    pub fn publish(&self, records_per_file: u64) {
        let mut value = self.value.lock().unwrap();
        if value.is_none() {
            *value = Some(records_per_file);
            self.condvar.notify_all();
        }
    }

    /// Wait up to `max_attempts * poll_interval` for a published value.
    /// Returns `None` on expiry, which the caller turns into a fatal
    /// `Timeout` (§1B, §7).
    pub fn wait(&self, poll_interval: Duration, max_attempts: u32) -> Option<u64> {
        let mut value = self.value.lock().unwrap();
        for _ in 0..max_attempts {
            if let Some(p) = *value {
                return Some(p);
            }
            let (guard, _timeout) = self.condvar.wait_timeout(value, poll_interval).unwrap();
            value = guard;
        }
        *value
    }
}

impl Default for FirstReadGate {
    fn default() -> Self {
        Self::new()
    }
}
