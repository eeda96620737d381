/// Interface boundary to the external sort kernel (§4.6). The pipeline
/// hands every received batch to `consume`; what happens downstream
/// (bucketing, splitter selection, merge/quicksort) is out of scope here.
pub trait SortConsumer: Send {
    fn consume(&mut self, payload: &[u8]);
}

/// Placeholder cap for the real sort consumer (§4.6, §9 "the Sorter-side
/// 'clear at 1 GB' is a placeholder for the real sort consumer"). Accumulates
/// received payloads and drops them once the configured cap is exceeded,
/// which is exactly as much behavior as a stand-in needs to preserve the
/// pipeline's backpressure shape.
pub struct NullSortConsumer {
    buffer: Vec<u8>,
    cap_bytes: usize,
}

impl NullSortConsumer {
    /// `cap_bytes` defaults to the ~1 GB threshold named in §4.6.
    pub fn new(cap_bytes: usize) -> Self {
        Self { buffer: Vec::new(), cap_bytes }
    }

    pub fn bytes_held(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for NullSortConsumer {
    fn default() -> Self {
        Self::new(1_000_000_000)
    }
}

impl SortConsumer for NullSortConsumer {
    fn consume(&mut self, payload: &[u8]) {
        if self.buffer.len() > self.cap_bytes {
            self.buffer.clear();
        }
        self.buffer.extend_from_slice(payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_payloads_below_cap() {
        let mut c = NullSortConsumer::new(100);
        c.consume(&[1, 2, 3]);
        c.consume(&[4, 5]);
        assert_eq!(c.bytes_held(), 5);
    }

    #[test]
    fn clears_once_cap_exceeded() {
        let mut c = NullSortConsumer::new(4);
        c.consume(&[0u8; 5]);
        assert_eq!(c.bytes_held(), 5);
        c.consume(&[0u8; 3]);
        // previous fill exceeded cap, so this consume starts from a clear
        assert_eq!(c.bytes_held(), 3);
    }
}
