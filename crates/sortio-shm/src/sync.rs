use std::sync::atomic::{AtomicI32, Ordering};

use crate::region::ShmRegion;

/// `(state, size)` as laid out in the `syncFlags` region (§3 "SharedSync",
/// §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Empty,
    Full,
}

/// Number of bytes the two-word header occupies.
pub const HEADER_BYTES: usize = 2 * std::mem::size_of::<i32>();

/// View over the two-word `(state, size)` header living at the start of a
/// mapped region. Only the Transferrer ever writes `Full`; only the
/// Sorter-master ever writes `Empty` (§4.5 invariant) — this type enforces
/// neither side, it only gives atomic access to the two words.
pub struct SyncHeader<'a> {
    words: &'a [AtomicI32; 2],
}

impl<'a> SyncHeader<'a> {
    pub fn new(region: &'a mut ShmRegion) -> Self {
        assert!(region.len() >= HEADER_BYTES, "sync header region too small");
        let ptr = region.as_mut_slice().as_mut_ptr() as *const AtomicI32;
        // SAFETY: the region is at least HEADER_BYTES = 2 * size_of::<i32>()
        // long, 8-byte aligned (mmap always returns page-aligned memory),
        // and outlives `'a`.
        let words: &'a [AtomicI32; 2] = unsafe { &*(ptr as *const [AtomicI32; 2]) };
        Self { words }
    }

    pub fn state(&self) -> SyncState {
        match self.words[0].load(Ordering::Acquire) {
            0 => SyncState::Empty,
            _ => SyncState::Full,
        }
    }

    pub fn size(&self) -> i32 {
        self.words[1].load(Ordering::Acquire)
    }

    /// Producer side: write `size` then flip to `Full` (§4.5 "Production").
    /// Size is stored before the state flip so a consumer observing `Full`
    /// always sees a consistent size alongside it.
    pub fn set_full(&self, size: i32) {
        self.words[1].store(size, Ordering::Release);
        self.words[0].store(1, Ordering::Release);
    }

    /// Consumer side: flip back to `Empty` after copying the payload out
    /// (§4.5 "Consumption").
    pub fn set_empty(&self) {
        self.words[0].store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::ShmRegion;

    #[test]
    fn starts_empty_with_zero_size() {
        let name = format!("sortio-sync-test-{}", std::process::id());
        let mut region = ShmRegion::create(&name, HEADER_BYTES).unwrap();
        let header = SyncHeader::new(&mut region);
        assert_eq!(header.state(), SyncState::Empty);
        assert_eq!(header.size(), 0);
    }

    #[test]
    fn set_full_then_set_empty_alternates_state() {
        let name = format!("sortio-sync-test-alt-{}", std::process::id());
        let mut region = ShmRegion::create(&name, HEADER_BYTES).unwrap();
        let header = SyncHeader::new(&mut region);

        header.set_full(42);
        assert_eq!(header.state(), SyncState::Full);
        assert_eq!(header.size(), 42);

        header.set_empty();
        assert_eq!(header.state(), SyncState::Empty);
    }
}
