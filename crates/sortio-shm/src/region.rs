use std::ffi::CString;

use sortio_core::SortioError;

/// A POSIX shared-memory mapping (`shm_open` + `mmap`), used for both of
/// the per-host named regions in §4.5/§6 (`syncFlags`, `rawData`).
///
/// The Transferrer creates a region (`O_CREAT`); the local Sorter-master
/// opens the same name read-write without `O_CREAT`, after the READY
/// handshake has proven it exists (§4.5).
pub struct ShmRegion {
    ptr: *mut u8,
    len: usize,
    name: String,
    owner: bool,
}

impl ShmRegion {
    /// Create a new region of `len` bytes, named `name`, owned by the
    /// calling process (the Transferrer). The backing object is unlinked
    /// when this value drops.
    pub fn create(name: &str, len: usize) -> Result<Self, SortioError> {
        let cname = Self::shm_name(name)?;
        let fd = unsafe {
            libc::shm_open(cname.as_ptr(), libc::O_CREAT | libc::O_RDWR, 0o600)
        };
        if fd < 0 {
            return Err(SortioError::Config(format!(
                "shm_open(O_CREAT) failed for {name}: errno={}",
                Self::errno()
            )));
        }
        if unsafe { libc::ftruncate(fd, len as libc::off_t) } < 0 {
            let errno = Self::errno();
            unsafe { libc::close(fd) };
            return Err(SortioError::Config(format!(
                "ftruncate failed for {name}: errno={errno}"
            )));
        }
        let region = Self::map(fd, len, name.to_string(), true)?;
        unsafe { libc::close(fd) };
        Ok(region)
    }

    /// Open an existing region created by the Transferrer (the
    /// Sorter-master side). Does not unlink the backing object on drop.
    pub fn open_existing(name: &str, len: usize) -> Result<Self, SortioError> {
        let cname = Self::shm_name(name)?;
        let fd = unsafe { libc::shm_open(cname.as_ptr(), libc::O_RDWR, 0o600) };
        if fd < 0 {
            return Err(SortioError::Config(format!(
                "shm_open failed for {name}: errno={}",
                Self::errno()
            )));
        }
        let region = Self::map(fd, len, name.to_string(), false)?;
        unsafe { libc::close(fd) };
        Ok(region)
    }

    fn map(fd: i32, len: usize, name: String, owner: bool) -> Result<Self, SortioError> {
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(SortioError::Config(format!(
                "mmap failed for {name}: errno={}",
                Self::errno()
            )));
        }
        Ok(Self { ptr: ptr as *mut u8, len, name, owner })
    }

    fn shm_name(name: &str) -> Result<CString, SortioError> {
        let posix_name = format!("/{name}");
        CString::new(posix_name).map_err(|_| SortioError::Config(format!("invalid shm name {name}")))
    }

    fn errno() -> i32 {
        unsafe { *libc::__errno_location() }
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for ShmRegion {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr as *mut libc::c_void, self.len);
        }
        if self.owner {
            if let Ok(cname) = Self::shm_name(&self.name) {
                unsafe {
                    libc::shm_unlink(cname.as_ptr());
                }
            }
        }
    }
}

// SAFETY: the mapping is backed by a named OS object; all access is
// coordinated by the single-writer-per-field protocol in `sync`/`channel`.
unsafe impl Send for ShmRegion {}
unsafe impl Sync for ShmRegion {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_open_existing_see_the_same_bytes() {
        let name = format!("sortio-shm-test-{}", std::process::id());
        let mut writer = ShmRegion::create(&name, 64).unwrap();
        writer.as_mut_slice()[0] = 0xAB;

        let reader = ShmRegion::open_existing(&name, 64).unwrap();
        assert_eq!(reader.as_slice()[0], 0xAB);
    }

    #[test]
    fn drop_of_owner_unlinks_the_backing_object() {
        let name = format!("sortio-shm-test-unlink-{}", std::process::id());
        {
            let _region = ShmRegion::create(&name, 16).unwrap();
        }
        assert!(ShmRegion::open_existing(&name, 16).is_err());
    }
}
