use std::ptr::NonNull;

use crate::{
    error::{Error, Result},
    kernel::{page_size, request_memory, return_memory},
    utils::align,
};

/// A chunk of memory we own, obtained straight from the kernel.
///
/// The kernel hands out memory in whole pages, so the mapping behind a
/// region is usually a bit bigger than what was asked for. Only the first
/// [`Region::len`] bytes are ever exposed.
///
/// ```text
/// +------------------------------------+-----------+
/// |          len usable bytes          |  unused   |
/// +------------------------------------+-----------+
/// ^                                                ^
/// ptr (page aligned)                  ptr + mapped_len
/// ```
///
/// The memory is zero-initialized when the region is created and it is
/// returned to the kernel when the region is dropped.
pub(crate) struct Region {
    /// Start of the mapping.
    ptr: NonNull<u8>,
    /// Bytes requested by the owner.
    len: usize,
    /// Bytes actually mapped (`len` rounded up to the page size).
    mapped_len: usize,
}

// The region is the only owner of its mapping, so moving it to another thread
// moves the whole memory with it.
unsafe impl Send for Region {}

impl Region {
    /// Maps a new zeroed region of at least `len` bytes. `len` must not be 0.
    pub(crate) fn map(len: usize) -> Result<Self> {
        debug_assert!(len > 0);

        let mapped_len = align(len, page_size());
        let ptr = unsafe { request_memory(mapped_len) }.ok_or(Error::MapFailed { len: mapped_len })?;

        Ok(Self {
            ptr,
            len,
            mapped_len,
        })
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// `len` bytes starting at `start`.
    ///
    /// Only this range is borrowed. Other parts of the region may be in use
    /// through raw pointers handed out earlier, so never build a slice wider
    /// than what is actually read.
    #[inline]
    pub(crate) fn range(&self, start: usize, len: usize) -> &[u8] {
        self.check_range(start, len);
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().add(start), len) }
    }

    /// Mutable version of [`Region::range`].
    #[inline]
    pub(crate) fn range_mut(&mut self, start: usize, len: usize) -> &mut [u8] {
        self.check_range(start, len);
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr().add(start), len) }
    }

    #[inline]
    fn check_range(&self, start: usize, len: usize) {
        assert!(
            start <= self.len && len <= self.len - start,
            "range {start}..{} out of region of {} bytes",
            start.wrapping_add(len),
            self.len
        );
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        unsafe { return_memory(self.ptr, self.mapped_len) }
    }
}
