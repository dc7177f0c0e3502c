use std::ptr::{self, NonNull};

use crate::{error::Result, region::Region};

/// The fixed capacity byte buffer every payload is carved out of.
///
/// It is addressed by offsets everywhere inside the crate. Addresses only
/// show up at the public boundary of [`crate::Allocator`], through
/// [`Arena::base`].
///
/// Live blocks are written by their owners through the raw pointers the
/// allocator returned, so the arena never borrows more than the bytes one
/// operation touches: the metadata of a single block, or a single payload.
pub struct Arena {
    memory: Region,
}

impl Arena {
    /// Maps a new zeroed arena of `capacity` bytes.
    pub(crate) fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            memory: Region::map(capacity)?,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.memory.len()
    }

    /// Address of offset 0. It is always page aligned.
    #[inline]
    pub fn base(&self) -> NonNull<u8> {
        // Regions never hand out null pointers.
        unsafe { NonNull::new_unchecked(self.memory.as_ptr()) }
    }

    /// Byte at `offset`. Panics past the end of the arena.
    #[inline]
    pub fn byte(&self, offset: usize) -> u8 {
        self.memory.range(offset, 1)[0]
    }

    /// `len` bytes starting at `offset`. Panics past the end of the arena.
    #[inline]
    pub fn slice(&self, offset: usize, len: usize) -> &[u8] {
        self.memory.range(offset, len)
    }

    #[inline]
    pub fn slice_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        self.memory.range_mut(offset, len)
    }

    /// Copies `len` bytes from offset `src` to offset `dst`. Both ranges must
    /// be inside the arena and must not overlap.
    pub(crate) fn copy(&mut self, src: usize, dst: usize, len: usize) {
        assert!(src + len <= self.capacity() && dst + len <= self.capacity());
        debug_assert!(src + len <= dst || dst + len <= src);

        unsafe {
            let base = self.memory.as_ptr();
            ptr::copy_nonoverlapping(base.add(src), base.add(dst), len);
        }
    }
}
