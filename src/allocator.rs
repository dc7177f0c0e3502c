use std::{cmp, ptr::NonNull};

use crate::{
    arena::Arena,
    config::Config,
    error::{Error, Result},
    metadata::MetadataWidth,
    occupancy::OccupancyIndex,
    utils::is_aligned,
};

/// Fixed capacity, first-fit block allocator over a single arena.
///
/// Every block is a length prefix followed by the payload, and the bytes of
/// both are marked in an [`OccupancyIndex`] that has one bit per arena byte:
///
/// ```text
///   offset:     0    1    2    3    4    5    6    7    8    9   10   ...
///   arena:   | W  | payload (3)  | W  | payload (4)       |  free ...
///   index:   | 1    1    1    1  | 1    1    1    1    1  |  0    0 ...
///                 ^                   ^
///                 returned            returned
/// ```
///
/// Allocations scan the index from the lowest offset up and take the first
/// free run that is long enough and whose payload address is correctly
/// aligned. Releasing a block clears its bits, nothing else.
///
/// The allocator is a plain value: each instance owns its own arena, so any
/// number of independent arenas can coexist. It is not synchronized, see
/// [`crate::LockedAllocator`] for a version that can be shared between threads.
pub struct Allocator {
    arena: Arena,
    occupancy: OccupancyIndex,
    width: MetadataWidth,
    default_alignment: usize,
}

impl Allocator {
    /// Creates an allocator with an arena of `capacity` bytes and the default
    /// alignment.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_config(Config::new(capacity))
    }

    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;

        let width = MetadataWidth::for_capacity(config.capacity);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            capacity = config.capacity,
            width = width.bytes(),
            "mapping arena"
        );

        Ok(Self {
            arena: Arena::new(config.capacity)?,
            occupancy: OccupancyIndex::new(config.capacity)?,
            width,
            default_alignment: config.default_alignment,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Width of the length prefix stored in front of every payload.
    #[inline]
    pub fn metadata_width(&self) -> MetadataWidth {
        self.width
    }

    #[inline]
    pub fn default_alignment(&self) -> usize {
        self.default_alignment
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn occupancy(&self) -> &OccupancyIndex {
        &self.occupancy
    }

    /// Bytes currently belonging to blocks, metadata included.
    pub fn issued_bytes(&self) -> usize {
        self.occupancy.count_issued()
    }

    pub fn free_bytes(&self) -> usize {
        self.capacity() - self.issued_bytes()
    }

    /// Allocates a block of `size` bytes aligned to
    /// [`Allocator::default_alignment`].
    pub fn allocate(&mut self, size: usize) -> Result<NonNull<u8>> {
        self.allocate_aligned(size, self.default_alignment)
    }

    /// Allocates a block of `size` bytes whose address is a multiple of
    /// `alignment`.
    ///
    /// `alignment` is normally a power of two but doesn't have to be: any
    /// other modulus is honored as well, it just rarely fits.
    ///
    /// The returned pointer stays valid for reads and writes of `size` bytes
    /// until the block is released or the allocator is dropped.
    pub fn allocate_aligned(&mut self, size: usize, alignment: usize) -> Result<NonNull<u8>> {
        let offset = self.allocate_offset(size, alignment)?;

        Ok(self.pointer_to(offset))
    }

    /// Moves the block at `ptr` to a new block of `new_size` bytes aligned to
    /// [`Allocator::default_alignment`].
    pub fn reallocate(&mut self, ptr: NonNull<u8>, new_size: usize) -> Result<NonNull<u8>> {
        self.reallocate_aligned(ptr, new_size, self.default_alignment)
    }

    /// Moves the block at `ptr` to a new block of `new_size` bytes aligned to
    /// `alignment`, keeping the first `min(old size, new_size)` bytes.
    ///
    /// The block always moves, even when it could have grown or shrunk in
    /// place. If the new block can't be allocated the old one is left
    /// untouched and still valid.
    pub fn reallocate_aligned(
        &mut self,
        ptr: NonNull<u8>,
        new_size: usize,
        alignment: usize,
    ) -> Result<NonNull<u8>> {
        let (old_start, old_size) = self.block_at(ptr)?;
        let new_offset = self.allocate_offset(new_size, alignment)?;

        let width = self.width.bytes();
        self.arena
            .copy(old_start + width, new_offset, cmp::min(old_size, new_size));
        self.occupancy
            .set_range(old_start, old_start + width + old_size, false);

        #[cfg(feature = "tracing")]
        tracing::trace!(
            from = old_start + width,
            to = new_offset,
            old_size,
            new_size,
            "reallocated block"
        );

        Ok(self.pointer_to(new_offset))
    }

    /// Gives the block at `ptr` back to the arena.
    ///
    /// `ptr` must have been returned by this allocator and not released
    /// since. The allocator can't tell a live block from a stale one: passing
    /// a pointer that doesn't start a live block corrupts the occupancy of
    /// whatever lives around it. Pointers outside of the arena are rejected.
    pub fn release(&mut self, ptr: NonNull<u8>) -> Result<()> {
        let (start, size) = self.block_at(ptr)?;

        self.occupancy
            .set_range(start, start + self.width.bytes() + size, false);

        #[cfg(feature = "tracing")]
        tracing::trace!(offset = start + self.width.bytes(), size, "released block");

        Ok(())
    }

    /// Payload size of the block at `ptr`, as requested when it was
    /// allocated. Same contract as [`Allocator::release`].
    pub fn block_size(&self, ptr: NonNull<u8>) -> Result<usize> {
        self.block_at(ptr).map(|(_, size)| size)
    }

    /// Arena offset of the payload `ptr` points to.
    pub fn offset_of(&self, ptr: NonNull<u8>) -> Result<usize> {
        let addr = ptr.as_ptr() as usize;

        addr.checked_sub(self.base_addr())
            .filter(|offset| (self.width.bytes()..self.capacity()).contains(offset))
            .ok_or(Error::ForeignPointer { addr })
    }

    /// Payload of the block at `ptr`.
    pub fn payload(&self, ptr: NonNull<u8>) -> Result<&[u8]> {
        let (start, size) = self.block_at(ptr)?;
        let offset = start + self.width.bytes();

        Ok(self.arena.slice(offset, size))
    }

    /// Mutable payload of the block at `ptr`.
    pub fn payload_mut(&mut self, ptr: NonNull<u8>) -> Result<&mut [u8]> {
        let (start, size) = self.block_at(ptr)?;
        let offset = start + self.width.bytes();

        Ok(self.arena.slice_mut(offset, size))
    }

    #[inline]
    fn base_addr(&self) -> usize {
        self.arena.base().as_ptr() as usize
    }

    #[inline]
    fn pointer_to(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset < self.capacity());
        unsafe { self.arena.base().add(offset) }
    }

    /// Start offset and payload size of the block whose payload `ptr`
    /// points to.
    fn block_at(&self, ptr: NonNull<u8>) -> Result<(usize, usize)> {
        let offset = self.offset_of(ptr)?;
        let start = offset - self.width.bytes();

        let stored = self.width.decode(self.arena.slice(start, self.width.bytes()));
        let corrupt = Error::CorruptBlock {
            offset: start,
            len: usize::try_from(stored).unwrap_or(usize::MAX),
        };
        let size = usize::try_from(stored).map_err(|_| corrupt)?;

        if size > self.capacity() - offset {
            return Err(corrupt);
        }

        Ok((start, size))
    }

    fn check_request(&self, size: usize, alignment: usize) -> Result<()> {
        if size == 0 {
            return Err(Error::ZeroSize);
        }

        if size > self.capacity() {
            return Err(Error::SizeExceedsCapacity {
                size,
                capacity: self.capacity(),
            });
        }

        if alignment == 0 {
            return Err(Error::ZeroAlignment);
        }

        Ok(())
    }

    /// Issues a block and returns the offset of its payload.
    fn allocate_offset(&mut self, size: usize, alignment: usize) -> Result<usize> {
        self.check_request(size, alignment)?;

        let Some(start) = self.find_free_run(size, alignment) else {
            #[cfg(feature = "tracing")]
            tracing::trace!(size, alignment, "arena out of space");

            return Err(Error::OutOfSpace { size, alignment });
        };

        let width = self.width.bytes();
        self.occupancy.set_range(start, start + width + size, true);
        // `size` is at most the capacity, which always fits in the width.
        self.width
            .encode(self.arena.slice_mut(start, width), size as u64);

        #[cfg(feature = "tracing")]
        tracing::trace!(offset = start + width, size, alignment, "allocated block");

        Ok(start + width)
    }

    /// Returns the start offset of the first run of free bytes that can hold
    /// the metadata plus `size` payload bytes with the payload aligned to
    /// `alignment`.
    ///
    /// This is a first-fit scan, one byte at a time. A run may only start at
    /// an offset whose payload address would be aligned; a misaligned free
    /// byte is skipped and the next one is tried, without jumping ahead to
    /// the next aligned offset.
    fn find_free_run(&self, size: usize, alignment: usize) -> Option<usize> {
        let width = self.width.bytes();
        let needed = width + size;
        let base = self.base_addr();

        // (start, len) of the run being grown.
        let mut run: Option<(usize, usize)> = None;

        for i in 0..self.capacity() {
            if self.occupancy.test(i) {
                run = None;
                continue;
            }

            let (start, len) = match run {
                Some(run) => run,
                None if is_aligned(base + i + width, alignment) => (i, 0),
                None => continue,
            };

            if len + 1 == needed {
                return Some(start);
            }

            run = Some((start, len + 1));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Small arena with byte alignment, so offsets are predictable.
    fn byte_aligned(capacity: usize) -> Allocator {
        Allocator::with_config(Config::new(capacity).with_default_alignment(1)).unwrap()
    }

    #[test]
    fn metadata_width_is_fixed_at_construction() {
        assert_eq!(Allocator::new(64).unwrap().metadata_width(), MetadataWidth::U8);
        assert_eq!(Allocator::new(8192).unwrap().metadata_width(), MetadataWidth::U16);
        assert_eq!(Allocator::new(70_000).unwrap().metadata_width(), MetadataWidth::U32);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(Allocator::new(0), Err(Error::ZeroCapacity)));
    }

    #[test]
    fn invalid_requests_fail() {
        let mut allocator = Allocator::new(64).unwrap();

        assert_eq!(allocator.allocate(0), Err(Error::ZeroSize));
        assert_eq!(allocator.allocate_aligned(8, 0), Err(Error::ZeroAlignment));
        assert_eq!(
            allocator.allocate(65),
            Err(Error::SizeExceedsCapacity { size: 65, capacity: 64 })
        );
        assert_eq!(allocator.issued_bytes(), 0);
    }

    #[test]
    fn first_block_follows_its_metadata() {
        let mut allocator = byte_aligned(64);

        let block = allocator.allocate(10).unwrap();

        assert_eq!(allocator.offset_of(block), Ok(1));
        assert_eq!(allocator.block_size(block), Ok(10));
        assert_eq!(allocator.arena().byte(0), 10);
        assert_eq!(allocator.issued_bytes(), 11);
    }

    #[test]
    fn released_range_is_reused_first() {
        let mut allocator = byte_aligned(64);

        let first = allocator.allocate(5).unwrap();
        let second = allocator.allocate(5).unwrap();
        assert_eq!(allocator.offset_of(first), Ok(1));
        assert_eq!(allocator.offset_of(second), Ok(7));

        allocator.release(first).unwrap();
        let third = allocator.allocate(5).unwrap();

        assert_eq!(third, first);
        assert_eq!(allocator.issued_bytes(), 12);
    }

    #[test]
    fn shrinking_keeps_the_prefix_and_frees_the_old_block() {
        let mut allocator = byte_aligned(64);

        let block = allocator.allocate(8).unwrap();
        allocator
            .payload_mut(block)
            .unwrap()
            .copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);

        let shrunk = allocator.reallocate(block, 4).unwrap();

        assert_ne!(shrunk, block);
        assert_eq!(allocator.payload(shrunk).unwrap(), &[1, 2, 3, 4]);
        assert_eq!(allocator.block_size(shrunk), Ok(4));
        assert_eq!(allocator.issued_bytes(), 5);

        // The old block is free again and is the first fit.
        let reused = allocator.allocate(8).unwrap();
        assert_eq!(reused, block);
    }

    #[test]
    fn growing_keeps_the_whole_payload() {
        let mut allocator = Allocator::new(256).unwrap();

        let block = allocator.allocate(4).unwrap();
        unsafe {
            block.as_ptr().cast::<u32>().write(0xDEADBEEF);
        }

        let grown = allocator.reallocate(block, 32).unwrap();

        assert_eq!(unsafe { grown.as_ptr().cast::<u32>().read() }, 0xDEADBEEF);
        assert_eq!(allocator.block_size(grown), Ok(32));
        // 256 needs 9 bits, so the prefix is two bytes wide.
        assert_eq!(allocator.metadata_width(), MetadataWidth::U16);
        assert_eq!(allocator.issued_bytes(), 34);
    }

    #[test]
    fn failed_reallocation_leaves_the_block_alone() {
        let mut allocator = byte_aligned(64);

        let block = allocator.allocate(40).unwrap();
        allocator.payload_mut(block).unwrap().fill(0xAB);

        assert_eq!(
            allocator.reallocate(block, 30),
            Err(Error::OutOfSpace { size: 30, alignment: 1 })
        );
        assert_eq!(allocator.block_size(block), Ok(40));
        assert!(allocator.payload(block).unwrap().iter().all(|&byte| byte == 0xAB));
        assert_eq!(allocator.issued_bytes(), 41);

        assert_eq!(allocator.reallocate(block, 0), Err(Error::ZeroSize));
        assert_eq!(allocator.block_size(block), Ok(40));
    }

    #[test]
    fn full_arena_is_out_of_space() {
        let mut allocator = byte_aligned(64);

        // Metadata and payload can't both fit in 64 bytes.
        assert_eq!(
            allocator.allocate(64),
            Err(Error::OutOfSpace { size: 64, alignment: 1 })
        );

        let block = allocator.allocate(63).unwrap();
        assert_eq!(allocator.free_bytes(), 0);
        assert_eq!(
            allocator.allocate(1),
            Err(Error::OutOfSpace { size: 1, alignment: 1 })
        );

        allocator.release(block).unwrap();
        assert_eq!(allocator.free_bytes(), 64);
        assert!(allocator.allocate(1).is_ok());
    }

    #[test]
    fn fragmented_space_does_not_fit() {
        let mut allocator = byte_aligned(32);

        let blocks: Vec<_> = (0..4).map(|_| allocator.allocate(7).unwrap()).collect();
        allocator.release(blocks[0]).unwrap();
        allocator.release(blocks[2]).unwrap();

        // 16 free bytes, but in two separate runs of 8.
        assert_eq!(allocator.free_bytes(), 16);
        assert!(allocator.allocate(8).is_err());
        assert_eq!(allocator.allocate(7), Ok(blocks[0]));
        assert_eq!(allocator.allocate(7), Ok(blocks[2]));
    }

    #[test]
    fn default_alignment_is_used() {
        let mut allocator = Allocator::new(256).unwrap();

        for size in [1, 3, 8, 13] {
            let block = allocator.allocate(size).unwrap();
            assert_eq!(block.as_ptr() as usize % 16, 0);
        }
    }

    #[test]
    fn explicit_alignment_is_honored() {
        let mut allocator = Allocator::new(4096).unwrap();

        for alignment in [1, 2, 4, 8, 16, 32, 64, 128, 256] {
            let block = allocator.allocate_aligned(5, alignment).unwrap();
            assert_eq!(block.as_ptr() as usize % alignment, 0);
            assert_eq!(allocator.block_size(block), Ok(5));
        }
    }

    #[test]
    fn alignment_need_not_be_a_power_of_two() {
        let mut allocator = Allocator::new(128).unwrap();

        let block = allocator.allocate_aligned(4, 3).unwrap();

        assert_eq!(block.as_ptr() as usize % 3, 0);
    }

    #[test]
    fn wider_metadata_prefix() {
        let mut allocator = Allocator::with_config(Config::new(8192).with_default_alignment(1)).unwrap();

        let block = allocator.allocate(300).unwrap();

        assert_eq!(allocator.offset_of(block), Ok(2));
        assert_eq!(allocator.block_size(block), Ok(300));
        assert_eq!(allocator.arena().slice(0, 2), &300u16.to_le_bytes());
        assert_eq!(allocator.issued_bytes(), 302);
    }

    #[test]
    fn pointers_outside_the_arena_are_rejected() {
        let mut allocator = byte_aligned(64);
        let mut other = byte_aligned(64);

        let foreign = other.allocate(4).unwrap();
        let addr = foreign.as_ptr() as usize;
        assert_eq!(allocator.release(foreign), Err(Error::ForeignPointer { addr }));
        assert_eq!(allocator.block_size(foreign), Err(Error::ForeignPointer { addr }));

        // Offset 0 can only hold metadata.
        let base = allocator.arena().base();
        let addr = base.as_ptr() as usize;
        assert_eq!(allocator.block_size(base), Err(Error::ForeignPointer { addr }));
    }

    #[test]
    fn corrupt_metadata_is_detected() {
        let mut allocator = byte_aligned(64);

        let block = allocator.allocate(4).unwrap();
        unsafe {
            block.as_ptr().sub(1).write(200);
        }

        assert_eq!(
            allocator.block_size(block),
            Err(Error::CorruptBlock { offset: 0, len: 200 })
        );
        assert!(allocator.release(block).is_err());
        assert_eq!(allocator.issued_bytes(), 5);
    }

    #[test]
    fn live_view_survives_other_blocks() {
        let mut allocator = byte_aligned(64);

        let held = allocator.allocate(4).unwrap();
        let view = unsafe { std::slice::from_raw_parts_mut(held.as_ptr(), 4) };
        view.copy_from_slice(&[9, 8, 7, 6]);

        let other = allocator.allocate(8).unwrap();
        allocator.payload_mut(other).unwrap().fill(1);
        let other = allocator.reallocate(other, 2).unwrap();
        assert_eq!(allocator.block_size(other), Ok(2));
        allocator.release(other).unwrap();

        view[3] = 5;
        assert_eq!(&view[..], &[9, 8, 7, 5]);
        assert_eq!(allocator.payload(held).unwrap(), &[9, 8, 7, 5]);
        assert_eq!(allocator.block_size(held), Ok(4));
    }

    #[test]
    fn independent_arenas() {
        let mut first = byte_aligned(64);
        let mut second = byte_aligned(64);

        let a = first.allocate(10).unwrap();
        let b = second.allocate(10).unwrap();

        assert_ne!(a, b);
        assert_eq!(first.offset_of(a), second.offset_of(b));
        first.release(a).unwrap();
        assert_eq!(first.issued_bytes(), 0);
        assert_eq!(second.issued_bytes(), 11);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn allocations_are_aligned_and_sized(
                requests in proptest::collection::vec((1_usize..200, 0_u32..7), 1..20)
            ) {
                let mut allocator = Allocator::new(4096).unwrap();
                let width = allocator.metadata_width().bytes();
                let mut blocks = Vec::new();

                for (size, shift) in requests {
                    let alignment = 1 << shift;
                    if let Ok(block) = allocator.allocate_aligned(size, alignment) {
                        prop_assert_eq!(block.as_ptr() as usize % alignment, 0);
                        prop_assert_eq!(allocator.block_size(block), Ok(size));
                        blocks.push((block, size));
                    }
                }

                // Live blocks never overlap.
                let issued: usize = blocks.iter().map(|(_, size)| width + size).sum();
                prop_assert_eq!(allocator.issued_bytes(), issued);
                prop_assert!(issued <= allocator.capacity());

                for (block, _) in blocks {
                    allocator.release(block).unwrap();
                }
                prop_assert_eq!(allocator.issued_bytes(), 0);
            }

            #[test]
            fn released_range_fits_the_same_request(
                sizes in proptest::collection::vec(1_usize..64, 2..10),
                victim in any::<prop::sample::Index>(),
            ) {
                let mut allocator = Allocator::with_config(Config::new(1024).with_default_alignment(1)).unwrap();
                let blocks: Vec<_> = sizes.iter().map(|&size| allocator.allocate(size).unwrap()).collect();
                let issued = allocator.issued_bytes();

                let i = victim.index(blocks.len());
                allocator.release(blocks[i]).unwrap();
                let again = allocator.allocate(sizes[i]).unwrap();

                prop_assert_eq!(again, blocks[i]);
                prop_assert_eq!(allocator.issued_bytes(), issued);
            }

            #[test]
            fn reallocation_keeps_the_common_prefix(
                payload in proptest::collection::vec(any::<u8>(), 1..100),
                new_size in 1_usize..100,
            ) {
                let mut allocator = Allocator::new(512).unwrap();

                let block = allocator.allocate(payload.len()).unwrap();
                allocator.payload_mut(block).unwrap().copy_from_slice(&payload);

                let moved = allocator.reallocate(block, new_size).unwrap();
                let kept = payload.len().min(new_size);

                prop_assert_eq!(&allocator.payload(moved).unwrap()[..kept], &payload[..kept]);
                prop_assert_eq!(allocator.block_size(moved), Ok(new_size));
                prop_assert_eq!(
                    allocator.issued_bytes(),
                    allocator.metadata_width().bytes() + new_size
                );
            }
        }
    }
}
