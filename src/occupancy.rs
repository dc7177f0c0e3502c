use crate::{error::Result, region::Region};

/// One bit per arena byte telling whether that byte currently belongs to an
/// issued block (its metadata or its payload).
///
/// Bits are packed eight per storage byte, most significant bit first, so bit
/// `i` lives in byte `i / 8` under the mask `0x80 >> (i % 8)`:
///
/// ```text
///   arena:  | b0 | b1 | b2 | b3 | b4 | b5 | b6 | b7 | b8 | ...
///   index:  |  1    1    1    0    0    1    1    0 |  0   ...
///           +---------------- byte 0 --------------+-- byte 1 ...
/// ```
///
/// Since every byte is tracked on its own, releasing a block just clears its
/// bits and the freed run becomes available to the next scan: there is no
/// free list to keep in sync and no coalescing step.
///
/// The index does not know about blocks. Keeping every access under
/// [`OccupancyIndex::len`] is up to the caller; out of range indices panic.
pub struct OccupancyIndex {
    bits: Region,
    len: usize,
}

impl OccupancyIndex {
    /// Creates an index for `len` bytes with every byte free.
    pub(crate) fn new(len: usize) -> Result<Self> {
        Ok(Self {
            bits: Region::map(len.div_ceil(8))?,
            len,
        })
    }

    /// Number of tracked bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn mask(i: usize) -> u8 {
        0x80 >> (i % 8)
    }

    /// Whether byte `i` is issued.
    #[inline]
    pub fn test(&self, i: usize) -> bool {
        assert!(i < self.len, "occupancy index {i} out of range");
        self.bits.range(i / 8, 1)[0] & Self::mask(i) != 0
    }

    /// Marks byte `i` as issued or free.
    #[inline]
    pub fn set(&mut self, i: usize, issued: bool) {
        assert!(i < self.len, "occupancy index {i} out of range");

        let byte = &mut self.bits.range_mut(i / 8, 1)[0];
        if issued {
            *byte |= Self::mask(i);
        } else {
            *byte &= !Self::mask(i);
        }
    }

    /// Marks every byte in `start..end` as issued or free.
    pub fn set_range(&mut self, start: usize, end: usize, issued: bool) {
        for i in start..end {
            self.set(i, issued);
        }
    }

    /// Number of issued bytes.
    pub fn count_issued(&self) -> usize {
        self.as_bytes()
            .iter()
            .map(|byte| byte.count_ones() as usize)
            .sum()
    }

    /// Packed storage, `len.div_ceil(8)` bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.bits.range(0, self.bits.len())
    }
}
