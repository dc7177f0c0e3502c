/// Number of bytes used to store the payload length in front of every block.
///
/// Every issued block has an associated length prefix that precedes the
/// actual payload:
///
/// ```text
/// +---------------------+ <------+
/// |   payload length    |        | -> W bytes of metadata
/// +---------------------+ <------+ <--- pointer handed to the user
/// |       Content       |        |
/// |         ...         |        | -> payload length bytes
/// |         ...         |        |
/// +---------------------+ <------+
/// ```
///
/// The prefix is as narrow as possible while still being able to hold any
/// length up to the arena capacity, so a small arena does not waste 8 bytes
/// per block on lengths that never need more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum MetadataWidth {
    U8 = 1,
    U16 = 2,
    U32 = 4,
    U64 = 8,
}

impl MetadataWidth {
    /// Picks the smallest width whose bit count is at least
    /// `ceil(log2(capacity + 1))`, the number of bits needed to write
    /// `capacity` itself.
    ///
    /// `usize` is at most 64 bits wide on every supported target, so any
    /// capacity fits in [`MetadataWidth::U64`].
    pub const fn for_capacity(capacity: usize) -> Self {
        let bits = usize::BITS - capacity.leading_zeros();

        if bits <= u8::BITS {
            Self::U8
        } else if bits <= u16::BITS {
            Self::U16
        } else if bits <= u32::BITS {
            Self::U32
        } else {
            Self::U64
        }
    }

    /// Width in bytes.
    #[inline]
    pub const fn bytes(self) -> usize {
        self as usize
    }

    /// Largest length that can be stored with this width.
    pub const fn max_value(self) -> u64 {
        u64::MAX >> (64 - 8 * self.bytes())
    }

    /// Writes `value` into the first [`MetadataWidth::bytes`] bytes of
    /// `buf`, little endian.
    ///
    /// Panics if `buf` is too short. `value` is truncated to the width, so
    /// callers must keep it under [`MetadataWidth::max_value`].
    #[inline]
    pub fn encode(self, buf: &mut [u8], value: u64) {
        debug_assert!(value <= self.max_value());

        let width = self.bytes();
        buf[..width].copy_from_slice(&value.to_le_bytes()[..width]);
    }

    /// Reads back a value written by [`MetadataWidth::encode`].
    ///
    /// Panics if `buf` is too short.
    #[inline]
    pub fn decode(self, buf: &[u8]) -> u64 {
        let width = self.bytes();
        let mut bytes = [0u8; 8];
        bytes[..width].copy_from_slice(&buf[..width]);

        u64::from_le_bytes(bytes)
    }
}
