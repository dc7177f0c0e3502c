use thiserror::Error;

/// Result type of every fallible operation of the allocator.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while talking to the allocator.
///
/// Failures are always handed back to the immediate caller. The allocator
/// never retries internally and never aborts the process: an
/// [`Error::OutOfSpace`] is terminal for that call, but the same request may
/// succeed later once other blocks have been released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// Requested a block with a payload of zero bytes.
    #[error("requested a zero sized block")]
    ZeroSize,

    /// Requested an alignment of zero.
    #[error("requested an alignment of zero")]
    ZeroAlignment,

    /// Requested more bytes than the whole arena holds.
    #[error("requested {size} bytes but the arena capacity is {capacity} bytes")]
    SizeExceedsCapacity { size: usize, capacity: usize },

    /// There is no free, correctly aligned run long enough for the block.
    #[error("no free run of {size} bytes aligned to {alignment} left in the arena")]
    OutOfSpace { size: usize, alignment: usize },

    /// Tried to build an arena that can hold nothing.
    #[error("arena capacity must be greater than zero")]
    ZeroCapacity,

    /// The address can't be a payload pointer handed out by this arena.
    #[error("address {addr:#x} does not point into the arena")]
    ForeignPointer { addr: usize },

    /// The block metadata describes a block that would run past the arena end.
    #[error("block at offset {offset} claims {len} bytes, past the end of the arena")]
    CorruptBlock { offset: usize, len: usize },

    /// The operating system refused to map the backing memory.
    #[error("could not map {len} bytes of backing memory")]
    MapFailed { len: usize },
}

impl Error {
    /// Tells whether the error was caused by a bad argument rather than by
    /// the state of the arena.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Error::ZeroSize | Error::ZeroAlignment | Error::SizeExceedsCapacity { .. }
        )
    }
}
