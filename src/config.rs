use crate::error::{Error, Result};

/// Arena capacity in bytes used when nothing else is asked for.
pub const DEFAULT_CAPACITY: usize = 8192;

/// Alignment used by [`crate::Allocator::allocate`] and
/// [`crate::Allocator::reallocate`].
///
/// This is the largest alignment any scalar type needs, so whatever the caller
/// stores in a block allocated without an explicit alignment is always
/// correctly aligned.
pub const DEFAULT_ALIGNMENT: usize = 16;

/// Construction parameters of an [`crate::Allocator`].
///
/// ```
/// use bitalloc::{Allocator, Config};
///
/// let config = Config::default().with_capacity(1024).with_default_alignment(8);
/// let allocator = Allocator::with_config(config).unwrap();
///
/// assert_eq!(allocator.capacity(), 1024);
/// assert_eq!(allocator.default_alignment(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Size of the arena in bytes. Fixed for the lifetime of the allocator.
    pub capacity: usize,
    /// Alignment used when the caller does not give one.
    pub default_alignment: usize,
}

impl Config {
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            default_alignment: DEFAULT_ALIGNMENT,
        }
    }

    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub const fn with_default_alignment(mut self, alignment: usize) -> Self {
        self.default_alignment = alignment;
        self
    }

    /// Checks that an allocator can actually be built from this configuration.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::ZeroCapacity);
        }

        if self.default_alignment == 0 {
            return Err(Error::ZeroAlignment);
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
