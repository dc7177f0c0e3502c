//! This file contains the helper functions for the allocator.
//! These are functions that don't particularly belong to any concrete module of the program.

/// It aligns `to_be_aligned` up to the next multiple of `aligment`.
///
/// This is used to round backing mappings up to a whole number of
/// [`crate::kernel::page_size`] pages. `aligment` must be a power of two.
pub fn align(to_be_aligned: usize, aligment: usize) -> usize {
    (to_be_aligned + aligment - 1) & !(aligment - 1)
}

/// Tells whether `addr` is a multiple of `alignment`.
///
/// Unlike [`align`] this does not require `alignment` to be a power of two,
/// any non zero modulus works.
#[inline]
pub fn is_aligned(addr: usize, alignment: usize) -> bool {
    addr % alignment == 0
}
