use std::{
    alloc::{GlobalAlloc, Layout},
    ptr::{self, NonNull},
};

use spin::Mutex;

use crate::{
    allocator::Allocator,
    config::DEFAULT_CAPACITY,
    error::Result,
};

/// An [`Allocator`] behind a spin lock, with its arena capacity fixed at
/// compile time.
///
/// Every entry point takes the lock for the whole operation, so the scan and
/// the commit of an allocation can't interleave with another thread. The
/// arena is mapped the first time the allocator is used, which is what lets
/// [`LockedAllocator::new`] be a `const fn` and the type be used as the
/// program's global allocator:
///
/// ```no_run
/// use bitalloc::LockedAllocator;
///
/// #[global_allocator]
/// static ALLOCATOR: LockedAllocator<{ 1 << 20 }> = LockedAllocator::new();
///
/// fn main() {
///     let numbers: Vec<u32> = (0..10).collect();
///     assert_eq!(numbers.len(), 10);
/// }
/// ```
///
/// When used as the global allocator, don't enable the `tracing` feature:
/// a subscriber that allocates while an event is being recorded would try to
/// take the lock it is already holding.
pub struct LockedAllocator<const N: usize = DEFAULT_CAPACITY> {
    inner: Mutex<Option<Allocator>>,
}

impl<const N: usize> LockedAllocator<N> {
    /// # Panics
    /// This function will panic if `N` is zero. When assigned to a `static`
    /// this turns into a compile error.
    pub const fn new() -> Self {
        assert!(N > 0, "arena capacity must be greater than zero");

        Self {
            inner: Mutex::new(None),
        }
    }

    /// Runs `f` with exclusive access to the underlying [`Allocator`],
    /// mapping the arena first if this is the first use.
    pub fn with_allocator<R>(&self, f: impl FnOnce(&mut Allocator) -> R) -> Result<R> {
        let mut guard = self.inner.lock();

        let allocator = match &mut *guard {
            Some(allocator) => allocator,
            slot @ None => slot.insert(Allocator::new(N)?),
        };

        Ok(f(allocator))
    }

    fn try_with<T>(&self, f: impl FnOnce(&mut Allocator) -> Result<T>) -> Result<T> {
        self.with_allocator(f).and_then(|result| result)
    }
}

impl<const N: usize> Default for LockedAllocator<N> {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl<const N: usize> GlobalAlloc for LockedAllocator<N> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.try_with(|allocator| allocator.allocate_aligned(layout.size(), layout.align()))
            .map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        if let Some(ptr) = NonNull::new(ptr) {
            let _ = self.try_with(|allocator| allocator.release(ptr));
        }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let Some(ptr) = NonNull::new(ptr) else {
            return ptr::null_mut();
        };

        self.try_with(|allocator| allocator.reallocate_aligned(ptr, new_size, layout.align()))
            .map_or(ptr::null_mut(), NonNull::as_ptr)
    }
}
