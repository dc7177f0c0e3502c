use std::{
    ptr::NonNull,
    sync::atomic::{AtomicUsize, Ordering},
};

/// Virtual memory page size of the computer. This is usually 4096.
/// It can't be a constant since we don't know the value at compile time,
/// so it is queried once and cached here. Zero means "not queried yet".
static PAGE_SIZE: AtomicUsize = AtomicUsize::new(0);

/// The platform layer of the allocator. Both the arena and the occupancy
/// index live in memory we get directly from the kernel rather than from the
/// Rust global allocator, which is what allows a [`crate::LockedAllocator`] to
/// be the `#[global_allocator]` of a program without calling into itself.
pub(crate) struct Kernel;

/// This trait provides an abstraction to handle low level memory operations
/// and syscalls. The allocator does not care about the concrete APIs offered
/// by each kernel, only that it gets zeroed, page aligned memory.
trait PlatformMemory {
    /// Request a zero-initialized memory region of size `len`. It returns a
    /// pointer to the given location or None if the underlying syscall fails.
    unsafe fn request_memory(len: usize) -> Option<NonNull<u8>>;

    /// Returns the memory of size `len` starting from `addr` back to the kernel.
    unsafe fn return_memory(addr: NonNull<u8>, len: usize);

    /// Returns the virtual memory page size of the computer in bytes.
    unsafe fn page_size() -> usize;
}

/// Wrapper to calculate the computer's page size.
#[inline]
pub(crate) fn page_size() -> usize {
    match PAGE_SIZE.load(Ordering::Relaxed) {
        0 => {
            let size = unsafe { Kernel::page_size() };
            PAGE_SIZE.store(size, Ordering::Relaxed);
            size
        }
        size => size,
    }
}

/// Wrapper to use [`PlatformMemory::request_memory`].
///
/// **SAFETY**: `len` must be a non zero multiple of [`page_size`].
#[inline]
pub(crate) unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
    unsafe { Kernel::request_memory(len) }
}

/// Wrapper to use [`PlatformMemory::return_memory`].
///
/// **SAFETY**: `addr` and `len` must describe exactly one mapping previously
/// obtained from [`request_memory`], and nothing may touch it afterwards.
#[inline]
pub(crate) unsafe fn return_memory(addr: NonNull<u8>, len: usize) {
    unsafe { Kernel::return_memory(addr, len) }
}

#[cfg(unix)]
mod unix {
    use super::{Kernel, PlatformMemory};

    use libc::{mmap, munmap, off_t, size_t};

    use std::{
        os::raw::{c_int, c_void},
        ptr::NonNull,
    };

    impl PlatformMemory for Kernel {
        unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
            // mmap parameters.
            const ADDR: *mut c_void = std::ptr::null_mut::<c_void>();
            // Read-Write only memory.
            const PROT: c_int = libc::PROT_READ | libc::PROT_WRITE;
            // Anonymous mappings are always zero filled.
            const FLAGS: c_int = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;
            const FD: c_int = -1;
            const OFFSET: off_t = 0;

            unsafe {
                match mmap(ADDR, len as size_t, PROT, FLAGS, FD, OFFSET) {
                    libc::MAP_FAILED => None,
                    addr => NonNull::new(addr.cast::<u8>()),
                }
            }
        }

        unsafe fn return_memory(addr: NonNull<u8>, len: usize) {
            unsafe {
                munmap(addr.as_ptr().cast::<c_void>(), len as size_t);
            }
        }

        unsafe fn page_size() -> usize {
            unsafe { libc::sysconf(libc::_SC_PAGE_SIZE) as usize }
        }
    }
}

#[cfg(windows)]
mod windows {
    use std::{mem::MaybeUninit, os::raw::c_void, ptr::NonNull};

    use super::{Kernel, PlatformMemory};

    use windows::Win32::System::{Memory, SystemInformation};

    impl PlatformMemory for Kernel {
        unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
            // Read-Write only.
            let protection = Memory::PAGE_READWRITE;

            // Committed pages are zero filled.
            let flags = Memory::MEM_RESERVE | Memory::MEM_COMMIT;

            unsafe {
                let addr = Memory::VirtualAlloc(None, len, flags, protection);

                NonNull::new(addr.cast::<u8>())
            }
        }

        unsafe fn return_memory(addr: NonNull<u8>, _len: usize) {
            unsafe {
                let _ = Memory::VirtualFree(addr.as_ptr().cast::<c_void>(), 0, Memory::MEM_RELEASE);
            }
        }

        unsafe fn page_size() -> usize {
            unsafe {
                let mut system_info = MaybeUninit::uninit();
                SystemInformation::GetSystemInfo(system_info.as_mut_ptr());

                system_info.assume_init().dwPageSize as usize
            }
        }
    }
}
