//! # bitalloc
//!
//! A fixed capacity block allocator. All blocks are carved out of a single
//! arena that is mapped once, up front, and never grows. Which arena bytes
//! are in use is tracked by a bitmap with one bit per byte.
//!
//! ```text
//!   arena (capacity C)
//!   +----+--------------+----+------------------+-------------------------+
//!   | W  |   payload    | W  |     payload      |          free           |
//!   +----+--------------+----+------------------+-------------------------+
//!        ^                   ^
//!        |                   +-- pointer returned by the second allocation
//!        +-- pointer returned by the first allocation
//!
//!   occupancy index (C bits)
//!   1111111111111111111111111111111111111111111110000000000000000000000000
//! ```
//!
//! Every block starts with a `W` byte length prefix, where `W` is the
//! narrowest of 1, 2, 4 or 8 bytes that can hold the arena capacity. The
//! user only ever sees the payload that follows it.
//!
//! Allocation is first-fit: the bitmap is scanned from the lowest offset and
//! the first free run that is long enough, and whose payload address has the
//! requested alignment, is taken. Releasing a block clears its bits and the
//! range is immediately available to the next scan.
//!
//! ```
//! use bitalloc::{Allocator, Error};
//!
//! let mut allocator = Allocator::new(1024).unwrap();
//!
//! let block = allocator.allocate(12).unwrap();
//! allocator.payload_mut(block).unwrap().copy_from_slice(b"hello, arena");
//! assert_eq!(allocator.block_size(block), Ok(12));
//!
//! let block = allocator.reallocate(block, 5).unwrap();
//! assert_eq!(allocator.payload(block).unwrap(), b"hello");
//!
//! allocator.release(block).unwrap();
//! assert_eq!(allocator.issued_bytes(), 0);
//!
//! assert_eq!(allocator.allocate(0), Err(Error::ZeroSize));
//! ```
//!
//! [`Allocator`] is a plain, unsynchronized value. [`LockedAllocator`] puts
//! one behind a lock and implements [`std::alloc::GlobalAlloc`], so it can
//! serve as a drop-in replacement for the system allocator.
//!
//! ## Features
//!
//! - `tracing`: emit [`tracing`](https://docs.rs/tracing) events on every
//!   allocation, reallocation and release.

mod allocator;
mod arena;
mod config;
mod dump;
mod error;
mod global;
mod kernel;
mod metadata;
mod occupancy;
mod region;
mod utils;

pub use allocator::Allocator;
pub use arena::Arena;
pub use config::{Config, DEFAULT_ALIGNMENT, DEFAULT_CAPACITY};
pub use error::{Error, Result};
pub use global::LockedAllocator;
pub use metadata::MetadataWidth;
pub use occupancy::OccupancyIndex;
