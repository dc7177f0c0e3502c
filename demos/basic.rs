use std::{io, ptr::NonNull};

use bitalloc::{Allocator, Config};

fn log_alloc(allocator: &Allocator, addr: NonNull<u8>) {
    println!(
        "Received {} bytes at {addr:?} (arena offset {})",
        allocator.block_size(addr).unwrap(),
        allocator.offset_of(addr).unwrap()
    );
}

fn main() {
    let config = Config::default().with_capacity(64).with_default_alignment(1);
    let mut allocator = Allocator::with_config(config).unwrap();

    println!(
        "Arena of {} bytes, {} byte length prefix",
        allocator.capacity(),
        allocator.metadata_width().bytes()
    );

    let addr1 = allocator.allocate(8).unwrap();
    log_alloc(&allocator, addr1);

    let addr2 = allocator.allocate(5).unwrap();
    log_alloc(&allocator, addr2);
    allocator.payload_mut(addr2).unwrap().copy_from_slice(b"arena");

    allocator.release(addr1).unwrap();
    println!("Released first block");

    // Fits in the range the first block left behind.
    let addr3 = allocator.allocate_aligned(4, 4).unwrap();
    log_alloc(&allocator, addr3);

    let addr2 = allocator.reallocate(addr2, 3).unwrap();
    println!(
        "Shrunk second block to {:?}",
        String::from_utf8_lossy(allocator.payload(addr2).unwrap())
    );
    log_alloc(&allocator, addr2);

    let mut out = io::stdout().lock();
    allocator.dump_arena(&mut out).unwrap();
    allocator.dump_occupancy(&mut out).unwrap();
}
