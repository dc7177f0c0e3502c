//! Runs a small program with [`LockedAllocator`] as its global allocator.
//! Every `Box`, `Vec` and `String` below is carved out of one 256 KiB arena,
//! and the checks along the way show the bitmap at work.

use std::{alloc::Layout, thread};

use bitalloc::LockedAllocator;

#[global_allocator]
static ARENA: LockedAllocator<{ 1 << 18 }> = LockedAllocator::new();

fn issued() -> usize {
    ARENA.with_allocator(|inner| inner.issued_bytes()).unwrap_or(0)
}

fn main() {
    let width = ARENA
        .with_allocator(|inner| inner.metadata_width().bytes())
        .expect("could not map the arena");
    println!("Arena mapped, {width} byte length prefix per block");

    // Each block costs its payload plus the prefix, whatever the type.
    let before = issued();
    let number = Box::new(0x1122_3344_5566_7788u64);
    assert_eq!(issued() - before, width + 8);
    println!("Box<u64> at {:p} took {} bytes", number, issued() - before);

    // Growing a Vec always moves it: realloc never extends in place.
    let mut squares: Vec<u32> = Vec::with_capacity(2);
    let mut moves = 0;
    for i in 0..32 {
        let old = squares.as_ptr();
        squares.push(i * i);
        if squares.as_ptr() != old {
            moves += 1;
        }
    }
    println!("Vec of {} squares moved {moves} times while growing", squares.len());
    assert_eq!(squares[31], 961);

    // First fit: a released range is handed out again before anything past it.
    let first = Box::new([1u8; 48]);
    let fence = Box::new([2u8; 48]);
    let first_addr = first.as_ptr();
    drop(first);

    let again = Box::new([3u8; 48]);
    assert_eq!(again.as_ptr(), first_addr);
    assert!(fence.iter().all(|&byte| byte == 2));
    println!("Released block at {:p} was reused by the next fit", first_addr);

    // Alignment is checked on the payload address, the prefix sits just in
    // front of it.
    for align in [8, 64, 512, 4096] {
        let layout = Layout::from_size_align(24, align).unwrap();
        let block = unsafe { std::alloc::alloc(layout) };
        assert!(!block.is_null());
        assert_eq!(block as usize % align, 0);
        println!("{align:>5} byte aligned block at {block:p}");
        unsafe { std::alloc::dealloc(block, layout) };
    }

    // Threads share the arena through the lock.
    let workers: Vec<_> = (0..4)
        .map(|id| {
            thread::spawn(move || {
                let label = format!("worker {id}");
                label.len()
            })
        })
        .collect();
    let total: usize = workers.into_iter().map(|worker| worker.join().unwrap()).sum();
    assert_eq!(total, 4 * "worker 0".len());

    let text = String::from("bitmap arena");
    println!("String '{}' at {:p}", text, text.as_ptr());

    drop((number, squares, fence, again, text));
    println!("Issued bytes at exit: {}", issued());
}
