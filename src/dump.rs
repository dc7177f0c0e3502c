//! Raw dumps of the allocator state, meant for a human staring at a
//! terminal while debugging. The format is not stable.

use std::io::{self, Write};

use crate::allocator::Allocator;

impl Allocator {
    /// Writes every arena byte as a zero padded decimal number.
    ///
    /// ```text
    /// Heap size: 8
    /// 003 001 002 003 000 000 000 000
    /// ```
    pub fn dump_arena<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Heap size: {}", self.capacity())?;

        let arena = self.arena();
        let line = (0..arena.capacity())
            .map(|offset| format!("{:03}", arena.byte(offset)))
            .collect::<Vec<_>>()
            .join(" ");

        writeln!(out, "{line}")
    }

    /// Writes every occupancy bit, one per arena byte.
    ///
    /// ```text
    /// Bitmap size (bytes): 1
    /// 1 1 1 1 0 0 0 0
    /// ```
    pub fn dump_occupancy<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let occupancy = self.occupancy();

        writeln!(out, "Bitmap size (bytes): {}", occupancy.as_bytes().len())?;

        let line = (0..occupancy.len())
            .map(|i| if occupancy.test(i) { "1" } else { "0" })
            .collect::<Vec<_>>()
            .join(" ");

        writeln!(out, "{line}")
    }
}
