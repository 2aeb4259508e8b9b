// Output stream abstraction shared by every format encoder.
//
// The formats need four operations beyond plain `Write`: writing N
// identical filler bytes (`fill`), and measuring how far the stream has
// advanced since some earlier mark (`distance_from`) so that match
// distances and moduled chunk sizes can be computed without the caller
// threading a running byte count through every codec. Both are built as
// extension traits over `std::io::{Write, Seek}` rather than as a new
// trait hierarchy, matching the rest of this crate's habit of reusing
// standard-library seams instead of re-deriving them.

use std::io::{self, Seek, SeekFrom, Write};

/// Adds a `fill` operation to any writer: used by decoders for
/// filler-value dictionaries (GBA, Rocket) and by the moduled wrapper for
/// alignment padding.
pub trait WriteExt: Write {
    fn fill(&mut self, value: u8, count: usize) -> io::Result<()> {
        let buf = [value; 256];
        let mut remaining = count;
        while remaining > 0 {
            let chunk = remaining.min(buf.len());
            self.write_all(&buf[..chunk])?;
            remaining -= chunk;
        }
        Ok(())
    }
}

impl<W: Write + ?Sized> WriteExt for W {}

/// Adds distance-since-mark measurement to any seekable stream, used by
/// `DescriptorWriter` to know how many bytes separate "now" from the
/// placeholder it will seek back to patch.
pub trait SeekExt: Seek {
    fn tell(&mut self) -> io::Result<u64> {
        self.stream_position()
    }

    fn distance_from(&mut self, mark: u64) -> io::Result<u64> {
        let now = self.tell()?;
        Ok(now - mark)
    }
}

impl<S: Seek + ?Sized> SeekExt for S {}
