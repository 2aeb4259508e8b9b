// Copyright 2016 Martin Grabmueller. See the LICENSE file at the
// top-level directory of this distribution for license information.

//! Generic "moduled" framing: splits the input into fixed-size chunks,
//! compresses each chunk independently with a format's own codec, and
//! writes a small header recording the total uncompressed size before
//! the chunk stream. Every format in this crate gets this for free by
//! calling [`compress`]/[`decompress`] with its own per-chunk codec.

use std::io::{self, Read, Write};

use crate::error::{Error, Result};
use crate::io::WriteExt;

/// Parameters describing a format's moduled header and padding.
#[derive(Debug, Clone, Copy)]
pub struct ModuledConfig {
    /// Uncompressed bytes per chunk (the last chunk may be shorter).
    pub module_size: usize,
    /// Compressed chunks are padded with zero bytes up to a multiple of
    /// this many bytes.
    pub module_alignment: usize,
    /// Header byte width: 2 for most formats, 4 for GBA.
    pub header_width: usize,
    pub header_big_endian: bool,
}

fn write_header<W: Write>(w: &mut W, cfg: &ModuledConfig, total_size: usize) -> io::Result<()> {
    let packed = (total_size % cfg.module_size) | ((total_size / cfg.module_size) << 12);
    let mut buf = [0u8; 4];
    if cfg.header_big_endian {
        for i in 0..cfg.header_width {
            buf[i] = (packed >> (8 * (cfg.header_width - 1 - i))) as u8;
        }
    } else {
        for i in 0..cfg.header_width {
            buf[i] = (packed >> (8 * i)) as u8;
        }
    }
    w.write_all(&buf[..cfg.header_width])
}

fn read_header<R: Read>(r: &mut R, cfg: &ModuledConfig) -> io::Result<usize> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf[..cfg.header_width])?;
    let mut packed: usize = 0;
    if cfg.header_big_endian {
        for &b in &buf[..cfg.header_width] {
            packed = (packed << 8) | b as usize;
        }
    } else {
        for &b in buf[..cfg.header_width].iter().rev() {
            packed = (packed << 8) | b as usize;
        }
    }
    let remainder = packed & 0xFFF;
    let whole_modules = packed >> 12;
    Ok(whole_modules * cfg.module_size + remainder)
}

/// Compresses `data` in `module_size`-byte chunks, each run through
/// `compress_one`, which is handed a chunk and the `Vec<u8>` to append
/// its compressed bytes to.
pub fn compress<F>(data: &[u8], cfg: &ModuledConfig, mut compress_one: F) -> Result<Vec<u8>>
where
    F: FnMut(&[u8], &mut Vec<u8>) -> Result<()>,
{
    if cfg.module_size == 0 {
        return Err(Error::Config("module size must be non-zero".into()));
    }

    let mut out = Vec::new();
    write_header(&mut out, cfg, data.len())?;

    let mut pending_padding = 0usize;
    for chunk in data.chunks(cfg.module_size) {
        if pending_padding > 0 {
            out.fill(0, pending_padding)?;
        }
        let before = out.len();
        compress_one(chunk, &mut out)?;
        let written = out.len() - before;
        pending_padding = if cfg.module_alignment > 1 {
            (cfg.module_alignment - (written % cfg.module_alignment)) % cfg.module_alignment
        } else {
            0
        };
    }

    Ok(out)
}

/// Reader wrapper that counts bytes consumed, so [`decompress`] can skip
/// each chunk's alignment padding without requiring `R: Seek`.
struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

/// Decompresses a moduled stream, calling `decompress_one` once per
/// chunk with how many uncompressed bytes that chunk should produce.
pub fn decompress<R, F>(input: R, cfg: &ModuledConfig, mut decompress_one: F) -> Result<Vec<u8>>
where
    R: Read,
    F: FnMut(&mut CountingReader<R>, usize, &mut Vec<u8>) -> Result<()>,
{
    if cfg.module_size == 0 {
        return Err(Error::Config("module size must be non-zero".into()));
    }

    let mut input = CountingReader { inner: input, count: 0 };
    let total_size = read_header(&mut input, cfg)?;
    let mut out = Vec::with_capacity(total_size);

    let mut remaining = total_size;
    let mut pending_padding = 0usize;
    while remaining > 0 {
        if pending_padding > 0 {
            io::copy(&mut (&mut input).take(pending_padding as u64), &mut io::sink())?;
        }

        let chunk_size = remaining.min(cfg.module_size);
        let before = input.count;
        decompress_one(&mut input, chunk_size, &mut out)?;
        remaining -= chunk_size;

        let consumed = input.count - before;
        pending_padding = if cfg.module_alignment > 1 {
            (cfg.module_alignment - (consumed as usize % cfg.module_alignment)) % cfg.module_alignment
        } else {
            0
        };
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_round_trips() {
        let cfg = ModuledConfig { module_size: 0x1000, module_alignment: 1, header_width: 2, header_big_endian: true };
        let mut buf = Vec::new();
        write_header(&mut buf, &cfg, 0x1234).unwrap();
        let mut cursor = Cursor::new(buf);
        let size = read_header(&mut cursor, &cfg).unwrap();
        assert_eq!(size, 0x1234);
    }

    #[test]
    fn rejects_zero_module_size() {
        let cfg = ModuledConfig { module_size: 0, module_alignment: 1, header_width: 2, header_big_endian: true };
        let result = compress(&[1, 2, 3], &cfg, |_, _| Ok(()));
        assert!(result.is_err());
    }
}
