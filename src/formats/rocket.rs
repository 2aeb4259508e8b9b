// Copyright 2016 Martin Grabmueller. See the LICENSE file at the
// top-level directory of this distribution for license information.

//! Rocket: matches are always the same cost regardless of shape, so the
//! parser only has to pick match positions, not shapes. The window is
//! pre-seeded with a virtual run of `0x20` bytes ahead of the real data,
//! so references near the very start of the file can still cheaply
//! encode a short run before anything real has been written yet. Each
//! call writes its own two 16-bit headers (uncompressed size, then
//! compressed size of what follows) and decoding stops at whichever of
//! the two limits is hit first.

use std::io::{Cursor, Read, Write};

use crate::bitfield::{BitFieldConfig, BitPosition, DescriptorWriter, Endian, RefillTiming};
use crate::dict::DictionarySink;
use crate::error::{Error, Result};
use crate::moduled::{self, ModuledConfig};
use crate::parser::{find_optimal_matches, ExtraEdge, Match};

const MAX_MATCH_LENGTH: usize = 0x40;
const MAX_MATCH_DISTANCE: usize = 0x400;
const FILLER_VALUE: u8 = 0x20;
const DICTIONARY_OFFSET: i64 = 0x40;

fn descriptor_config() -> BitFieldConfig {
    BitFieldConfig::new(1, RefillTiming::Before, BitPosition::High, Endian::Big)
}

/// Popped at the opposite end from where it was pushed (see `kosinski.rs`).
fn reader_descriptor_config() -> BitFieldConfig {
    BitFieldConfig::new(1, RefillTiming::Before, BitPosition::Low, Endian::Big)
}

fn literal_cost(_unit: &[u8]) -> usize {
    1 + 8
}

fn match_cost(_distance: usize, _length: usize) -> Option<usize> {
    Some(1 + 16)
}

fn no_extra_edges(_: &[u8], _: usize) -> Vec<ExtraEdge> {
    Vec::new()
}

fn emit(data: &[u8], matches: &[Match]) -> Result<Vec<u8>> {
    let mut descriptor = DescriptorWriter::new(Cursor::new(Vec::new()), descriptor_config())?;

    for m in matches {
        if m.is_literal() {
            descriptor.push_bit(1)?;
            descriptor.get_mut().write_all(&[data[m.destination]])?;
        } else {
            let offset = (m.source - DICTIONARY_OFFSET).rem_euclid(MAX_MATCH_DISTANCE as i64) as u32;
            let length = m.length as u32;
            descriptor.push_bit(0)?;
            descriptor.get_mut().write_all(&[(((offset >> 8) & 3) | ((length - 1) << 2)) as u8])?;
            descriptor.get_mut().write_all(&[(offset & 0xFF) as u8])?;
        }
    }

    Ok(descriptor.finish()?.into_inner())
}

pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let matches = find_optimal_matches(
        data,
        1,
        MAX_MATCH_LENGTH,
        MAX_MATCH_DISTANCE,
        Some(FILLER_VALUE),
        literal_cost,
        match_cost,
        no_extra_edges,
    );
    let body = emit(data, &matches)?;

    let mut out = Vec::with_capacity(body.len() + 4);
    out.extend_from_slice(&(data.len() as u16).to_be_bytes());
    out.extend_from_slice(&(body.len() as u16).to_be_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

pub fn moduled_compress(data: &[u8], module_size: usize) -> Result<Vec<u8>> {
    let cfg = ModuledConfig { module_size, module_alignment: 2, header_width: 2, header_big_endian: true };
    moduled::compress(data, &cfg, |chunk, out| {
        out.extend_from_slice(&compress(chunk)?);
        Ok(())
    })
}

struct CountingReader<R> {
    inner: R,
    count: usize,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n;
        Ok(n)
    }
}

fn read_byte<R: Read>(input: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    input.read_exact(&mut buf).map_err(|_| Error::UnexpectedEof)?;
    Ok(buf[0])
}

fn read_be16<R: Read>(input: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    input.read_exact(&mut buf).map_err(|_| Error::UnexpectedEof)?;
    Ok(u16::from_be_bytes(buf))
}

pub fn decompress<R: Read>(mut input: R) -> Result<Vec<u8>> {
    use crate::bitfield::BitReader;

    let uncompressed_size = read_be16(&mut input)? as usize;
    let compressed_size = read_be16(&mut input)? as usize;

    let mut input = CountingReader { inner: input, count: 0 };
    let mut descriptor = BitReader::new(&mut input, reader_descriptor_config());
    let mut sink = DictionarySink::new(None);

    while descriptor.get_mut().count < compressed_size {
        if sink.len() >= uncompressed_size {
            break;
        }

        if descriptor.read_bit()? != 0 {
            let byte = read_byte(descriptor.get_mut())?;
            sink.push(byte);
        } else {
            let word = read_be16(descriptor.get_mut())? as usize;
            let dictionary_index = (word + 0x40) % MAX_MATCH_DISTANCE;
            let count = (word >> 10) + 1;
            let output_position = sink.len();
            let distance = ((MAX_MATCH_DISTANCE + output_position - dictionary_index - 1) % MAX_MATCH_DISTANCE) + 1;
            sink.copy(distance, count)?;
        }
    }

    Ok(sink.into_vec())
}

pub fn moduled_decompress(input: &[u8], module_size: usize) -> Result<Vec<u8>> {
    let cfg = ModuledConfig { module_size, module_alignment: 2, header_width: 2, header_big_endian: true };
    moduled::decompress(Cursor::new(input), &cfg, |reader, _chunk_size, out| {
        let decoded = decompress(reader)?;
        out.extend_from_slice(&decoded);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_literal_round_trips() {
        let data = b"a";
        let compressed = compress(data).unwrap();
        let decompressed = decompress(&compressed[..]).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn early_run_uses_filler_prefix() {
        let data = [FILLER_VALUE; 8];
        let compressed = compress(&data).unwrap();
        let decompressed = decompress(&compressed[..]).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn repeated_run_round_trips() {
        let data = [b'z'; 48];
        let compressed = compress(&data).unwrap();
        let decompressed = decompress(&compressed[..]).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn moduled_round_trips() {
        let data = b"the quick brown fox jumps over the lazy dog, the quick brown fox jumps again";
        let compressed = moduled_compress(data, 0x20).unwrap();
        let decompressed = moduled_decompress(&compressed, 0x20).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn empty_input_round_trips() {
        let data: [u8; 0] = [];
        let compressed = compress(&data).unwrap();
        let decompressed = decompress(&compressed[..]).unwrap();
        assert_eq!(decompressed, data.to_vec());
    }
}
