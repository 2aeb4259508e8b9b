// Copyright 2016 Martin Grabmueller. See the LICENSE file at the
// top-level directory of this distribution for license information.

//! Saxman: the common "ring buffer" LZSS used across many 8/16-bit
//! consoles. There's no end-of-stream opcode; instead a match header
//! (with-header variant) or the caller (without-header variant) records
//! how many *compressed* bytes follow, and decoding just runs until that
//! many input bytes have been consumed. Dictionary addressing works
//! through a conceptually 0x1000-byte ring buffer that starts zeroed: a
//! back-reference pointing at a ring-buffer slot the real data hasn't
//! reached yet reads back as zero bytes rather than as an error, which
//! lets the encoder cheaply express leading runs of zero bytes as
//! matches into that untouched part of the ring before any real data has
//! been written.

use std::io::{Cursor, Read, Write};

use crate::bitfield::{BitFieldConfig, BitPosition, DescriptorWriter, Endian, RefillTiming};
use crate::dict::DictionarySink;
use crate::error::{Error, Result};
use crate::moduled::{self, ModuledConfig};
use crate::parser::{find_optimal_matches, ExtraEdge, Match};

const MIN_MATCH_LENGTH: usize = 3;
const MAX_MATCH_LENGTH: usize = 0x12;
const MAX_MATCH_DISTANCE: usize = 0x1000;
const DICTIONARY_OFFSET: i64 = 0x12;
const ZERO_RUN_SENTINEL: i64 = 0xFFF;

fn descriptor_config() -> BitFieldConfig {
    BitFieldConfig::new(1, RefillTiming::Before, BitPosition::High, Endian::Little)
}

/// Popped at the opposite end from where it was pushed (see `kosinski.rs`).
fn reader_descriptor_config() -> BitFieldConfig {
    BitFieldConfig::new(1, RefillTiming::Before, BitPosition::Low, Endian::Little)
}

fn literal_cost(_unit: &[u8]) -> usize {
    1 + 8
}

fn match_cost(_distance: usize, length: usize) -> Option<usize> {
    if length >= MIN_MATCH_LENGTH {
        Some(1 + 16)
    } else {
        None
    }
}

fn zero_run_edges(data: &[u8], position: usize) -> Vec<ExtraEdge> {
    let mut edges = Vec::new();
    if position >= MAX_MATCH_DISTANCE {
        return edges;
    }

    let max_read_ahead = MAX_MATCH_LENGTH.min(data.len() - position);
    for i in 0..max_read_ahead {
        if data[position + i] != 0 {
            break;
        }
        let length = i + 1;
        if length >= MIN_MATCH_LENGTH {
            edges.push(ExtraEdge { sentinel_payload: ZERO_RUN_SENTINEL, length, cost: 1 + 16 });
        }
    }
    edges
}

fn encode_match(m: &Match) -> u16 {
    if m.is_sentinel() {
        return ZERO_RUN_SENTINEL as u16;
    }
    ((m.source - DICTIONARY_OFFSET) as u32 & 0xFFF) as u16
}

fn emit(data: &[u8], matches: &[Match]) -> Result<Vec<u8>> {
    let mut descriptor = DescriptorWriter::new(Cursor::new(Vec::new()), descriptor_config())?;

    for m in matches {
        if m.is_literal() {
            descriptor.push_bit(1)?;
            descriptor.get_mut().write_all(&[data[m.destination]])?;
        } else {
            let offset = encode_match(m) as u32;
            let length = m.length as u32;
            descriptor.push_bit(0)?;
            descriptor.get_mut().write_all(&[(offset & 0xFF) as u8])?;
            descriptor.get_mut().write_all(&[(((offset & 0xF00) >> 4) | (length - 3)) as u8])?;
        }
    }

    Ok(descriptor.finish()?.into_inner())
}

fn compress_raw(data: &[u8]) -> Result<Vec<u8>> {
    let matches =
        find_optimal_matches(data, 1, MAX_MATCH_LENGTH, MAX_MATCH_DISTANCE, None, literal_cost, match_cost, zero_run_edges);
    emit(data, &matches)
}

pub fn compress_without_header(data: &[u8]) -> Result<Vec<u8>> {
    compress_raw(data)
}

pub fn compress_with_header(data: &[u8]) -> Result<Vec<u8>> {
    let body = compress_raw(data)?;
    let mut out = Vec::with_capacity(body.len() + 2);
    out.extend_from_slice(&(body.len() as u16).to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

pub fn moduled_compress(data: &[u8], module_size: usize) -> Result<Vec<u8>> {
    let cfg = ModuledConfig { module_size, module_alignment: 2, header_width: 2, header_big_endian: true };
    moduled::compress(data, &cfg, |chunk, out| {
        out.extend_from_slice(&compress_with_header(chunk)?);
        Ok(())
    })
}

/// Counts bytes pulled through it, so the decode loop can stop after
/// exactly `compressed_length` compressed bytes have been consumed
/// instead of relying on an end-of-stream opcode.
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

fn read_le16<R: Read>(input: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    input.read_exact(&mut buf).map_err(|_| Error::UnexpectedEof)?;
    Ok(u16::from_le_bytes(buf))
}

fn decompress_body<R: Read>(input: R, compressed_length: usize) -> Result<Vec<u8>> {
    use crate::bitfield::BitReader;

    let mut input = CountingReader { inner: input, count: 0 };
    let mut descriptor = BitReader::new(&mut input, reader_descriptor_config());
    let mut sink = DictionarySink::new(None);

    while descriptor.get_mut().count < compressed_length {
        if descriptor.read_bit()? != 0 {
            let byte = read_byte(descriptor.get_mut())?;
            sink.push(byte);
        } else {
            let first_byte = read_byte(descriptor.get_mut())? as usize;
            let second_byte = read_byte(descriptor.get_mut())? as usize;
            let dictionary_index = (first_byte | ((second_byte << 4) & 0xF00)) + (0xF + 3);
            let count = (second_byte & 0xF) + 3;
            let output_position = sink.len();
            let distance = (output_position as i64 - dictionary_index as i64).rem_euclid(MAX_MATCH_DISTANCE as i64) as usize;

            if distance > output_position {
                for _ in 0..count {
                    sink.push(0);
                }
            } else {
                sink.copy(distance, count)?;
            }
        }
    }

    Ok(sink.into_vec())
}

pub fn decompress_without_header<R: Read>(input: R, compressed_length: usize) -> Result<Vec<u8>> {
    decompress_body(input, compressed_length)
}

pub fn decompress_with_header<R: Read>(mut input: R) -> Result<Vec<u8>> {
    let compressed_length = read_le16(&mut input)? as usize;
    decompress_body(input, compressed_length)
}

pub fn moduled_decompress(input: &[u8], module_size: usize) -> Result<Vec<u8>> {
    let cfg = ModuledConfig { module_size, module_alignment: 2, header_width: 2, header_big_endian: true };
    moduled::decompress(Cursor::new(input), &cfg, |reader, _chunk_size, out| {
        let decoded = decompress_with_header(reader)?;
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
        let compressed = compress_without_header(data).unwrap();
        let decompressed = decompress_without_header(&compressed[..], compressed.len()).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn repeated_run_round_trips() {
        let data = [b'x'; 32];
        let compressed = compress_without_header(&data).unwrap();
        let decompressed = decompress_without_header(&compressed[..], compressed.len()).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn leading_zero_run_uses_ring_buffer_prefill() {
        let mut data = vec![0u8; 16];
        data.extend_from_slice(b"tail");
        let compressed = compress_without_header(&data).unwrap();
        let decompressed = decompress_without_header(&compressed[..], compressed.len()).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn with_header_round_trips() {
        let data = b"abracadabra abracadabra";
        let compressed = compress_with_header(data).unwrap();
        let decompressed = decompress_with_header(&compressed[..]).unwrap();
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
        let compressed = compress_with_header(&data).unwrap();
        let decompressed = decompress_with_header(&compressed[..]).unwrap();
        assert_eq!(decompressed, data.to_vec());
    }
}
