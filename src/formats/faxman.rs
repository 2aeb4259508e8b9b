// Copyright 2016 Martin Grabmueller. See the LICENSE file at the
// top-level directory of this distribution for license information.

//! Faxman: a Kosinski-shaped LZSS (short inline matches for close, short
//! runs; full two-byte matches for everything else needing length >= 3)
//! whose header records the total number of *descriptor bits* rather
//! than a byte count, so decoding naturally stops once every pushed bit
//! has been popped back out — no explicit terminator opcode needed.
//! Leading runs of zero bytes near the start of the file (where
//! `offset < 0x800`) get an extra, always-available "virtual" match
//! whose distance is fixed at the format's maximum (`0x800`): any real
//! match with that exact distance is always farther back than any
//! output produced so far this early in the file, so the decoder can
//! use it as a flag to fill zero bytes instead of attempting a
//! backward copy.

use std::io::{Cursor, Read, Write};

use crate::bitfield::{BitFieldConfig, BitPosition, BitReader, DescriptorWriter, Endian, RefillTiming};
use crate::dict::DictionarySink;
use crate::error::{Error, Result};
use crate::moduled::{self, ModuledConfig};
use crate::parser::{find_optimal_matches, ExtraEdge, Match};

const MIN_MATCH_LENGTH: usize = 3;
const MAX_MATCH_LENGTH: usize = 0x1F + 3;
const MAX_MATCH_DISTANCE: usize = 0x800;

fn writer_descriptor_config() -> BitFieldConfig {
    BitFieldConfig::new(1, RefillTiming::Before, BitPosition::High, Endian::Little)
}

/// Popped at the opposite end from where it was pushed (see `kosinski.rs`).
fn reader_descriptor_config() -> BitFieldConfig {
    BitFieldConfig::new(1, RefillTiming::Before, BitPosition::Low, Endian::Little)
}

fn literal_cost(_unit: &[u8]) -> usize {
    1 + 8
}

fn match_cost(distance: usize, length: usize) -> Option<usize> {
    if length >= 2 && length <= 5 && distance <= 0x100 {
        Some(2 + 8 + 2)
    } else if length >= MIN_MATCH_LENGTH {
        Some(2 + 16)
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
    for k in 0..max_read_ahead {
        if data[position + k] != 0 {
            break;
        }
        let length = k + 1;
        if length >= MIN_MATCH_LENGTH {
            edges.push(ExtraEdge { sentinel_payload: 0, length, cost: 2 + 16 });
        }
    }
    edges
}

/// Pushes one descriptor bit and returns the running total, so the
/// caller can record it in the header once the whole stream is built.
struct DescriptorCounter<W> {
    inner: DescriptorWriter<W>,
    total_bits: usize,
}

impl<W: Write + std::io::Seek> DescriptorCounter<W> {
    fn push_bit(&mut self, bit: u8) -> Result<()> {
        self.total_bits += 1;
        self.inner.push_bit(bit)?;
        Ok(())
    }
}

fn emit(data: &[u8], matches: &[Match]) -> Result<(usize, Vec<u8>)> {
    let mut descriptor = DescriptorCounter { inner: DescriptorWriter::new(Cursor::new(Vec::new()), writer_descriptor_config())?, total_bits: 0 };

    for m in matches {
        if m.is_literal() {
            descriptor.push_bit(1)?;
            descriptor.inner.get_mut().write_all(&[data[m.destination]])?;
        } else {
            let distance = if m.is_sentinel() { MAX_MATCH_DISTANCE as u32 } else { (m.destination as i64 - m.source) as u32 };
            let length = m.length as u32;

            if length >= 2 && length <= 5 && distance as usize <= 0x100 {
                descriptor.push_bit(0)?;
                descriptor.push_bit(0)?;
                descriptor.inner.get_mut().write_all(&[(0u32.wrapping_sub(distance) & 0xFF) as u8])?;
                descriptor.push_bit((((length - 2) & 2) != 0) as u8)?;
                descriptor.push_bit((((length - 2) & 1) != 0) as u8)?;
            } else {
                descriptor.push_bit(0)?;
                descriptor.push_bit(1)?;
                descriptor.inner.get_mut().write_all(&[((distance - 1) & 0xFF) as u8])?;
                descriptor
                    .inner
                    .get_mut()
                    .write_all(&[((((distance - 1) & 0x700) >> 3) | (length - 3)) as u8])?;
            }
        }
    }

    let total_bits = descriptor.total_bits;
    Ok((total_bits, descriptor.inner.finish()?.into_inner()))
}

pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let matches = find_optimal_matches(data, 1, MAX_MATCH_LENGTH, MAX_MATCH_DISTANCE, None, literal_cost, match_cost, zero_run_edges);
    let (total_bits, body) = emit(data, &matches)?;

    let mut out = Vec::with_capacity(body.len() + 2);
    out.extend_from_slice(&(total_bits as u16).to_le_bytes());
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

pub fn decompress<R: Read>(mut input: R) -> Result<Vec<u8>> {
    let mut descriptor_bits_remaining = read_le16(&mut input)? as usize;
    let mut descriptor = BitReader::new(&mut input, reader_descriptor_config());
    let mut sink = DictionarySink::new(None);

    let mut pop = |descriptor: &mut BitReader<&mut R>, remaining: &mut usize| -> Result<u8> {
        *remaining -= 1;
        Ok(descriptor.read_bit()?)
    };

    while descriptor_bits_remaining != 0 {
        if pop(&mut descriptor, &mut descriptor_bits_remaining)? != 0 {
            let byte = read_byte(descriptor.get_mut())?;
            sink.push(byte);
        } else {
            let distance;
            let mut count;

            if pop(&mut descriptor, &mut descriptor_bits_remaining)? != 0 {
                let first_byte = read_byte(descriptor.get_mut())? as usize;
                let second_byte = read_byte(descriptor.get_mut())? as usize;
                distance = (first_byte | ((second_byte << 3) & 0x700)) + 1;
                count = (second_byte & 0x1F) + 3;
            } else {
                distance = 0x100 - read_byte(descriptor.get_mut())? as usize;
                count = 2;
                if pop(&mut descriptor, &mut descriptor_bits_remaining)? != 0 {
                    count += 2;
                }
                if pop(&mut descriptor, &mut descriptor_bits_remaining)? != 0 {
                    count += 1;
                }
            }

            let output_position = sink.len();
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
    fn leading_zero_run_uses_virtual_match() {
        let mut data = vec![0u8; 20];
        data.extend_from_slice(b"tail");
        let compressed = compress(&data).unwrap();
        let decompressed = decompress(&compressed[..]).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn repeated_run_round_trips() {
        let data = [b'q'; 40];
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
