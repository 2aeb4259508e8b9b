// Copyright 2016 Martin Grabmueller. See the LICENSE file at the
// top-level directory of this distribution for license information.

//! Chameleon: unlike every other format here, the descriptor bits and
//! the literal/match payload bytes are written as two separate regions
//! rather than interleaved — a 2-byte header gives the descriptor
//! region's length, the descriptor bits for every match (in order)
//! follow, and the payload bytes follow that. Decoding reads the whole
//! descriptor region up front and then walks it and the payload stream
//! in lock-step. There's no length field for the payload region; it
//! simply ends wherever the descriptor's own explicit terminator match
//! says to stop.

use std::io::{Cursor, Read, Write};

use crate::bitfield::{BitFieldConfig, BitPosition, BitReader, DescriptorWriter, Endian, RefillTiming};
use crate::dict::DictionarySink;
use crate::error::{Error, Result};
use crate::moduled::{self, ModuledConfig};
use crate::parser::{find_optimal_matches, ExtraEdge, Match};

const MAX_MATCH_LENGTH: usize = 0xFF;
const MAX_MATCH_DISTANCE: usize = 0x7FF;

fn descriptor_config() -> BitFieldConfig {
    BitFieldConfig::new(1, RefillTiming::Before, BitPosition::Low, Endian::Big)
}

/// Popped at the opposite end from where it was pushed (see `kosinski.rs`).
fn reader_descriptor_config() -> BitFieldConfig {
    BitFieldConfig::new(1, RefillTiming::Before, BitPosition::High, Endian::Big)
}

fn literal_cost(_unit: &[u8]) -> usize {
    1 + 8
}

fn match_cost(distance: usize, length: usize) -> Option<usize> {
    if length >= 2 && length <= 3 && distance < 0x100 {
        Some(2 + 8 + 1)
    } else if length >= 3 && length <= 5 {
        Some(2 + 3 + 8 + 2)
    } else if length >= 6 {
        Some(2 + 3 + 8 + 2 + 8)
    } else {
        None
    }
}

fn no_extra_edges(_: &[u8], _: usize) -> Vec<ExtraEdge> {
    Vec::new()
}

fn emit_descriptor_bits<W: Write + std::io::Seek>(descriptor: &mut DescriptorWriter<W>, matches: &[Match]) -> Result<()> {
    for m in matches {
        if m.is_literal() {
            descriptor.push_bit(1)?;
            continue;
        }

        let distance = (m.destination as i64 - m.source) as usize;
        let length = m.length;

        if length >= 2 && length <= 3 && distance < 0x100 {
            descriptor.push_bit(0)?;
            descriptor.push_bit(0)?;
            descriptor.push_bit((length == 3) as u8)?;
        } else if length >= 3 && length <= 5 {
            descriptor.push_bit(0)?;
            descriptor.push_bit(1)?;
            descriptor.push_bit(((distance & (1 << 10)) != 0) as u8)?;
            descriptor.push_bit(((distance & (1 << 9)) != 0) as u8)?;
            descriptor.push_bit(((distance & (1 << 8)) != 0) as u8)?;
            descriptor.push_bit((length == 5) as u8)?;
            descriptor.push_bit((length == 4) as u8)?;
        } else {
            descriptor.push_bit(0)?;
            descriptor.push_bit(1)?;
            descriptor.push_bit(((distance & (1 << 10)) != 0) as u8)?;
            descriptor.push_bit(((distance & (1 << 9)) != 0) as u8)?;
            descriptor.push_bit(((distance & (1 << 8)) != 0) as u8)?;
            descriptor.push_bit(1)?;
            descriptor.push_bit(1)?;
        }
    }

    // Terminator: same shape as a length->=6 match, with a distance and
    // explicit length of zero (a real match's explicit length is never
    // below 6, so this is unambiguous on decode).
    descriptor.push_bit(0)?;
    descriptor.push_bit(1)?;
    descriptor.push_bit(0)?;
    descriptor.push_bit(0)?;
    descriptor.push_bit(0)?;
    descriptor.push_bit(1)?;
    descriptor.push_bit(1)?;
    Ok(())
}

fn emit_payload(data: &[u8], matches: &[Match]) -> Vec<u8> {
    let mut out = Vec::new();

    for m in matches {
        if m.is_literal() {
            out.push(data[m.destination]);
            continue;
        }

        let distance = (m.destination as i64 - m.source) as usize;
        let length = m.length;

        if length >= 2 && length <= 3 && distance < 0x100 {
            out.push(distance as u8);
        } else if length >= 3 && length <= 5 {
            out.push((distance & 0xFF) as u8);
        } else {
            out.push((distance & 0xFF) as u8);
            out.push(length as u8);
        }
    }

    out.push(0);
    out.push(0);
    out
}

pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let matches =
        find_optimal_matches(data, 1, MAX_MATCH_LENGTH, MAX_MATCH_DISTANCE, None, literal_cost, match_cost, no_extra_edges);

    let mut descriptor = DescriptorWriter::new(Cursor::new(Vec::new()), descriptor_config())?;
    emit_descriptor_bits(&mut descriptor, &matches)?;
    let descriptor_bytes = descriptor.finish()?.into_inner();

    let payload = emit_payload(data, &matches);

    let mut out = Vec::with_capacity(2 + descriptor_bytes.len() + payload.len());
    out.extend_from_slice(&(descriptor_bytes.len() as u16).to_be_bytes());
    out.extend_from_slice(&descriptor_bytes);
    out.extend_from_slice(&payload);
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

fn read_be16<R: Read>(input: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    input.read_exact(&mut buf).map_err(|_| Error::UnexpectedEof)?;
    Ok(u16::from_be_bytes(buf))
}

pub fn decompress<R: Read>(mut input: R) -> Result<Vec<u8>> {
    let descriptor_len = read_be16(&mut input)? as usize;
    let mut descriptor_bytes = vec![0u8; descriptor_len];
    input.read_exact(&mut descriptor_bytes).map_err(|_| Error::UnexpectedEof)?;

    let mut descriptor = BitReader::new(Cursor::new(descriptor_bytes), reader_descriptor_config());
    let mut sink = DictionarySink::new(None);

    loop {
        if descriptor.read_bit()? != 0 {
            let byte = read_byte(&mut input)?;
            sink.push(byte);
        } else {
            let mut distance = read_byte(&mut input)? as usize;
            let count;

            if descriptor.read_bit()? == 0 {
                count = 2 + descriptor.read_bit()? as usize;
            } else {
                if descriptor.read_bit()? != 0 {
                    distance += 1 << 10;
                }
                if descriptor.read_bit()? != 0 {
                    distance += 1 << 9;
                }
                if descriptor.read_bit()? != 0 {
                    distance += 1 << 8;
                }

                if descriptor.read_bit()? == 0 {
                    count = if descriptor.read_bit()? == 0 { 3 } else { 4 };
                } else if descriptor.read_bit()? == 0 {
                    count = 5;
                } else {
                    let explicit = read_byte(&mut input)? as usize;
                    if explicit < 6 {
                        break;
                    }
                    count = explicit;
                }
            }

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
    fn short_inline_match_round_trips() {
        let data = b"abcabc";
        let compressed = compress(data).unwrap();
        let decompressed = decompress(&compressed[..]).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn long_explicit_length_match_round_trips() {
        let mut data = b"abcdefghij".to_vec();
        data.extend_from_slice(b"abcdefghij");
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
