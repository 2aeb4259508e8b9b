// Copyright 2016 Martin Grabmueller. See the LICENSE file at the
// top-level directory of this distribution for license information.

//! Kosinski+: a Kosinski variant with a rearranged bitstream (one byte
//! per descriptor word instead of two) and a differently-shaped full
//! match encoding. Matches up to `0x108` bytes long are allowed, eight
//! more than plain Kosinski, to make room for the length byte's
//! `length - 9` encoding.

use std::io::{Cursor, Read, Write};

use crate::bitfield::{BitFieldConfig, BitPosition, BitReader, DescriptorWriter, Endian, RefillTiming};
use crate::dict::DictionarySink;
use crate::error::{Error, Result};
use crate::moduled::{self, ModuledConfig};
use crate::parser::{find_optimal_matches, ExtraEdge, Match};

const MAX_MATCH_LENGTH: usize = 0x100 + 8;
const MAX_MATCH_DISTANCE: usize = 0x2000;

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
    if length >= 2 && length <= 5 && distance <= 0x100 {
        Some(2 + 8 + 2)
    } else if length >= 3 && length <= 9 {
        Some(2 + 16)
    } else if length >= 10 {
        Some(2 + 16 + 8)
    } else {
        None
    }
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
            let distance = (m.destination as i64 - m.source) as u32;
            let length = m.length;
            let neg = 0u32.wrapping_sub(distance);

            if length >= 2 && length <= 5 && distance as usize <= 0x100 {
                descriptor.push_bit(0)?;
                descriptor.push_bit(0)?;
                descriptor.get_mut().write_all(&[(neg & 0xFF) as u8])?;
                descriptor.push_bit((((length - 2) & 2) != 0) as u8)?;
                descriptor.push_bit((((length - 2) & 1) != 0) as u8)?;
            } else if length >= 3 && length <= 9 {
                descriptor.push_bit(0)?;
                descriptor.push_bit(1)?;
                descriptor
                    .get_mut()
                    .write_all(&[(((neg >> (8 - 3)) & 0xF8) | ((10 - length) as u32 & 7)) as u8])?;
                descriptor.get_mut().write_all(&[(neg & 0xFF) as u8])?;
            } else {
                descriptor.push_bit(0)?;
                descriptor.push_bit(1)?;
                descriptor.get_mut().write_all(&[((neg >> (8 - 3)) & 0xF8) as u8])?;
                descriptor.get_mut().write_all(&[(neg & 0xFF) as u8])?;
                descriptor.get_mut().write_all(&[(length - 9) as u8])?;
            }
        }
    }

    // Terminator: a full match with raw count zero (decoded count == 9).
    descriptor.push_bit(0)?;
    descriptor.push_bit(1)?;
    descriptor.get_mut().write_all(&[0xF0, 0x00, 0x00])?;

    Ok(descriptor.finish()?.into_inner())
}

pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let matches = find_optimal_matches(
        data,
        1,
        MAX_MATCH_LENGTH,
        MAX_MATCH_DISTANCE,
        None,
        literal_cost,
        match_cost,
        no_extra_edges,
    );
    emit(data, &matches)
}

pub fn moduled_compress(data: &[u8], module_size: usize) -> Result<Vec<u8>> {
    let cfg = ModuledConfig { module_size, module_alignment: 1, header_width: 2, header_big_endian: true };
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

pub fn decompress<R: Read>(mut input: R) -> Result<Vec<u8>> {
    let mut descriptor = BitReader::new(&mut input, reader_descriptor_config());
    let mut sink = DictionarySink::new(None);

    loop {
        if descriptor.read_bit()? != 0 {
            let byte = read_byte(descriptor.get_mut())?;
            sink.push(byte);
        } else {
            let offset;
            let mut count;

            if descriptor.read_bit()? != 0 {
                let high_byte = read_byte(descriptor.get_mut())? as u32;
                let low_byte = read_byte(descriptor.get_mut())? as u32;

                let mut raw_offset = ((high_byte & 0xF8) << 5) | low_byte;
                raw_offset = 0x2000 - raw_offset;
                offset = raw_offset as usize;
                count = (high_byte & 7) as usize;

                if count != 0 {
                    count = 10 - count;
                } else {
                    count = read_byte(descriptor.get_mut())? as usize + 9;
                    if count == 9 {
                        break;
                    }
                }
            } else {
                offset = 0x100 - read_byte(descriptor.get_mut())? as usize;
                count = 2;
                if descriptor.read_bit()? != 0 {
                    count += 2;
                }
                if descriptor.read_bit()? != 0 {
                    count += 1;
                }
            }

            sink.copy(offset, count)?;
        }
    }

    Ok(sink.into_vec())
}

pub fn moduled_decompress(input: &[u8], module_size: usize) -> Result<Vec<u8>> {
    let cfg = ModuledConfig { module_size, module_alignment: 1, header_width: 2, header_big_endian: true };
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
    fn long_run_round_trips() {
        let data = [b'z'; 32];
        let compressed = compress(&data).unwrap();
        let decompressed = decompress(&compressed[..]).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn moduled_round_trips() {
        let data = b"one two three two one three two one";
        let compressed = moduled_compress(data, 0x10).unwrap();
        let decompressed = moduled_decompress(&compressed, 0x10).unwrap();
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
