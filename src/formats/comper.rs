// Copyright 2016 Martin Grabmueller. See the LICENSE file at the
// top-level directory of this distribution for license information.

//! Comper: a Kosinski relative that operates on 16-bit words instead of
//! bytes, so matches can never straddle a word boundary. One descriptor
//! bit per word (0 = literal word, 1 = dictionary match), packed 16 at a
//! time, most-significant-bit first, big-endian.

use std::io::{Cursor, Read, Write};

use crate::bitfield::{BitFieldConfig, BitPosition, BitReader, DescriptorWriter, Endian, RefillTiming};
use crate::dict::DictionarySink;
use crate::error::{Error, Result};
use crate::moduled::{self, ModuledConfig};
use crate::parser::{find_optimal_matches, ExtraEdge, Match};

const BYTES_PER_VALUE: usize = 2;
const MAX_MATCH_LENGTH: usize = 0x100;
const MAX_MATCH_DISTANCE: usize = 0x100;

fn descriptor_config() -> BitFieldConfig {
    BitFieldConfig::new(2, RefillTiming::Before, BitPosition::Low, Endian::Big)
}

/// Popped at the opposite end from where it was pushed (see `kosinski.rs`).
fn reader_descriptor_config() -> BitFieldConfig {
    BitFieldConfig::new(2, RefillTiming::Before, BitPosition::High, Endian::Big)
}

fn literal_cost(_unit: &[u8]) -> usize {
    1 + 16
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
            descriptor.push_bit(0)?;
            let i = m.destination * BYTES_PER_VALUE;
            descriptor.get_mut().write_all(&[data[i], data[i + 1]])?;
        } else {
            let distance = (m.destination as i64 - m.source) as u32;
            let length = m.length as u32;

            descriptor.push_bit(1)?;
            descriptor.get_mut().write_all(&[(0u32.wrapping_sub(distance) & 0xFF) as u8])?;
            descriptor.get_mut().write_all(&[(length - 1) as u8])?;
        }
    }

    // Terminator: a match with raw distance and raw count both zero.
    descriptor.push_bit(1)?;
    descriptor.get_mut().write_all(&[0x00, 0x00])?;

    Ok(descriptor.finish()?.into_inner())
}

pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() % BYTES_PER_VALUE != 0 {
        return Err(Error::Format("Comper input length must be a multiple of 2".into()));
    }

    let matches = find_optimal_matches(
        data,
        BYTES_PER_VALUE,
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

pub fn decompress<R: Read>(mut input: R) -> Result<Vec<u8>> {
    let mut descriptor = BitReader::new(&mut input, reader_descriptor_config());
    let mut sink = DictionarySink::new(None);

    loop {
        if descriptor.read_bit()? == 0 {
            let lo = read_byte(descriptor.get_mut())?;
            let hi = read_byte(descriptor.get_mut())?;
            sink.push(lo);
            sink.push(hi);
        } else {
            let raw_distance = read_byte(descriptor.get_mut())? as u32;
            let raw_count = read_byte(descriptor.get_mut())? as u32;

            if raw_count == 0 {
                break;
            }

            let distance = (0x100 - raw_distance) as usize * 2;
            let count = (raw_count as usize + 1) * 2;
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
    fn two_identical_words_round_trip() {
        let data = [0x12, 0x34, 0x12, 0x34];
        let compressed = compress(&data).unwrap();
        let decompressed = decompress(&compressed[..]).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn odd_length_input_is_rejected() {
        let data = [1, 2, 3];
        assert!(compress(&data).is_err());
    }

    #[test]
    fn moduled_round_trips() {
        let data: Vec<u8> = (0..64u8).collect();
        let compressed = moduled_compress(&data, 16).unwrap();
        let decompressed = moduled_decompress(&compressed, 16).unwrap();
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
