// Copyright 2016 Martin Grabmueller. See the LICENSE file at the
// top-level directory of this distribution for license information.

//! The GBA BIOS's `LZ77UnCompVram`-compatible format: a single self-
//! describing blob with its own 4-byte header (a `0x10` type byte
//! followed by a 3-byte little-endian uncompressed size) rather than
//! relying on an explicit end-of-stream opcode — decoding simply stops
//! once that many bytes have been produced. The "VRAM-safe" variant
//! forbids distance-1 matches, which `LZ77UnCompVram` can't perform a
//! correct 16-bit-at-a-time copy for.

use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use crate::bitfield::{BitFieldConfig, BitPosition, BitReader, DescriptorWriter, Endian, RefillTiming};
use crate::dict::DictionarySink;
use crate::error::{Error, Result};
use crate::io::SeekExt;
use crate::moduled::{self, ModuledConfig};
use crate::parser::{find_optimal_matches, ExtraEdge, Match};

const COMPRESSION_TYPE: u8 = 0x10;
const MINIMUM_MATCH_LENGTH: usize = 3;
const MAXIMUM_MATCH_LENGTH: usize = 18;
const MINIMUM_MATCH_DISTANCE: usize = 1;
const MINIMUM_MATCH_DISTANCE_VRAM_SAFE: usize = 2;
const MAXIMUM_MATCH_DISTANCE: usize = 0x1000;
const MODULE_ALIGNMENT: usize = 4;

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

fn match_cost(_distance: usize, length: usize) -> Option<usize> {
    if length < MINIMUM_MATCH_LENGTH {
        None
    } else {
        Some(1 + 16)
    }
}

fn match_cost_vram_safe(distance: usize, length: usize) -> Option<usize> {
    if length < MINIMUM_MATCH_LENGTH || distance < MINIMUM_MATCH_DISTANCE_VRAM_SAFE {
        None
    } else {
        Some(1 + 16)
    }
}

fn no_extra_edges(_: &[u8], _: usize) -> Vec<ExtraEdge> {
    Vec::new()
}

fn encode_match(m: &Match) -> u16 {
    let length = (m.length - MINIMUM_MATCH_LENGTH) as u16;
    let offset = (m.destination as i64 - m.source - 1) as u16;
    ((offset & 0xFF) << 8) | (length << 4) | (offset >> 8)
}

fn compress_with<MC>(data: &[u8], match_cost: MC) -> Result<Vec<u8>>
where
    MC: Fn(usize, usize) -> Option<usize>,
{
    let matches = find_optimal_matches(
        data,
        1,
        MAXIMUM_MATCH_LENGTH,
        MAXIMUM_MATCH_DISTANCE,
        None,
        literal_cost,
        match_cost,
        no_extra_edges,
    );

    let mut cursor = Cursor::new(Vec::new());
    cursor.write_all(&[0, 0, 0, 0])?;

    let mut descriptor = DescriptorWriter::new(cursor, descriptor_config())?;
    for m in &matches {
        if m.is_literal() {
            descriptor.push_bit(0)?;
            descriptor.get_mut().write_all(&[data[m.destination]])?;
        } else {
            descriptor.push_bit(1)?;
            let encoded = encode_match(m);
            descriptor.get_mut().write_all(&encoded.to_le_bytes())?;
        }
    }
    let mut cursor = descriptor.finish()?;

    let end_pos = cursor.tell()?;
    cursor.seek(SeekFrom::Start(0))?;
    let size = data.len();
    cursor.write_all(&[COMPRESSION_TYPE, (size & 0xFF) as u8, ((size >> 8) & 0xFF) as u8, ((size >> 16) & 0xFF) as u8])?;
    cursor.seek(SeekFrom::Start(end_pos))?;

    let padding = (MODULE_ALIGNMENT as u64 - (end_pos % MODULE_ALIGNMENT as u64)) % MODULE_ALIGNMENT as u64;
    cursor.write_all(&vec![0u8; padding as usize])?;

    Ok(cursor.into_inner())
}

pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    compress_with(data, match_cost)
}

pub fn compress_vram_safe(data: &[u8]) -> Result<Vec<u8>> {
    compress_with(data, match_cost_vram_safe)
}

fn moduled_cfg() -> ModuledConfig {
    ModuledConfig { module_size: 0, module_alignment: MODULE_ALIGNMENT, header_width: 4, header_big_endian: false }
}

pub fn moduled_compress(data: &[u8], module_size: usize) -> Result<Vec<u8>> {
    let cfg = ModuledConfig { module_size, ..moduled_cfg() };
    moduled::compress(data, &cfg, |chunk, out| {
        out.extend_from_slice(&compress(chunk)?);
        Ok(())
    })
}

pub fn moduled_compress_vram_safe(data: &[u8], module_size: usize) -> Result<Vec<u8>> {
    let cfg = ModuledConfig { module_size, ..moduled_cfg() };
    moduled::compress(data, &cfg, |chunk, out| {
        out.extend_from_slice(&compress_vram_safe(chunk)?);
        Ok(())
    })
}

fn read_byte<R: Read>(input: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    input.read_exact(&mut buf).map_err(|_| Error::UnexpectedEof)?;
    Ok(buf[0])
}

fn read_header<R: Read>(input: &mut R) -> Result<usize> {
    read_byte(input)?; // compression type, unused here
    let b0 = read_byte(input)? as usize;
    let b1 = read_byte(input)? as usize;
    let b2 = read_byte(input)? as usize;
    Ok(b0 | (b1 << 8) | (b2 << 16))
}

pub fn decompress<R: Read>(mut input: R) -> Result<Vec<u8>> {
    let uncompressed_size = read_header(&mut input)?;
    let mut descriptor = BitReader::new(&mut input, reader_descriptor_config());
    let mut sink = DictionarySink::new(None);

    while sink.len() < uncompressed_size {
        if descriptor.read_bit()? == 0 {
            let byte = read_byte(descriptor.get_mut())?;
            sink.push(byte);
        } else {
            let b0 = read_byte(descriptor.get_mut())? as usize;
            let b1 = read_byte(descriptor.get_mut())? as usize;
            let count = ((b0 >> 4) & 0xF) + MINIMUM_MATCH_LENGTH;
            let distance = (((b0 & 0xF) << 8) | b1) + MINIMUM_MATCH_DISTANCE;
            sink.copy(distance, count)?;
        }
    }

    Ok(sink.into_vec())
}

pub fn moduled_decompress(input: &[u8], module_size: usize) -> Result<Vec<u8>> {
    let cfg = ModuledConfig { module_size, ..moduled_cfg() };
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
    fn eighteen_byte_run_round_trips() {
        let data = [b'q'; 18];
        let compressed = compress(&data).unwrap();
        let decompressed = decompress(&compressed[..]).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn header_has_bios_type_and_size() {
        let data = [1u8, 2, 3, 4, 5];
        let compressed = compress(&data).unwrap();
        assert_eq!(compressed[0], COMPRESSION_TYPE);
        assert_eq!(compressed[1..4], [5, 0, 0]);
        assert_eq!(compressed.len() % 4, 0);
    }

    #[test]
    fn vram_safe_never_emits_distance_one_matches() {
        let data = [b'a'; 10];
        let compressed = compress_vram_safe(&data).unwrap();
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
