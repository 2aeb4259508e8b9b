// Copyright 2016 Martin Grabmueller. See the LICENSE file at the
// top-level directory of this distribution for license information.

//! Rage (Streets of Rage 1, Mega Drive): unlike every other format in
//! this crate, there's no bit-level descriptor stream at all — every
//! opcode is a whole byte, tagged by its top three bits. There's also
//! no ordinary single-byte literal opcode; runs of arbitrary bytes are
//! instead emitted as their own kind of "match" (distance `0`), found by
//! the same cost-optimal parser as everything else by registering them,
//! and the run-length-encoded fill opcode, as synthetic edges. A
//! dictionary match longer than 7 bytes spills into extra "repeat the
//! last distance" opcodes of up to 31 bytes each, all still describing
//! one parsed match.

use std::io::{Cursor, Read, Write};

use crate::dict::DictionarySink;
use crate::error::{Error, Result};
use crate::moduled::{self, ModuledConfig};
use crate::parser::{find_optimal_matches, ExtraEdge, Match};

const MAX_MATCH_DISTANCE: usize = 0x1FFF;
const MIN_DICTIONARY_MATCH_LENGTH: usize = 4;
const MAX_RLE_RUN_LENGTH: usize = 0xFFF + 4;
const MAX_LITERAL_RUN_LENGTH: usize = 0x1FFF;

/// Marks a sentinel edge as an uncompressed run rather than an RLE fill;
/// real RLE fill bytes are always `0..=0xFF`, so this is never confused
/// with one.
const LITERAL_RUN_SENTINEL: i64 = -1;

/// So large that the plain per-unit literal edge is always beaten by
/// the uncompressed-run sentinel edge of the same length (which this
/// format always offers starting at length 1).
fn literal_cost(_unit: &[u8]) -> usize {
    usize::MAX / 2
}

fn match_cost(_distance: usize, length: usize) -> Option<usize> {
    if length < MIN_DICTIONARY_MATCH_LENGTH {
        return None;
    }
    let extra_after_inline = length.saturating_sub(7);
    let continuation_chunks = (extra_after_inline + 0x1E) / 0x1F;
    Some((2 + continuation_chunks) * 8)
}

fn extra_edges(data: &[u8], position: usize) -> Vec<ExtraEdge> {
    let mut edges = Vec::new();

    let rle_read_ahead = MAX_RLE_RUN_LENGTH.min(data.len() - position);
    let repeated_byte = data[position];
    for k in 0..rle_read_ahead {
        if data[position + k] != repeated_byte {
            break;
        }
        let length = k + 1;
        if length < MIN_DICTIONARY_MATCH_LENGTH {
            continue;
        }
        let extra = length - 4;
        let header_bytes = if extra > 0xF { 2 } else { 1 };
        edges.push(ExtraEdge {
            sentinel_payload: repeated_byte as i64,
            length,
            cost: (header_bytes + 1) * 8,
        });
    }

    let literal_read_ahead = MAX_LITERAL_RUN_LENGTH.min(data.len() - position);
    for k in 0..literal_read_ahead {
        let length = k + 1;
        let header_bytes = if length > 0x1F { 2 } else { 1 };
        edges.push(ExtraEdge {
            sentinel_payload: LITERAL_RUN_SENTINEL,
            length,
            cost: (length + header_bytes) * 8,
        });
    }

    edges
}

fn is_uncompressed_run(m: &Match) -> bool {
    m.is_literal() || (m.is_sentinel() && m.sentinel_payload() == LITERAL_RUN_SENTINEL)
}

fn write_run_header(out: &mut Vec<u8>, length: usize) {
    if length > 0x1F {
        out.push(0x20 | ((length >> 8) & 0x1F) as u8);
        out.push((length & 0xFF) as u8);
    } else {
        out.push(length as u8);
    }
}

fn write_rle_header(out: &mut Vec<u8>, length: usize) {
    let extra = length - MIN_DICTIONARY_MATCH_LENGTH;
    if extra > 0xF {
        out.push(0x40 | 0x10 | ((extra >> 8) & 0xF) as u8);
        out.push((extra & 0xFF) as u8);
    } else {
        out.push(0x40 | (extra & 0xF) as u8);
    }
}

fn emit(data: &[u8], matches: &[Match]) -> Vec<u8> {
    let mut out = Vec::new();

    for m in matches {
        if is_uncompressed_run(m) {
            write_run_header(&mut out, m.length);
            out.extend_from_slice(&data[m.destination..m.destination + m.length]);
        } else if m.is_sentinel() {
            write_rle_header(&mut out, m.length);
            out.push(m.sentinel_payload() as u8);
        } else {
            let distance = (m.destination as i64 - m.source) as usize;
            let mut remaining = m.length - MIN_DICTIONARY_MATCH_LENGTH;
            let first_chunk = remaining.min(3);

            out.push(0x80 | ((first_chunk << 5) | ((distance >> 8) & 0x1F)) as u8);
            out.push((distance & 0xFF) as u8);
            remaining -= first_chunk;

            while remaining != 0 {
                let chunk = remaining.min(0x1F);
                out.push(0x60 | chunk as u8);
                remaining -= chunk;
            }
        }
    }

    out
}

pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let matches = find_optimal_matches(data, 1, usize::MAX / 2, MAX_MATCH_DISTANCE, None, literal_cost, match_cost, extra_edges);
    let body = emit(data, &matches);

    let mut out = Vec::with_capacity(body.len() + 2);
    out.extend_from_slice(&((body.len() + 2) as u16).to_le_bytes());
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
    let compressed_size = read_le16(&mut input)? as usize;
    let body_len = compressed_size - 2;

    let mut consumed = 0usize;
    let mut sink = DictionarySink::new(None);
    // Meaningful only once a dictionary match has actually been decoded.
    let mut distance = 0usize;

    while consumed < body_len {
        let first_byte = read_byte(&mut input)? as usize;
        consumed += 1;

        match first_byte >> 5 {
            0 | 1 => {
                let count = if first_byte & 0x20 != 0 {
                    let extra = read_byte(&mut input)?;
                    consumed += 1;
                    ((first_byte << 8) & 0x1F00) | extra as usize
                } else {
                    first_byte
                };
                for _ in 0..count {
                    let byte = read_byte(&mut input)?;
                    consumed += 1;
                    sink.push(byte);
                }
            }
            2 => {
                let mut count = MIN_DICTIONARY_MATCH_LENGTH;
                if first_byte & 0x10 != 0 {
                    let extra = read_byte(&mut input)?;
                    consumed += 1;
                    count += ((first_byte << 8) & 0xF00) | extra as usize;
                } else {
                    count += first_byte & 0xF;
                }
                let value = read_byte(&mut input)?;
                consumed += 1;
                for _ in 0..count {
                    sink.push(value);
                }
            }
            3 => {
                let count = first_byte & 0x1F;
                sink.copy(distance, count)?;
            }
            _ => {
                let second_byte = read_byte(&mut input)?;
                consumed += 1;
                let count = ((first_byte >> 5) & 3) + 4;
                distance = ((first_byte << 8) & 0x1F00) | second_byte as usize;
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
    fn single_byte_round_trips() {
        let data = b"a";
        let compressed = compress(data).unwrap();
        let decompressed = decompress(&compressed[..]).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn uncompressed_run_round_trips() {
        let data = b"The quick brown fox";
        let compressed = compress(data).unwrap();
        let decompressed = decompress(&compressed[..]).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn rle_run_round_trips() {
        let data = [b'q'; 40];
        let compressed = compress(&data).unwrap();
        let decompressed = decompress(&compressed[..]).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn dictionary_match_spans_continuation_opcodes() {
        let mut data = b"abcdefghijklmnop".to_vec();
        data.extend_from_slice(b"abcdefghijklmnop");
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
