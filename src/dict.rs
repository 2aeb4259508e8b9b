// Copyright 2016 Martin Grabmueller. See the LICENSE file at the
// top-level directory of this distribution for license information.

//! Decoder output sink: a growing buffer that also serves as its own
//! dictionary, the way a `Vec`/slice-backed output does in the original
//! decompressor (the ring-buffer "second copy" trick that library uses
//! for streaming `ostream` output is an optimization this crate doesn't
//! need, since every format here decodes into an owned `Vec<u8>`).

use crate::error::{Error, Result};

pub struct DictionarySink {
    buf: Vec<u8>,
    filler_value: Option<u8>,
}

impl DictionarySink {
    pub fn new(filler_value: Option<u8>) -> Self {
        DictionarySink { buf: Vec::new(), filler_value }
    }

    pub fn with_capacity(capacity: usize, filler_value: Option<u8>) -> Self {
        DictionarySink { buf: Vec::with_capacity(capacity), filler_value }
    }

    pub fn push(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Copies `count` bytes from `distance` bytes back in the output to
    /// its end. When this sink has a `filler_value` and `distance`
    /// reaches further back than any real output exists yet, the
    /// overhung portion is synthesized as `filler_value` bytes instead
    /// of erroring (Rocket's mandatory pre-fill).
    pub fn copy(&mut self, distance: usize, count: usize) -> Result<()> {
        match self.filler_value {
            Some(filler) => {
                let limit = self.buf.len();
                let capped_distance = distance.min(limit);
                let fill_amount = (distance - capped_distance).min(count);

                for _ in 0..fill_amount {
                    self.buf.push(filler);
                }
                let start = self.buf.len() - capped_distance;
                for i in 0..(count - fill_amount) {
                    let b = self.buf[start + i];
                    self.buf.push(b);
                }
            }
            None => {
                if distance == 0 || distance > self.buf.len() {
                    return Err(Error::Format(format!(
                        "match distance {} exceeds {} bytes of output produced so far",
                        distance,
                        self.buf.len()
                    )));
                }
                let start = self.buf.len() - distance;
                for i in 0..count {
                    let b = self.buf[start + i];
                    self.buf.push(b);
                }
            }
        }
        Ok(())
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_copy_handles_overlap() {
        let mut sink = DictionarySink::new(None);
        sink.extend(b"ab");
        sink.copy(2, 5).unwrap();
        assert_eq!(sink.into_vec(), b"ababababab".to_vec()[..7].to_vec());
    }

    #[test]
    fn filler_value_pads_overhung_distance() {
        let mut sink = DictionarySink::new(Some(0x20));
        sink.copy(4, 4).unwrap();
        assert_eq!(sink.into_vec(), vec![0x20, 0x20, 0x20, 0x20]);
    }

    #[test]
    fn plain_copy_rejects_out_of_range_distance() {
        let mut sink = DictionarySink::new(None);
        sink.extend(b"a");
        assert!(sink.copy(5, 1).is_err());
    }
}
