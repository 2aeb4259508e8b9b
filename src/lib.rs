// Copyright 2016 Martin Grabmueller. See the LICENSE file at the
// top-level directory of this distribution for license information.

//! A suite of LZSS-derived compressors and decompressors for a handful
//! of retro-console formats, all sharing one cost-optimal parser, bit
//! packer, and decoder output sink. See [`formats`] for the list of
//! supported formats.

pub mod bitfield;
pub mod dict;
pub mod error;
pub mod formats;
pub mod io;
pub mod moduled;
pub mod parser;
