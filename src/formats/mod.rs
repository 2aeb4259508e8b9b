//! One module per supported format, each exposing a `compress` and a
//! `decompress` free function (plus `moduled_compress`/`moduled_decompress`
//! where the format supports chunking) operating on plain byte buffers.

pub mod chameleon;
pub mod comper;
pub mod enigma;
pub mod faxman;
pub mod gba;
pub mod kosinski;
pub mod kosinski_plus;
pub mod rage;
pub mod rocket;
pub mod saxman;
