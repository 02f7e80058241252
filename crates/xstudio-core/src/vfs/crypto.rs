//! Obfuscation used by the game's packed data
//!
//! All three layers are XOR based, so each function both encodes and decodes:
//! - catalogs (`.cat`): byte `i` is XORed with `0xDB + i`
//! - data files (`.dat`): every byte is XORed with `0x33`
//! - PCK payloads: a key byte (stored XORed with `0xC8`) followed by a gzip
//!   stream XORed with that key

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Seed of the rolling catalog key
pub const CATALOG_SEED: u8 = 0xDB;

/// Data file key
pub const DATA_KEY: u8 = 0x33;

/// Mask applied to the PCK key byte
pub const PCK_MASK: u8 = 0xC8;

/// Catalog key for the byte at absolute file position `position`
#[inline]
pub fn catalog_key(position: u64) -> u8 {
    CATALOG_SEED.wrapping_add(position as u8)
}

/// Apply the catalog cipher to a buffer that starts at file position `start`
pub fn apply_catalog_cipher(bytes: &mut [u8], start: u64) {
    for (i, b) in bytes.iter_mut().enumerate() {
        *b ^= catalog_key(start + i as u64);
    }
}

/// Apply the data file cipher in place
pub fn apply_data_cipher(bytes: &mut [u8]) {
    for b in bytes.iter_mut() {
        *b ^= DATA_KEY;
    }
}

/// Unpack a PCK payload (already stripped of the data file cipher)
pub fn decode_pck(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let Some((&first, rest)) = bytes.split_first() else {
        return Ok(Vec::new());
    };
    let key = first ^ PCK_MASK;
    let gzip: Vec<u8> = rest.iter().map(|b| b ^ key).collect();

    let mut decoder = GzDecoder::new(gzip.as_slice());
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Pack bytes into a PCK payload using `key`
pub fn encode_pck(bytes: &[u8], key: u8) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    let gzip = encoder.finish()?;

    let mut out = Vec::with_capacity(gzip.len() + 1);
    out.push(key ^ PCK_MASK);
    out.extend(gzip.iter().map(|b| b ^ key));
    Ok(out)
}
