// texport-parsers/src/pk3/compression.rs
//! Compression handling for PK3 packages
//!
//! Packages built by the stock tools only ever use:
//! - Store (no compression)
//! - Deflate (standard ZIP)

use std::io::{Read, Write};

use crate::traits::{ParseError, ParseResult};
use super::CompressionMethod;

/// Handles compression and decompression for PK3 entries
pub struct Pk3Compression;

impl Pk3Compression {
    /// Decompress data using the specified compression method
    pub fn decompress(
        data: &[u8],
        method: CompressionMethod,
        expected_size: usize,
    ) -> ParseResult<Vec<u8>> {
        let output = match method {
            CompressionMethod::Store => data.to_vec(),
            CompressionMethod::Deflate => Self::decompress_deflate(data, expected_size)?,
            CompressionMethod::Unknown(method) => {
                return Err(ParseError::UnsupportedFeature(
                    format!("compression method {method}")
                ));
            }
        };

        if output.len() != expected_size {
            return Err(ParseError::DecompressionFailed(format!(
                "size mismatch: expected {}, got {}",
                expected_size,
                output.len()
            )));
        }

        Ok(output)
    }

    fn decompress_deflate(data: &[u8], expected_size: usize) -> ParseResult<Vec<u8>> {
        // One byte past the declared size is enough to detect a mismatch
        let limit = expected_size as u64 + 1;
        let mut decoder = flate2::read::DeflateDecoder::new(data).take(limit);
        let mut output = Vec::with_capacity(expected_size);

        decoder.read_to_end(&mut output)
            .map_err(|e| ParseError::DecompressionFailed(
                format!("DEFLATE decompression failed: {e}")
            ))?;

        Ok(output)
    }

    /// Compress data using the specified method
    pub fn compress(data: &[u8], method: CompressionMethod) -> ParseResult<Vec<u8>> {
        match method {
            CompressionMethod::Store => Ok(data.to_vec()),
            CompressionMethod::Deflate => {
                let mut encoder = flate2::write::DeflateEncoder::new(
                    Vec::new(),
                    flate2::Compression::default(),
                );
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
            CompressionMethod::Unknown(method) => Err(ParseError::UnsupportedFeature(
                format!("cannot compress with method {method}")
            )),
        }
    }

    /// Calculate CRC32 checksum
    pub fn crc32(data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(data);
        hasher.finalize()
    }

    /// Verify data integrity using CRC32
    pub fn verify_crc32(data: &[u8], expected: u32) -> bool {
        Self::crc32(data) == expected
    }
}
