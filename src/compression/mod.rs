// src/compression/mod.rs
//! zlib helpers for workshop content
//!
//! Workshop `.z` containers hold a sequence of independent zlib streams,
//! one per chunk. These helpers inflate a single stream at a time so the
//! container decoder can account for each chunk separately.

use flate2::read::ZlibDecoder;
use std::io::{self, Read};
use thiserror::Error;

/// Compression-related errors
#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Failed to inflate {format} chunk: {source}")]
    Decompression {
        format: &'static str,
        source: io::Error,
    },

    #[error("Failed to deflate {format} data: {source}")]
    Compression {
        format: &'static str,
        source: io::Error,
    },
}

/// Inflate one zlib stream and append the output to `out`
///
/// Returns the number of bytes appended.
pub fn inflate_zlib_into(data: &[u8], out: &mut Vec<u8>) -> Result<usize, CompressionError> {
    let before = out.len();
    ZlibDecoder::new(data)
        .read_to_end(out)
        .map_err(|e| CompressionError::Decompression {
            format: "zlib",
            source: e,
        })?;
    Ok(out.len() - before)
}

/// Deflate `data` into a single zlib stream
pub fn deflate_zlib(data: &[u8]) -> Result<Vec<u8>, CompressionError> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| CompressionError::Compression {
            format: "zlib",
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inflate_known_stream() {
        // zlib stream of "hello"
        let data: &[u8] = &[
            0x78, 0x9c, 0xcb, 0x48, 0xcd, 0xc9, 0xc9, 0x07, 0x00, 0x06, 0x2c, 0x02, 0x15,
        ];
        let mut out = Vec::new();
        assert_eq!(inflate_zlib_into(data, &mut out).unwrap(), 5);
        assert_eq!(out, b"hello");
    }

    #[test]
    fn test_deflate_then_inflate() {
        let payload = vec![7u8; 4096];
        let compressed = deflate_zlib(&payload).unwrap();
        assert!(compressed.len() < payload.len());

        let mut out = b"prefix".to_vec();
        let added = inflate_zlib_into(&compressed, &mut out).unwrap();
        assert_eq!(added, 4096);
        assert_eq!(out.len(), 4096 + 6);
    }

    #[test]
    fn test_inflate_garbage_fails() {
        let err = inflate_zlib_into(b"definitely not zlib", &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("zlib"));
    }
}
