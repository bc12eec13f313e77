// src/container/mod.rs

//! Workshop `.z` container decoding
//!
//! Workshop content is shipped as chunked zlib containers. Every
//! `Foo.uasset.z` is accompanied by `Foo.uasset.z.uncompressed_size`, a text
//! file holding the decimal size of the original file.
//!
//! Container layout (all integers little-endian):
//!
//! ```text
//! 0x00  magic            C1 83 2A 9E 00 00 00 00
//! 0x08  chunk size       u32 lo, u32 hi
//! 0x10  compressed total u32 lo, u32 hi
//! 0x18  uncompressed tot u32 lo, u32 hi
//! 0x20  chunk table      (compressed u32 lo/hi, uncompressed u32 lo/hi) * N
//!       zlib streams     one per chunk, back to back
//! ```
//!
//! The chunk table has no explicit count. Descriptors are read until their
//! compressed sizes add up to the header's compressed total.
//!
//! Only the low halves of the 64-bit size fields are populated in files seen
//! in the wild. The halves are kept as separate fields and a non-zero high
//! half is rejected rather than guessed at.

use crate::codec::{ByteReader, CodecError};
use crate::compression::{inflate_zlib_into, CompressionError};
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Container magic
pub const CONTAINER_MAGIC: [u8; 8] = [0xC1, 0x83, 0x2A, 0x9E, 0x00, 0x00, 0x00, 0x00];

/// Fixed header size in bytes
pub const HEADER_LEN: usize = 32;

/// Size of one chunk table entry in bytes
pub const CHUNK_DESCRIPTOR_LEN: usize = 16;

/// Upper bound on the output buffer reserved up front
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// File extension of container files
pub const CONTAINER_EXTENSION: &str = "z";

/// Suffix of the companion size file (`Foo.z` -> `Foo.z.uncompressed_size`)
pub const SIZE_HINT_SUFFIX: &str = ".uncompressed_size";

/// Container format errors
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Bad container magic: {found:02x?}")]
    BadMagic { found: [u8; 8] },

    #[error("Truncated container: {0}")]
    Truncated(#[from] CodecError),

    #[error("Unsupported non-zero high half in {field}: {value:#x}")]
    UnsupportedHighHalf { field: &'static str, value: u32 },

    #[error("Chunk table covers {actual} compressed bytes, header declares {declared}")]
    ChunkTableMismatch { declared: u64, actual: u64 },

    #[error("Chunk {index} needs {needed} compressed bytes, {available} remain")]
    ChunkOverrun {
        index: usize,
        needed: usize,
        available: usize,
    },

    #[error("Chunk {index}: {source}")]
    Inflate {
        index: usize,
        source: CompressionError,
    },

    #[error("Chunk {index} inflated to {actual} bytes, table declares {declared}")]
    ChunkSizeMismatch {
        index: usize,
        declared: u32,
        actual: usize,
    },

    #[error("Chunk table declares {actual} uncompressed bytes, header declares {declared}")]
    UncompressedTotalMismatch { declared: u64, actual: u64 },

    #[error("Unpacked size is invalid: declared {declared} bytes, delta {delta}")]
    SizeMismatch { declared: u64, delta: i64 },
}

/// A 64-bit size stored as two little-endian 32-bit halves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SplitSize {
    pub lo: u32,
    pub hi: u32,
}

impl SplitSize {
    fn read(reader: &mut ByteReader<'_>, what: &'static str) -> std::result::Result<Self, CodecError> {
        let lo = reader.read_u32(what)?;
        let hi = reader.read_u32(what)?;
        Ok(Self { lo, hi })
    }

    /// The low half, refusing values that need the high half
    fn low(&self, field: &'static str) -> std::result::Result<u32, ContainerError> {
        if self.hi != 0 {
            return Err(ContainerError::UnsupportedHighHalf {
                field,
                value: self.hi,
            });
        }
        Ok(self.lo)
    }
}

/// Fixed container header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub magic: [u8; 8],
    pub chunk_size: SplitSize,
    pub compressed_total: SplitSize,
    pub uncompressed_total: SplitSize,
}

impl ContainerHeader {
    /// Read and validate the header
    pub fn read(reader: &mut ByteReader<'_>) -> std::result::Result<Self, ContainerError> {
        let raw = reader.take(8, "container magic")?;
        let mut magic = [0u8; 8];
        magic.copy_from_slice(raw);
        if magic != CONTAINER_MAGIC {
            return Err(ContainerError::BadMagic { found: magic });
        }

        Ok(Self {
            magic,
            chunk_size: SplitSize::read(reader, "chunk size")?,
            compressed_total: SplitSize::read(reader, "compressed total")?,
            uncompressed_total: SplitSize::read(reader, "uncompressed total")?,
        })
    }
}

/// One entry of the chunk table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDescriptor {
    pub compressed: SplitSize,
    pub uncompressed: SplitSize,
}

/// Read chunk descriptors until they cover `compressed_total` bytes
fn read_chunk_table(
    reader: &mut ByteReader<'_>,
    compressed_total: u32,
) -> std::result::Result<Vec<ChunkDescriptor>, ContainerError> {
    let mut chunks = Vec::new();
    let mut covered: u64 = 0;

    while covered < u64::from(compressed_total) {
        let chunk = ChunkDescriptor {
            compressed: SplitSize::read(reader, "chunk descriptor")?,
            uncompressed: SplitSize::read(reader, "chunk descriptor")?,
        };
        covered += u64::from(chunk.compressed.low("chunk compressed size")?);
        chunk.uncompressed.low("chunk uncompressed size")?;
        chunks.push(chunk);
    }

    if covered != u64::from(compressed_total) {
        return Err(ContainerError::ChunkTableMismatch {
            declared: u64::from(compressed_total),
            actual: covered,
        });
    }

    Ok(chunks)
}

/// Decode a container held in memory
///
/// `declared_size` is the size from the companion size file. Every byte
/// inflated is subtracted from it, and the result must land exactly on zero.
/// Each chunk must also inflate to the size its table entry declares, and
/// those sizes must add up to the header's uncompressed total.
pub fn decode(data: &[u8], declared_size: u64) -> std::result::Result<Vec<u8>, ContainerError> {
    let mut reader = ByteReader::new(data);
    let header = ContainerHeader::read(&mut reader)?;
    header.chunk_size.low("chunk size")?;
    let compressed_total = header.compressed_total.low("compressed total")?;
    let uncompressed_total = header.uncompressed_total.low("uncompressed total")?;

    let chunks = read_chunk_table(&mut reader, compressed_total)?;
    debug!(
        "Container: {} chunk(s), {} compressed bytes, {} declared",
        chunks.len(),
        compressed_total,
        declared_size
    );

    let mut output = Vec::with_capacity(declared_size.min(MAX_PREALLOC) as usize);
    let mut remaining = declared_size as i64;

    for (index, chunk) in chunks.iter().enumerate() {
        let len = chunk.compressed.lo as usize;
        let available = reader.remaining();
        let stream = reader
            .take(len, "chunk data")
            .map_err(|_| ContainerError::ChunkOverrun {
                index,
                needed: len,
                available,
            })?;

        let produced = inflate_zlib_into(stream, &mut output)
            .map_err(|source| ContainerError::Inflate { index, source })?;
        if produced != chunk.uncompressed.lo as usize {
            return Err(ContainerError::ChunkSizeMismatch {
                index,
                declared: chunk.uncompressed.lo,
                actual: produced,
            });
        }
        remaining -= produced as i64;
    }

    if remaining != 0 {
        return Err(ContainerError::SizeMismatch {
            declared: declared_size,
            delta: remaining,
        });
    }

    let table_total: u64 = chunks.iter().map(|c| u64::from(c.uncompressed.lo)).sum();
    if table_total != u64::from(uncompressed_total) {
        return Err(ContainerError::UncompressedTotalMismatch {
            declared: u64::from(uncompressed_total),
            actual: table_total,
        });
    }

    Ok(output)
}

/// Companion size file of a container
pub fn size_hint_path(container: &Path) -> PathBuf {
    let mut name = container.as_os_str().to_owned();
    name.push(SIZE_HINT_SUFFIX);
    PathBuf::from(name)
}

/// Output path of a container (`Foo.uasset.z` -> `Foo.uasset`)
pub fn output_path(container: &Path) -> PathBuf {
    container.with_extension("")
}

/// Read the decimal size from a companion size file
pub fn read_size_hint(path: &Path) -> Result<u64> {
    let text = fs::read_to_string(path)
        .map_err(|e| Error::IoError(format!("Failed to read {}: {e}", path.display())))?;
    text.trim().parse::<u64>().map_err(|e| {
        Error::ParseError(format!(
            "Invalid uncompressed size '{}' in {}: {e}",
            text.trim(),
            path.display()
        ))
    })
}

/// Find every container under `root`, in a stable order
pub fn find_containers(root: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            Error::IoError(format!("Failed to walk {}: {e}", root.display()))
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == CONTAINER_EXTENSION)
        {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

/// Decode one container next to itself and delete the source files
///
/// Returns the path of the decoded file. The source container and its size
/// file are only removed once the output has been written.
pub fn unpack_file(container: &Path) -> Result<PathBuf> {
    let hint_path = size_hint_path(container);
    let dest = output_path(container);

    let data = fs::read(container)
        .map_err(|e| Error::IoError(format!("Failed to read {}: {e}", container.display())))?;
    let declared = read_size_hint(&hint_path)?;

    let plain = decode(&data, declared).map_err(|source| Error::Container {
        path: container.to_path_buf(),
        source,
    })?;

    fs::write(&dest, &plain)
        .map_err(|e| Error::IoError(format!("Failed to write {}: {e}", dest.display())))?;

    for path in [container, hint_path.as_path()] {
        fs::remove_file(path)
            .map_err(|e| Error::IoError(format!("Failed to remove {}: {e}", path.display())))?;
    }

    debug!("Unpacked {} ({} bytes)", dest.display(), plain.len());
    Ok(dest)
}

/// Unpack every container under `root`
pub fn unpack_tree(root: &Path) -> Result<usize> {
    let containers = find_containers(root)?;
    info!("Unpacking {} container(s) under {}", containers.len(), root.display());
    for container in &containers {
        unpack_file(container)?;
    }
    Ok(containers.len())
}

/// Build a container from plain data, one zlib stream per `chunk_len` bytes
///
/// The inverse of [`decode`]; used for test fixtures and tooling.
pub fn encode(data: &[u8], chunk_len: usize) -> std::result::Result<Vec<u8>, CompressionError> {
    let chunk_len = chunk_len.max(1);
    let mut table = Vec::new();
    let mut streams = Vec::new();
    let mut compressed_total: u32 = 0;

    for piece in data.chunks(chunk_len) {
        let stream = crate::compression::deflate_zlib(piece)?;
        for value in [stream.len() as u32, 0, piece.len() as u32, 0] {
            table.extend_from_slice(&value.to_le_bytes());
        }
        compressed_total += stream.len() as u32;
        streams.extend_from_slice(&stream);
    }

    let mut out = Vec::with_capacity(HEADER_LEN + table.len() + streams.len());
    out.extend_from_slice(&CONTAINER_MAGIC);
    for value in [chunk_len as u32, 0, compressed_total, 0, data.len() as u32, 0] {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out.extend_from_slice(&table);
    out.extend_from_slice(&streams);
    Ok(out)
}
