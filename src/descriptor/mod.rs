// src/descriptor/mod.rs

//! `.mod` descriptor generation
//!
//! The dedicated server only loads a workshop mod when
//! `ShooterGame/Content/Mods/<id>.mod` exists next to the mod directory.
//! SteamCMD does not produce that file, so it is synthesized from the two
//! metadata files shipped inside the mod:
//!
//! - `mod.info`: internal name, then a counted list of map names
//! - `modmeta.info`: a counted list of key/value pairs
//!
//! Descriptor layout (little-endian, strings per [`crate::codec`]):
//!
//! ```text
//! u32     item id
//! u32     reserved (0)
//! string  title
//! string  "../../../ShooterGame/Content/Mods/<id>"
//! u32     map count, then map names
//! u32     4280483635 (33 FF 22 FF)
//! u32     2
//! u8      1 if modmeta.info has a "ModType" key, else 0
//! u32     meta count, then key/value strings
//! ```

pub mod version;

pub use version::VersionRecord;

use crate::codec::{self, ByteReader, CodecError};
use thiserror::Error;

/// Relative root the server resolves mod paths against
pub const MODS_RELATIVE_ROOT: &str = "../../../ShooterGame/Content/Mods";

/// The two fixed words following the map list
pub const DESCRIPTOR_MAGIC: [u32; 2] = [4280483635, 2];

/// Meta key whose presence sets the extended-type flag
pub const MOD_TYPE_KEY: &str = "ModType";

/// File name of the primary metadata file inside a mod
pub const MOD_INFO_FILE: &str = "mod.info";

/// File name of the extended metadata file inside a mod
pub const MOD_META_INFO_FILE: &str = "modmeta.info";

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("Failed to read {what}: {source}")]
    Field {
        what: &'static str,
        source: CodecError,
    },

    #[error("Item id {0} does not fit in a descriptor")]
    ItemIdOutOfRange(u64),

    #[error("Unexpected descriptor magic {found:?}")]
    BadMagic { found: [u32; 2] },

    #[error("{0} trailing bytes after descriptor")]
    TrailingBytes(usize),
}

type DescriptorResult<T> = std::result::Result<T, DescriptorError>;

/// Attach a field name to a codec failure
fn field<T>(what: &'static str, result: Result<T, CodecError>) -> DescriptorResult<T> {
    result.map_err(|source| DescriptorError::Field { what, source })
}

/// Contents of `mod.info`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModInfo {
    /// Internal mod name; not carried into the descriptor
    pub name: String,
    pub maps: Vec<String>,
}

impl ModInfo {
    pub fn parse(data: &[u8]) -> DescriptorResult<Self> {
        let mut reader = ByteReader::new(data);
        let (name, _) = field("mod name", reader.read_string())?;
        let count = field("map count", reader.read_u32("map count"))?;

        let mut maps = Vec::new();
        for _ in 0..count {
            let (map, _) = field("map name", reader.read_string())?;
            maps.push(map);
        }

        Ok(Self { name, maps })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        codec::write_string(&mut out, &self.name);
        out.extend_from_slice(&(self.maps.len() as u32).to_le_bytes());
        for map in &self.maps {
            codec::write_string(&mut out, map);
        }
        out
    }
}

/// Contents of `modmeta.info`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModMetaInfo {
    pub entries: Vec<(String, String)>,
}

impl ModMetaInfo {
    pub fn parse(data: &[u8]) -> DescriptorResult<Self> {
        let mut reader = ByteReader::new(data);
        let count = field("meta count", reader.read_u32("meta count"))?;

        let mut entries = Vec::new();
        for _ in 0..count {
            let (key, _) = field("meta key", reader.read_string())?;
            let (value, _) = field("meta value", reader.read_string())?;
            entries.push((key, value));
        }

        Ok(Self { entries })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
        for (key, value) in &self.entries {
            codec::write_string(&mut out, key);
            codec::write_string(&mut out, value);
        }
        out
    }

    /// Whether any key is exactly `ModType`
    pub fn has_mod_type(&self) -> bool {
        self.entries.iter().any(|(key, _)| key == MOD_TYPE_KEY)
    }
}

/// The binary `.mod` record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModDescriptor {
    pub item_id: u32,
    pub title: String,
    pub install_path: String,
    pub maps: Vec<String>,
    pub has_mod_type: bool,
    pub meta: Vec<(String, String)>,
}

impl ModDescriptor {
    /// Assemble a descriptor from parsed metadata
    pub fn new(item_id: u64, title: &str, info: ModInfo, meta: ModMetaInfo) -> DescriptorResult<Self> {
        let id = u32::try_from(item_id).map_err(|_| DescriptorError::ItemIdOutOfRange(item_id))?;
        let has_mod_type = meta.has_mod_type();
        Ok(Self {
            item_id: id,
            title: title.to_string(),
            install_path: format!("{}/{}", MODS_RELATIVE_ROOT, item_id),
            maps: info.maps,
            has_mod_type,
            meta: meta.entries,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.item_id.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        codec::write_string(&mut out, &self.title);
        codec::write_string(&mut out, &self.install_path);

        out.extend_from_slice(&(self.maps.len() as u32).to_le_bytes());
        for map in &self.maps {
            codec::write_string(&mut out, map);
        }

        for word in DESCRIPTOR_MAGIC {
            out.extend_from_slice(&word.to_le_bytes());
        }
        out.push(u8::from(self.has_mod_type));

        out.extend_from_slice(&(self.meta.len() as u32).to_le_bytes());
        for (key, value) in &self.meta {
            codec::write_string(&mut out, key);
            codec::write_string(&mut out, value);
        }
        out
    }

    /// Decode an existing `.mod` file
    pub fn decode(data: &[u8]) -> DescriptorResult<Self> {
        let mut reader = ByteReader::new(data);
        let item_id = field("item id", reader.read_u32("item id"))?;
        field("reserved", reader.read_u32("reserved"))?;
        let (title, _) = field("title", reader.read_string())?;
        let (install_path, _) = field("install path", reader.read_string())?;

        let map_count = field("map count", reader.read_u32("map count"))?;
        let mut maps = Vec::new();
        for _ in 0..map_count {
            maps.push(field("map name", reader.read_string())?.0);
        }

        let found = [
            field("magic", reader.read_u32("magic"))?,
            field("magic", reader.read_u32("magic"))?,
        ];
        if found != DESCRIPTOR_MAGIC {
            return Err(DescriptorError::BadMagic { found });
        }
        let has_mod_type = field("mod type flag", reader.read_u8("mod type flag"))? != 0;

        let meta_count = field("meta count", reader.read_u32("meta count"))?;
        let mut meta = Vec::new();
        for _ in 0..meta_count {
            let (key, _) = field("meta key", reader.read_string())?;
            let (value, _) = field("meta value", reader.read_string())?;
            meta.push((key, value));
        }

        if reader.remaining() != 0 {
            return Err(DescriptorError::TrailingBytes(reader.remaining()));
        }

        Ok(Self {
            item_id,
            title,
            install_path,
            maps,
            has_mod_type,
            meta,
        })
    }
}

/// Build descriptor bytes and the matching version record
pub fn build(
    mod_info: &[u8],
    mod_meta_info: &[u8],
    item_id: u64,
    title: &str,
    updated: i64,
) -> DescriptorResult<(Vec<u8>, VersionRecord)> {
    let info = ModInfo::parse(mod_info)?;
    let meta = ModMetaInfo::parse(mod_meta_info)?;
    let descriptor = ModDescriptor::new(item_id, title, info, meta)?;
    Ok((descriptor.encode(), VersionRecord::new(title, updated)))
}
