// src/commands/inspect.rs
//! Offline file commands: unpack, manifest, descriptor

use anyhow::{Context as _, Result};
use arkctl::descriptor::{ModDescriptor, VersionRecord};
use arkctl::{container, manifest};
use std::path::Path;

/// Decode a single `.z` container in place
pub fn cmd_unpack(file: &Path) -> Result<()> {
    let dest = container::unpack_file(file)?;
    println!("Unpacked {} -> {}", file.display(), dest.display());
    Ok(())
}

/// Print every `path<TAB>value` pair of a manifest
pub fn cmd_manifest(file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    for pair in manifest::parse(&text) {
        println!("{}\t{}", pair.path, pair.value);
    }
    Ok(())
}

/// Print a `.mod` descriptor and its version record when present
pub fn cmd_descriptor(file: &Path) -> Result<()> {
    let data = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let descriptor = ModDescriptor::decode(&data)
        .with_context(|| format!("Invalid descriptor {}", file.display()))?;

    println!("Item:     {}", descriptor.item_id);
    println!("Title:    {}", descriptor.title);
    println!("Path:     {}", descriptor.install_path);
    println!("ModType:  {}", if descriptor.has_mod_type { "yes" } else { "no" });
    println!("Maps:     {}", descriptor.maps.len());
    for map in &descriptor.maps {
        println!("  {}", map);
    }
    println!("Meta:     {}", descriptor.meta.len());
    for (key, value) in &descriptor.meta {
        println!("  {} = {}", key, value);
    }

    if let Some(record) = VersionRecord::load(&file.with_extension("yaml"))? {
        println!("Updated:  {}", record.updated_display());
    }
    Ok(())
}
