// src/update/install.rs

//! Descriptor staging and the final move into `ShooterGame/Content/Mods`

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

use super::Layout;
use crate::descriptor::{self, MOD_INFO_FILE, MOD_META_INFO_FILE, VersionRecord};
use crate::error::{Error, Result};

/// Descriptor staged inside the work directory before install
pub const STAGED_DESCRIPTOR: &str = ".mod";

/// Version record staged inside the work directory before install
pub const STAGED_VERSION: &str = ".yaml";

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::IoError(format!("Failed to read {}: {e}", path.display())))
}

/// Build `.mod` and `.yaml` inside an unpacked mod directory
///
/// Reads `mod.info` and `modmeta.info` from `work_dir`.
pub fn build_descriptor_in_dir(
    work_dir: &Path,
    item_id: u64,
    title: &str,
    updated: i64,
) -> Result<VersionRecord> {
    let mod_info = read_file(&work_dir.join(MOD_INFO_FILE))?;
    let mod_meta_info = read_file(&work_dir.join(MOD_META_INFO_FILE))?;

    let (bytes, record) = descriptor::build(&mod_info, &mod_meta_info, item_id, title, updated)
        .map_err(|source| Error::Descriptor { item_id, source })?;

    let descriptor_path = work_dir.join(STAGED_DESCRIPTOR);
    fs::write(&descriptor_path, &bytes).map_err(|e| {
        Error::IoError(format!("Failed to write {}: {e}", descriptor_path.display()))
    })?;
    record.save(&work_dir.join(STAGED_VERSION))?;

    debug!("Staged descriptor for MOD[{}] ({} bytes)", item_id, bytes.len());
    Ok(record)
}

/// Remove a file or directory tree; absent paths are fine
fn remove_existing(path: &Path) -> Result<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => Err(e),
    };
    result.map_err(|e| Error::IoError(format!("Failed to remove {}: {e}", path.display())))
}

fn rename(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to).map_err(|e| {
        Error::IoError(format!(
            "Failed to move {} to {}: {e}",
            from.display(),
            to.display()
        ))
    })
}

/// Move a staged mod directory into place
///
/// Replaces `Mods/<id>`, `Mods/<id>.mod` and `Mods/<id>.yaml`. The staged
/// `.mod` and `.yaml` travel with the directory and are then renamed out of
/// it, so `work_dir` must hold both.
pub fn install_mod(layout: &Layout, work_dir: &Path, item_id: u64) -> Result<()> {
    let mods_root = layout.mods_root();
    let dest_dir = layout.installed_mod_dir(item_id);
    let dest_descriptor = layout.installed_descriptor(item_id);
    let dest_version = layout.installed_version(item_id);

    for staged in [STAGED_DESCRIPTOR, STAGED_VERSION] {
        let path = work_dir.join(staged);
        if !path.is_file() {
            return Err(Error::NotFoundError(format!(
                "{} has not been built",
                path.display()
            )));
        }
    }

    fs::create_dir_all(&mods_root).map_err(|e| {
        Error::IoError(format!("Failed to create {}: {e}", mods_root.display()))
    })?;

    for path in [&dest_dir, &dest_descriptor, &dest_version] {
        remove_existing(path)?;
    }

    rename(work_dir, &dest_dir)?;
    rename(&dest_dir.join(STAGED_DESCRIPTOR), &dest_descriptor)?;
    rename(&dest_dir.join(STAGED_VERSION), &dest_version)?;

    info!("Installed MOD[{}] into {}", item_id, dest_dir.display());
    Ok(())
}
