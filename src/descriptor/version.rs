// src/descriptor/version.rs

//! Version record sidecar (`<id>.yaml`)
//!
//! Remembers the workshop `time_updated` of the last installed build of a
//! mod so unchanged mods are not downloaded again.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub title: String,
    /// Workshop `time_updated`, seconds since the epoch
    pub updated: i64,
}

impl VersionRecord {
    pub fn new(title: impl Into<String>, updated: i64) -> Self {
        Self {
            title: title.into(),
            updated,
        }
    }

    /// Load a record, returning `None` when the file does not exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::IoError(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        let record = serde_yaml::from_str(&text).map_err(|e| {
            Error::ParseError(format!("Invalid version record {}: {e}", path.display()))
        })?;
        Ok(Some(record))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_yaml::to_string(self).map_err(|e| {
            Error::ParseError(format!("Failed to serialize version record: {e}"))
        })?;
        fs::write(path, text)
            .map_err(|e| Error::IoError(format!("Failed to write {}: {e}", path.display())))
    }

    /// `updated` rendered as UTC, for user-facing messages
    pub fn updated_display(&self) -> String {
        chrono::DateTime::from_timestamp(self.updated, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| self.updated.to_string())
    }
}
