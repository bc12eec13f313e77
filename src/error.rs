// src/error.rs

//! Crate-wide error type
//!
//! Engine modules keep their own focused error enums; this type aggregates
//! them and adds string-carrying variants for I/O and lookup failures, which
//! always name the path or item involved.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::container::ContainerError;
use crate::descriptor::DescriptorError;
use crate::session::SessionError;
use crate::workshop::WorkshopError;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem failure, message carries operation and path
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Download error: {0}")]
    DownloadError(String),

    #[error("Not found: {0}")]
    NotFoundError(String),

    #[error("Invalid container {}: {source}", path.display())]
    Container {
        path: PathBuf,
        source: ContainerError,
    },

    #[error("Invalid mod metadata for item {item_id}: {source}")]
    Descriptor {
        item_id: u64,
        source: DescriptorError,
    },

    #[error("SteamCMD session failed: {0}")]
    Session(#[from] SessionError),

    #[error(transparent)]
    Workshop(#[from] WorkshopError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
