// src/lib.rs

//! arkctl: ARK dedicated server administration
//!
//! Keeps an ARK: Survival Evolved dedicated server and its workshop mods up
//! to date by driving SteamCMD, then turns downloaded workshop content into
//! something the server can load.
//!
//! # Architecture
//!
//! - `session`: SteamCMD under a pseudo-terminal, one prompt at a time
//! - `manifest`: Valve key/value text (`.acf`, `app_info_print`) flattened to dotted paths
//! - `container`: chunked zlib `.z` files from workshop downloads
//! - `descriptor`: the binary `<id>.mod` file plus its `<id>.yaml` version record
//! - `update`: checks and update pipelines tying the above together

pub mod codec;
pub mod compression;
pub mod config;
pub mod container;
pub mod descriptor;
mod error;
pub mod manifest;
pub mod report;
pub mod session;
pub mod update;
pub mod workshop;

pub use config::{Config, ConfigError, OutputTarget, Overrides};
pub use descriptor::{ModDescriptor, VersionRecord};
pub use error::{Error, Result};
pub use manifest::ManifestPair;
pub use report::{LogReporter, Reporter, SilentReporter, WriterReporter};
pub use session::{CancelToken, SessionError, SteamCmd};
pub use update::{Layout, PendingMod, Updater};
pub use workshop::{ItemDetails, WorkshopClient, WorkshopError};
