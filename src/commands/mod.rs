// src/commands/mod.rs
//! Command handlers for the arkctl CLI

mod inspect;
mod mods;
mod update;

pub use inspect::{cmd_descriptor, cmd_manifest, cmd_unpack};
pub use mods::cmd_update_mods;
pub use update::cmd_update;

use anyhow::{Context as _, Result};
use arkctl::{CancelToken, Config, Layout, Reporter, SteamCmd, WriterReporter};

/// Settings every update command runs with
pub struct Context {
    pub config: Config,
    /// Report only, never download
    pub check: bool,
    /// Skip the up-to-date check
    pub force: bool,
    pub cancel: CancelToken,
}

impl Context {
    pub fn steamcmd(&self) -> SteamCmd {
        SteamCmd::new(&self.config.steamcmd).with_cancel(self.cancel.clone())
    }

    pub fn layout(&self) -> Layout {
        Layout::new(&self.config.install_dir)
    }

    pub fn reporter(&self) -> Result<Box<dyn Reporter>> {
        let target = self.config.output_target();
        let reporter = WriterReporter::for_target(&target)
            .with_context(|| format!("Failed to open status output {:?}", target))?;
        Ok(Box::new(reporter))
    }
}
