// src/commands/mods.rs
//! Workshop mod update command

use super::Context;
use anyhow::{Context as _, Result};
use arkctl::update::lookup_all;
use arkctl::{Updater, WorkshopClient};
use tracing::info;

/// Check workshop mods and download/install the stale ones unless `--check`
pub fn cmd_update_mods(ctx: &Context, ids: Vec<u64>, mod_appid: Option<u32>) -> Result<()> {
    let mod_app_id = mod_appid.unwrap_or(ctx.config.mod_app_id);
    let ids = if ids.is_empty() {
        ctx.config.mods.clone()
    } else {
        ids
    };

    if ids.is_empty() {
        info!("No mods given and none configured");
        return Ok(());
    }

    let reporter = ctx.reporter()?;
    let updater = Updater::new(ctx.steamcmd(), ctx.layout(), reporter.as_ref());
    let client = WorkshopClient::new()?;

    let pending = if ctx.force {
        lookup_all(&client, &ids)?
    } else {
        updater
            .mods_requiring_update(&client, &ids)
            .context("Failed to check mods for updates")?
    };

    if pending.is_empty() || ctx.check {
        return Ok(());
    }

    let names: Vec<String> = pending.iter().map(ToString::to_string).collect();
    info!("Updating {}", names.join(", "));
    updater
        .update_mods(mod_app_id, &pending)
        .with_context(|| format!("Failed to update mods for app {}", mod_app_id))?;

    Ok(())
}
