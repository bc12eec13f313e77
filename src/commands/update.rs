// src/commands/update.rs
//! Dedicated server update command

use super::Context;
use anyhow::{Context as _, Result};
use arkctl::Updater;
use tracing::info;

/// Check the server for updates and apply them unless `--check`
pub fn cmd_update(ctx: &Context, appid: Option<u32>) -> Result<()> {
    let app_id = appid.unwrap_or(ctx.config.app_id);
    let reporter = ctx.reporter()?;
    let updater = Updater::new(ctx.steamcmd(), ctx.layout(), reporter.as_ref());

    let required = if ctx.force {
        info!("Forcing update of app {}", app_id);
        true
    } else {
        updater
            .has_server_update(app_id)
            .with_context(|| format!("Failed to check app {} for updates", app_id))?
    };

    if required && !ctx.check {
        updater
            .update_server(app_id)
            .with_context(|| format!("Failed to update app {}", app_id))?;
    }

    Ok(())
}
