// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use arkctl::{CancelToken, Overrides};
use clap::Parser;
use cli::{Cli, Commands, GlobalArgs};
use tracing::{debug, warn};

/// Cancel `token` on the first Ctrl-C
///
/// The signal is awaited on a small current-thread runtime of its own so the
/// rest of the program stays synchronous.
fn watch_ctrl_c(token: CancelToken) {
    let spawned = std::thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!("Ctrl-C handling unavailable: {}", e);
                    return;
                }
            };
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        warn!("Interrupted, stopping SteamCMD");
                        token.cancel();
                    }
                    Err(e) => warn!("Ctrl-C handling unavailable: {}", e),
                }
            });
        });

    if let Err(e) = spawned {
        warn!("Failed to start Ctrl-C watcher: {}", e);
    }
}

/// Load configuration and arm cancellation for commands that run SteamCMD
fn update_context(global: &GlobalArgs) -> Result<commands::Context> {
    let overrides = Overrides {
        install_dir: global.install_dir.clone(),
        steamcmd: global.steamcmd.clone(),
        output: global.output.clone(),
    };
    let config = arkctl::config::load(global.config.as_deref(), &overrides)?;
    debug!("Effective configuration: {:?}", config);

    let cancel = CancelToken::new();
    watch_ctrl_c(cancel.clone());

    Ok(commands::Context {
        config,
        check: global.check,
        force: global.force,
        cancel,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    let default_level = if cli.global.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Update { appid } => commands::cmd_update(&update_context(&cli.global)?, appid),
        Commands::UpdateMods { ids, mod_appid } => {
            commands::cmd_update_mods(&update_context(&cli.global)?, ids, mod_appid)
        }
        Commands::Unpack { file } => commands::cmd_unpack(&file),
        Commands::Manifest { file } => commands::cmd_manifest(&file),
        Commands::Descriptor { file } => commands::cmd_descriptor(&file),
    }
}
