// src/cli/mod.rs
//! CLI definitions for arkctl
//!
//! The command implementations are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "arkctl")]
#[command(author = "arkctl Contributors")]
#[command(version)]
#[command(about = "Keep an ARK dedicated server and its workshop mods up to date", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Config file (default: ~/.arkctl.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Server install directory
    #[arg(long, global = true)]
    pub install_dir: Option<PathBuf>,

    /// Path to steamcmd.sh
    #[arg(long, global = true)]
    pub steamcmd: Option<PathBuf>,

    /// Where status lines go: "stdout" or a file path
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    /// Only check, never download
    #[arg(long, global = true)]
    pub check: bool,

    /// Skip the check and update unconditionally
    #[arg(short, long, global = true, conflicts_with = "check")]
    pub force: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check for and apply dedicated server updates
    Update {
        /// Server app id (default from config, 376030)
        #[arg(long)]
        appid: Option<u32>,
    },

    /// Check for and apply workshop mod updates
    #[command(name = "update-mods")]
    UpdateMods {
        /// Workshop item ids (default: `mods` from config)
        ids: Vec<u64>,

        /// Workshop app id (default from config, 346110)
        #[arg(long)]
        mod_appid: Option<u32>,
    },

    /// Decode one .z container next to itself
    Unpack {
        /// Container file; its .uncompressed_size companion must exist
        file: PathBuf,
    },

    /// Print the flattened key paths of a manifest (.acf) file
    Manifest {
        file: PathBuf,
    },

    /// Print the contents of a .mod descriptor
    Descriptor {
        file: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_update_mods() {
        let cli = Cli::parse_from(["arkctl", "update-mods", "731604991", "895711211", "--check"]);
        assert!(cli.global.check);
        match cli.command {
            Commands::UpdateMods { ids, mod_appid } => {
                assert_eq!(ids, vec![731604991, 895711211]);
                assert_eq!(mod_appid, None);
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn test_check_conflicts_with_force() {
        assert!(Cli::try_parse_from(["arkctl", "update", "--check", "--force"]).is_err());
    }
}
