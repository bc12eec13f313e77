// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: server app id
fn appid_arg(name: &'static str, default: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_name("ID")
        .help(format!("Steam app id (default: {})", default))
}

fn build_cli() -> Command {
    Command::new("arkctl")
        .version(env!("CARGO_PKG_VERSION"))
        .author("arkctl Contributors")
        .about("Keep an ARK dedicated server and its workshop mods up to date")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .global(true)
                .help("Config file (default: ~/.arkctl.toml)"),
        )
        .arg(
            Arg::new("install_dir")
                .long("install-dir")
                .global(true)
                .help("Server install directory"),
        )
        .arg(
            Arg::new("steamcmd")
                .long("steamcmd")
                .global(true)
                .help("Path to steamcmd.sh"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .global(true)
                .help("Where status lines go: \"stdout\" or a file path"),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Only check, never download"),
        )
        .arg(
            Arg::new("force")
                .short('f')
                .long("force")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Skip the check and update unconditionally"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging (overridden by RUST_LOG)"),
        )
        .subcommand(
            Command::new("update")
                .about("Check for and apply dedicated server updates")
                .arg(appid_arg("appid", "376030")),
        )
        .subcommand(
            Command::new("update-mods")
                .about("Check for and apply workshop mod updates")
                .arg(
                    Arg::new("ids")
                        .num_args(0..)
                        .help("Workshop item ids (default: `mods` from config)"),
                )
                .arg(appid_arg("mod-appid", "346110")),
        )
        .subcommand(
            Command::new("unpack")
                .about("Decode one .z container next to itself")
                .arg(Arg::new("file").required(true).help("Container file")),
        )
        .subcommand(
            Command::new("manifest")
                .about("Print the flattened key paths of a manifest (.acf) file")
                .arg(Arg::new("file").required(true)),
        )
        .subcommand(
            Command::new("descriptor")
                .about("Print the contents of a .mod descriptor")
                .arg(Arg::new("file").required(true)),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("arkctl.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
