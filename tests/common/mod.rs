// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use arkctl::container;
use arkctl::descriptor::{MOD_INFO_FILE, MOD_META_INFO_FILE, ModInfo, ModMetaInfo};
use arkctl::{Layout, Reporter};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const MOD_APP_ID: u32 = 346110;

/// Reporter that keeps every line for later assertions
#[derive(Default)]
pub struct Recorder(Mutex<Vec<String>>);

impl Recorder {
    pub fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl Reporter for Recorder {
    fn notify(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

/// Write `<path>` as a container of `data` plus its size companion
pub fn write_container(path: &Path, data: &[u8], chunk_len: usize) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, container::encode(data, chunk_len).unwrap()).unwrap();
    fs::write(container::size_hint_path(path), data.len().to_string()).unwrap();
}

/// Write `mod.info` and `modmeta.info` into `dir`
pub fn write_mod_metadata(dir: &Path, maps: &[&str], meta: &[(&str, &str)]) {
    let info = ModInfo {
        name: "TestMod".to_string(),
        maps: maps.iter().map(|m| m.to_string()).collect(),
    };
    let meta = ModMetaInfo {
        entries: meta
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    };
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(MOD_INFO_FILE), info.encode()).unwrap();
    fs::write(dir.join(MOD_META_INFO_FILE), meta.encode()).unwrap();
}

/// Lay out a downloaded workshop item the way SteamCMD leaves it
///
/// Returns the decoded contents expected after unpacking, keyed by path
/// relative to the item directory.
pub fn build_workshop_item(layout: &Layout, item_id: u64) -> Vec<(PathBuf, Vec<u8>)> {
    let root = layout.workshop_content(MOD_APP_ID, item_id);
    write_mod_metadata(&root, &["TestMap"], &[("ModType", "1")]);

    let mesh: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let small = b"texture bytes".to_vec();

    let files = vec![
        (PathBuf::from("Content/Meshes/Wall.uasset"), mesh),
        (PathBuf::from("Content/Textures/Wall_D.uasset"), small),
    ];
    for (rel, data) in &files {
        let mut container = root.join(rel).into_os_string();
        container.push(".z");
        write_container(Path::new(&container), data, 65_536);
    }
    files
}

/// Write SteamCMD's workshop cache with `timeupdated` per item
pub fn write_workshop_cache(layout: &Layout, items: &[(u64, i64)]) {
    let mut text = String::from("\"AppWorkshop\"\n{\n\t\"appid\"\t\t\"346110\"\n\t\"WorkshopItemDetails\"\n\t{\n");
    for (id, updated) in items {
        text.push_str(&format!(
            "\t\t\"{id}\"\n\t\t{{\n\t\t\t\"manifest\"\t\t\"1\"\n\t\t\t\"timeupdated\"\t\t\"{updated}\"\n\t\t}}\n"
        ));
    }
    text.push_str("\t}\n}\n");

    let path = layout.workshop_cache(MOD_APP_ID);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

/// Shell script that answers like SteamCMD for login, downloads and app updates
pub fn fake_steamcmd(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("steamcmd.sh");
    fs::write(
        &path,
        r#"#!/bin/sh
echo "Steam Console Client (c) Valve Corporation"
while true; do
  printf 'Steam>'
  read cmd || exit 0
  set -- $cmd
  case "$1" in
    login) echo "Waiting for user info...OK" ;;
    workshop_download_item) echo "Success. Downloaded item $3 to \"$PWD\" (1 bytes)" ;;
    app_update) echo "Success! App '$2' fully installed." ;;
    quit) exit 0 ;;
  esac
done
"#,
    )
    .unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}
