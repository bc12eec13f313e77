// tests/pipeline.rs

//! Workshop mod pipeline tests: unpack, describe, install.

mod common;

use arkctl::descriptor::{ModDescriptor, VersionRecord};
use arkctl::update::server_update_required;
use arkctl::{Error, ItemDetails, Layout, PendingMod, SteamCmd, Updater};
use common::{MOD_APP_ID, Recorder};
use std::fs;

fn pending(item_id: u64, title: &str, time_updated: i64) -> PendingMod {
    PendingMod::new(
        item_id,
        ItemDetails {
            title: title.to_string(),
            time_updated,
        },
    )
}

#[test]
fn test_downloaded_mod_is_installed() {
    let root = tempfile::tempdir().unwrap();
    let layout = Layout::new(root.path());
    let files = common::build_workshop_item(&layout, 731604991);
    common::write_workshop_cache(&layout, &[(731604991, 1597700547)]);

    let recorder = Recorder::default();
    let updater = Updater::new(SteamCmd::new("/bin/false"), layout.clone(), &recorder);
    updater
        .process_downloaded(MOD_APP_ID, &pending(731604991, "Structures Plus (S+)", 1))
        .unwrap();

    // Decoded content moved into the mods directory, containers gone
    let installed = layout.installed_mod_dir(731604991);
    for (rel, data) in &files {
        assert_eq!(&fs::read(installed.join(rel)).unwrap(), data);
        let mut container = installed.join(rel).into_os_string();
        container.push(".z");
        assert!(!std::path::Path::new(&container).exists());
    }
    assert!(!layout.workshop_content(MOD_APP_ID, 731604991).exists());

    let descriptor =
        ModDescriptor::decode(&fs::read(layout.installed_descriptor(731604991)).unwrap()).unwrap();
    assert_eq!(descriptor.item_id, 731604991);
    assert_eq!(descriptor.title, "Structures Plus (S+)");
    assert_eq!(
        descriptor.install_path,
        "../../../ShooterGame/Content/Mods/731604991"
    );
    assert_eq!(descriptor.maps, vec!["TestMap".to_string()]);
    assert!(descriptor.has_mod_type);

    // The workshop cache wins over the lookup time
    assert_eq!(
        VersionRecord::load(&layout.installed_version(731604991)).unwrap(),
        Some(VersionRecord::new("Structures Plus (S+)", 1597700547))
    );
    assert_eq!(
        recorder.lines(),
        vec!["ARK MOD[731604991](Structures Plus (S+)) was updated (restart required)".to_string()]
    );
}

#[test]
fn test_lookup_time_used_without_cache() {
    let root = tempfile::tempdir().unwrap();
    let layout = Layout::new(root.path());
    common::build_workshop_item(&layout, 42);

    let recorder = Recorder::default();
    let updater = Updater::new(SteamCmd::new("/bin/false"), layout.clone(), &recorder);
    updater
        .process_downloaded(MOD_APP_ID, &pending(42, "Answer", 1600000000))
        .unwrap();

    assert_eq!(
        VersionRecord::load(&layout.installed_version(42)).unwrap(),
        Some(VersionRecord::new("Answer", 1600000000))
    );
}

#[test]
fn test_reinstall_is_up_to_date() {
    let root = tempfile::tempdir().unwrap();
    let layout = Layout::new(root.path());
    common::build_workshop_item(&layout, 7);

    let recorder = Recorder::default();
    let updater = Updater::new(SteamCmd::new("/bin/false"), layout.clone(), &recorder);
    updater
        .process_downloaded(MOD_APP_ID, &pending(7, "Seven", 700))
        .unwrap();

    struct Fixed;
    impl arkctl::update::DetailsSource for Fixed {
        fn fetch_details(&self, _: u64) -> Result<ItemDetails, arkctl::WorkshopError> {
            Ok(ItemDetails {
                title: "Seven".to_string(),
                time_updated: 700,
            })
        }
    }

    assert!(updater.mods_requiring_update(&Fixed, &[7]).unwrap().is_empty());
    assert_eq!(
        recorder.lines().last().map(String::as_str),
        Some("ARK MOD[7](Seven) is up-to-date")
    );
}

#[test]
fn test_bad_size_hint_keeps_sources() {
    let root = tempfile::tempdir().unwrap();
    let layout = Layout::new(root.path());
    common::build_workshop_item(&layout, 9);

    let container = layout
        .workshop_content(MOD_APP_ID, 9)
        .join("Content/Textures/Wall_D.uasset.z");
    fs::write(arkctl::container::size_hint_path(&container), "100").unwrap();

    let recorder = Recorder::default();
    let updater = Updater::new(SteamCmd::new("/bin/false"), layout.clone(), &recorder);
    let err = updater
        .process_downloaded(MOD_APP_ID, &pending(9, "Nine", 1))
        .unwrap_err();

    match &err {
        Error::Container { path, .. } => assert_eq!(path, &container),
        other => panic!("unexpected error {other}"),
    }
    assert!(err.to_string().contains("Wall_D.uasset.z"));
    assert!(container.exists());
    assert!(!layout.installed_descriptor(9).exists());
    assert!(recorder.lines().is_empty());
}

#[test]
fn test_appstate_example_needs_update_against_other_build() {
    let local = "\"AppState\"\n{\n\t\"appid\"\t\t\"376030\"\n\t\"InstalledDepots\"\n\t{\n\t\t\"1006\"\n\t\t{\n\t\t\t\"manifest\"\t\t\"123\"\n\t\t}\n\t}\n}\n";
    let same = "\"376030\"\n{\n\t\"depots\"\n\t{\n\t\t\"1006\"\n\t\t{\n\t\t\t\"manifests\"\n\t\t\t{\n\t\t\t\t\"public\"\t\t\"123\"\n\t\t\t}\n\t\t}\n\t}\n}\n";
    let newer = same.replace("\"123\"", "\"124\"");

    assert!(!server_update_required(same, Some(local)));
    assert!(server_update_required(&newer, Some(local)));
}

#[test]
#[ignore = "requires a pseudo-terminal"]
fn test_update_mods_with_fake_steamcmd() {
    let root = tempfile::tempdir().unwrap();
    let layout = Layout::new(root.path().join("ark"));
    let steamcmd = common::fake_steamcmd(root.path());
    common::build_workshop_item(&layout, 1);
    common::build_workshop_item(&layout, 2);

    let recorder = Recorder::default();
    let updater = Updater::new(SteamCmd::new(steamcmd), layout.clone(), &recorder);
    updater
        .update_mods(MOD_APP_ID, &[pending(1, "One", 10), pending(2, "Two", 20)])
        .unwrap();

    assert!(layout.installed_descriptor(1).exists());
    assert!(layout.installed_descriptor(2).exists());
    assert_eq!(recorder.lines().len(), 2);
}

#[test]
#[ignore = "requires a pseudo-terminal"]
fn test_update_server_with_fake_steamcmd() {
    let root = tempfile::tempdir().unwrap();
    let steamcmd = common::fake_steamcmd(root.path());

    let recorder = Recorder::default();
    let updater = Updater::new(SteamCmd::new(steamcmd), Layout::new(root.path()), &recorder);
    updater.update_server(376030).unwrap();

    assert_eq!(
        recorder.lines(),
        vec!["ARK Server was updated. (restart required)".to_string()]
    );
}
