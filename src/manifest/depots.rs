// src/manifest/depots.rs

//! Lookups over parsed manifests used by the update check

use super::ManifestPair;
use std::collections::BTreeMap;

/// Public depot manifest ids from `app_info_print` output
///
/// Matches paths shaped like `.376030.depots.1004.manifests.public`.
pub fn remote_depot_manifests(pairs: &[ManifestPair]) -> BTreeMap<String, String> {
    let mut depots = BTreeMap::new();
    for pair in pairs {
        let seg = pair.segments();
        if seg.len() == 6 && seg[2] == "depots" && seg[4] == "manifests" && seg[5] == "public" {
            depots.insert(seg[3].to_string(), pair.value.clone());
        }
    }
    depots
}

/// Installed depot manifest ids from a local `appmanifest_<id>.acf`
///
/// Matches paths shaped like `.AppState.InstalledDepots.1006.manifest`.
pub fn installed_depot_manifests(pairs: &[ManifestPair]) -> BTreeMap<String, String> {
    let mut depots = BTreeMap::new();
    for pair in pairs {
        let seg = pair.segments();
        if seg.len() == 5
            && seg[1] == "AppState"
            && seg[2] == "InstalledDepots"
            && seg[4] == "manifest"
        {
            depots.insert(seg[3].to_string(), pair.value.clone());
        }
    }
    depots
}

/// `timeupdated` of a workshop item from `appworkshop_<appid>.acf`
///
/// Returns `None` when the item is absent or the value is not a number.
pub fn workshop_time_updated(pairs: &[ManifestPair], item_id: u64) -> Option<i64> {
    let key = format!(".AppWorkshop.WorkshopItemDetails.{}.timeupdated", item_id);
    super::lookup(pairs, &key).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::parse;

    const APP_INFO: &str = "\"376030\"\n{\n\t\"common\"\n\t{\n\t\t\"name\"\t\t\"ARK Survival Evolved Dedicated Server\"\n\t}\n\t\"depots\"\n\t{\n\t\t\"1004\"\n\t\t{\n\t\t\t\"manifests\"\n\t\t\t{\n\t\t\t\t\"public\"\t\t\"4660701598619066954\"\n\t\t\t}\n\t\t}\n\t\t\"1006\"\n\t\t{\n\t\t\t\"manifests\"\n\t\t\t{\n\t\t\t\t\"public\"\t\t\"6912453647411644579\"\n\t\t\t}\n\t\t}\n\t}\n}\n";

    const LOCAL: &str = "\"AppState\"\n{\n\t\"appid\"\t\t\"376030\"\n\t\"InstalledDepots\"\n\t{\n\t\t\"1006\"\n\t\t{\n\t\t\t\"manifest\"\t\t\"6912453647411644579\"\n\t\t\t\"size\"\t\t\"1024\"\n\t\t}\n\t}\n}\n";

    #[test]
    fn test_remote_depots() {
        let depots = remote_depot_manifests(&parse(APP_INFO));
        assert_eq!(depots.len(), 2);
        assert_eq!(depots["1004"], "4660701598619066954");
        assert_eq!(depots["1006"], "6912453647411644579");
    }

    #[test]
    fn test_installed_depots() {
        let depots = installed_depot_manifests(&parse(LOCAL));
        assert_eq!(depots.len(), 1);
        assert_eq!(depots["1006"], "6912453647411644579");
    }

    #[test]
    fn test_short_paths_do_not_match() {
        let pairs = vec![
            ManifestPair::new(".depots", "1"),
            ManifestPair::new(".AppState.InstalledDepots", "2"),
        ];
        assert!(remote_depot_manifests(&pairs).is_empty());
        assert!(installed_depot_manifests(&pairs).is_empty());
    }

    #[test]
    fn test_workshop_time_updated() {
        let text = "\"AppWorkshop\"\n{\n\t\"WorkshopItemDetails\"\n\t{\n\t\t\"731604991\"\n\t\t{\n\t\t\t\"timeupdated\"\t\t\"1597700547\"\n\t\t}\n\t}\n}\n";
        let pairs = parse(text);
        assert_eq!(workshop_time_updated(&pairs, 731604991), Some(1597700547));
        assert_eq!(workshop_time_updated(&pairs, 1), None);
    }
}
