// src/update/mod.rs

//! Update orchestration
//!
//! Decides whether the dedicated server or its workshop mods are out of
//! date and drives SteamCMD to fix that.
//!
//! Server: the depot manifest ids printed by `app_info_print` are compared
//! with those recorded in the local `appmanifest_<appid>.acf`. Any
//! difference (or no local manifest at all) means an update is required.
//!
//! Mods: the workshop `time_updated` of each item is compared with the one
//! saved in its `<id>.yaml` version record. Pending mods are downloaded in
//! one session, then each is unpacked, given a fresh `.mod` descriptor and
//! moved into `ShooterGame/Content/Mods`.

pub mod install;
pub mod mods;

pub use install::{build_descriptor_in_dir, install_mod};
pub use mods::{DetailsSource, PendingMod, lookup_all};

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::manifest;
use crate::report::Reporter;
use crate::session::SteamCmd;
use crate::session::script::{AppInfoScript, ServerUpdateScript};

/// Where things live inside a server install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    install_dir: PathBuf,
}

impl Layout {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
        }
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    fn steamapps(&self) -> PathBuf {
        self.install_dir.join("steamapps")
    }

    /// Local manifest of an installed app
    pub fn app_manifest(&self, app_id: u32) -> PathBuf {
        self.steamapps().join(format!("appmanifest_{}.acf", app_id))
    }

    /// Download tree of a workshop item
    pub fn workshop_content(&self, mod_app_id: u32, item_id: u64) -> PathBuf {
        self.steamapps()
            .join("workshop")
            .join("content")
            .join(mod_app_id.to_string())
            .join(item_id.to_string())
            .join("WindowsNoEditor")
    }

    /// SteamCMD's record of downloaded workshop items
    pub fn workshop_cache(&self, mod_app_id: u32) -> PathBuf {
        self.steamapps()
            .join("workshop")
            .join(format!("appworkshop_{}.acf", mod_app_id))
    }

    pub fn mods_root(&self) -> PathBuf {
        self.install_dir
            .join("ShooterGame")
            .join("Content")
            .join("Mods")
    }

    pub fn installed_mod_dir(&self, item_id: u64) -> PathBuf {
        self.mods_root().join(item_id.to_string())
    }

    pub fn installed_descriptor(&self, item_id: u64) -> PathBuf {
        self.mods_root().join(format!("{}.mod", item_id))
    }

    pub fn installed_version(&self, item_id: u64) -> PathBuf {
        self.mods_root().join(format!("{}.yaml", item_id))
    }
}

/// Read a text file, `None` when it does not exist
pub(crate) fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::IoError(format!(
            "Failed to read {}: {e}",
            path.display()
        ))),
    }
}

/// Compare remote `app_info_print` output with a local app manifest
///
/// Every depot recorded locally must carry the same public manifest id
/// remotely. A missing local manifest always requires an update.
pub fn server_update_required(remote_info: &str, local_manifest: Option<&str>) -> bool {
    let Some(local_manifest) = local_manifest else {
        return true;
    };

    let remote = manifest::remote_depot_manifests(&manifest::parse(remote_info));
    let local = manifest::installed_depot_manifests(&manifest::parse(local_manifest));
    debug!("Remote depots: {:?}", remote);
    debug!("Local depots: {:?}", local);

    if local.is_empty() {
        return true;
    }
    local
        .iter()
        .any(|(depot, id)| remote.get(depot).map(String::as_str) != Some(id.as_str()))
}

/// Drives checks and updates for one server install
pub struct Updater<'a> {
    steamcmd: SteamCmd,
    layout: Layout,
    reporter: &'a dyn Reporter,
}

impl<'a> Updater<'a> {
    pub fn new(steamcmd: SteamCmd, layout: Layout, reporter: &'a dyn Reporter) -> Self {
        Self {
            steamcmd,
            layout,
            reporter,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Fetch the current app info manifest text for `app_id`
    pub fn fetch_app_info(&self, app_id: u32) -> Result<String> {
        let script = self.steamcmd.run_script(AppInfoScript::new(app_id))?;
        script
            .info
            .ok_or_else(|| Error::NotFoundError(format!("No app info printed for app {}", app_id)))
    }

    /// Check whether the installed server differs from the published build
    pub fn has_server_update(&self, app_id: u32) -> Result<bool> {
        let remote = self.fetch_app_info(app_id)?;

        let manifest_path = self.layout.app_manifest(app_id);
        let local = read_optional(&manifest_path)?;
        if local.is_none() {
            warn!("{} not found, treating server as not installed", manifest_path.display());
        }

        let required = server_update_required(&remote, local.as_deref());
        if required {
            self.reporter.notify("ARK Server update required");
        } else {
            self.reporter.notify("ARK Server is up-to-date");
        }
        Ok(required)
    }

    /// Install or update the server with `app_update <id> validate`
    pub fn update_server(&self, app_id: u32) -> Result<()> {
        let install_dir = self.layout.install_dir().display().to_string();
        info!("Updating app {} in {}", app_id, install_dir);

        let script = self
            .steamcmd
            .run_script(ServerUpdateScript::new(app_id, &install_dir))?;

        if !script.login.logged_in {
            return Err(Error::DownloadError(format!(
                "Anonymous login failed after {} attempts",
                script.login.attempts
            )));
        }
        if !script.succeeded {
            return Err(Error::DownloadError(format!(
                "app_update {} did not report success",
                app_id
            )));
        }

        self.reporter.notify("ARK Server was updated. (restart required)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REMOTE: &str = "\"376030\"\n{\n\t\"common\"\n\t{\n\t\t\"name\"\t\t\"ARK Survival Evolved Dedicated Server\"\n\t}\n\t\"depots\"\n\t{\n\t\t\"1004\"\n\t\t{\n\t\t\t\"manifests\"\n\t\t\t{\n\t\t\t\t\"public\"\t\t\"4660701598619066954\"\n\t\t\t}\n\t\t}\n\t\t\"1006\"\n\t\t{\n\t\t\t\"manifests\"\n\t\t\t{\n\t\t\t\t\"public\"\t\t\"6912453647411644579\"\n\t\t\t}\n\t\t}\n\t}\n}\n";

    fn local(depot_1006: &str) -> String {
        format!(
            "\"AppState\"\n{{\n\t\"appid\"\t\t\"376030\"\n\t\"InstalledDepots\"\n\t{{\n\t\t\"1006\"\n\t\t{{\n\t\t\t\"manifest\"\t\t\"{}\"\n\t\t\t\"size\"\t\t\"12345\"\n\t\t}}\n\t}}\n}}\n",
            depot_1006
        )
    }

    #[test]
    fn test_up_to_date() {
        assert!(!server_update_required(REMOTE, Some(&local("6912453647411644579"))));
    }

    #[test]
    fn test_manifest_changed() {
        assert!(server_update_required(REMOTE, Some(&local("123"))));
    }

    #[test]
    fn test_no_local_manifest() {
        assert!(server_update_required(REMOTE, None));
        assert!(server_update_required(REMOTE, Some("\"AppState\"\n{\n}\n")));
    }

    #[test]
    fn test_depot_missing_remotely() {
        let local = local("6912453647411644579").replace("1006", "2000");
        assert!(server_update_required(REMOTE, Some(&local)));
    }

    #[test]
    fn test_layout_paths() {
        let layout = Layout::new("/srv/ark");
        assert_eq!(
            layout.app_manifest(376030),
            PathBuf::from("/srv/ark/steamapps/appmanifest_376030.acf")
        );
        assert_eq!(
            layout.workshop_content(346110, 731604991),
            PathBuf::from("/srv/ark/steamapps/workshop/content/346110/731604991/WindowsNoEditor")
        );
        assert_eq!(
            layout.workshop_cache(346110),
            PathBuf::from("/srv/ark/steamapps/workshop/appworkshop_346110.acf")
        );
        assert_eq!(
            layout.installed_descriptor(731604991),
            PathBuf::from("/srv/ark/ShooterGame/Content/Mods/731604991.mod")
        );
        assert_eq!(
            layout.installed_version(731604991),
            PathBuf::from("/srv/ark/ShooterGame/Content/Mods/731604991.yaml")
        );
    }

    #[test]
    fn test_read_optional() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_optional(&dir.path().join("nope")).unwrap(), None);
        std::fs::write(dir.path().join("yes"), "x").unwrap();
        assert_eq!(read_optional(&dir.path().join("yes")).unwrap().as_deref(), Some("x"));
    }
}
