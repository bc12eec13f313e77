// src/update/mods.rs

//! Workshop mod checks and the download/unpack/install pipeline

use std::fmt;
use tracing::{info, warn};

use super::{Updater, install, read_optional};
use crate::container;
use crate::descriptor::VersionRecord;
use crate::error::{Error, Result};
use crate::manifest;
use crate::session::script::WorkshopScript;
use crate::workshop::{ItemDetails, WorkshopClient, WorkshopError};

/// Anything that can answer workshop detail lookups
pub trait DetailsSource {
    fn fetch_details(&self, item_id: u64) -> std::result::Result<ItemDetails, WorkshopError>;
}

impl DetailsSource for WorkshopClient {
    fn fetch_details(&self, item_id: u64) -> std::result::Result<ItemDetails, WorkshopError> {
        WorkshopClient::fetch_details(self, item_id)
    }
}

/// A mod that is about to be downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMod {
    pub item_id: u64,
    pub title: String,
    /// Workshop `time_updated` at lookup time
    pub time_updated: i64,
}

impl PendingMod {
    pub fn new(item_id: u64, details: ItemDetails) -> Self {
        Self {
            item_id,
            title: details.title,
            time_updated: details.time_updated,
        }
    }
}

impl fmt::Display for PendingMod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MOD[{}]({})", self.item_id, self.title)
    }
}

/// Look up every item before anything is decided
///
/// The first failed lookup aborts the whole batch.
pub fn lookup_all(source: &dyn DetailsSource, item_ids: &[u64]) -> Result<Vec<PendingMod>> {
    item_ids
        .iter()
        .map(|&id| -> Result<PendingMod> { Ok(PendingMod::new(id, source.fetch_details(id)?)) })
        .collect()
}

impl Updater<'_> {
    /// Mods whose workshop build differs from the installed version record
    pub fn mods_requiring_update(
        &self,
        source: &dyn DetailsSource,
        item_ids: &[u64],
    ) -> Result<Vec<PendingMod>> {
        let candidates = lookup_all(source, item_ids)?;
        let mut required = Vec::new();

        for candidate in candidates {
            let record_path = self.layout.installed_version(candidate.item_id);
            let local = match VersionRecord::load(&record_path)? {
                Some(record) => record.updated,
                None => {
                    warn!("MOD[{}] has no version record", candidate.item_id);
                    0
                }
            };

            if local == candidate.time_updated {
                info!("{} is up-to-date", candidate);
                self.reporter.notify(&format!("ARK {} is up-to-date", candidate));
            } else {
                info!("{} update required", candidate);
                self.reporter.notify(&format!("ARK {} update required", candidate));
                required.push(candidate);
            }
        }

        Ok(required)
    }

    /// `timeupdated` SteamCMD recorded for an item, if any
    fn cached_time_updated(&self, mod_app_id: u32, item_id: u64) -> Result<Option<i64>> {
        let cache = self.layout.workshop_cache(mod_app_id);
        Ok(read_optional(&cache)?
            .and_then(|text| manifest::workshop_time_updated(&manifest::parse(&text), item_id)))
    }

    /// Unpack, describe and install one downloaded mod
    pub fn process_downloaded(&self, mod_app_id: u32, pending: &PendingMod) -> Result<()> {
        let work_dir = self.layout.workshop_content(mod_app_id, pending.item_id);
        if !work_dir.is_dir() {
            return Err(Error::NotFoundError(format!(
                "Downloaded content for {} missing at {}",
                pending,
                work_dir.display()
            )));
        }

        info!("{} unpack", pending);
        container::unpack_tree(&work_dir)?;

        let updated = match self.cached_time_updated(mod_app_id, pending.item_id)? {
            Some(updated) => updated,
            None => {
                warn!(
                    "{} missing from workshop cache, using lookup time {}",
                    pending, pending.time_updated
                );
                pending.time_updated
            }
        };

        info!("{} create .mod", pending);
        install::build_descriptor_in_dir(&work_dir, pending.item_id, &pending.title, updated)?;

        info!("{} install", pending);
        install::install_mod(&self.layout, &work_dir, pending.item_id)?;

        self.reporter
            .notify(&format!("ARK {} was updated (restart required)", pending));
        Ok(())
    }

    /// Download `pending` in one SteamCMD session and install what arrived
    ///
    /// Items SteamCMD failed to download are reported as an error after the
    /// successful ones have been installed.
    pub fn update_mods(&self, mod_app_id: u32, pending: &[PendingMod]) -> Result<()> {
        if pending.is_empty() {
            return Ok(());
        }

        let install_dir = self.layout.install_dir().display().to_string();
        let ids: Vec<u64> = pending.iter().map(|p| p.item_id).collect();
        let script = self
            .steamcmd
            .run_script(WorkshopScript::new(mod_app_id, &install_dir, &ids))?;

        if !script.login.logged_in {
            return Err(Error::DownloadError(format!(
                "Anonymous login failed after {} attempts",
                script.login.attempts
            )));
        }

        for item_id in &script.downloaded {
            if let Some(item) = pending.iter().find(|p| p.item_id == *item_id) {
                self.process_downloaded(mod_app_id, item)?;
            }
        }

        if script.failed.is_empty() {
            Ok(())
        } else {
            let failed: Vec<String> = script.failed.iter().map(|id| id.to_string()).collect();
            Err(Error::DownloadError(format!(
                "Failed to download MOD[{}]",
                failed.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Reporter;
    use crate::session::SteamCmd;
    use crate::update::Layout;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Reporter for Recorder {
        fn notify(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    struct FakeWorkshop(HashMap<u64, ItemDetails>);

    impl DetailsSource for FakeWorkshop {
        fn fetch_details(&self, item_id: u64) -> std::result::Result<ItemDetails, WorkshopError> {
            self.0
                .get(&item_id)
                .cloned()
                .ok_or(WorkshopError::NoDetails { item_id })
        }
    }

    fn workshop() -> FakeWorkshop {
        let mut items = HashMap::new();
        items.insert(
            1,
            ItemDetails {
                title: "One".to_string(),
                time_updated: 100,
            },
        );
        items.insert(
            2,
            ItemDetails {
                title: "Two".to_string(),
                time_updated: 200,
            },
        );
        FakeWorkshop(items)
    }

    #[test]
    fn test_mods_requiring_update() {
        let root = tempfile::tempdir().unwrap();
        let layout = Layout::new(root.path());
        std::fs::create_dir_all(layout.mods_root()).unwrap();
        VersionRecord::new("One", 100)
            .save(&layout.installed_version(1))
            .unwrap();
        VersionRecord::new("Two", 150)
            .save(&layout.installed_version(2))
            .unwrap();

        let recorder = Recorder::default();
        let updater = Updater::new(SteamCmd::new("/bin/false"), layout, &recorder);
        let required = updater.mods_requiring_update(&workshop(), &[1, 2]).unwrap();

        assert_eq!(
            required,
            vec![PendingMod {
                item_id: 2,
                title: "Two".to_string(),
                time_updated: 200,
            }]
        );
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![
                "ARK MOD[1](One) is up-to-date".to_string(),
                "ARK MOD[2](Two) update required".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_record_requires_update() {
        let root = tempfile::tempdir().unwrap();
        let recorder = Recorder::default();
        let updater = Updater::new(SteamCmd::new("/bin/false"), Layout::new(root.path()), &recorder);

        let required = updater.mods_requiring_update(&workshop(), &[1]).unwrap();
        assert_eq!(required.len(), 1);
    }

    #[test]
    fn test_lookup_failure_aborts_batch() {
        let root = tempfile::tempdir().unwrap();
        let recorder = Recorder::default();
        let updater = Updater::new(SteamCmd::new("/bin/false"), Layout::new(root.path()), &recorder);

        let err = updater.mods_requiring_update(&workshop(), &[1, 99, 2]).unwrap_err();
        assert!(matches!(err, Error::Workshop(WorkshopError::NoDetails { item_id: 99 })));
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_update_mods_nothing_pending() {
        let root = tempfile::tempdir().unwrap();
        let recorder = Recorder::default();
        let updater = Updater::new(
            SteamCmd::new("/nonexistent/steamcmd.sh"),
            Layout::new(root.path()),
            &recorder,
        );
        updater.update_mods(346110, &[]).unwrap();
    }

    #[test]
    fn test_process_missing_download() {
        let root = tempfile::tempdir().unwrap();
        let recorder = Recorder::default();
        let updater = Updater::new(SteamCmd::new("/bin/false"), Layout::new(root.path()), &recorder);
        let pending = PendingMod::new(
            5,
            ItemDetails {
                title: "Five".to_string(),
                time_updated: 1,
            },
        );

        assert!(matches!(
            updater.process_downloaded(346110, &pending),
            Err(Error::NotFoundError(_))
        ));
    }
}
