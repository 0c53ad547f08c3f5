use crate::list::{is_builtin, read_mod_list};
use crate::presence::is_present;
use crate::version::resolve;
use crate::{write_artifact, CancelToken, Credentials, ModError, ModPortal};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Why a listed mod needed no download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    Builtin,
    Present,
}

/// Per-mod result, folded into a [`SyncOutcome`].
#[derive(Debug)]
pub enum ModResult {
    Skipped(SkipReason),
    Downloaded(PathBuf),
    Failed(ModError),
}

/// Aggregate result of one synchronisation run.
///
/// A `None` fatal error does not mean every mod succeeded; check `failed`.
#[derive(Debug, Default)]
pub struct SyncOutcome {
    pub downloaded: usize,
    /// Failed mod names in mod-list order.
    pub failed: Vec<String>,
    pub fatal: Option<ModError>,
}

impl SyncOutcome {
    pub fn record(&mut self, name: &str, result: ModResult) {
        match result {
            ModResult::Skipped(reason) => debug!("{name}: skipped ({reason:?})"),
            ModResult::Downloaded(path) => {
                info!("{name}: downloaded {}", path.display());
                self.downloaded += 1;
            }
            ModResult::Failed(e) => {
                warn!("{name}: {e}");
                self.failed.push(name.to_owned());
            }
        }
    }

    fn abort(mut self, error: ModError) -> Self {
        self.fatal = Some(error);
        self
    }

    pub fn is_clean(&self) -> bool {
        self.fatal.is_none() && self.failed.is_empty()
    }
}

/// Anything that can bring the mods directory in line with the mod list.
pub trait ModSynchronizer: Send + Sync {
    fn sync(&self, cancel: &CancelToken) -> SyncOutcome;
}

/// Sequential mod-list reconciler backed by a [`ModPortal`].
pub struct ModSyncer {
    portal: Box<dyn ModPortal>,
    credentials: Option<Credentials>,
    engine_version: String,
    mods_dir: PathBuf,
    mod_list: PathBuf,
}

impl ModSyncer {
    pub fn new(
        portal: Box<dyn ModPortal>,
        credentials: Option<Credentials>,
        engine_version: &str,
        mods_dir: impl Into<PathBuf>,
        mod_list: impl Into<PathBuf>,
    ) -> Self {
        Self {
            portal,
            credentials,
            engine_version: engine_version.to_owned(),
            mods_dir: mods_dir.into(),
            mod_list: mod_list.into(),
        }
    }

    fn fetch_one(
        &self,
        name: &str,
        credentials: &Credentials,
        cancel: &CancelToken,
    ) -> Result<PathBuf, ModError> {
        let releases = self.portal.fetch_releases(name, cancel)?;
        let release = resolve(&releases, &self.engine_version).ok_or_else(|| {
            ModError::NoCompatibleRelease {
                name: name.to_owned(),
                engine_version: self.engine_version.clone(),
            }
        })?;
        info!("{name}: fetching {} ({})", release.version, release.file_name);
        let mut body = self.portal.open_download(release, credentials, cancel)?;
        write_artifact(&mut *body, &self.mods_dir, &release.file_name, cancel)
    }
}

impl ModSynchronizer for ModSyncer {
    fn sync(&self, cancel: &CancelToken) -> SyncOutcome {
        let mut outcome = SyncOutcome::default();

        let Some(credentials) = &self.credentials else {
            warn!("mod portal credentials not configured, skipping mod sync");
            return outcome;
        };

        let list = match read_mod_list(&self.mod_list) {
            Ok(list) => list,
            Err(e) => return outcome.abort(e),
        };

        for entry in &list.mods {
            let result = if !entry.enabled {
                ModResult::Skipped(SkipReason::Disabled)
            } else if is_builtin(&entry.name) {
                ModResult::Skipped(SkipReason::Builtin)
            } else {
                match is_present(&entry.name, &self.mods_dir) {
                    Ok(true) => ModResult::Skipped(SkipReason::Present),
                    Ok(false) => match self.fetch_one(&entry.name, credentials, cancel) {
                        Ok(path) => ModResult::Downloaded(path),
                        Err(e) => ModResult::Failed(e),
                    },
                    Err(e) => return outcome.abort(e),
                }
            };
            outcome.record(&entry.name, result);
        }

        info!(
            "mod sync finished: {} downloaded, {} failed",
            outcome.downloaded,
            outcome.failed.len()
        );
        outcome
    }
}
