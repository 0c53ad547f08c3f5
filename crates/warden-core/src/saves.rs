use crate::CoreError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const AUTOSAVE_PREFIX: &str = "_autosave";
const SAVE_EXT: &str = ".zip";

/// The server's saves directory.
pub struct SaveStore {
    dir: PathBuf,
}

impl SaveStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Delete `_autosave*.zip` files so the next start loads the operator's save.
    ///
    /// Returns the number of files removed. Stops at the first failure.
    pub fn clean_autosaves(&self) -> Result<usize, CoreError> {
        let wrap = |source| CoreError::Saves {
            path: self.dir.clone(),
            source,
        };
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir).map_err(wrap)? {
            let entry = entry.map_err(wrap)?;
            if entry.file_type().map_err(wrap)?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(AUTOSAVE_PREFIX) && name.ends_with(SAVE_EXT) {
                fs::remove_file(entry.path()).map_err(|source| CoreError::Saves {
                    path: entry.path(),
                    source,
                })?;
                info!("removed autosave {name}");
                removed += 1;
            }
        }
        Ok(removed)
    }
}
