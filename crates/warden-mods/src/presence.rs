use crate::ModError;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Extension of downloaded mod archives.
pub const ARCHIVE_EXT: &str = ".zip";

/// Whether `mods_dir` already holds an archive for `mod_name`.
///
/// Matches any regular file named `<mod_name>_*.zip`, with the prefix compared
/// case-insensitively. Version and integrity are not inspected.
pub fn is_present(mod_name: &str, mods_dir: &Path) -> Result<bool, ModError> {
    let scan_err = |source| ModError::DirScan {
        path: mods_dir.to_path_buf(),
        source,
    };
    let prefix = format!("{}_", mod_name.to_lowercase());

    for entry in fs::read_dir(mods_dir).map_err(scan_err)? {
        let entry = entry.map_err(scan_err)?;
        if entry.file_type().map_err(scan_err)?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if name.ends_with(ARCHIVE_EXT) && name.to_lowercase().starts_with(&prefix) {
            debug!("{mod_name}: found {name}");
            return Ok(true);
        }
    }
    Ok(false)
}
