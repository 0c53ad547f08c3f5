use crate::ModError;
use serde::Deserialize;
use std::path::Path;

/// Mods shipped with the engine itself. The portal does not serve these.
pub const BUILTIN_MODS: &[&str] = &["base", "space-age", "elevated-rails", "quality"];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_MODS.contains(&name)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModList {
    #[serde(default)]
    pub mods: Vec<ModListEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModListEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
}

impl ModList {
    pub fn parse(data: &[u8], path: &Path) -> Result<Self, ModError> {
        serde_json::from_slice(data).map_err(|source| ModError::ListParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Read the declared mod list. Always hits the disk; callers must not cache it.
pub fn read_mod_list(path: &Path) -> Result<ModList, ModError> {
    let data = std::fs::read(path).map_err(|source| ModError::ListRead {
        path: path.to_path_buf(),
        source,
    })?;
    ModList::parse(&data, path)
}
