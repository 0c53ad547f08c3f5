//! Mod synchronisation for a dedicated game-server container.
//!
//! This crate reconciles the declarative `mod-list.json` against the local mods
//! directory and the remote mod portal: it parses the list, skips built-in and
//! already materialised mods, picks the newest release compatible with the
//! configured engine version, and streams the artifact into place atomically.
//! Per-mod failures are aggregated into a [`SyncOutcome`]; only list-read and
//! directory-scan errors abort a run.

pub mod artifact;
pub mod cancel;
pub mod config;
pub mod list;
pub mod portal;
pub mod presence;
pub mod sync;
pub mod version;

pub use artifact::write_artifact;
pub use cancel::CancelToken;
pub use config::{Credentials, PortalConfig};
pub use list::{is_builtin, read_mod_list, ModList, ModListEntry, BUILTIN_MODS};
pub use portal::{HttpPortal, ModPortal};
pub use presence::{is_present, ARCHIVE_EXT};
pub use sync::{ModResult, ModSyncer, ModSynchronizer, SkipReason, SyncOutcome};
pub use version::{resolve, ModRelease, ModVersion};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read mod list {path}: {source}")]
    ListRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse mod list {path}: {source}")]
    ListParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to scan mods directory {path}: {source}")]
    DirScan {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("mod portal returned HTTP {status} for {url}")]
    Status { status: u16, url: String },
    #[error("invalid portal response for '{name}': {reason}")]
    InvalidResponse { name: String, reason: String },
    #[error("no release of '{name}' is compatible with engine version {engine_version}")]
    NoCompatibleRelease {
        name: String,
        engine_version: String,
    },
    #[error("refusing to write artifact with unsafe file name '{0}'")]
    UnsafeFileName(String),
    #[error("portal config error: {0}")]
    Config(String),
    #[error("operation cancelled")]
    Cancelled,
}

impl ModError {
    /// Fatal errors abort a whole synchronisation run instead of a single mod.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ModError::ListRead { .. } | ModError::ListParse { .. } | ModError::DirScan { .. }
        )
    }
}
