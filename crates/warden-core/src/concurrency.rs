use crate::CoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use warden_mods::CancelToken;

/// Exclusive advisory lock held for the duration of one lifecycle pipeline.
///
/// Backed by `flock(2)` on a lock file, so it also excludes a second warden
/// process pointed at the same lock path.
pub struct PipelineLock {
    lock_file: File,
}

fn open_lock_file(lock_path: &Path) -> Result<File, CoreError> {
    let wrap = |source| CoreError::Lock {
        path: PathBuf::from(lock_path),
        source,
    };
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent).map_err(wrap)?;
    }
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(lock_path)
        .map_err(wrap)
}

impl PipelineLock {
    /// Block until the lock is free.
    pub fn acquire(lock_path: &Path) -> Result<Self, CoreError> {
        let file = open_lock_file(lock_path)?;
        file.lock_exclusive().map_err(|source| CoreError::Lock {
            path: lock_path.to_path_buf(),
            source,
        })?;
        Ok(Self { lock_file: file })
    }

    /// Take the lock if nobody holds it, otherwise `Ok(None)`.
    pub fn try_acquire(lock_path: &Path) -> Result<Option<Self>, CoreError> {
        let file = open_lock_file(lock_path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { lock_file: file })),
            Err(e) if is_contended(&e) => Ok(None),
            Err(source) => Err(CoreError::Lock {
                path: lock_path.to_path_buf(),
                source,
            }),
        }
    }

    /// Whether some holder currently owns the lock at `lock_path`.
    pub fn is_held(lock_path: &Path) -> bool {
        matches!(Self::try_acquire(lock_path), Ok(None))
    }
}

fn is_contended(e: &std::io::Error) -> bool {
    e.kind() == fs2::lock_contended_error().kind()
}

impl Drop for PipelineLock {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
    }
}

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Cancel `cancel` and run `on_shutdown` on the first SIGINT/SIGTERM.
/// A second signal exits immediately.
pub fn install_signal_handler<F>(cancel: CancelToken, on_shutdown: F)
where
    F: Fn() + Send + 'static,
{
    let result = ctrlc::set_handler(move || {
        if SHUTDOWN_REQUESTED.swap(true, Ordering::SeqCst) {
            std::process::exit(1);
        }
        eprintln!("\nshutdown requested, finishing current operation...");
        cancel.cancel();
        on_shutdown();
    });
    if let Err(e) = result {
        tracing::warn!("failed to install signal handler: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_acquire_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("pipeline.lock");

        {
            let _lock = PipelineLock::acquire(&lock_path).unwrap();
            assert!(lock_path.exists());
            assert!(PipelineLock::is_held(&lock_path));
        }
        assert!(!PipelineLock::is_held(&lock_path));
    }

    #[test]
    fn try_acquire_returns_none_when_held() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("pipeline.lock");

        let _lock = PipelineLock::acquire(&lock_path).unwrap();
        assert!(PipelineLock::try_acquire(&lock_path).unwrap().is_none());
    }

    #[test]
    fn only_contention_counts_as_held() {
        assert!(is_contended(&fs2::lock_contended_error()));
        assert!(!is_contended(&std::io::Error::other("no locks available")));
        assert!(!is_contended(&std::io::Error::from(
            std::io::ErrorKind::PermissionDenied
        )));
    }

    #[test]
    fn creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("run/warden/pipeline.lock");
        let lock = PipelineLock::try_acquire(&lock_path).unwrap();
        assert!(lock.is_some());
    }
}
