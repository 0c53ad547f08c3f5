use crate::{CancelToken, ModError};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const CHUNK_SIZE: usize = 64 * 1024;

/// Stream `body` into `<dir>/<file_name>`.
///
/// Bytes land in a temporary file inside `dir` first and are renamed into
/// place only after the full body was copied and synced. On any error,
/// including cancellation, the temporary file is dropped and the final path
/// is left untouched.
pub fn write_artifact(
    body: &mut dyn Read,
    dir: &Path,
    file_name: &str,
    cancel: &CancelToken,
) -> Result<PathBuf, ModError> {
    validate_file_name(file_name)?;
    let dest = dir.join(file_name);

    let mut tmp = tempfile::Builder::new()
        .prefix(".warden-")
        .suffix(".part")
        .tempfile_in(dir)?;
    let written = copy_cancellable(body, &mut tmp, cancel)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&dest).map_err(|e| ModError::Io(e.error))?;

    tracing::debug!("wrote {} ({written} bytes)", dest.display());
    Ok(dest)
}

fn copy_cancellable(
    body: &mut dyn Read,
    out: &mut NamedTempFile,
    cancel: &CancelToken,
) -> Result<u64, ModError> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        cancel.check()?;
        let n = match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ModError::Http(format!("download interrupted: {e}"))),
        };
        out.write_all(&buf[..n])?;
        total += n as u64;
    }
    Ok(total)
}

fn validate_file_name(file_name: &str) -> Result<(), ModError> {
    let unsafe_name = file_name.is_empty()
        || file_name == "."
        || file_name == ".."
        || file_name.contains('/')
        || file_name.contains('\\');
    if unsafe_name {
        return Err(ModError::UnsafeFileName(file_name.to_owned()));
    }
    Ok(())
}
