//! Disk-backed executables for platforms without anonymous memory files.
//!
//! The payload goes into a uniquely named temp file restricted to owner
//! read+execute. Order: create, restrict permissions, write, close the write
//! handle. Only the [`TempPath`] survives, so the file is removed on release
//! or, failing that, when the handle is dropped.

use super::{Backing, ExecutableHandle, Materializer, resolve_temp_dir, sanitize_prefix};
use crate::constants::naming;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use tempfile::{Builder, NamedTempFile, TempPath};

/// Permission-hardened temp file strategy.
#[derive(Debug, Default, Clone, Copy)]
pub struct TempFileMaterializer;

impl Materializer for TempFileMaterializer {
    fn materialize(
        &self,
        payload: &[u8],
        prefix: &str,
        temp_dir: Option<&Path>,
    ) -> io::Result<ExecutableHandle> {
        let dir = resolve_temp_dir(temp_dir);
        materialize_in(&dir, payload, prefix, |file, payload| file.write_all(payload))
    }

    fn backing(&self) -> Backing {
        Backing::Disk
    }

    fn name(&self) -> &'static str {
        "temp-file"
    }
}

fn materialize_in<W>(
    dir: &Path,
    payload: &[u8],
    prefix: &str,
    write: W,
) -> io::Result<ExecutableHandle>
where
    W: FnOnce(&mut File, &[u8]) -> io::Result<()>,
{
    let mut file = Builder::new()
        .prefix(&format!("{}-", sanitize_prefix(prefix)))
        .suffix(naming::EXECUTABLE_SUFFIX)
        .rand_bytes(naming::RANDOM_SUFFIX_LEN)
        .tempfile_in(dir)?;

    if let Err(err) = fill(&mut file, payload, write) {
        // Partial file must not outlive the failure; its removal error is
        // secondary and discarded.
        let path = file.path().to_path_buf();
        if let Err(cleanup_err) = release(file.into_temp_path()) {
            tracing::debug!(
                path = %path.display(),
                error = %cleanup_err,
                "Failed to remove partially written executable"
            );
        }
        return Err(err);
    }

    // Closes the write handle; only the path is kept.
    let temp_path = file.into_temp_path();
    tracing::debug!(
        path = %temp_path.display(),
        size = payload.len(),
        "Materialized executable in temp file"
    );
    Ok(ExecutableHandle::disk(temp_path))
}

fn fill<W>(file: &mut NamedTempFile, payload: &[u8], write: W) -> io::Result<()>
where
    W: FnOnce(&mut File, &[u8]) -> io::Result<()>,
{
    restrict_permissions(file.as_file())?;
    write(file.as_file_mut(), payload)?;
    file.as_file_mut().flush()
}

#[cfg(unix)]
fn restrict_permissions(file: &File) -> io::Result<()> {
    use crate::constants::EXECUTABLE_MODE;
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(std::fs::Permissions::from_mode(EXECUTABLE_MODE))
}

#[cfg(not(unix))]
fn restrict_permissions(file: &File) -> io::Result<()> {
    let mut perms = file.metadata()?.permissions();
    perms.set_readonly(true);
    file.set_permissions(perms)
}

/// Remove the file, reporting failures (e.g. already removed externally).
pub(super) fn release(temp_path: TempPath) -> io::Result<()> {
    // Read-only files cannot be deleted on Windows.
    #[cfg(windows)]
    {
        if let Ok(metadata) = std::fs::metadata(&temp_path) {
            let mut perms = metadata.permissions();
            perms.set_readonly(false);
            let _ = std::fs::set_permissions(&temp_path, perms);
        }
    }

    temp_path.close()
}
