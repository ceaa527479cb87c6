//! Linux and Android memory-backed executables.
//!
//! The payload is written to an anonymous file created with `memfd_create(2)`,
//! which never appears in the filesystem namespace. The descriptor is then
//! sealed and exposed to the loader as `/proc/self/fd/N`. Closing the
//! descriptor is the only cleanup needed.

use super::{Backing, ExecutableHandle, Materializer, sanitize_prefix};
use crate::constants::EXECUTABLE_MODE;
use std::ffi::{CStr, CString};
use std::fs::File;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd};
use std::path::{Path, PathBuf};

/// `MFD_EXEC` from linux/memfd.h (Linux 6.3+), not exported by every libc release.
const MFD_EXEC: libc::c_uint = 0x0010;

const SEALS: libc::c_int =
    libc::F_SEAL_SHRINK | libc::F_SEAL_GROW | libc::F_SEAL_WRITE | libc::F_SEAL_SEAL;

/// Anonymous, sealed memfd strategy.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemfdMaterializer;

impl Materializer for MemfdMaterializer {
    fn materialize(
        &self,
        payload: &[u8],
        prefix: &str,
        _temp_dir: Option<&Path>,
    ) -> io::Result<ExecutableHandle> {
        let name = CString::new(sanitize_prefix(prefix).into_owned())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        // Dropping `file` on any error below closes the descriptor.
        let mut file = File::from(create(&name)?);
        file.write_all(payload)?;
        seal(&file)?;

        let fd = OwnedFd::from(file);
        let path = PathBuf::from(format!("/proc/self/fd/{}", fd.as_raw_fd()));

        tracing::debug!(
            path = %path.display(),
            size = payload.len(),
            "Materialized executable in memfd"
        );
        Ok(ExecutableHandle::memory(fd, path))
    }

    fn backing(&self) -> Backing {
        Backing::Memory
    }

    fn name(&self) -> &'static str {
        "memfd"
    }
}

/// Close the descriptor, surfacing the error `OwnedFd`'s drop would discard.
pub(super) fn release(fd: OwnedFd) -> io::Result<()> {
    let raw = fd.into_raw_fd();
    if unsafe { libc::close(raw) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn create(name: &CStr) -> io::Result<OwnedFd> {
    let flags = libc::MFD_CLOEXEC | libc::MFD_ALLOW_SEALING;

    let fd = match cvt(unsafe { libc::memfd_create(name.as_ptr(), flags | MFD_EXEC) }) {
        Err(e) if e.raw_os_error() == Some(libc::EINVAL) => {
            tracing::debug!("memfd_create: EINVAL with MFD_EXEC, retrying without it");
            cvt(unsafe { libc::memfd_create(name.as_ptr(), flags) })?
        }
        result => result?,
    };

    // SAFETY: memfd_create just returned this descriptor and nothing else owns it.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Drop the write bit and freeze the content.
fn seal(file: &File) -> io::Result<()> {
    let fd = file.as_raw_fd();
    cvt(unsafe { libc::fchmod(fd, EXECUTABLE_MODE as libc::mode_t) })?;
    cvt(unsafe { libc::fcntl(fd, libc::F_ADD_SEALS, SEALS) })?;
    Ok(())
}

fn cvt(ret: libc::c_int) -> io::Result<libc::c_int> {
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}
