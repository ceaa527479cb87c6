//! Turning byte payloads into executable storage.
//!
//! This module provides a trait-based abstraction over the two ways a payload
//! can be made executable, selected at compile time without scattered `#[cfg]`
//! at the call sites.
//!
//! # Architecture
//!
//! ```text
//! Materializer (trait)
//!     ├── MemfdMaterializer     → memfd_create, sealed, /proc/self/fd/N (Linux, Android)
//!     └── TempFileMaterializer  → 0o500 temp file, removed on release (all)
//! ```

#[cfg(any(target_os = "linux", target_os = "android"))]
mod memfd;
mod temp_file;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub use memfd::MemfdMaterializer;
pub use temp_file::TempFileMaterializer;

use crate::constants::{envs, naming};
use std::borrow::Cow;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// Platform-agnostic materialization interface.
///
/// Implementations write `payload` into storage the OS loader can execute and
/// return a handle owning that storage. Permissions are fixed at creation and
/// the content is immutable once this returns.
pub trait Materializer: Send + Sync {
    /// Materialize `payload` as an executable.
    ///
    /// `prefix` is a diagnostic name hint and is never trusted as a path.
    /// `temp_dir` is only used by disk-backed strategies.
    fn materialize(
        &self,
        payload: &[u8],
        prefix: &str,
        temp_dir: Option<&Path>,
    ) -> io::Result<ExecutableHandle>;

    /// Kind of storage this strategy produces.
    fn backing(&self) -> Backing;

    /// Strategy name for logging/debugging.
    fn name(&self) -> &'static str;
}

/// Where a materialized executable lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backing {
    /// Anonymous memory-backed file, no filesystem entry.
    Memory,
    /// Named temporary file on disk.
    Disk,
}

// ============================================================================
// Executable Handle
// ============================================================================

/// Owned reference to materialized executable storage.
///
/// The path never changes for the lifetime of the handle. Dropping the handle
/// releases the storage on a best-effort basis; use [`release`](Self::release)
/// to observe failures.
#[derive(Debug)]
pub struct ExecutableHandle {
    path: PathBuf,
    locator: Locator,
}

#[derive(Debug)]
enum Locator {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    Memory(std::os::fd::OwnedFd),
    Disk(tempfile::TempPath),
}

impl ExecutableHandle {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub(crate) fn memory(fd: std::os::fd::OwnedFd, path: PathBuf) -> Self {
        Self {
            path,
            locator: Locator::Memory(fd),
        }
    }

    pub(crate) fn disk(path: tempfile::TempPath) -> Self {
        Self {
            path: path.to_path_buf(),
            locator: Locator::Disk(path),
        }
    }

    /// Path that can be handed to the process-spawning facility.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backing(&self) -> Backing {
        match self.locator {
            #[cfg(any(target_os = "linux", target_os = "android"))]
            Locator::Memory(_) => Backing::Memory,
            Locator::Disk(_) => Backing::Disk,
        }
    }

    /// Release the storage: close the descriptor (memory) or remove the
    /// file (disk).
    pub fn release(self) -> io::Result<()> {
        let Self { path, locator } = self;
        let result = match locator {
            #[cfg(any(target_os = "linux", target_os = "android"))]
            Locator::Memory(fd) => memfd::release(fd),
            Locator::Disk(temp_path) => temp_file::release(temp_path),
        };
        match &result {
            Ok(()) => tracing::debug!(path = %path.display(), "Released executable"),
            Err(e) => tracing::debug!(
                path = %path.display(),
                error = %e,
                "Failed to release executable"
            ),
        }
        result
    }
}

// ============================================================================
// Current Platform
// ============================================================================

/// Get the materializer for the current platform.
///
/// Returns a static reference to avoid allocation.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn current() -> &'static dyn Materializer {
    static MATERIALIZER: MemfdMaterializer = MemfdMaterializer;
    &MATERIALIZER
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn current() -> &'static dyn Materializer {
    static MATERIALIZER: TempFileMaterializer = TempFileMaterializer;
    &MATERIALIZER
}

// ============================================================================
// Helpers
// ============================================================================

/// Make a caller-supplied prefix safe to use as a file or memfd name.
///
/// Path separators, NUL and other control characters become `_`, and the
/// result is cut to [`naming::MAX_PREFIX_LEN`] bytes at a char boundary.
pub(crate) fn sanitize_prefix(prefix: &str) -> Cow<'_, str> {
    if prefix.is_empty() {
        return Cow::Borrowed(naming::DEFAULT_PREFIX);
    }

    let prefix = truncate_at_char_boundary(prefix, naming::MAX_PREFIX_LEN);
    let is_unsafe = |c: char| c == '/' || c == '\\' || c.is_control();
    if !prefix.contains(is_unsafe) {
        return Cow::Borrowed(prefix);
    }

    Cow::Owned(
        prefix
            .chars()
            .map(|c| if is_unsafe(c) { '_' } else { c })
            .collect(),
    )
}

fn truncate_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Resolve the directory for disk-backed executables.
///
/// Explicit option, then `MEMEXEC_TMPDIR`, then the platform temp directory.
pub(crate) fn resolve_temp_dir(explicit: Option<&Path>) -> PathBuf {
    resolve_temp_dir_from(explicit, std::env::var_os(envs::MEMEXEC_TMPDIR))
}

fn resolve_temp_dir_from(explicit: Option<&Path>, env_value: Option<OsString>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    match env_value {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir(),
    }
}
