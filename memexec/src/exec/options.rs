//! Configuration for a [`MemExec`](super::MemExec) session.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Customizes every command built by a session (environment, working
/// directory, stdio, ...).
pub type PrepareHook = Box<dyn Fn(&mut Command) + Send + Sync>;

/// Extra teardown run by [`MemExec::close`](super::MemExec::close) after the
/// executable has been released.
pub type CleanupHook = Box<dyn FnOnce() -> anyhow::Result<()> + Send + Sync>;

/// Options applied once, when the session is created.
///
/// Options never fail; they only record configuration.
///
/// ```
/// use memexec::ExecOptions;
///
/// let options = ExecOptions::new()
///     .with_prepare(|cmd| {
///         cmd.env("RUST_LOG", "debug");
///     })
///     .with_prepare(|cmd| {
///         cmd.current_dir("/");
///     })
///     .with_cleanup(|| Ok(()))
///     .with_temp_dir("/var/tmp");
///
/// assert_eq!(options.temp_dir(), Some(std::path::Path::new("/var/tmp")));
/// ```
#[derive(Default)]
pub struct ExecOptions {
    pub(crate) prepare: Vec<PrepareHook>,
    pub(crate) cleanup: Option<CleanupHook>,
    pub(crate) temp_dir: Option<PathBuf>,
}

impl ExecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a preparation hook.
    ///
    /// Hooks run in registration order on every command, so later hooks
    /// override earlier ones.
    pub fn with_prepare<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Command) + Send + Sync + 'static,
    {
        self.prepare.push(Box::new(hook));
        self
    }

    /// Set the teardown hook, replacing any previous one.
    pub fn with_cleanup<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.cleanup = Some(Box::new(hook));
        self
    }

    /// Directory for disk-backed executables.
    ///
    /// Ignored by memory-backed materialization. When unset, `MEMEXEC_TMPDIR`
    /// or the platform temp directory is used.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }
}

impl fmt::Debug for ExecOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecOptions")
            .field("prepare", &self.prepare.len())
            .field("cleanup", &self.cleanup.is_some())
            .field("temp_dir", &self.temp_dir)
            .finish()
    }
}
