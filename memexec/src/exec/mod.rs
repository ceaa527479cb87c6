//! Executable sessions.
//!
//! A [`MemExec`] owns one materialized executable, builds any number of
//! independent commands against it, and tears it down on [`MemExec::close`].
//!
//! # Concurrency
//!
//! There is no internal locking. Building commands only reads the session, so
//! `&MemExec` may be shared across threads freely. `close` consumes the
//! session, which rules out closing while commands are being built or
//! building after close; a session shared between threads has to be taken
//! back into single ownership (e.g. out of a `Mutex<Option<MemExec>>`)
//! before it can be closed.

mod command;
mod options;

pub use command::CancellableCommand;
pub use options::{CleanupHook, ExecOptions, PrepareHook};

use crate::error::{MemExecError, MemExecResult};
use crate::materialize::{self, Backing, ExecutableHandle, Materializer};
use std::ffi::OsStr;
use std::fmt;
use std::path::Path;
use std::process::Command;
use tokio_util::sync::CancellationToken;

/// An in-memory executable ready to be run as a child process.
///
/// Dropping a session without calling [`close`](Self::close) still releases
/// the executable, but silently and without running the teardown hook.
pub struct MemExec {
    handle: ExecutableHandle,
    prepare: Vec<PrepareHook>,
    cleanup: Option<CleanupHook>,
}

impl MemExec {
    // ─────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────

    /// Materialize `payload` with the current platform's strategy.
    ///
    /// `prefix` only names the storage for diagnostics. Fails iff
    /// materialization fails; no session exists in that case.
    pub fn new(
        payload: impl AsRef<[u8]>,
        prefix: &str,
        options: ExecOptions,
    ) -> MemExecResult<Self> {
        Self::with_materializer(materialize::current(), payload, prefix, options)
    }

    /// Materialize `payload` with an explicit strategy.
    pub fn with_materializer(
        materializer: &dyn Materializer,
        payload: impl AsRef<[u8]>,
        prefix: &str,
        options: ExecOptions,
    ) -> MemExecResult<Self> {
        let ExecOptions {
            prepare,
            cleanup,
            temp_dir,
        } = options;

        let handle = materializer.materialize(payload.as_ref(), prefix, temp_dir.as_deref())?;
        tracing::debug!(
            strategy = materializer.name(),
            path = %handle.path().display(),
            hooks = prepare.len(),
            "Created executable session"
        );

        Ok(Self {
            handle,
            prepare,
            cleanup,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Getters
    // ─────────────────────────────────────────────────────────────────────

    /// Path the executable is run from.
    pub fn path(&self) -> &Path {
        self.handle.path()
    }

    pub fn backing(&self) -> Backing {
        self.handle.backing()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────

    /// Build a command running the executable with `args`.
    ///
    /// Equivalent to [`command_context`](Self::command_context) with a token
    /// that is never cancelled. The executable path is the program; nothing
    /// is injected into `args`. Preparation hooks run afterwards, in
    /// registration order.
    pub fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(self.handle.path());
        cmd.args(args);
        for hook in &self.prepare {
            hook(&mut cmd);
        }
        cmd
    }

    /// Build a command whose child is killed once `cancel` fires.
    pub fn command_context<I, S>(&self, cancel: &CancellationToken, args: I) -> CancellableCommand
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        CancellableCommand::new(self.command(args), cancel.clone())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Teardown
    // ─────────────────────────────────────────────────────────────────────

    /// Release the executable, then run the teardown hook.
    ///
    /// Both steps always run. A release error takes priority and the hook's
    /// result is discarded; otherwise the hook's result is returned as is.
    ///
    /// The session is consumed, so it cannot be closed twice:
    ///
    /// ```compile_fail
    /// use memexec::{ExecOptions, MemExec};
    ///
    /// let exec = MemExec::new(b"", "twice", ExecOptions::new()).unwrap();
    /// exec.close().unwrap();
    /// exec.close().unwrap();
    /// ```
    pub fn close(self) -> MemExecResult<()> {
        let Self {
            handle, cleanup, ..
        } = self;

        match handle.release() {
            Err(err) => {
                if let Some(cleanup) = cleanup
                    && let Err(hook_err) = cleanup()
                {
                    tracing::debug!(
                        error = %hook_err,
                        "Teardown hook failed after release error (discarded)"
                    );
                }
                Err(MemExecError::Io(err))
            }
            Ok(()) => match cleanup {
                Some(cleanup) => cleanup().map_err(MemExecError::Cleanup),
                None => Ok(()),
            },
        }
    }
}

impl fmt::Debug for MemExec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemExec")
            .field("handle", &self.handle)
            .field("prepare", &self.prepare.len())
            .field("cleanup", &self.cleanup.is_some())
            .finish()
    }
}
