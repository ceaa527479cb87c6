//! Commands bound to a cancellation token.
//!
//! The token only affects the spawned child: once it is cancelled, a pending
//! [`status`](CancellableCommand::status) or
//! [`output`](CancellableCommand::output) kills the child and returns
//! [`io::ErrorKind::Interrupted`].

use std::io;
use std::ops::{Deref, DerefMut};
use std::process::{ExitStatus, Output};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

/// A command whose child is killed when its [`CancellationToken`] fires.
///
/// Derefs to [`tokio::process::Command`] for stdio and other settings.
#[derive(Debug)]
pub struct CancellableCommand {
    inner: Command,
    cancel: CancellationToken,
}

impl CancellableCommand {
    pub(crate) fn new(cmd: std::process::Command, cancel: CancellationToken) -> Self {
        let mut inner = Command::from(cmd);
        inner.kill_on_drop(true);
        Self { inner, cancel }
    }

    /// Token this command watches.
    ///
    /// Shares state with the token passed to
    /// [`MemExec::command_context`](crate::MemExec::command_context). Useful
    /// after [`spawn`](Self::spawn), where watching the token is up to the
    /// caller.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Spawn the child. It is killed if the returned [`Child`] is dropped;
    /// watching the token is up to the caller.
    pub fn spawn(&mut self) -> io::Result<Child> {
        self.inner.spawn()
    }

    /// Run to completion, killing the child if the token is cancelled first.
    pub async fn status(&mut self) -> io::Result<ExitStatus> {
        let cancel = self.cancel.clone();
        tokio::select! {
            status = self.inner.status() => status,
            _ = cancel.cancelled() => Err(cancelled()),
        }
    }

    /// Run to completion collecting stdout/stderr, killing the child if the
    /// token is cancelled first.
    pub async fn output(&mut self) -> io::Result<Output> {
        let cancel = self.cancel.clone();
        tokio::select! {
            output = self.inner.output() => output,
            _ = cancel.cancelled() => Err(cancelled()),
        }
    }
}

impl Deref for CancellableCommand {
    type Target = Command;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for CancellableCommand {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

fn cancelled() -> io::Error {
    io::Error::new(io::ErrorKind::Interrupted, "command cancelled")
}
