//! Error types for memexec.
//!
//! Failures are not re-classified: OS errors are carried as the original
//! [`io::Error`] and teardown hook failures as the hook's own error.

use std::io;
use thiserror::Error;

/// Errors returned by [`MemExec`](crate::MemExec).
#[derive(Debug, Error)]
pub enum MemExecError {
    /// Materializing or releasing the executable failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The teardown hook registered with
    /// [`ExecOptions::with_cleanup`](crate::ExecOptions::with_cleanup) failed.
    #[error(transparent)]
    Cleanup(anyhow::Error),
}

pub type MemExecResult<T> = Result<T, MemExecError>;

impl MemExecError {
    /// The underlying OS error, if this is not a teardown hook failure.
    pub fn as_io(&self) -> Option<&io::Error> {
        match self {
            Self::Io(err) => Some(err),
            Self::Cleanup(_) => None,
        }
    }
}
