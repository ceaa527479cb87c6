//! memexec - run executables that only exist as in-memory bytes.
//!
//! Operating systems can only `exec` a path. This crate turns a byte payload
//! into something the loader can execute, hands out commands bound to it, and
//! removes every trace of it on close.
//!
//! # Architecture
//!
//! ```text
//! memexec/
//! ├── exec/           (MemExec session, ExecOptions, CancellableCommand)
//! ├── materialize/    (Materializer trait)
//! │   ├── memfd       (Linux/Android: anonymous memfd, no filesystem entry)
//! │   └── temp_file   (everywhere: 0o500 temp file, removed on release)
//! ├── constants.rs
//! └── error.rs
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use memexec::{ExecOptions, MemExec};
//!
//! # fn main() -> memexec::MemExecResult<()> {
//! let payload = std::fs::read("/usr/bin/true")?;
//! let exec = MemExec::new(
//!     &payload,
//!     "true",
//!     ExecOptions::new().with_prepare(|cmd| {
//!         cmd.env("LANG", "C");
//!     }),
//! )?;
//!
//! let status = exec.command(["--help"]).status()?;
//! assert!(status.success());
//!
//! exec.close()?;
//! # Ok(())
//! # }
//! ```

pub mod constants;
mod error;
pub mod exec;
pub mod materialize;

pub use error::{MemExecError, MemExecResult};
pub use exec::{CancellableCommand, CleanupHook, ExecOptions, MemExec, PrepareHook};
pub use materialize::{Backing, ExecutableHandle, Materializer};
pub use tokio_util::sync::CancellationToken;
