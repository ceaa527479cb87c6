//! Shared helpers for memexec tests.

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::Path;
use std::sync::{Arc, Once};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Install a test-friendly tracing subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Scratch directory that allows executing files.
///
/// Created under `base` (use `env!("CARGO_TARGET_TMPDIR")` from integration
/// tests), since `/tmp` is mounted `noexec` on some CI hosts.
pub fn exec_temp_dir(base: impl AsRef<Path>) -> TempDir {
    TempDir::new_in(base).expect("Failed to create temp dir")
}

/// File names currently in `dir`.
pub fn dir_entries(dir: &Path) -> BTreeSet<OsString> {
    std::fs::read_dir(dir)
        .expect("Failed to list directory")
        .map(|entry| entry.expect("Failed to read entry").file_name())
        .collect()
}

/// Ordered record of events observed by hooks running on any thread.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events.lock().iter().filter(|e| *e == event).count()
    }
}
