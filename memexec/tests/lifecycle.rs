//! Integration tests for session lifecycle.
//!
//! Covers materialization and teardown of disk-backed executables:
//! - No residue in the temp root after close, for any payload
//! - Close ordering: release first, teardown hook always attempted
//! - Error priority between release and teardown hook

use memexec::materialize::TempFileMaterializer;
use memexec::{Backing, ExecOptions, MemExec, MemExecError};
use memexec_test_utils::{EventLog, dir_entries, init_tracing};
use proptest::prelude::*;
use std::io;
use tempfile::TempDir;

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn disk_session(dir: &TempDir, payload: &[u8], options: ExecOptions) -> MemExec {
    MemExec::with_materializer(
        &TempFileMaterializer,
        payload,
        "lifecycle",
        options.with_temp_dir(dir.path()),
    )
    .expect("Failed to materialize")
}

// ============================================================================
// NO RESIDUE
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn new_then_close_leaves_no_file(
        payload in proptest::collection::vec(any::<u8>(), 0..8192),
        prefix in "[a-zA-Z0-9_./-]{0,12}",
    ) {
        let dir = TempDir::new().unwrap();
        let before = dir_entries(dir.path());

        let exec = MemExec::with_materializer(
            &TempFileMaterializer,
            &payload,
            &prefix,
            ExecOptions::new().with_temp_dir(dir.path()),
        )
        .unwrap();
        prop_assert_eq!(exec.backing(), Backing::Disk);
        prop_assert_eq!(std::fs::read(exec.path()).unwrap(), payload);
        exec.close().unwrap();

        prop_assert_eq!(dir_entries(dir.path()), before);
    }
}

#[test]
fn one_file_per_session_while_open() {
    init_tracing();
    let dir = TempDir::new().unwrap();

    let first = disk_session(&dir, b"one", ExecOptions::new());
    let second = disk_session(&dir, b"one", ExecOptions::new());
    assert_ne!(first.path(), second.path());
    assert_eq!(dir_entries(dir.path()).len(), 2);

    first.close().unwrap();
    assert_eq!(dir_entries(dir.path()).len(), 1);
    assert!(second.path().exists());

    second.close().unwrap();
    assert!(dir_entries(dir.path()).is_empty());
}

#[test]
fn file_name_uses_prefix() {
    let dir = TempDir::new().unwrap();
    let exec = disk_session(&dir, b"payload", ExecOptions::new());

    let name = exec.path().file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("lifecycle-"), "unexpected name {name}");

    exec.close().unwrap();
}

// ============================================================================
// CLOSE ORDERING AND ERROR PRIORITY
// ============================================================================

#[test]
fn teardown_hook_runs_after_release() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let log = EventLog::new();

    let exec = {
        let log = log.clone();
        let root = dir.path().to_path_buf();
        disk_session(
            &dir,
            b"payload",
            ExecOptions::new().with_cleanup(move || {
                let remaining = dir_entries(&root).len();
                log.push(format!("cleanup:{remaining}"));
                Ok(())
            }),
        )
    };

    exec.close().unwrap();
    assert_eq!(log.events(), ["cleanup:0"]);
}

#[test]
fn hook_error_returned_verbatim_when_release_succeeds() {
    #[derive(Debug, thiserror::Error)]
    #[error("custom teardown failure")]
    struct TeardownError;

    let dir = TempDir::new().unwrap();
    let log = EventLog::new();

    let exec = {
        let log = log.clone();
        disk_session(
            &dir,
            b"payload",
            ExecOptions::new().with_cleanup(move || {
                log.push("cleanup");
                Err(TeardownError.into())
            }),
        )
    };

    match exec.close() {
        Err(MemExecError::Cleanup(err)) => {
            assert!(err.downcast_ref::<TeardownError>().is_some());
        }
        other => panic!("expected teardown error, got {other:?}"),
    }
    assert_eq!(log.count("cleanup"), 1);
    assert!(dir_entries(dir.path()).is_empty());
}

#[test]
fn release_error_wins_and_hook_still_runs() {
    let dir = TempDir::new().unwrap();
    let log = EventLog::new();

    let exec = {
        let log = log.clone();
        disk_session(
            &dir,
            b"payload",
            ExecOptions::new().with_cleanup(move || {
                log.push("cleanup");
                anyhow::bail!("hook error must be discarded")
            }),
        )
    };

    // Simulate an external deletion so the release step fails.
    std::fs::remove_file(exec.path()).unwrap();

    let err = exec.close().unwrap_err();
    let io_err = err.as_io().expect("release error should win");
    assert_eq!(io_err.kind(), io::ErrorKind::NotFound);
    assert_eq!(log.count("cleanup"), 1);
}

#[test]
fn close_without_hook_succeeds() {
    let dir = TempDir::new().unwrap();
    let exec = disk_session(&dir, b"", ExecOptions::new());
    assert!(exec.close().is_ok());
}

// ============================================================================
// MATERIALIZATION FAILURE
// ============================================================================

#[test]
fn unwritable_root_fails_without_residue() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing");

    let result = MemExec::with_materializer(
        &TempFileMaterializer,
        vec![0u8; 1024],
        "nowhere",
        ExecOptions::new().with_temp_dir(&missing),
    );

    assert!(matches!(result, Err(MemExecError::Io(_))));
    assert!(dir_entries(dir.path()).is_empty());
}

#[test]
fn long_prefix_is_accepted_by_default_strategy() {
    init_tracing();
    let exec = MemExec::new(b"payload", &"p".repeat(300), ExecOptions::new())
        .expect("long prefix should be truncated, not rejected");

    assert_eq!(std::fs::read(exec.path()).unwrap(), b"payload");
    exec.close().unwrap();
}

#[cfg(unix)]
#[test]
fn read_only_root_fails_without_residue() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let locked = dir.path().join("locked");
    std::fs::create_dir(&locked).unwrap();
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o500)).unwrap();

    let result = MemExec::with_materializer(
        &TempFileMaterializer,
        b"payload",
        "locked",
        ExecOptions::new().with_temp_dir(&locked),
    );

    // Root bypasses directory permissions, in which case the session is valid.
    match result {
        Ok(exec) => exec.close().unwrap(),
        Err(err) => assert!(err.as_io().is_some()),
    }
    assert!(dir_entries(&locked).is_empty());

    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o700)).unwrap();
}
