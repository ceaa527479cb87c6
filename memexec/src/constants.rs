//! Constants for memexec
//!
//! Centralized location for file modes, naming patterns and environment
//! variable names.

pub mod envs {
    /// Overrides the directory used for disk-backed executables when no
    /// explicit directory is configured.
    pub const MEMEXEC_TMPDIR: &str = "MEMEXEC_TMPDIR";
}

/// File naming for materialized executables
pub mod naming {
    /// Prefix used when the caller supplies an empty one.
    pub const DEFAULT_PREFIX: &str = "memexec";

    /// Number of random characters appended to the prefix of a temp file.
    pub const RANDOM_SUFFIX_LEN: usize = 10;

    /// Extension the loader needs to recognize an executable.
    pub const EXECUTABLE_SUFFIX: &str = if cfg!(windows) { ".exe" } else { "" };

    /// Longest name `memfd_create(2)` accepts (NAME_MAX minus `memfd:`).
    pub const MAX_NAME_LEN: usize = 249;

    /// Longest sanitized prefix, in bytes. Leaves room for the `-`, the random
    /// suffix and `.exe`, which keeps temp file names under NAME_MAX too.
    pub const MAX_PREFIX_LEN: usize = MAX_NAME_LEN - 1 - RANDOM_SUFFIX_LEN - ".exe".len();
}

/// Owner read + execute. No write bit, nothing for group/other.
pub const EXECUTABLE_MODE: u32 = 0o500;
