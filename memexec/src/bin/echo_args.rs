//! Prints each argument after argv[0] on its own line.
//!
//! With `ECHO_ARGS_SLEEP_MS` set, sleeps that long before printing, which
//! gives cancellation tests a child that is still running.

use std::io::Write;
use std::time::Duration;

const SLEEP_ENV: &str = "ECHO_ARGS_SLEEP_MS";

fn main() -> std::io::Result<()> {
    if let Some(ms) = std::env::var(SLEEP_ENV)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
    {
        std::thread::sleep(Duration::from_millis(ms));
    }

    let mut out = std::io::stdout().lock();
    for arg in std::env::args_os().skip(1) {
        writeln!(out, "{}", arg.to_string_lossy())?;
    }
    out.flush()
}
