//! Invocation of optional host utilities.
//!
//! The Termux commands the notifier and wake guard rely on may or may not
//! exist on a given host. Callers treat any failure, including a missing
//! binary, as "mechanism unavailable" and move on.

use std::process::Stdio;

use anyhow::{Result, bail};
use tokio::process::Command;

/// Run a command with all stdio discarded; Ok only on exit status zero.
pub(crate) async fn run_quiet(program: &str, args: &[&str]) -> Result<()> {
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;
    if !status.success() {
        bail!("{program} exited with {status}");
    }
    Ok(())
}
