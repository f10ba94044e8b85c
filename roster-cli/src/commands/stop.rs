//! `roster stop` — ask the running daemon to shut down.

use anyhow::{Context, Result};

use roster_daemon::{request_stop, DaemonError};

pub fn run() -> Result<()> {
    let home = super::home_dir()?;
    match request_stop(&home) {
        Ok(()) => println!("daemon stop requested"),
        Err(DaemonError::DaemonNotRunning { .. }) => println!("daemon is not running"),
        Err(err) => return Err(err).context("failed to stop daemon"),
    }
    Ok(())
}
