//! `roster targets` — healthy peers as seen by the running daemon.

use anyhow::{Context, Result};
use clap::Args;

use roster_daemon::{request_targets, DaemonError};

use super::render;

#[derive(Args, Debug)]
pub struct TargetsArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl TargetsArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;
        let targets = match request_targets(&home) {
            Ok(targets) => targets,
            Err(DaemonError::DaemonNotRunning { socket }) => {
                anyhow::bail!(
                    "daemon is not running (no socket at {}); start it with `roster run`",
                    socket.display()
                );
            }
            Err(err) => return Err(err).context("failed to query daemon targets"),
        };

        if self.json {
            return render::print_json(&targets);
        }
        render::print_table(&targets, None);
        Ok(())
    }
}
