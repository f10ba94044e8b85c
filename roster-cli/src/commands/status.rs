//! `roster status` — registration status of the running daemon.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use roster_daemon::paths::socket_path;
use roster_daemon::{request_status, DaemonError};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;

        let status = match request_status(&home) {
            Ok(status) => status,
            Err(DaemonError::DaemonNotRunning { .. }) => {
                if self.json {
                    let payload = serde_json::json!({
                        "running": false,
                        "socket": socket_path(&home).display().to_string(),
                    });
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&payload)
                            .context("failed to render status JSON")?
                    );
                } else {
                    println!("{} daemon is not running", "■".bright_black().bold());
                }
                return Ok(());
            }
            Err(err) => return Err(err).context("failed to query daemon status"),
        };

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&status).context("failed to render status JSON")?
            );
            return Ok(());
        }

        let registration = if status.registered {
            "registered".green().bold()
        } else {
            "not registered".yellow().bold()
        };
        println!("{} {} ({registration})", "■".green().bold(), status.name);
        println!("  healthy peers: {}", status.peers);
        println!("  socket: {}", status.socket);
        Ok(())
    }
}
