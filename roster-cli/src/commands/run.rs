//! `roster run` — foreground daemon.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use roster_core::{config, Config, ConfigFile};
use roster_daemon::start_blocking;

/// Settings come from the config file; any flag given here overrides it.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Config file (default: ~/.roster/config.yaml).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// DNS name this node registers under.
    #[arg(long)]
    pub name: Option<String>,

    /// Shared registry directory.
    #[arg(long, value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    /// Seconds between peer list refreshes.
    #[arg(long, value_name = "SECS")]
    pub refresh_interval: Option<u64>,

    /// Seconds between self-registration updates.
    #[arg(long, value_name = "SECS")]
    pub registration_interval: Option<u64>,

    /// Seconds a peer may go without an update before it is dropped.
    #[arg(long, value_name = "SECS")]
    pub unhealthy_threshold: Option<u64>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let home = super::home_dir()?;
        let json_logs = self.json_logs;
        let config = self.resolve_config(&home)?;
        start_blocking(config, &home, json_logs).context("daemon exited with error")
    }

    fn resolve_config(self, home: &Path) -> Result<Config> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(|| config::config_path_at(home));
        let file = ConfigFile::load(&path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?;

        let overrides = ConfigFile {
            name: self.name,
            store_dir: self.store_dir,
            refresh_interval_secs: self.refresh_interval,
            registration_interval_secs: self.registration_interval,
            unhealthy_threshold_secs: self.unhealthy_threshold,
        };
        file.merge(overrides)
            .resolve()
            .context("invalid roster configuration")
    }
}
