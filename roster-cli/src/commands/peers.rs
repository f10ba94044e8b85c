//! `roster peers` — read a registry directory without a daemon.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use roster_core::{health, DirStore};

use super::render;

#[derive(Args, Debug)]
pub struct PeersArgs {
    /// Registry directory to read.
    #[arg(long, value_name = "DIR")]
    pub store_dir: PathBuf,

    /// Drop peers older than this many seconds (default: show all).
    #[arg(long, value_name = "SECS")]
    pub unhealthy_threshold: Option<u64>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl PeersArgs {
    pub fn run(self) -> Result<()> {
        let store = DirStore::new(&self.store_dir);
        let mut records = store
            .load_records()
            .with_context(|| format!("failed to read registry '{}'", self.store_dir.display()))?;

        let threshold = self.unhealthy_threshold.map(Duration::from_secs);
        if let Some(threshold) = threshold {
            records = health::filter_healthy(records, Utc::now(), threshold);
        }

        if self.json {
            return render::print_json(&records);
        }
        render::print_table(&records, threshold);
        Ok(())
    }
}
