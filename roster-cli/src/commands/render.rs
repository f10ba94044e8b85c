//! Shared peer list output for `targets` and `peers`.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use roster_core::{health, PeerRecord};

#[derive(Tabled)]
struct PeerTableRow {
    #[tabled(rename = "url")]
    url: String,
    #[tabled(rename = "last seen")]
    last_seen: String,
    #[tabled(rename = "age")]
    age: String,
}

pub fn print_json(records: &[PeerRecord]) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(records).context("failed to serialize peers JSON")?
    );
    Ok(())
}

/// Render `records` as a table. With a threshold, ages past half of it are
/// highlighted as at risk of being dropped.
pub fn print_table(records: &[PeerRecord], threshold: Option<Duration>) {
    if records.is_empty() {
        println!("No healthy peers.");
        return;
    }

    let now = Utc::now();
    let rows: Vec<PeerTableRow> = records
        .iter()
        .map(|record| PeerTableRow {
            url: record.url.clone(),
            last_seen: record.last_seen.to_rfc3339(),
            age: age_cell(record, now, threshold),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!("{} peer(s)", records.len());
}

fn age_cell(record: &PeerRecord, now: chrono::DateTime<Utc>, threshold: Option<Duration>) -> String {
    let age = health::format_age(record.last_seen, now);
    let Some(threshold) = threshold else {
        return age;
    };
    if health::is_healthy(record, now, threshold / 2) {
        age.green().to_string()
    } else {
        age.yellow().to_string()
    }
}
