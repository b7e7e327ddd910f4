//! One-shot converter from raw Telegram init-data dumps to the
//! `account|displayName` records the engine loads.
//!
//! Usage: `convert_accounts [input] [output]`, defaulting to
//! `convert.txt` → `data.txt`.

use std::env;
use std::fs;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use kilobot::accounts;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = env::args().skip(1);
    let input = args.next().unwrap_or_else(|| "convert.txt".to_string());
    let output = args.next().unwrap_or_else(|| "data.txt".to_string());

    let contents = fs::read_to_string(&input)
        .with_context(|| format!("Failed to read input file: {input}"))?;

    let accounts = accounts::convert_init_data(&contents);
    if accounts.is_empty() {
        anyhow::bail!("no convertible records in {input}");
    }

    fs::write(&output, accounts::format_records(&accounts))
        .with_context(|| format!("Failed to write output file: {output}"))?;

    info!(count = accounts.len(), output = %output, "Accounts converted");
    Ok(())
}
