//! Account list loading.
//!
//! Accounts are newline-delimited `account|displayName` records, parsed
//! once at startup and immutable for the run. Re-reading the list
//! requires a process restart — a documented limitation.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::types::{Account, KilobotError};

/// Parse account records from raw file contents.
///
/// Blank lines are skipped silently; lines without a `|` separator or
/// with an empty field are skipped with a logged warning and never halt
/// processing of subsequent lines.
pub fn parse_accounts(contents: &str) -> Vec<Account> {
    let mut accounts = Vec::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some((account_id, display_name)) = line.split_once('|') else {
            warn!(line = %line, "Invalid account line (missing separator), skipping");
            continue;
        };

        let account_id = account_id.trim();
        let display_name = display_name.trim();
        if account_id.is_empty() || display_name.is_empty() {
            warn!(line = %line, "Invalid account line (empty field), skipping");
            continue;
        }

        accounts.push(Account {
            account_id: account_id.to_string(),
            display_name: display_name.to_string(),
            proxy: None,
        });
    }

    accounts
}

/// Load the account list from disk.
///
/// Errors when the file is missing or contains zero valid records — the
/// caller decides whether that refusal is graceful (before the cycle
/// loop) or fatal.
pub fn load_accounts(path: &str) -> Result<Vec<Account>, KilobotError> {
    if !Path::new(path).exists() {
        return Err(KilobotError::AccountList(format!("{path} not found")));
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| KilobotError::AccountList(format!("failed to read {path}: {e}")))?;

    let accounts = parse_accounts(&contents);
    if accounts.is_empty() {
        return Err(KilobotError::AccountList(format!(
            "no valid account records in {path}"
        )));
    }

    Ok(accounts)
}

// ---------------------------------------------------------------------------
// Init-data conversion
// ---------------------------------------------------------------------------

/// The `user` payload inside a Telegram init-data query string.
#[derive(Debug, Deserialize)]
struct InitDataUser {
    id: u64,
    username: String,
}

/// Extract an account from one raw init-data line: the percent-encoded
/// `user` query parameter carries the id and username as JSON.
pub fn parse_init_data_line(line: &str) -> Option<Account> {
    let encoded = line.split("user=").nth(1)?.split('&').next()?;
    let decoded = urlencoding::decode(encoded).ok()?;
    let user: InitDataUser = serde_json::from_str(&decoded).ok()?;
    Some(Account {
        account_id: user.id.to_string(),
        display_name: user.username,
        proxy: None,
    })
}

/// Convert raw init-data dump contents into account records.
///
/// Lines without a decodable `user` parameter are skipped with a logged
/// warning, same as malformed record lines in [`parse_accounts`].
pub fn convert_init_data(contents: &str) -> Vec<Account> {
    let mut accounts = Vec::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_init_data_line(line) {
            Some(account) => accounts.push(account),
            None => warn!(line = %line, "Unparseable init-data line, skipping"),
        }
    }

    accounts
}

/// Render accounts as the newline-delimited records [`load_accounts`]
/// reads back.
pub fn format_records(accounts: &[Account]) -> String {
    let mut out = String::new();
    for account in accounts {
        out.push_str(&account.account_id);
        out.push('|');
        out.push_str(&account.display_name);
        out.push('\n');
    }
    out
}
