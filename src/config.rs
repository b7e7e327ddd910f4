//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! All pacing, retry, and trading parameters live here so the three bot
//! variants (fixed margin, proxied, tiered + yield claim) are expressed
//! as configuration rather than separate builds.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::types::{MarginSchedule, MarginTier};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub api: ApiConfig,
    pub retry: RetryConfig,
    pub trading: TradingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    pub name: String,
    /// Newline-delimited `account|displayName` records.
    pub accounts_file: String,
    /// Newline-delimited proxy URIs, matched to accounts by index.
    #[serde(default)]
    pub proxy_file: Option<String>,
    /// Delay inserted before each side-effecting call within an account.
    #[serde(default = "default_pacing_delay")]
    pub pacing_delay_secs: u64,
    /// Delay between accounts within a batch (not after the last).
    #[serde(default = "default_inter_account_delay")]
    pub inter_account_delay_secs: u64,
    /// Wait between full cycles, rendered as a live countdown.
    #[serde(default = "default_cycle_wait")]
    pub cycle_wait_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Referral code submitted to unbound accounts.
    pub referral_code: String,
    /// Per-request timeout, applied when a proxy is configured.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_ip_echo_url")]
    pub ip_echo_url: String,
    #[serde(default = "default_ip_echo_timeout")]
    pub ip_echo_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff")]
    pub backoff_secs: u64,
    /// Substring in an error message that marks a rate-limit rejection.
    #[serde(default = "default_rate_limit_marker")]
    pub rate_limit_marker: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TradingConfig {
    #[serde(default = "default_product_id")]
    pub product_id: u32,
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    #[serde(default = "default_settle_delay")]
    pub settle_delay_secs: u64,
    /// Whether to claim the offline-yield counter when it is positive.
    #[serde(default)]
    pub claim_offline_yield: bool,
    /// Balance thresholds mapped to order margins. A single entry
    /// reproduces the fixed-margin behavior; empty disables trading.
    #[serde(default)]
    pub margin_tiers: Vec<MarginTier>,
}

fn default_pacing_delay() -> u64 {
    2
}
fn default_inter_account_delay() -> u64 {
    3
}
fn default_cycle_wait() -> u64 {
    3600
}
fn default_request_timeout() -> u64 {
    30
}
fn default_ip_echo_url() -> String {
    "https://api.ipify.org?format=json".to_string()
}
fn default_ip_echo_timeout() -> u64 {
    10
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff() -> u64 {
    5
}
fn default_rate_limit_marker() -> String {
    "too quickly".to_string()
}
fn default_product_id() -> u32 {
    2
}
fn default_leverage() -> u32 {
    100
}
fn default_settle_delay() -> u64 {
    300
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.api.base_url.is_empty() {
            anyhow::bail!("api.base_url must not be empty");
        }
        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }
        for tier in &self.trading.margin_tiers {
            if tier.margin <= 0.0 || tier.required_balance < 0.0 {
                anyhow::bail!(
                    "invalid margin tier: required_balance={} margin={}",
                    tier.required_balance,
                    tier.margin,
                );
            }
        }
        Ok(())
    }

    /// The margin-tier table, sorted descending by threshold.
    pub fn margin_schedule(&self) -> MarginSchedule {
        MarginSchedule::new(self.trading.margin_tiers.clone())
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_secs(self.bot.pacing_delay_secs)
    }

    pub fn inter_account_delay(&self) -> Duration {
        Duration::from_secs(self.bot.inter_account_delay_secs)
    }
}
