//! Shared types for the KILOBOT engine.
//!
//! These types form the data model used across all modules. They are
//! designed to be stable so that the API client, workflow, and scheduler
//! modules can depend on them without circular references.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// One remote-service identity processed by the engine.
///
/// Identity is the pair `(account_id, display_name)` — both are required.
/// The optional proxy is positional metadata assigned by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub account_id: String,
    pub display_name: String,
    /// Outbound proxy URI for this account, if one was assigned.
    #[serde(default)]
    pub proxy: Option<String>,
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.account_id)
    }
}

/// Server-reported account status, fetched fresh at the start of every
/// workflow invocation and never cached across cycles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatus {
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub stamina: f64,
    /// Offline-yield counter. Claimable when > 0.
    #[serde(default)]
    pub auto_yield: f64,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "balance={:.2} stamina={:.2} auto_yield={:.2}",
            self.balance, self.stamina, self.auto_yield,
        )
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Position direction for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// The opposite direction.
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    /// Wire representation expected by the order endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Margin tiers
// ---------------------------------------------------------------------------

/// A balance threshold mapped to an order margin amount.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MarginTier {
    pub required_balance: f64,
    pub margin: f64,
}

/// Ordered margin-tier table, kept sorted descending by `required_balance`
/// so that the first entry whose threshold is met is the highest
/// qualifying tier.
#[derive(Debug, Clone, Default)]
pub struct MarginSchedule {
    tiers: Vec<MarginTier>,
}

impl MarginSchedule {
    /// Build a schedule from tiers in any order; sorts descending.
    pub fn new(mut tiers: Vec<MarginTier>) -> Self {
        tiers.sort_by(|a, b| {
            b.required_balance
                .partial_cmp(&a.required_balance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self { tiers }
    }

    /// Select the margin for the given balance: first tier (descending)
    /// whose `required_balance <= balance`. `None` means the account is
    /// not eligible to trade.
    pub fn select(&self, balance: f64) -> Option<f64> {
        self.tiers
            .iter()
            .find(|t| t.required_balance <= balance)
            .map(|t| t.margin)
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn tiers(&self) -> &[MarginTier] {
        &self.tiers
    }
}

impl fmt::Display for MarginSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tiers.is_empty() {
            return write!(f, "no tiers");
        }
        let parts: Vec<String> = self
            .tiers
            .iter()
            .map(|t| format!("{:.0}→{:.0}", t.required_balance, t.margin))
            .collect();
        write!(f, "{}", parts.join(" | "))
    }
}

// ---------------------------------------------------------------------------
// Action outcome
// ---------------------------------------------------------------------------

/// The uniform shape every remote action produces.
///
/// Transport failures (network/DNS/timeout) and application-level
/// rejections (HTTP 200 with a server-encoded failure flag) both normalize
/// to `Failure(message)` — the caller cannot distinguish them. Only truly
/// unexpected faults use `Err` paths elsewhere in the crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome<T> {
    Success(T),
    Failure(String),
}

impl<T> ActionOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Success(_))
    }

    /// The error message, if this is a failure.
    pub fn error(&self) -> Option<&str> {
        match self {
            ActionOutcome::Success(_) => None,
            ActionOutcome::Failure(msg) => Some(msg),
        }
    }

    /// Map the success value, preserving failures.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ActionOutcome<U> {
        match self {
            ActionOutcome::Success(v) => ActionOutcome::Success(f(v)),
            ActionOutcome::Failure(msg) => ActionOutcome::Failure(msg),
        }
    }
}

impl<T> fmt::Display for ActionOutcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutcome::Success(_) => write!(f, "ok"),
            ActionOutcome::Failure(msg) => write!(f, "failed: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for KILOBOT.
#[derive(Debug, thiserror::Error)]
pub enum KilobotError {
    #[error("Account list error: {0}")]
    AccountList(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network identity error: {0}")]
    NetworkIdentity(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
