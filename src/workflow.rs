//! Per-account workflow.
//!
//! The ordered state machine applied to one account:
//! info → (claim) → referral → mining → margin-tiered order pair.
//! Every remote call goes through the retry policy; per-step failures
//! are logged and the sibling steps still execute. Only a failed
//! initial info fetch aborts the account, and nothing here can abort
//! the scheduler.

use std::fmt;
use std::time::Duration;

use tracing::{error, info};

use crate::api::GameApi;
use crate::retry::RetryPolicy;
use crate::types::{Account, AccountStatus, ActionOutcome, Direction, MarginSchedule};

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Outcome of one account's cycle, step by step. `None` means the step
/// was not attempted (precondition unmet or workflow aborted earlier).
#[derive(Debug, Clone, Default)]
pub struct AccountReport {
    pub account_id: String,
    pub display_name: String,
    pub status: Option<AccountStatus>,
    /// Why the workflow aborted after the info fetch, if it did.
    pub aborted: Option<String>,
    pub yield_claimed: Option<bool>,
    pub referral_ok: Option<bool>,
    pub stamina_converted: Option<bool>,
    /// The margin selected from the tier table, if any tier qualified.
    pub margin: Option<f64>,
    pub long_ok: Option<bool>,
    pub short_ok: Option<bool>,
}

impl AccountReport {
    fn new(account: &Account) -> Self {
        Self {
            account_id: account.account_id.clone(),
            display_name: account.display_name.clone(),
            ..Self::default()
        }
    }

    /// Whether a balanced pair was fully opened this cycle.
    pub fn pair_opened(&self) -> bool {
        self.long_ok == Some(true) && self.short_ok == Some(true)
    }
}

impl fmt::Display for AccountReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(reason) = &self.aborted {
            return write!(f, "{}: aborted ({reason})", self.display_name);
        }
        let step = |v: Option<bool>| match v {
            Some(true) => "ok",
            Some(false) => "failed",
            None => "skipped",
        };
        write!(
            f,
            "{}: yield={} referral={} mining={} orders={}",
            self.display_name,
            step(self.yield_claimed),
            step(self.referral_ok),
            step(self.stamina_converted),
            match self.margin {
                Some(m) => format!(
                    "margin {:.0} long={} short={}",
                    m,
                    step(self.long_ok),
                    step(self.short_ok),
                ),
                None => "skipped".to_string(),
            },
        )
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// Deterministic per-account sequence. Owns no state beyond the borrows
/// for the current account; all results are returned in the report.
pub struct Workflow<'a> {
    api: &'a dyn GameApi,
    retry: &'a RetryPolicy,
    schedule: &'a MarginSchedule,
    /// Pacing delay inserted before each side-effecting call (not before
    /// the initial read).
    pacing: Duration,
    claim_offline_yield: bool,
}

impl<'a> Workflow<'a> {
    pub fn new(
        api: &'a dyn GameApi,
        retry: &'a RetryPolicy,
        schedule: &'a MarginSchedule,
        pacing: Duration,
        claim_offline_yield: bool,
    ) -> Self {
        Self {
            api,
            retry,
            schedule,
            pacing,
            claim_offline_yield,
        }
    }

    async fn pace(&self) {
        tokio::time::sleep(self.pacing).await;
    }

    /// Run the full sequence for one account.
    pub async fn run(&self, account: &Account) -> AccountReport {
        let mut report = AccountReport::new(account);
        let id = account.account_id.as_str();

        // 1. Status read. Failure here aborts this account only.
        let outcome = self
            .retry
            .run(|| self.api.fetch_info(id, &account.display_name))
            .await;
        let status = match outcome {
            ActionOutcome::Success(status) => status,
            ActionOutcome::Failure(msg) => {
                error!(account = %account, error = %msg, "Unable to retrieve account information");
                report.aborted = Some(msg);
                return report;
            }
        };
        info!(account = %account, %status, "Account status");
        report.status = Some(status);

        // 2. Offline yield (feature-gated, best-effort).
        if self.claim_offline_yield && status.auto_yield > 0.0 {
            self.pace().await;
            let outcome = self.retry.run(|| self.api.claim_offline_yield(id)).await;
            match outcome.error() {
                None => info!(account = %account, "Offline yield claimed"),
                Some(msg) => error!(account = %account, error = %msg, "Yield claim failed"),
            }
            report.yield_claimed = Some(outcome.is_success());
        }

        // 3. Referral (best-effort, idempotent on the server side).
        self.pace().await;
        let outcome = self.retry.run(|| self.api.bind_referral(id)).await;
        if let Some(msg) = outcome.error() {
            error!(account = %account, error = %msg, "Error checking/binding referral");
        }
        report.referral_ok = Some(outcome.is_success());

        // 4. Stamina conversion (only when there is stamina to spend).
        if status.stamina > 0.0 {
            self.pace().await;
            let outcome = self
                .retry
                .run(|| self.api.convert_stamina(id, status.stamina))
                .await;
            match outcome.error() {
                None => info!(account = %account, stamina = status.stamina, "Mining successful"),
                Some(msg) => error!(account = %account, error = %msg, "Mining error"),
            }
            report.stamina_converted = Some(outcome.is_success());
        }

        // 5. Balanced order pair at the highest qualifying tier. The two
        //    legs are independent: one failing never stops the other, and
        //    there is no rollback.
        match self.schedule.select(status.balance) {
            Some(margin) => {
                info!(
                    account = %account,
                    balance = status.balance,
                    margin,
                    "Balance sufficient, opening balanced pair"
                );
                report.margin = Some(margin);

                for direction in [Direction::Long, Direction::Short] {
                    self.pace().await;
                    let outcome = self
                        .retry
                        .run(|| self.api.open_position(id, direction, margin))
                        .await;
                    match outcome.error() {
                        None => info!(account = %account, %direction, "Opened order"),
                        Some(msg) => {
                            error!(account = %account, %direction, error = %msg, "Error opening order")
                        }
                    }
                    match direction {
                        Direction::Long => report.long_ok = Some(outcome.is_success()),
                        Direction::Short => report.short_ok = Some(outcome.is_success()),
                    }
                }

                if report.pair_opened() {
                    info!(account = %account, "Both orders opened successfully");
                }
            }
            None => {
                info!(
                    account = %account,
                    balance = status.balance,
                    "Balance below every margin tier, skipping orders"
                );
            }
        }

        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
