//! Cycle scheduler.
//!
//! Iterates all accounts in file order with a fixed inter-account
//! delay, then waits a full cycle interval with a live countdown
//! display, forever. Exactly one account is in flight at any time —
//! sequential by design, to keep request pacing predictable to the
//! remote service.

use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use reqwest::header::HeaderMap;
use tracing::{error, info};

use crate::api::{KiloClient, OrderParams};
use crate::config::AppConfig;
use crate::headers;
use crate::net::{self, NetworkIdentity, ProxyPool};
use crate::retry::RetryPolicy;
use crate::types::{Account, MarginSchedule};
use crate::workflow::{AccountReport, Workflow};

// ---------------------------------------------------------------------------
// Countdown
// ---------------------------------------------------------------------------

/// Explicit countdown state between batches, exposing a tick so the
/// caller renders the remaining time rather than blocking blind.
#[derive(Debug)]
pub struct Countdown {
    remaining: u64,
}

impl Countdown {
    pub fn new(secs: u64) -> Self {
        Self { remaining: secs }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Sleep one second and decrement. `None` once the countdown has
    /// elapsed.
    pub async fn tick(&mut self) -> Option<u64> {
        if self.remaining == 0 {
            return None;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
        self.remaining -= 1;
        Some(self.remaining)
    }
}

// ---------------------------------------------------------------------------
// Batch iteration
// ---------------------------------------------------------------------------

/// Process accounts strictly in order, inserting a fixed delay between
/// accounts (not after the last). Returns the per-account reports in
/// the same order.
pub async fn run_accounts<F, Fut>(
    accounts: &[Account],
    inter_account_delay: Duration,
    mut process: F,
) -> Vec<AccountReport>
where
    F: FnMut(usize, Account) -> Fut,
    Fut: std::future::Future<Output = AccountReport>,
{
    let mut reports = Vec::with_capacity(accounts.len());

    for (index, account) in accounts.iter().enumerate() {
        reports.push(process(index, account.clone()).await);

        if index + 1 < accounts.len() {
            tokio::time::sleep(inter_account_delay).await;
        }
    }

    reports
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Owns the account list for the run and drives the infinite
/// `RunningBatch → Countdown → RunningBatch` loop.
pub struct Scheduler {
    cfg: AppConfig,
    accounts: Vec<Account>,
    proxies: ProxyPool,
    headers: HeaderMap,
    retry: RetryPolicy,
    schedule: MarginSchedule,
}

impl Scheduler {
    pub fn new(cfg: AppConfig, accounts: Vec<Account>, proxies: ProxyPool) -> Self {
        let retry = RetryPolicy::from(&cfg.retry);
        let schedule = cfg.margin_schedule();
        Self {
            cfg,
            accounts,
            proxies,
            headers: headers::default_headers(),
            retry,
            schedule,
        }
    }

    /// Run forever. Only an error escaping the batch loop itself ends
    /// the process; per-account and per-step failures never do.
    pub async fn run(&self) -> Result<()> {
        let mut cycle: u64 = 1;
        loop {
            info!(cycle, accounts = self.accounts.len(), "Starting cycle");
            let reports = self.run_batch().await;
            let pairs = reports.iter().filter(|r| r.pair_opened()).count();
            let aborted = reports.iter().filter(|r| r.aborted.is_some()).count();
            info!(
                cycle,
                processed = reports.len(),
                pairs_opened = pairs,
                aborted,
                "Cycle completed, waiting for the next cycle"
            );

            self.countdown(self.cfg.bot.cycle_wait_secs).await;
            cycle += 1;
        }
    }

    /// One full pass over every account, in file order.
    pub async fn run_batch(&self) -> Vec<AccountReport> {
        run_accounts(
            &self.accounts,
            self.cfg.inter_account_delay(),
            |index, account| self.process_account(index, account),
        )
        .await
    }

    /// Stamp the positional proxy assignment onto the account record.
    fn with_proxy(&self, index: usize, account: Account) -> Account {
        Account {
            proxy: self.proxies.assign(index).map(String::from),
            ..account
        }
    }

    async fn process_account(&self, index: usize, account: Account) -> AccountReport {
        let account = self.with_proxy(index, account);
        let identity = self.resolve_identity(account.proxy.as_deref()).await;
        info!(
            account_no = index + 1,
            account = %account,
            ip = %identity,
            "Processing account"
        );

        let client = match net::build_client(
            self.headers.clone(),
            account.proxy.as_deref(),
            Duration::from_secs(self.cfg.api.request_timeout_secs),
        ) {
            Ok(client) => client,
            Err(e) => {
                // Client construction failing is a per-account skip, not
                // a process error.
                error!(account = %account, error = %e, "Failed to build HTTP client");
                return AccountReport {
                    account_id: account.account_id.clone(),
                    display_name: account.display_name.clone(),
                    aborted: Some(e.to_string()),
                    ..Default::default()
                };
            }
        };

        let api = KiloClient::new(
            client,
            &self.cfg.api,
            OrderParams::from(&self.cfg.trading),
            self.cfg.pacing_delay(),
        );
        let workflow = Workflow::new(
            &api,
            &self.retry,
            &self.schedule,
            self.cfg.pacing_delay(),
            self.cfg.trading.claim_offline_yield,
        );

        let report = workflow.run(&account).await;
        info!(account = %account, report = %report, "Account done");
        report
    }

    /// Resolve the assigned proxy's public IP for the banner.
    /// Best-effort: resolution failure degrades to an "unknown" label.
    async fn resolve_identity(&self, proxy: Option<&str>) -> NetworkIdentity {
        let Some(proxy) = proxy else {
            return NetworkIdentity::default();
        };

        let mut identity = NetworkIdentity {
            proxy: Some(proxy.to_string()),
            public_ip: None,
        };

        let echo_timeout = Duration::from_secs(self.cfg.api.ip_echo_timeout_secs);
        match net::build_client(self.headers.clone(), Some(proxy), echo_timeout) {
            Ok(client) => {
                identity.public_ip =
                    net::resolve_public_ip(&client, &self.cfg.api.ip_echo_url, echo_timeout).await;
            }
            Err(e) => {
                error!(proxy = %proxy, error = %e, "Failed to build proxy client for IP check");
            }
        }

        identity
    }

    async fn countdown(&self, secs: u64) {
        let mut countdown = Countdown::new(secs);
        while countdown.remaining() > 0 {
            let timestamp = chrono::Local::now().format("%H:%M:%S");
            print!(
                "\r[{timestamp}] [*] Waiting {} seconds to continue...",
                countdown.remaining(),
            );
            let _ = io::stdout().flush();
            countdown.tick().await;
        }
        // Clear the countdown line before the next cycle's logs.
        print!("\r\x1b[2K");
        let _ = io::stdout().flush();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
