//! KILOBOT — Multi-Account KiloEx Mini-Game Automation Engine
//!
//! Entry point. Loads configuration, initialises structured logging,
//! parses the account and proxy lists, and runs the hourly batch cycle
//! forever. A missing or empty account list is a graceful refusal to
//! run (exit 0); an error escaping the scheduler exits non-zero.

use anyhow::Result;
use tracing::{error, info};

use kilobot::accounts;
use kilobot::config::AppConfig;
use kilobot::net::ProxyPool;
use kilobot::scheduler::Scheduler;

const BANNER: &str = r#"
 _  _____ _     ___  ____   ___ _____
| |/ /_ _| |   / _ \| __ ) / _ \_   _|
| ' / | || |  | | | |  _ \| | | || |
| . \ | || |__| |_| | |_) | |_| || |
|_|\_\___|_____\___/|____/ \___/ |_|

  Multi-Account Mini-Game Automation Engine
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load("config.toml")?;

    init_logging();

    println!("{BANNER}");
    info!(
        bot_name = %cfg.bot.name,
        accounts_file = %cfg.bot.accounts_file,
        cycle_wait_secs = cfg.bot.cycle_wait_secs,
        tiers = %cfg.margin_schedule(),
        "KILOBOT starting up"
    );

    // -- Load inputs -------------------------------------------------------

    let accounts = match accounts::load_accounts(&cfg.bot.accounts_file) {
        Ok(accounts) => accounts,
        Err(e) => {
            // Graceful refusal: nothing to do without accounts, and the
            // operator gets a clear message instead of a stack trace.
            error!(error = %e, "Cannot start without an account list");
            return Ok(());
        }
    };
    info!(count = accounts.len(), "Accounts loaded");

    let proxies = match cfg.bot.proxy_file.as_deref() {
        Some(path) => ProxyPool::load(path),
        None => ProxyPool::default(),
    };
    if !proxies.is_empty() {
        info!(count = proxies.len(), "Proxies loaded");
    }

    // -- Run ---------------------------------------------------------------

    let scheduler = Scheduler::new(cfg, accounts, proxies);
    scheduler.run().await
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("kilobot=info"));

    let json_logging = std::env::var("KILOBOT_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
