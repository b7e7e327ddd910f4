//! Network identity selection.
//!
//! Maps an account's position in the batch to an outbound proxy and
//! resolves the proxy's externally-visible IP for operator-facing
//! display. Resolution is best-effort: failure degrades to a "no proxy"
//! label and never aborts the account.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::HeaderMap;
use reqwest::{Client, Proxy};
use serde::Deserialize;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Proxy pool
// ---------------------------------------------------------------------------

/// Positional proxy assignments, matched to accounts by batch index.
#[derive(Debug, Clone, Default)]
pub struct ProxyPool {
    proxies: Vec<String>,
}

impl ProxyPool {
    pub fn new(proxies: Vec<String>) -> Self {
        Self { proxies }
    }

    /// Load proxy URIs from a newline-delimited file. A missing file is
    /// tolerated: all accounts fall back to a direct connection.
    pub fn load(path: &str) -> Self {
        if !Path::new(path).exists() {
            warn!(path = %path, "Proxy file not found, running without proxies");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => Self::new(
                contents
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(String::from)
                    .collect(),
            ),
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to read proxy file, running without proxies");
                Self::default()
            }
        }
    }

    /// The proxy assigned to the account at this batch index, if any.
    pub fn assign(&self, index: usize) -> Option<&str> {
        self.proxies.get(index).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }
}

// ---------------------------------------------------------------------------
// Network identity
// ---------------------------------------------------------------------------

/// The outbound proxy (if any) and its resolved public IP for one
/// account's requests.
#[derive(Debug, Clone, Default)]
pub struct NetworkIdentity {
    pub proxy: Option<String>,
    pub public_ip: Option<String>,
}

impl NetworkIdentity {
    /// Operator-facing label for the batch banner.
    pub fn label(&self) -> String {
        match (&self.proxy, &self.public_ip) {
            (None, _) => "no proxy".to_string(),
            (Some(_), Some(ip)) => ip.clone(),
            (Some(_), None) => "unknown".to_string(),
        }
    }
}

impl fmt::Display for NetworkIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// ---------------------------------------------------------------------------
// Client construction & IP resolution
// ---------------------------------------------------------------------------

/// Build the per-account HTTP client.
///
/// With a proxy: routes through it with a fixed request timeout. Without:
/// a plain client carrying only the common headers, transport defaults
/// untouched.
pub fn build_client(
    headers: HeaderMap,
    proxy: Option<&str>,
    timeout: Duration,
) -> Result<Client> {
    let builder = Client::builder().default_headers(headers);

    let builder = match proxy {
        Some(uri) => builder
            .proxy(Proxy::all(uri).with_context(|| format!("Invalid proxy URI: {uri}"))?)
            .timeout(timeout),
        None => builder,
    };

    builder.build().context("Failed to build HTTP client")
}

#[derive(Debug, Deserialize)]
struct IpEchoResponse {
    ip: String,
}

/// Resolve the externally-visible IP through the given client.
///
/// Returns `None` on any failure; the caller proceeds with an "unknown"
/// label.
pub async fn resolve_public_ip(client: &Client, echo_url: &str, timeout: Duration) -> Option<String> {
    let result = async {
        let resp = client.get(echo_url).timeout(timeout).send().await?;
        let resp = resp.error_for_status()?;
        let body: IpEchoResponse = resp.json().await?;
        Ok::<_, reqwest::Error>(body.ip)
    }
    .await;

    match result {
        Ok(ip) => {
            debug!(ip = %ip, "Resolved public IP");
            Some(ip)
        }
        Err(e) => {
            warn!(error = %e, "Failed to resolve public IP");
            None
        }
    }
}
