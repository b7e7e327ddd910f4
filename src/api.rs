//! Remote action client for the mini-game API.
//!
//! Five typed operations over the service's JSON envelope
//! (`{status, data, msg}`). Every call distinguishes transport failure,
//! non-2xx responses, and application-level rejection, and normalizes
//! all three into [`ActionOutcome`] — no raw transport error escapes
//! this boundary.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config::{ApiConfig, TradingConfig};
use crate::types::{AccountStatus, ActionOutcome, Direction};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The fixed set of remote operations the engine performs.
///
/// Callers enforce the preconditions: `convert_stamina` only when
/// stamina > 0, `claim_offline_yield` only when the yield counter is
/// positive.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GameApi: Send + Sync {
    async fn fetch_info(&self, account: &str, name: &str) -> ActionOutcome<AccountStatus>;

    /// Check the bound referral code; if none, submit the configured one.
    /// Idempotent: an already-bound account is a successful no-op.
    async fn bind_referral(&self, account: &str) -> ActionOutcome<()>;

    /// Convert stamina into coin, submitting the amount as both fields.
    async fn convert_stamina(&self, account: &str, stamina: f64) -> ActionOutcome<()>;

    async fn open_position(
        &self,
        account: &str,
        direction: Direction,
        margin: f64,
    ) -> ActionOutcome<()>;

    async fn claim_offline_yield(&self, account: &str) -> ActionOutcome<()>;
}

// ---------------------------------------------------------------------------
// Wire envelope
// ---------------------------------------------------------------------------

/// The service's uniform response shape: a boolean status flag plus
/// either a `data` payload or a `msg` error string.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    msg: Option<String>,
}

impl<T> Envelope<T> {
    /// Collapse the envelope into an outcome carrying the optional data.
    fn into_outcome(self) -> ActionOutcome<Option<T>> {
        if self.status {
            ActionOutcome::Success(self.data)
        } else {
            ActionOutcome::Failure(
                self.msg
                    .unwrap_or_else(|| "server rejected request without message".to_string()),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Fixed-shape order parameters, identical for every position.
#[derive(Debug, Clone, Copy)]
pub struct OrderParams {
    pub product_id: u32,
    pub leverage: u32,
    pub settle_delay_secs: u64,
}

impl From<&TradingConfig> for OrderParams {
    fn from(cfg: &TradingConfig) -> Self {
        Self {
            product_id: cfg.product_id,
            leverage: cfg.leverage,
            settle_delay_secs: cfg.settle_delay_secs,
        }
    }
}

/// HTTP implementation of [`GameApi`] over a per-account client.
///
/// The `http` client carries the per-account network identity (common
/// headers plus optional proxy transport); this type only knows the
/// endpoints and payload shapes.
pub struct KiloClient {
    http: Client,
    base_url: String,
    referral_code: String,
    order: OrderParams,
    /// Pause between the referral check and the bind submission.
    bind_pause: Duration,
}

impl KiloClient {
    pub fn new(
        http: Client,
        api: &ApiConfig,
        order: OrderParams,
        bind_pause: Duration,
    ) -> Self {
        Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            referral_code: api.referral_code.clone(),
            order,
            bind_pause,
        }
    }

    // -- Internal helpers ------------------------------------------------

    async fn get<T: DeserializeOwned>(&self, url: String) -> ActionOutcome<Option<T>> {
        debug!(url = %url, "GET");
        let resp = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(e) => return ActionOutcome::Failure(e.to_string()),
        };
        Self::read_envelope(resp).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        url: String,
        body: serde_json::Value,
    ) -> ActionOutcome<Option<T>> {
        debug!(url = %url, "POST");
        let resp = match self.http.post(&url).json(&body).send().await {
            Ok(r) => r,
            Err(e) => return ActionOutcome::Failure(e.to_string()),
        };
        Self::read_envelope(resp).await
    }

    async fn read_envelope<T: DeserializeOwned>(
        resp: reqwest::Response,
    ) -> ActionOutcome<Option<T>> {
        let status = resp.status();
        if !status.is_success() {
            return ActionOutcome::Failure(format!("HTTP {status}"));
        }
        match resp.json::<Envelope<T>>().await {
            Ok(envelope) => envelope.into_outcome(),
            Err(e) => ActionOutcome::Failure(format!("invalid response body: {e}")),
        }
    }

    fn order_payload(&self, account: &str, direction: Direction, margin: f64) -> serde_json::Value {
        json!({
            "account": account,
            "productId": self.order.product_id,
            "margin": margin,
            "leverage": self.order.leverage,
            "positionType": direction.as_str(),
            "settleDelay": self.order.settle_delay_secs,
        })
    }
}

#[async_trait]
impl GameApi for KiloClient {
    async fn fetch_info(&self, account: &str, name: &str) -> ActionOutcome<AccountStatus> {
        let url = format!(
            "{}/tg/user/info?account={}&name={}&from=kiloextrade",
            self.base_url,
            urlencoding::encode(account),
            urlencoding::encode(name),
        );
        match self.get::<AccountStatus>(url).await {
            ActionOutcome::Success(Some(status)) => ActionOutcome::Success(status),
            ActionOutcome::Success(None) => {
                ActionOutcome::Failure("user info response carried no data".to_string())
            }
            ActionOutcome::Failure(msg) => ActionOutcome::Failure(msg),
        }
    }

    async fn bind_referral(&self, account: &str) -> ActionOutcome<()> {
        let check_url = format!(
            "{}/tg/referral/code?account={}",
            self.base_url,
            urlencoding::encode(account),
        );

        // An existing code means nothing to submit.
        let codes = match self.get::<Vec<serde_json::Value>>(check_url).await {
            ActionOutcome::Success(codes) => codes.unwrap_or_default(),
            ActionOutcome::Failure(msg) => return ActionOutcome::Failure(msg),
        };
        if !codes.is_empty() {
            debug!(account = %account, "Referral already bound");
            return ActionOutcome::Success(());
        }

        tokio::time::sleep(self.bind_pause).await;

        let bind_url = format!("{}/tg/referral/bind", self.base_url);
        let body = json!({ "account": account, "code": self.referral_code });
        self.post::<serde_json::Value>(bind_url, body).await.map(|_| ())
    }

    async fn convert_stamina(&self, account: &str, stamina: f64) -> ActionOutcome<()> {
        let url = format!("{}/tg/mining/update", self.base_url);
        // Stamina spent and coin gained are the same figure by contract.
        let body = json!({ "account": account, "stamina": stamina, "coin": stamina });
        self.post::<serde_json::Value>(url, body).await.map(|_| ())
    }

    async fn open_position(
        &self,
        account: &str,
        direction: Direction,
        margin: f64,
    ) -> ActionOutcome<()> {
        let url = format!("{}/tg/order/open", self.base_url);
        let body = self.order_payload(account, direction, margin);
        self.post::<serde_json::Value>(url, body).await.map(|_| ())
    }

    async fn claim_offline_yield(&self, account: &str) -> ActionOutcome<()> {
        let url = format!("{}/tg/mining/claim", self.base_url);
        let body = json!({ "account": account });
        self.post::<serde_json::Value>(url, body).await.map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
