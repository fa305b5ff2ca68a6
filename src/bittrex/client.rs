//! Bittrex REST Client
//!
//! Thin reqwest wrapper around the endpoints the bridge consumes. Signed
//! endpoints carry `apikey` and `nonce` query parameters and an `apisign`
//! header holding the HMAC-SHA512 of the full request URI.
//!
//! Every call site goes through the RestSync queue, so this client never
//! sees concurrent requests; it still carries its own timeout because the
//! queue cannot cancel an in-flight call.

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::de::DeserializeOwned;
use sha2::Sha512;
use std::collections::HashMap;
use std::time::Duration;

use crate::bittrex::types::*;
use crate::error::BridgeError;
use crate::market::{Side, Ticker};

/// Production REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.bittrex.com/api/v1.1";

/// Per-request timeout; the queue serializes calls, so a hung request
/// would otherwise stall every client's account refresh behind it.
pub const REST_TIMEOUT: Duration = Duration::from_secs(30);

/// API key/secret pair. Empty credentials mean read-only access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Credentials {
        Credentials {
            key: key.into(),
            secret: secret.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty() && self.secret.is_empty()
    }
}

/// Bittrex REST API client.
#[derive(Debug, Clone)]
pub struct BittrexClient {
    client: Client,
    base_url: String,
}

impl BittrexClient {
    pub fn new() -> BittrexClient {
        BittrexClient::with_base_url(DEFAULT_BASE_URL)
    }

    /// Custom base URL; tests point this at a mock server.
    pub fn with_base_url(base_url: impl Into<String>) -> BittrexClient {
        let client = Client::builder()
            .timeout(REST_TIMEOUT)
            .user_agent(concat!("btrex-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build HTTP client");
        BittrexClient {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_public<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, BridgeError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).query(query).send().await?;
        Self::unwrap_envelope(response.json::<ApiResponse<T>>().await?)
    }

    async fn get_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        credentials: &Credentials,
        query: &[(&str, String)],
    ) -> Result<T, BridgeError> {
        let nonce = chrono::Utc::now().timestamp_millis().to_string();
        let mut url = reqwest::Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| BridgeError::Rest(format!("bad URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("apikey", &credentials.key)
            .append_pair("nonce", &nonce)
            .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));

        let signature = sign_uri(url.as_str(), &credentials.secret);
        let response = self
            .client
            .get(url)
            .header("apisign", signature)
            .send()
            .await?;
        Self::unwrap_envelope(response.json::<ApiResponse<T>>().await?)
    }

    fn unwrap_envelope<T>(envelope: ApiResponse<T>) -> Result<T, BridgeError> {
        if !envelope.success {
            return Err(BridgeError::Exchange(envelope.message));
        }
        envelope
            .result
            .ok_or_else(|| BridgeError::Rest("successful response with empty result".into()))
    }

    // -- public endpoints ---------------------------------------------------

    pub async fn get_currencies(&self) -> Result<Vec<CurrencyInfo>, BridgeError> {
        self.get_public("/public/getcurrencies", &[]).await
    }

    pub async fn get_markets(&self) -> Result<Vec<MarketInfo>, BridgeError> {
        self.get_public("/public/getmarkets", &[]).await
    }

    /// All market summaries, keyed by symbol and converted to tickers.
    pub async fn get_tickers(&self) -> Result<HashMap<String, Ticker>, BridgeError> {
        let summaries: Vec<MarketSummary> =
            self.get_public("/public/getmarketsummaries", &[]).await?;
        Ok(summaries
            .into_iter()
            .map(|s| (s.market_name.clone(), s.to_ticker()))
            .collect())
    }

    /// Recent trades for one market, most recent first.
    pub async fn get_market_history(&self, market: &str) -> Result<Vec<PublicTrade>, BridgeError> {
        self.get_public("/public/getmarkethistory", &[("market", market.to_string())])
            .await
    }

    /// Trades for one market within `[start, end)` epoch seconds; the
    /// history pump walks hourly windows through this.
    pub async fn get_market_history_range(
        &self,
        market: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<PublicTrade>, BridgeError> {
        self.get_public(
            "/public/getmarkethistory",
            &[
                ("market", market.to_string()),
                ("start", start.to_string()),
                ("end", end.to_string()),
            ],
        )
        .await
    }

    // -- account endpoints --------------------------------------------------

    /// The logon credential check: any successful response means the
    /// key/secret pair is valid.
    pub async fn margin_account_summary(
        &self,
        credentials: &Credentials,
    ) -> Result<MarginSummary, BridgeError> {
        self.get_signed("/account/getmarginsummary", credentials, &[])
            .await
    }

    pub async fn get_balances(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<BalanceInfo>, BridgeError> {
        self.get_signed("/account/getbalances", credentials, &[]).await
    }

    pub async fn get_margin_balances(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<MarginBalanceInfo>, BridgeError> {
        self.get_signed("/account/getmarginbalances", credentials, &[])
            .await
    }

    pub async fn get_open_orders(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<OpenOrderInfo>, BridgeError> {
        self.get_signed("/account/getopenorders", credentials, &[])
            .await
    }

    pub async fn get_order_history(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<TradeFill>, BridgeError> {
        self.get_signed("/account/getorderhistory", credentials, &[])
            .await
    }

    pub async fn get_positions(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<PositionInfo>, BridgeError> {
        self.get_signed("/account/getpositions", credentials, &[])
            .await
    }

    // -- trading endpoints --------------------------------------------------

    pub async fn submit_order(
        &self,
        credentials: &Credentials,
        params: &SubmitParams,
    ) -> Result<OrderResult, BridgeError> {
        self.submit_to("/market/submit", credentials, params).await
    }

    /// Submit routed through the margin engine (margin-enabled symbols).
    pub async fn submit_margin_order(
        &self,
        credentials: &Credentials,
        params: &SubmitParams,
    ) -> Result<OrderResult, BridgeError> {
        self.submit_to("/market/submitmargin", credentials, params)
            .await
    }

    async fn submit_to(
        &self,
        path: &str,
        credentials: &Credentials,
        params: &SubmitParams,
    ) -> Result<OrderResult, BridgeError> {
        let side = match params.side {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        };
        let mut query = vec![
            ("market", params.market.clone()),
            ("side", side.to_string()),
            ("rate", format!("{:.8}", params.price)),
            ("quantity", format!("{:.8}", params.quantity)),
        ];
        if let Some(tif) = params.time_in_force {
            query.push(("timeinforce", tif.to_string()));
        }
        self.get_signed(path, credentials, &query).await
    }

    pub async fn cancel_order(
        &self,
        credentials: &Credentials,
        order_id: u64,
    ) -> Result<(), BridgeError> {
        // Result payload of a cancel is an empty object; only success matters
        let _: serde_json::Value = self
            .get_signed(
                "/market/cancel",
                credentials,
                &[("orderid", order_id.to_string())],
            )
            .await?;
        Ok(())
    }

    /// Cancel/replace in one exchange operation. Quantity is optional (keep
    /// remaining), price is required.
    pub async fn modify_order(
        &self,
        credentials: &Credentials,
        order_id: u64,
        quantity: Option<f64>,
        price: f64,
    ) -> Result<OrderResult, BridgeError> {
        let mut query = vec![
            ("orderid", order_id.to_string()),
            ("rate", format!("{:.8}", price)),
        ];
        if let Some(quantity) = quantity {
            query.push(("quantity", format!("{:.8}", quantity)));
        }
        self.get_signed("/market/modify", credentials, &query).await
    }
}

impl Default for BittrexClient {
    fn default() -> Self {
        Self::new()
    }
}

/// HMAC-SHA512 of the full request URI, hex-encoded, for the apisign header.
fn sign_uri(uri: &str, secret: &str) -> String {
    let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(uri.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
