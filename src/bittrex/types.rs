//! Bittrex API Type Definitions
//!
//! Serde types for the REST envelope and payloads, and for the market data
//! WebSocket stream. REST field names follow the exchange's PascalCase;
//! stream messages are a compact lowercase-tagged JSON protocol.

use serde::{Deserialize, Serialize};

use crate::market::{Side, Ticker};

/// Standard REST envelope: every endpoint wraps its payload in
/// `{success, message, result}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub result: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CurrencyInfo {
    pub currency: String,
    pub currency_long: String,
    pub tx_fee: f64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MarketInfo {
    pub market_name: String,
    pub is_active: bool,
    pub is_margin_enabled: bool,
    pub min_trade_size: f64,
}

/// 24-hour rolling summary for one market; the source of ticker state.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MarketSummary {
    pub market_name: String,
    pub bid: f64,
    pub ask: f64,
    pub last: f64,
    pub low: f64,
    pub high: f64,
    pub base_volume: f64,
}

impl MarketSummary {
    pub fn to_ticker(&self) -> Ticker {
        Ticker {
            bid: self.bid,
            ask: self.ask,
            last: self.last,
            low24h: self.low,
            high24h: self.high,
            base_volume: self.base_volume,
        }
    }
}

/// One public trade from the market history endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublicTrade {
    pub id: u64,
    /// Epoch seconds with fractional part
    pub time_stamp: f64,
    pub order_type: TradeSide,
    pub price: f64,
    pub quantity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl From<TradeSide> for Side {
    fn from(side: TradeSide) -> Side {
        match side {
            TradeSide::Buy => Side::Buy,
            TradeSide::Sell => Side::Sell,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BalanceInfo {
    pub currency: String,
    pub available: f64,
    pub on_orders: f64,
    pub btc_value: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MarginBalanceInfo {
    pub currency: String,
    pub balance: f64,
}

/// Margin account summary; fetched at logon as the credential check.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MarginSummary {
    pub account_value: f64,
    pub total_collateral: f64,
    pub borrowed_value: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OpenOrderInfo {
    pub id: u64,
    pub market: String,
    pub side: TradeSide,
    pub price: f64,
    pub quantity: f64,
    pub quantity_remaining: f64,
    /// Epoch seconds
    pub opened_at: f64,
}

/// One historical fill from the order history endpoint, keyed by uuid.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TradeFill {
    pub uuid: String,
    pub order_id: u64,
    pub market: String,
    pub side: TradeSide,
    pub price: f64,
    pub quantity: f64,
    /// Epoch seconds
    pub executed_at: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PositionInfo {
    pub market: String,
    pub quantity: f64,
    pub base_price: f64,
}

/// One fill attached to a submit/modify result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderResultFill {
    pub uuid: String,
    pub price: f64,
    pub quantity: f64,
}

/// Result of submitting or modifying an order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderResult {
    pub id: u64,
    #[serde(default)]
    pub trades: Vec<OrderResultFill>,
    pub amount_unfilled: f64,
}

/// Parameters for the submit endpoints. `quantity` and `price` are in
/// exchange units; wire-quantity scaling happens before this layer.
#[derive(Debug, Clone)]
pub struct SubmitParams {
    pub market: String,
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
    /// `FILL_OR_KILL` / `IMMEDIATE_OR_CANCEL`, or None for plain GTC
    pub time_in_force: Option<&'static str>,
}

// ---------------------------------------------------------------------------
// WebSocket stream
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamSide {
    Buy,
    Sell,
}

impl From<StreamSide> for Side {
    fn from(side: StreamSide) -> Side {
        match side {
            StreamSide::Buy => Side::Buy,
            StreamSide::Sell => Side::Sell,
        }
    }
}

/// Messages observed on the upstream market data stream.
///
/// Snapshots carry the upstream-chosen `subid` that keys every later update
/// and trade for that symbol; the symbol itself only travels in snapshots.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamMessage {
    Snapshot {
        subid: u64,
        symbol: String,
        bids: Vec<(f64, f64)>,
        asks: Vec<(f64, f64)>,
    },
    Update {
        subid: u64,
        side: StreamSide,
        price: f64,
        qty: f64,
    },
    Trade {
        subid: u64,
        /// Epoch seconds with fractional part
        ts: f64,
        side: StreamSide,
        price: f64,
        qty: f64,
    },
    Error {
        text: String,
    },
}

/// Outgoing stream commands.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum StreamCommand {
    Subscribe { symbol: String },
}
