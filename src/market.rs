//! Market State Store
//!
//! Process-wide tables shared by every component: currencies, tickers, order
//! books, latest trades and the upstream subscription-id map. One instance is
//! built at startup and passed around as `Arc<MarketState>`; tests construct
//! their own.
//!
//! Book sides are ordered maps keyed by integer satoshi price so best-of-book
//! scans are tree lookups. Floats cross into satoshis at this boundary only.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::error::BridgeError;

/// Book keys and persisted prices are integer multiples of 1e-8
pub const PRICE_SCALE: f64 = 1e8;
/// DTC wire quantities are integer multiples of 1e-4 of the base unit
pub const QTY_SCALE: f64 = 1e4;
/// Balances are reported in mBTC: cash values scale by 1e3
pub const BALANCE_SCALE: f64 = 1e3;

pub fn price_to_sats(price: f64) -> u64 {
    (price * PRICE_SCALE).round() as u64
}

/// Wall-clock time as the wire's float seconds since epoch.
pub fn datetime_to_f64(dt: DateTime<Utc>) -> f64 {
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) * 1e-9
}

/// Float seconds since epoch back to wall-clock time.
pub fn f64_to_datetime(secs: f64) -> DateTime<Utc> {
    chrono::TimeZone::timestamp_nanos(&Utc, (secs * 1e9).round() as i64)
}

pub fn sats_to_price(sats: u64) -> f64 {
    sats as f64 / PRICE_SCALE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

/// Exchange currency metadata, static after startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Currency {
    pub code: String,
    pub name: String,
    pub tx_fee: f64,
    pub is_active: bool,
}

/// Latest observed ticker fields for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Ticker {
    pub bid: f64,
    pub ask: f64,
    pub last: f64,
    pub low24h: f64,
    pub high24h: f64,
    pub base_volume: f64,
}

/// Most recent trade print seen on the upstream WebSocket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatestTrade {
    pub timestamp: DateTime<Utc>,
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
}

/// One depth mutation from upstream. `side` is `None` when the upstream
/// message failed to carry one; the batch is rejected in that case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthEntry {
    pub side: Option<Side>,
    pub price: f64,
    pub quantity: f64,
}

/// One side of a book: satoshi price → quantity, plus last mutation time.
#[derive(Debug, Clone, Default)]
pub struct BookSide {
    pub levels: BTreeMap<u64, f64>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct Book {
    pub bids: BookSide,
    pub asks: BookSide,
}

impl Book {
    /// Best bid is the maximum bid key.
    pub fn best_bid(&self) -> Option<(f64, f64)> {
        self.bids
            .levels
            .iter()
            .next_back()
            .map(|(&sats, &qty)| (sats_to_price(sats), qty))
    }

    /// Best ask is the minimum ask key.
    pub fn best_ask(&self) -> Option<(f64, f64)> {
        self.asks
            .levels
            .iter()
            .next()
            .map(|(&sats, &qty)| (sats_to_price(sats), qty))
    }

    /// Most recent mutation time across both sides.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        match (self.bids.updated_at, self.asks.updated_at) {
            (Some(b), Some(a)) => Some(b.max(a)),
            (b, a) => b.or(a),
        }
    }
}

#[derive(Debug, Default)]
pub struct MarketState {
    currencies: RwLock<HashMap<String, Currency>>,
    tickers: RwLock<HashMap<String, (DateTime<Utc>, Ticker)>>,
    books: RwLock<HashMap<String, Book>>,
    latest_trades: RwLock<HashMap<String, LatestTrade>>,
    subids: RwLock<HashMap<u64, String>>,
}

impl MarketState {
    pub fn new() -> MarketState {
        MarketState::default()
    }

    pub async fn set_currencies(&self, currencies: Vec<Currency>) {
        let mut table = self.currencies.write().await;
        table.clear();
        for currency in currencies {
            table.insert(currency.code.clone(), currency);
        }
    }

    pub async fn currency(&self, code: &str) -> Option<Currency> {
        self.currencies.read().await.get(code).cloned()
    }

    pub async fn currency_count(&self) -> usize {
        self.currencies.read().await.len()
    }

    /// Stores a ticker observation. Timestamps are monotonic non-decreasing
    /// per symbol: an older observation never rolls the stored time back.
    pub async fn store_ticker(&self, symbol: &str, observed_at: DateTime<Utc>, ticker: Ticker) {
        let mut table = self.tickers.write().await;
        match table.get_mut(symbol) {
            Some((ts, stored)) => {
                *ts = (*ts).max(observed_at);
                *stored = ticker;
            }
            None => {
                table.insert(symbol.to_string(), (observed_at, ticker));
            }
        }
    }

    pub async fn ticker(&self, symbol: &str) -> Option<(DateTime<Utc>, Ticker)> {
        self.tickers.read().await.get(symbol).copied()
    }

    pub async fn has_symbol(&self, symbol: &str) -> bool {
        self.tickers.read().await.contains_key(symbol)
    }

    pub async fn ticker_symbols(&self) -> Vec<String> {
        self.tickers.read().await.keys().cloned().collect()
    }

    /// Replaces a symbol's book from an upstream snapshot.
    pub async fn install_book(
        &self,
        symbol: &str,
        bids: &[(f64, f64)],
        asks: &[(f64, f64)],
        now: DateTime<Utc>,
    ) {
        let mut books = self.books.write().await;
        let book = books.entry(symbol.to_string()).or_default();
        book.bids.levels = bids
            .iter()
            .filter(|(_, qty)| *qty > 0.0)
            .map(|&(price, qty)| (price_to_sats(price), qty))
            .collect();
        book.asks.levels = asks
            .iter()
            .filter(|(_, qty)| *qty > 0.0)
            .map(|&(price, qty)| (price_to_sats(price), qty))
            .collect();
        book.bids.updated_at = Some(now);
        book.asks.updated_at = Some(now);
    }

    /// Applies a batch of depth mutations atomically for one symbol.
    ///
    /// `quantity > 0` inserts or updates the level, `quantity == 0` deletes
    /// it. A missing side anywhere in the batch rejects the whole batch
    /// before any level is touched.
    pub async fn apply_depth(
        &self,
        symbol: &str,
        entries: &[DepthEntry],
        now: DateTime<Utc>,
    ) -> Result<(), BridgeError> {
        if entries.iter().any(|e| e.side.is_none()) {
            return Err(BridgeError::Protocol(format!(
                "depth update for {} with unset side",
                symbol
            )));
        }
        let mut books = self.books.write().await;
        let book = books.entry(symbol.to_string()).or_default();
        for entry in entries {
            let side = match entry.side {
                Some(Side::Buy) => &mut book.bids,
                Some(Side::Sell) => &mut book.asks,
                None => unreachable!("validated above"),
            };
            let key = price_to_sats(entry.price);
            if entry.quantity > 0.0 {
                side.levels.insert(key, entry.quantity);
            } else {
                side.levels.remove(&key);
            }
            side.updated_at = Some(now);
        }
        Ok(())
    }

    pub async fn book(&self, symbol: &str) -> Option<Book> {
        self.books.read().await.get(symbol).cloned()
    }

    pub async fn store_trade(&self, symbol: &str, trade: LatestTrade) {
        self.latest_trades
            .write()
            .await
            .insert(symbol.to_string(), trade);
    }

    pub async fn latest_trade(&self, symbol: &str) -> Option<LatestTrade> {
        self.latest_trades.read().await.get(symbol).copied()
    }

    /// Records the upstream stream id for a symbol (from a snapshot).
    pub async fn record_subid(&self, subid: u64, symbol: &str) {
        self.subids.write().await.insert(subid, symbol.to_string());
    }

    pub async fn symbol_for_subid(&self, subid: u64) -> Option<String> {
        self.subids.read().await.get(&subid).cloned()
    }

    /// Drops all stream-id mappings; subids change on every reconnect.
    pub async fn clear_subids(&self) {
        self.subids.write().await.clear();
    }
}
