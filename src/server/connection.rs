//! Connection Registry
//!
//! Per-client state for the live bridge: the writer handle, credentials,
//! subscription maps and cached account tables, plus the process-wide
//! registry that fan-out paths iterate. A connection is registered when the
//! TCP peer arrives and removed when its socket closes or a write fails.

use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::{mpsc, watch, RwLock};

use crate::bittrex::client::{BittrexClient, Credentials};
use crate::bittrex::types::{BalanceInfo, OpenOrderInfo, PositionInfo, TradeFill};
use crate::dtc::codec::frame_message;
use crate::dtc::messages::{self, WireMessage};
use crate::market::{datetime_to_f64, LatestTrade, Side};

/// Per-connection writer queue depth; overflow counts as dropped messages
pub const WRITER_QUEUE_DEPTH: usize = 256;

/// Paired bidirectional map between symbols and client-chosen ids.
///
/// The two directions are kept exact inverses: every mutation goes through
/// [`subscribe`](SubscriptionMap::subscribe) /
/// [`unsubscribe_id`](SubscriptionMap::unsubscribe_id).
#[derive(Debug, Default, Clone)]
pub struct SubscriptionMap {
    by_symbol: HashMap<String, u32>,
    by_id: HashMap<u32, String>,
}

impl SubscriptionMap {
    /// Records `symbol ↔ id`. Fails when the id is already bound to a
    /// different symbol; re-subscribing a symbol under a new id rebinds it.
    pub fn subscribe(&mut self, symbol: &str, id: u32) -> Result<(), String> {
        if let Some(existing) = self.by_id.get(&id) {
            if existing != symbol {
                return Err(format!("Already subscribed to {} with id {}", existing, id));
            }
        }
        if let Some(old_id) = self.by_symbol.insert(symbol.to_string(), id) {
            if old_id != id {
                self.by_id.remove(&old_id);
            }
        }
        self.by_id.insert(id, symbol.to_string());
        Ok(())
    }

    /// Removes the pairing for `id`, if present.
    pub fn unsubscribe_id(&mut self, id: u32) {
        if let Some(symbol) = self.by_id.remove(&id) {
            self.by_symbol.remove(&symbol);
        }
    }

    pub fn id_for(&self, symbol: &str) -> Option<u32> {
        self.by_symbol.get(symbol).copied()
    }

    pub fn symbol_for(&self, id: u32) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Both directions agree exactly.
    pub fn is_consistent(&self) -> bool {
        self.by_symbol.len() == self.by_id.len()
            && self
                .by_symbol
                .iter()
                .all(|(symbol, id)| self.by_id.get(id).map(String::as_str) == Some(symbol.as_str()))
    }
}

/// Handle for writing framed messages to one client.
///
/// Sends never block: a full queue increments the dropped-message counter
/// (reported in heartbeats) and a closed writer swallows the write, since
/// the read side owns connection teardown. Closure travels on a watch
/// channel so the writer task and the per-connection timers observe it
/// without racing.
#[derive(Debug, Clone)]
pub struct ClientWriter {
    tx: mpsc::Sender<Bytes>,
    dropped: Arc<AtomicU32>,
    close: Arc<watch::Sender<bool>>,
}

impl ClientWriter {
    pub fn new(tx: mpsc::Sender<Bytes>) -> ClientWriter {
        let (close, _) = watch::channel(false);
        ClientWriter {
            tx,
            dropped: Arc::new(AtomicU32::new(0)),
            close: Arc::new(close),
        }
    }

    pub fn send<M: WireMessage>(&self, msg: &M) {
        self.send_raw(frame_message(msg));
    }

    pub fn send_raw(&self, bytes: Bytes) {
        if self.is_closed() {
            return;
        }
        match self.tx.try_send(bytes) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Marks the connection closed and wakes the writer task.
    pub fn close(&self) {
        let _ = self.close.send(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.close.borrow() || self.tx.is_closed()
    }

    /// A receiver that flips to `true` once the connection closes.
    pub fn close_signal(&self) -> watch::Receiver<bool> {
        self.close.subscribe()
    }
}

/// One live client connection.
///
/// Credentials are written once at logon and immutable afterwards. The
/// cached account tables are replaced wholesale by the periodic refresh.
#[derive(Debug)]
pub struct Connection {
    pub addr: String,
    pub writer: ClientWriter,
    credentials: OnceLock<Credentials>,
    send_secdefs: AtomicBool,
    trading_enabled: AtomicBool,
    pub subs_data: Mutex<SubscriptionMap>,
    pub subs_depth: Mutex<SubscriptionMap>,
    pub balances: Mutex<HashMap<String, BalanceInfo>>,
    pub margin_balances: Mutex<HashMap<String, f64>>,
    /// Original submit requests, keyed by the exchange's numeric order id
    pub client_orders: Mutex<HashMap<u64, messages::SubmitNewSingleOrder>>,
    /// Open orders as last reported by the exchange
    pub orders: Mutex<HashMap<u64, OpenOrderInfo>>,
    /// Historical fills keyed by trade uuid
    pub trades: Mutex<HashMap<String, TradeFill>>,
    pub positions: Mutex<HashMap<String, PositionInfo>>,
}

impl Connection {
    pub fn new(addr: impl Into<String>, writer: ClientWriter) -> Connection {
        Connection {
            addr: addr.into(),
            writer,
            credentials: OnceLock::new(),
            send_secdefs: AtomicBool::new(false),
            trading_enabled: AtomicBool::new(false),
            subs_data: Mutex::new(SubscriptionMap::default()),
            subs_depth: Mutex::new(SubscriptionMap::default()),
            balances: Mutex::new(HashMap::new()),
            margin_balances: Mutex::new(HashMap::new()),
            client_orders: Mutex::new(HashMap::new()),
            orders: Mutex::new(HashMap::new()),
            trades: Mutex::new(HashMap::new()),
            positions: Mutex::new(HashMap::new()),
        }
    }

    /// Stores logon credentials; only the first call wins.
    pub fn set_credentials(&self, credentials: Credentials) {
        let _ = self.credentials.set(credentials);
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.get()
    }

    pub fn set_send_secdefs(&self, value: bool) {
        self.send_secdefs.store(value, Ordering::Relaxed);
    }

    pub fn send_secdefs(&self) -> bool {
        self.send_secdefs.load(Ordering::Relaxed)
    }

    pub fn set_trading_enabled(&self, value: bool) {
        self.trading_enabled.store(value, Ordering::Relaxed);
    }

    pub fn trading_enabled(&self) -> bool {
        self.trading_enabled.load(Ordering::Relaxed)
    }

    /// Market-data symbol id for a symbol, if subscribed.
    pub fn data_symbol_id(&self, symbol: &str) -> Option<u32> {
        self.subs_data.lock().expect("subscription lock").id_for(symbol)
    }

    /// Depth symbol id for a symbol, if depth-subscribed.
    pub fn depth_symbol_id(&self, symbol: &str) -> Option<u32> {
        self.subs_depth.lock().expect("subscription lock").id_for(symbol)
    }
}

/// Process-wide table of live connections, keyed by remote address.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    inner: RwLock<HashMap<String, Arc<Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> ConnectionRegistry {
        ConnectionRegistry::default()
    }

    pub async fn register(&self, conn: Arc<Connection>) {
        self.inner.write().await.insert(conn.addr.clone(), conn);
    }

    pub async fn remove(&self, addr: &str) {
        self.inner.write().await.remove(addr);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Snapshot of all live connections. Iteration order is a hash map's:
    /// fan-out order across clients is unspecified.
    pub async fn connections(&self) -> Vec<Arc<Connection>> {
        self.inner.read().await.values().cloned().collect()
    }

    /// Fans a trade print out to every market-data subscriber of `symbol`.
    pub async fn broadcast_trade(&self, symbol: &str, trade: &LatestTrade) {
        let at_bid_or_ask = match trade.side {
            Side::Buy => messages::AtBidOrAsk::AtAsk,
            Side::Sell => messages::AtBidOrAsk::AtBid,
        };
        for conn in self.connections().await {
            if let Some(symbol_id) = conn.data_symbol_id(symbol) {
                conn.writer.send(&messages::MarketDataUpdateTrade {
                    symbol_id,
                    at_bid_or_ask: at_bid_or_ask as i32,
                    price: trade.price,
                    volume: trade.quantity,
                    date_time: datetime_to_f64(trade.timestamp),
                });
            }
        }
    }

    /// Fans one book level change out to every depth subscriber of `symbol`.
    pub async fn broadcast_depth_update(
        &self,
        symbol: &str,
        side: Side,
        price: f64,
        quantity: f64,
        timestamp: chrono::DateTime<Utc>,
    ) {
        let update_type = if quantity > 0.0 {
            messages::MarketDepthUpdateType::InsertOrUpdate
        } else {
            messages::MarketDepthUpdateType::Delete
        };
        let side = match side {
            Side::Buy => messages::BuySell::Buy,
            Side::Sell => messages::BuySell::Sell,
        };
        for conn in self.connections().await {
            if let Some(symbol_id) = conn.depth_symbol_id(symbol) {
                conn.writer.send(&messages::MarketDepthUpdateLevel {
                    symbol_id,
                    side: side as i32,
                    price,
                    quantity,
                    update_type: update_type as i32,
                    date_time: datetime_to_f64(timestamp),
                });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Periodic account refresh
// ---------------------------------------------------------------------------

/// Replaces the connection's open-order cache from the exchange.
pub async fn update_orders(client: &BittrexClient, conn: &Connection) {
    let Some(credentials) = conn.credentials().filter(|c| !c.is_empty()) else {
        return;
    };
    match client.get_open_orders(credentials).await {
        Ok(open_orders) => {
            let mut table = conn.orders.lock().expect("orders lock");
            table.clear();
            table.extend(open_orders.into_iter().map(|o| (o.id, o)));
        }
        Err(e) => tracing::error!("update_orders for {}: {}", conn.addr, e),
    }
}

/// Replaces the connection's fill cache from the exchange.
///
/// With the `trade-fill-updates` feature, newly observed fills emit an
/// order update; without it the diff only refreshes the cache.
pub async fn update_trades(client: &BittrexClient, conn: &Connection) {
    let Some(credentials) = conn.credentials().filter(|c| !c.is_empty()) else {
        return;
    };
    match client.get_order_history(credentials).await {
        Ok(fills) => {
            let fresh: Vec<TradeFill> = {
                let table = conn.trades.lock().expect("trades lock");
                fills
                    .iter()
                    .filter(|f| !table.contains_key(&f.uuid))
                    .cloned()
                    .collect()
            };
            #[cfg(feature = "trade-fill-updates")]
            for fill in &fresh {
                emit_fill_update(conn, fill);
            }
            #[cfg(not(feature = "trade-fill-updates"))]
            let _ = &fresh;

            let mut table = conn.trades.lock().expect("trades lock");
            table.clear();
            table.extend(fills.into_iter().map(|f| (f.uuid.clone(), f)));
        }
        Err(e) => tracing::error!("update_trades for {}: {}", conn.addr, e),
    }
}

#[cfg(feature = "trade-fill-updates")]
fn emit_fill_update(conn: &Connection, fill: &TradeFill) {
    use crate::market::QTY_SCALE;
    conn.writer.send(&messages::OrderUpdate {
        total_num_messages: 1,
        message_number: 1,
        symbol: fill.market.clone(),
        exchange: super::EXCHANGE.to_string(),
        server_order_id: fill.order_id.to_string(),
        order_status: messages::OrderStatus::Filled as i32,
        order_update_reason: messages::OrderUpdateReason::OrderFilled as i32,
        buy_sell: match fill.side {
            crate::bittrex::types::TradeSide::Buy => messages::BuySell::Buy as i32,
            crate::bittrex::types::TradeSide::Sell => messages::BuySell::Sell as i32,
        },
        last_fill_price: fill.price,
        last_fill_quantity: fill.quantity * QTY_SCALE,
        last_fill_date_time: fill.executed_at,
        filled_quantity: fill.quantity * QTY_SCALE,
        unique_fill_execution_id: fill.uuid.clone(),
        ..Default::default()
    });
}

/// Replaces the connection's balance caches from the exchange.
pub async fn update_balances(client: &BittrexClient, conn: &Connection) {
    let Some(credentials) = conn.credentials().filter(|c| !c.is_empty()) else {
        return;
    };
    match client.get_balances(credentials).await {
        Ok(balances) => {
            let mut table = conn.balances.lock().expect("balances lock");
            table.clear();
            table.extend(balances.into_iter().map(|b| (b.currency.clone(), b)));
        }
        Err(e) => tracing::error!("update_balances for {}: {}", conn.addr, e),
    }
    match client.get_margin_balances(credentials).await {
        Ok(balances) => {
            let mut table = conn.margin_balances.lock().expect("margin balances lock");
            table.clear();
            table.extend(balances.into_iter().map(|b| (b.currency, b.balance)));
        }
        Err(e) => tracing::error!("update_margin_balances for {}: {}", conn.addr, e),
    }
}

/// Replaces the connection's margin position cache from the exchange.
pub async fn update_positions(client: &BittrexClient, conn: &Connection) {
    let Some(credentials) = conn.credentials().filter(|c| !c.is_empty()) else {
        return;
    };
    match client.get_positions(credentials).await {
        Ok(positions) => {
            let mut table = conn.positions.lock().expect("positions lock");
            table.clear();
            table.extend(positions.into_iter().map(|p| (p.market.clone(), p)));
        }
        Err(e) => tracing::error!("update_positions for {}: {}", conn.addr, e),
    }
}
