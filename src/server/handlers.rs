//! Request Handlers
//!
//! One method per inbound request kind: logon and the encoding handshake,
//! security definitions, market data and depth subscriptions, account
//! queries. Trading lives in the orders module. Every validation failure
//! answers with the matching typed reject; nothing here closes connections.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::interval;

use crate::bittrex::client::{BittrexClient, Credentials};
use crate::dtc::codec::{EncodingRequest, EncodingResponse, CURRENT_VERSION};
use crate::dtc::messages::*;
use crate::market::{datetime_to_f64, BALANCE_SCALE, QTY_SCALE};
use crate::rest_sync::RestSync;
use crate::server::connection::{self, Connection};
use crate::server::{Session, EXCHANGE, SERVER_NAME, SYMBOL_DELIMITER};

/// Logon `integer_1` bit requesting the unsolicited secdef stream
const FLAG_SEND_SECDEFS: i32 = 1 << 7;

/// The populated security definition every known symbol gets: forex-typed,
/// 8 decimal places, satoshi tick.
pub fn security_definition(symbol: &str, request_id: i32) -> SecurityDefinitionResponse {
    SecurityDefinitionResponse {
        request_id,
        symbol: symbol.to_string(),
        exchange: EXCHANGE.to_string(),
        security_type: SecurityType::Forex as i32,
        description: symbol.to_string(),
        min_price_increment: 1e-8,
        price_display_format: PriceDisplayFormat::Decimal8 as i32,
        currency_value_per_increment: 1e-8,
        is_final_message: false,
        has_market_depth_data: true,
    }
}

impl Session {
    // -- session establishment ---------------------------------------------

    pub(crate) fn handle_encoding(&self, req: EncodingRequest) {
        tracing::debug!(
            "encoding request from {}: version {}, encoding {}",
            self.conn.addr,
            req.protocol_version,
            req.encoding
        );
        // The answer never varies: version 7, protobuf
        self.conn
            .writer
            .send_raw(EncodingResponse::protobuf().to_frame());
    }

    pub(crate) async fn handle_logon(&self, req: LogonRequest) {
        let credentials = Credentials::new(req.username, req.password);
        let send_secdefs = req.integer_1 & FLAG_SEND_SECDEFS != 0;
        self.conn.set_send_secdefs(send_secdefs);

        let (trading, result_text) = if credentials.is_empty() {
            (false, "Trading disabled: No credentials".to_string())
        } else if req.integer_2 != 0 {
            tracing::warn!(
                "{} sent credentials with integer_2 = {}",
                self.conn.addr,
                req.integer_2
            );
            (
                false,
                "Trading disabled: Invalid Bittrex credentials".to_string(),
            )
        } else {
            self.check_credentials(&credentials).await
        };

        self.conn.set_credentials(credentials);
        self.conn.set_trading_enabled(trading);
        tracing::info!("logon from {}: {}", self.conn.addr, result_text);

        self.conn.writer.send(&LogonResponse {
            protocol_version: CURRENT_VERSION,
            result: LogonStatus::Success as i32,
            result_text,
            reconnect_address: String::new(),
            server_name: SERVER_NAME.to_string(),
            market_depth_updates_best_bid_and_ask: true,
            trading_is_supported: trading,
            oco_orders_supported: false,
            order_cancel_replace_supported: true,
            symbol_exchange_delimiter: SYMBOL_DELIMITER.to_string(),
            security_definitions_supported: true,
            historical_price_data_supported: false,
            market_data_supported: true,
            market_depth_is_supported: true,
            bracket_orders_supported: false,
        });

        if req.heartbeat_interval_in_seconds > 0 {
            tokio::spawn(heartbeat_loop(
                self.conn.clone(),
                Duration::from_secs(req.heartbeat_interval_in_seconds as u64),
            ));
        }

        if !self.config.sierra_chart || send_secdefs {
            let mut symbols = self.state.ticker_symbols().await;
            symbols.sort();
            for symbol in symbols {
                self.conn.writer.send(&security_definition(&symbol, 0));
            }
        }

        tokio::spawn(account_refresh_loop(
            self.conn.clone(),
            self.rest.clone(),
            self.client.clone(),
            self.config.update_client_span,
        ));
    }

    /// Credential check: one margin summary call through the REST queue.
    async fn check_credentials(&self, credentials: &Credentials) -> (bool, String) {
        let (tx, rx) = oneshot::channel();
        let client = self.client.clone();
        let credentials = credentials.clone();
        self.rest
            .push(async move {
                let _ = tx.send(client.margin_account_summary(&credentials).await);
            })
            .await;
        match rx.await {
            Ok(Ok(_)) => (
                true,
                "Trading enabled: Valid Bittrex credentials".to_string(),
            ),
            Ok(Err(e)) => {
                tracing::warn!("credential check failed: {}", e);
                (
                    false,
                    "Trading disabled: Invalid Bittrex credentials".to_string(),
                )
            }
            Err(_) => (
                false,
                "Trading disabled: Invalid Bittrex credentials".to_string(),
            ),
        }
    }

    // -- security definitions ----------------------------------------------

    pub(crate) async fn handle_security_definition(
        &self,
        req: SecurityDefinitionForSymbolRequest,
    ) {
        if let Some(text) = self.check_symbol(&req.symbol, &req.exchange).await {
            self.conn.writer.send(&SecurityDefinitionReject {
                request_id: req.request_id,
                reject_text: text,
            });
            return;
        }
        self.conn
            .writer
            .send(&security_definition(&req.symbol, req.request_id));
    }

    /// Symbol/exchange validation shared by the data-path and order requests.
    pub(crate) async fn check_symbol(&self, symbol: &str, exchange: &str) -> Option<String> {
        if exchange != EXCHANGE {
            return Some(format!("Unknown exchange {}", exchange));
        }
        if !self.state.has_symbol(symbol).await {
            return Some(format!("Unknown symbol {}", symbol));
        }
        None
    }

    // -- market data -------------------------------------------------------

    pub(crate) async fn handle_market_data(&self, req: MarketDataRequest) {
        let reject = |text: String| {
            self.conn.writer.send(&MarketDataReject {
                symbol_id: req.symbol_id,
                reject_text: text,
            });
        };
        if let Some(text) = self.check_symbol(&req.symbol, &req.exchange).await {
            reject(text);
            return;
        }
        match RequestAction::from_i32(req.request_action) {
            Some(RequestAction::Unsubscribe) => {
                self.conn
                    .subs_data
                    .lock()
                    .expect("subscription lock")
                    .unsubscribe_id(req.symbol_id);
            }
            Some(RequestAction::Snapshot) => {
                let snapshot = self.build_snapshot(&req.symbol, req.symbol_id).await;
                self.conn.writer.send(&snapshot);
            }
            Some(RequestAction::Subscribe) => {
                let result = self
                    .conn
                    .subs_data
                    .lock()
                    .expect("subscription lock")
                    .subscribe(&req.symbol, req.symbol_id);
                match result {
                    Ok(()) => {
                        let snapshot = self.build_snapshot(&req.symbol, req.symbol_id).await;
                        self.conn.writer.send(&snapshot);
                    }
                    Err(text) => reject(text),
                }
            }
            _ => reject("Unknown request action".to_string()),
        }
    }

    /// Snapshot from the stored ticker, latest trade and best of book.
    async fn build_snapshot(&self, symbol: &str, symbol_id: u32) -> MarketDataSnapshot {
        let ticker = self
            .state
            .ticker(symbol)
            .await
            .map(|(_, t)| t)
            .unwrap_or_default();
        let book = self.state.book(symbol).await.unwrap_or_default();
        let (bid_price, bid_quantity) = book.best_bid().unwrap_or((ticker.bid, 0.0));
        let (ask_price, ask_quantity) = book.best_ask().unwrap_or((ticker.ask, 0.0));
        let trade = self.state.latest_trade(symbol).await;

        MarketDataSnapshot {
            symbol_id,
            session_high_price: ticker.high24h,
            session_low_price: ticker.low24h,
            session_volume: ticker.base_volume,
            bid_price,
            bid_quantity,
            ask_price,
            ask_quantity,
            last_trade_price: trade.map(|t| t.price).unwrap_or(ticker.last),
            last_trade_volume: trade.map(|t| t.quantity).unwrap_or(0.0),
            last_trade_date_time: trade
                .map(|t| datetime_to_f64(t.timestamp))
                .unwrap_or(0.0),
            bid_ask_date_time: book.updated_at().map(datetime_to_f64).unwrap_or(0.0),
        }
    }

    // -- market depth ------------------------------------------------------

    pub(crate) async fn handle_market_depth(&self, req: MarketDepthRequest) {
        let reject = |text: String| {
            self.conn.writer.send(&MarketDepthReject {
                symbol_id: req.symbol_id,
                reject_text: text,
            });
        };
        if let Some(text) = self.check_symbol(&req.symbol, &req.exchange).await {
            reject(text);
            return;
        }
        match RequestAction::from_i32(req.request_action) {
            Some(RequestAction::Unsubscribe) => {
                self.conn
                    .subs_depth
                    .lock()
                    .expect("subscription lock")
                    .unsubscribe_id(req.symbol_id);
            }
            Some(RequestAction::Snapshot) => {
                self.send_depth_sentinel(req.symbol_id);
            }
            Some(RequestAction::Subscribe) => {
                let result = self
                    .conn
                    .subs_depth
                    .lock()
                    .expect("subscription lock")
                    .subscribe(&req.symbol, req.symbol_id);
                match result {
                    Ok(()) => self.send_depth_sentinel(req.symbol_id),
                    Err(text) => reject(text),
                }
            }
            _ => reject("Unknown request action".to_string()),
        }
    }

    /// Depth snapshots are deliberately empty: one final-of-batch sentinel.
    /// Depth data itself flows incrementally from the upstream update path.
    fn send_depth_sentinel(&self, symbol_id: u32) {
        self.conn.writer.send(&MarketDepthSnapshotLevel {
            symbol_id,
            is_last_message_in_batch: true,
            ..Default::default()
        });
    }

    // -- account queries ---------------------------------------------------

    pub(crate) fn handle_open_orders(&self, req: OpenOrdersRequest) {
        let scope: Option<u64> = (!req.server_order_id.is_empty())
            .then(|| req.server_order_id.parse().ok())
            .flatten();

        let client_orders = self.conn.client_orders.lock().expect("client orders lock");
        let orders = self.conn.orders.lock().expect("orders lock");

        let mut entries: Vec<_> = client_orders
            .iter()
            .filter(|(id, _)| scope.map_or(true, |wanted| **id == wanted))
            .collect();
        entries.sort_by_key(|(id, _)| **id);

        if entries.is_empty() {
            self.conn.writer.send(&OrderUpdate {
                request_id: req.request_id,
                total_num_messages: 1,
                message_number: 1,
                order_update_reason: OrderUpdateReason::OpenOrdersRequestResponse as i32,
                no_orders: true,
                ..Default::default()
            });
            return;
        }

        let total = entries.len() as i32;
        for (number, (&id, submit)) in entries.into_iter().enumerate() {
            let (filled, remaining, status) = match orders.get(&id) {
                Some(open) => {
                    let remaining = open.quantity_remaining * QTY_SCALE;
                    let filled = (submit.quantity - remaining).max(0.0);
                    let status = if filled > 0.0 {
                        OrderStatus::PartiallyFilled
                    } else {
                        OrderStatus::Open
                    };
                    (filled, remaining, status)
                }
                None => (0.0, submit.quantity, OrderStatus::Open),
            };
            self.conn.writer.send(&OrderUpdate {
                request_id: req.request_id,
                total_num_messages: total,
                message_number: number as i32 + 1,
                symbol: submit.symbol.clone(),
                exchange: EXCHANGE.to_string(),
                server_order_id: id.to_string(),
                client_order_id: submit.client_order_id.clone(),
                order_status: status as i32,
                order_update_reason: OrderUpdateReason::OpenOrdersRequestResponse as i32,
                order_type: submit.order_type,
                buy_sell: submit.buy_sell,
                price1: submit.price1,
                time_in_force: submit.time_in_force,
                order_quantity: submit.quantity,
                filled_quantity: filled,
                remaining_quantity: remaining,
                ..Default::default()
            });
        }
    }

    pub(crate) fn handle_positions(&self, req: CurrentPositionsRequest) {
        let positions = self.conn.positions.lock().expect("positions lock");
        if positions.is_empty() {
            self.conn.writer.send(&PositionUpdate {
                request_id: req.request_id,
                total_number_messages: 1,
                message_number: 1,
                trade_account: "margin".to_string(),
                no_positions: true,
                ..Default::default()
            });
            return;
        }
        let mut entries: Vec<_> = positions.values().collect();
        entries.sort_by(|a, b| a.market.cmp(&b.market));
        let total = entries.len() as i32;
        for (number, position) in entries.into_iter().enumerate() {
            self.conn.writer.send(&PositionUpdate {
                request_id: req.request_id,
                total_number_messages: total,
                message_number: number as i32 + 1,
                symbol: position.market.clone(),
                exchange: EXCHANGE.to_string(),
                quantity: position.quantity * QTY_SCALE,
                average_price: position.base_price,
                position_identifier: position.market.clone(),
                trade_account: "margin".to_string(),
                ..Default::default()
            });
        }
    }

    pub(crate) fn handle_order_fills(&self, req: HistoricalOrderFillsRequest) {
        let scope: Option<u64> = (!req.server_order_id.is_empty())
            .then(|| req.server_order_id.parse().ok())
            .flatten();

        let trades = self.conn.trades.lock().expect("trades lock");
        let mut fills: Vec<_> = trades
            .values()
            .filter(|fill| scope.map_or(true, |wanted| fill.order_id == wanted))
            .collect();
        fills.sort_by(|a, b| a.executed_at.total_cmp(&b.executed_at));

        if fills.is_empty() {
            self.conn.writer.send(&HistoricalOrderFillResponse {
                request_id: req.request_id,
                total_number_messages: 1,
                message_number: 1,
                no_order_fills: true,
                ..Default::default()
            });
            return;
        }
        let total = fills.len() as i32;
        for (number, fill) in fills.into_iter().enumerate() {
            self.conn.writer.send(&HistoricalOrderFillResponse {
                request_id: req.request_id,
                total_number_messages: total,
                message_number: number as i32 + 1,
                symbol: fill.market.clone(),
                exchange: EXCHANGE.to_string(),
                server_order_id: fill.order_id.to_string(),
                buy_sell: match fill.side {
                    crate::bittrex::types::TradeSide::Buy => BuySell::Buy as i32,
                    crate::bittrex::types::TradeSide::Sell => BuySell::Sell as i32,
                },
                price: fill.price,
                quantity: fill.quantity * QTY_SCALE,
                date_time: fill.executed_at,
                unique_execution_id: fill.uuid.clone(),
                ..Default::default()
            });
        }
    }

    pub(crate) fn handle_trade_accounts(&self, req: TradeAccountsRequest) {
        for (number, account) in ["exchange", "margin"].iter().enumerate() {
            self.conn.writer.send(&TradeAccountResponse {
                total_number_messages: 2,
                message_number: number as i32 + 1,
                trade_account: account.to_string(),
                request_id: req.request_id,
            });
        }
    }

    pub(crate) fn handle_account_balance(&self, req: AccountBalanceRequest) {
        match req.trade_account.as_str() {
            "" => {
                let exchange = self.exchange_balance_update(req.request_id, 1, 2);
                let margin = self.margin_balance_update(req.request_id, 2, 2);
                self.conn.writer.send(&exchange);
                self.conn.writer.send(&margin);
            }
            "exchange" => {
                let update = self.exchange_balance_update(req.request_id, 1, 1);
                self.conn.writer.send(&update);
            }
            "margin" => {
                let update = self.margin_balance_update(req.request_id, 1, 1);
                self.conn.writer.send(&update);
            }
            other => {
                self.conn.writer.send(&AccountBalanceReject {
                    request_id: req.request_id,
                    reject_text: format!("Unknown account {}", other),
                });
            }
        }
    }

    /// Exchange wallet rollup in mBTC: total account value over every
    /// currency's BTC valuation, spendable BTC as the available figure.
    fn exchange_balance_update(
        &self,
        request_id: i32,
        message_number: i32,
        total_number_messages: i32,
    ) -> AccountBalanceUpdate {
        let balances = self.conn.balances.lock().expect("balances lock");
        let cash: f64 = balances.values().map(|b| b.btc_value).sum::<f64>() * BALANCE_SCALE;
        let available = balances
            .get("BTC")
            .map(|b| b.available)
            .unwrap_or_default()
            * BALANCE_SCALE;
        AccountBalanceUpdate {
            request_id,
            cash_balance: cash,
            balance_available_for_new_positions: available,
            account_currency: "mBTC".to_string(),
            trade_account: "exchange".to_string(),
            total_number_messages,
            message_number,
            ..Default::default()
        }
    }

    fn margin_balance_update(
        &self,
        request_id: i32,
        message_number: i32,
        total_number_messages: i32,
    ) -> AccountBalanceUpdate {
        let balances = self.conn.margin_balances.lock().expect("margin balances lock");
        let btc = balances.get("BTC").copied().unwrap_or_default() * BALANCE_SCALE;
        AccountBalanceUpdate {
            request_id,
            cash_balance: btc,
            balance_available_for_new_positions: btc,
            account_currency: "mBTC".to_string(),
            trade_account: "margin".to_string(),
            total_number_messages,
            message_number,
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Per-connection background loops, started at logon
// ---------------------------------------------------------------------------

/// Emits a heartbeat carrying the dropped-message count every interval;
/// stops when the writer closes.
async fn heartbeat_loop(conn: Arc<Connection>, period: Duration) {
    let mut tick = interval(period);
    tick.tick().await;
    loop {
        tick.tick().await;
        if conn.writer.is_closed() {
            return;
        }
        conn.writer.send(&Heartbeat {
            num_dropped_messages: conn.writer.dropped(),
            current_date_time: Utc::now().timestamp(),
        });
    }
}

/// Schedules the three account refreshes through the REST queue every
/// `update_client_span`; stops when the writer closes.
async fn account_refresh_loop(
    conn: Arc<Connection>,
    rest: RestSync,
    client: BittrexClient,
    span: Duration,
) {
    let mut tick = interval(span);
    tick.tick().await;
    loop {
        tick.tick().await;
        if conn.writer.is_closed() {
            return;
        }
        let (conn_orders, client_orders) = (conn.clone(), client.clone());
        rest.push_nowait(async move {
            connection::update_orders(&client_orders, &conn_orders).await;
        });
        let (conn_trades, client_trades) = (conn.clone(), client.clone());
        rest.push_nowait(async move {
            connection::update_trades(&client_trades, &conn_trades).await;
        });
        let (conn_balances, client_balances) = (conn.clone(), client.clone());
        rest.push_nowait(async move {
            connection::update_balances(&client_balances, &conn_balances).await;
        });
    }
}
