//! Order Lifecycle
//!
//! Submit, cancel and cancel/replace translation between DTC and the
//! exchange REST API. Validation failures and upstream errors always answer
//! with an order update carrying `order_status = rejected` and a readable
//! `info_text`; only a valid order reaches the REST queue.

use chrono::Utc;
use tokio::sync::oneshot;

use crate::bittrex::types::{OpenOrderInfo, OrderResult, SubmitParams, TradeSide};
use crate::dtc::messages::*;
use crate::error::BridgeError;
use crate::market::{datetime_to_f64, QTY_SCALE, Side};
use crate::server::connection::update_positions;
use crate::server::{Session, EXCHANGE};

/// A submit request that survived validation: the request with its market
/// rewrite applied, the REST parameters, and the routing decision.
#[derive(Debug, Clone)]
pub(crate) struct ValidatedSubmit {
    pub request: SubmitNewSingleOrder,
    pub params: SubmitParams,
    pub margin: bool,
}

impl Session {
    // -- submit ------------------------------------------------------------

    pub(crate) async fn handle_submit_order(&self, req: SubmitNewSingleOrder) {
        let original = req.clone();
        let validated = match self.validate_submit(req).await {
            Ok(validated) => validated,
            Err(text) => {
                self.reject_order(&original, &text);
                return;
            }
        };

        let credentials = self.conn.credentials().cloned().unwrap_or_default();
        let (tx, rx) = oneshot::channel();
        {
            let client = self.client.clone();
            let params = validated.params.clone();
            let margin = validated.margin;
            self.rest
                .push(async move {
                    let result = if margin {
                        client.submit_margin_order(&credentials, &params).await
                    } else {
                        client.submit_order(&credentials, &params).await
                    };
                    let _ = tx.send(result);
                })
                .await;
        }

        match rx.await {
            Ok(Ok(result)) => self.order_accepted(&validated, result).await,
            Ok(Err(BridgeError::Exchange(msg))) => self.reject_order(&validated.request, &msg),
            Ok(Err(e)) => self.reject_order(
                &validated.request,
                &format!("{} (client order {})", e, validated.request.client_order_id),
            ),
            Err(_) => self.reject_order(&validated.request, "order submission dropped"),
        }
    }

    /// Validation per the order contract, in order: symbol, time in force,
    /// order type. Market orders become synthetic marketable limits:
    /// `price1 = 2 × high24h`, TIF forced to FOK.
    pub(crate) async fn validate_submit(
        &self,
        mut req: SubmitNewSingleOrder,
    ) -> Result<ValidatedSubmit, String> {
        if req.symbol.is_empty() {
            return Err("Unknown symbol".to_string());
        }
        if let Some(text) = self.check_symbol(&req.symbol, &req.exchange).await {
            return Err(text);
        }
        let side = match BuySell::from_i32(req.buy_sell) {
            Some(BuySell::Buy) => Side::Buy,
            Some(BuySell::Sell) => Side::Sell,
            _ => return Err("Buy/sell unset".to_string()),
        };

        let mut tif = match TimeInForce::from_i32(req.time_in_force) {
            // Day silently maps to GTC
            Some(TimeInForce::Day) | Some(TimeInForce::GoodTillCanceled) => {
                TimeInForce::GoodTillCanceled
            }
            Some(TimeInForce::FillOrKill) => TimeInForce::FillOrKill,
            Some(TimeInForce::ImmediateOrCancel) => TimeInForce::ImmediateOrCancel,
            Some(TimeInForce::Unset) | None => return Err("Time in force unset".to_string()),
            Some(other) => return Err(format!("Unsupported time in force {:?}", other)),
        };

        match OrderType::from_i32(req.order_type) {
            Some(OrderType::Market) => {
                // Synthetic marketable limit well above the 24h range
                let high24h = self
                    .state
                    .ticker(&req.symbol)
                    .await
                    .map(|(_, t)| t.high24h)
                    .unwrap_or_default();
                req.price1 = 2.0 * high24h;
                tif = TimeInForce::FillOrKill;
            }
            Some(OrderType::Limit) => {
                if req.price1 <= 0.0 {
                    return Err("Limit order without a price".to_string());
                }
            }
            other => return Err(format!("Unsupported order type {:?}", other)),
        }
        req.time_in_force = tif as i32;

        let time_in_force = match tif {
            TimeInForce::FillOrKill => Some("FILL_OR_KILL"),
            TimeInForce::ImmediateOrCancel => Some("IMMEDIATE_OR_CANCEL"),
            _ => None,
        };
        let params = SubmitParams {
            market: req.symbol.clone(),
            side,
            price: req.price1,
            quantity: req.quantity / QTY_SCALE,
            time_in_force,
        };
        let margin = self.margin_symbols.contains(&req.symbol);
        Ok(ValidatedSubmit {
            request: req,
            params,
            margin,
        })
    }

    /// Records the accepted order and emits the status update the fill
    /// profile calls for.
    async fn order_accepted(&self, validated: &ValidatedSubmit, result: OrderResult) {
        let req = &validated.request;
        let OrderResult {
            id,
            trades,
            amount_unfilled,
        } = result;

        self.conn
            .client_orders
            .lock()
            .expect("client orders lock")
            .insert(id, req.clone());
        self.conn.orders.lock().expect("orders lock").insert(
            id,
            OpenOrderInfo {
                id,
                market: req.symbol.clone(),
                side: match validated.params.side {
                    Side::Buy => TradeSide::Buy,
                    Side::Sell => TradeSide::Sell,
                },
                price: req.price1,
                quantity: req.quantity / QTY_SCALE,
                quantity_remaining: amount_unfilled,
                opened_at: datetime_to_f64(Utc::now()),
            },
        );

        let base = OrderUpdate {
            total_num_messages: 1,
            message_number: 1,
            symbol: req.symbol.clone(),
            exchange: EXCHANGE.to_string(),
            server_order_id: id.to_string(),
            client_order_id: req.client_order_id.clone(),
            order_type: req.order_type,
            buy_sell: req.buy_sell,
            price1: req.price1,
            time_in_force: req.time_in_force,
            order_quantity: req.quantity,
            trade_account: if validated.margin { "margin" } else { "exchange" }.to_string(),
            ..Default::default()
        };

        if trades.is_empty() {
            self.conn.writer.send(&OrderUpdate {
                order_status: OrderStatus::Open as i32,
                order_update_reason: OrderUpdateReason::NewOrderAccepted as i32,
                filled_quantity: 0.0,
                remaining_quantity: req.quantity,
                ..base
            });
        } else if amount_unfilled == 0.0 {
            self.conn.writer.send(&OrderUpdate {
                order_status: OrderStatus::Filled as i32,
                order_update_reason: OrderUpdateReason::OrderFilled as i32,
                filled_quantity: req.quantity,
                remaining_quantity: 0.0,
                ..base
            });
            if validated.margin {
                self.refresh_positions();
            }
        } else {
            let filled: f64 =
                trades.iter().map(|fill| fill.quantity).sum::<f64>() * QTY_SCALE;
            self.conn.writer.send(&OrderUpdate {
                order_status: OrderStatus::PartiallyFilled as i32,
                order_update_reason: OrderUpdateReason::OrderFilledPartially as i32,
                filled_quantity: filled,
                remaining_quantity: req.quantity - filled,
                ..base
            });
            if validated.margin {
                self.refresh_positions();
            }
        }
    }

    fn refresh_positions(&self) {
        let conn = self.conn.clone();
        let client = self.client.clone();
        self.rest.push_nowait(async move {
            update_positions(&client, &conn).await;
        });
    }

    fn reject_order(&self, req: &SubmitNewSingleOrder, text: &str) {
        tracing::warn!("rejecting order from {}: {}", self.conn.addr, text);
        self.conn.writer.send(&OrderUpdate {
            total_num_messages: 1,
            message_number: 1,
            symbol: req.symbol.clone(),
            exchange: EXCHANGE.to_string(),
            client_order_id: req.client_order_id.clone(),
            order_status: OrderStatus::Rejected as i32,
            order_update_reason: OrderUpdateReason::NewOrderRejected as i32,
            order_type: req.order_type,
            buy_sell: req.buy_sell,
            price1: req.price1,
            order_quantity: req.quantity,
            info_text: text.to_string(),
            ..Default::default()
        });
    }

    // -- cancel ------------------------------------------------------------

    pub(crate) async fn handle_cancel_order(&self, req: CancelOrder) {
        let Ok(id) = req.server_order_id.parse::<u64>() else {
            self.reject_cancel(&req, "No server order id");
            return;
        };

        let credentials = self.conn.credentials().cloned().unwrap_or_default();
        let (tx, rx) = oneshot::channel();
        {
            let client = self.client.clone();
            self.rest
                .push(async move {
                    let _ = tx.send(client.cancel_order(&credentials, id).await);
                })
                .await;
        }

        match rx.await {
            Ok(Ok(())) => self.order_canceled(&req, id),
            Ok(Err(BridgeError::Exchange(msg))) => self.reject_cancel(&req, &msg),
            Ok(Err(e)) => self.reject_cancel(&req, &e.to_string()),
            Err(_) => self.reject_cancel(&req, "cancel dropped"),
        }
    }

    fn order_canceled(&self, req: &CancelOrder, id: u64) {
        let client_order = self
            .conn
            .client_orders
            .lock()
            .expect("client orders lock")
            .get(&id)
            .cloned();
        let open_order = self.conn.orders.lock().expect("orders lock").remove(&id);

        let update = match (client_order, open_order) {
            // Keep client_orders for audit; only the open-order entry goes
            (Some(submit), _) => OrderUpdate {
                symbol: submit.symbol.clone(),
                client_order_id: submit.client_order_id.clone(),
                order_type: submit.order_type,
                buy_sell: submit.buy_sell,
                price1: submit.price1,
                time_in_force: submit.time_in_force,
                order_quantity: submit.quantity,
                ..Default::default()
            },
            (None, Some(open)) => OrderUpdate {
                symbol: open.market.clone(),
                buy_sell: match open.side {
                    TradeSide::Buy => BuySell::Buy as i32,
                    TradeSide::Sell => BuySell::Sell as i32,
                },
                price1: open.price,
                order_quantity: open.quantity * QTY_SCALE,
                ..Default::default()
            },
            (None, None) => {
                tracing::error!(
                    "canceled order {} unknown to both order tables of {}",
                    id,
                    self.conn.addr
                );
                OrderUpdate::default()
            }
        };

        self.conn.writer.send(&OrderUpdate {
            total_num_messages: 1,
            message_number: 1,
            exchange: EXCHANGE.to_string(),
            server_order_id: id.to_string(),
            order_status: OrderStatus::Canceled as i32,
            order_update_reason: OrderUpdateReason::OrderCanceled as i32,
            remaining_quantity: 0.0,
            ..update
        });
    }

    fn reject_cancel(&self, req: &CancelOrder, text: &str) {
        tracing::warn!("rejecting cancel from {}: {}", self.conn.addr, text);
        self.conn.writer.send(&OrderUpdate {
            total_num_messages: 1,
            message_number: 1,
            exchange: EXCHANGE.to_string(),
            server_order_id: req.server_order_id.clone(),
            client_order_id: req.client_order_id.clone(),
            order_status: OrderStatus::Rejected as i32,
            order_update_reason: OrderUpdateReason::OrderCancelRejected as i32,
            info_text: text.to_string(),
            ..Default::default()
        });
    }

    // -- cancel/replace ----------------------------------------------------

    pub(crate) async fn handle_cancel_replace(&self, req: CancelReplaceOrder) {
        // The upstream can only move price and size on a resting order
        if OrderType::from_i32(req.order_type) != Some(OrderType::Unset) {
            self.reject_cancel_replace(&req, "Order type cannot be changed");
            return;
        }
        if TimeInForce::from_i32(req.time_in_force) != Some(TimeInForce::Unset) {
            self.reject_cancel_replace(&req, "Time in force cannot be changed");
            return;
        }
        let Ok(orig_id) = req.server_order_id.parse::<u64>() else {
            self.reject_cancel_replace(&req, "No server order id");
            return;
        };
        if !req.price1_is_set || req.price1 <= 0.0 {
            self.reject_cancel_replace(&req, "No price1");
            return;
        }
        let quantity = req.quantity_is_set.then_some(req.quantity / QTY_SCALE);

        let credentials = self.conn.credentials().cloned().unwrap_or_default();
        let (tx, rx) = oneshot::channel();
        {
            let client = self.client.clone();
            let price = req.price1;
            self.rest
                .push(async move {
                    let _ = tx.send(
                        client
                            .modify_order(&credentials, orig_id, quantity, price)
                            .await,
                    );
                })
                .await;
        }

        match rx.await {
            Ok(Ok(result)) => self.order_replaced(&req, orig_id, result),
            Ok(Err(BridgeError::Exchange(msg))) => self.reject_cancel_replace(&req, &msg),
            Ok(Err(e)) => self.reject_cancel_replace(&req, &e.to_string()),
            Err(_) => self.reject_cancel_replace(&req, "cancel/replace dropped"),
        }
    }

    /// Rewires both order tables from the old id to the exchange-assigned
    /// new one and confirms the replace.
    fn order_replaced(&self, req: &CancelReplaceOrder, orig_id: u64, result: OrderResult) {
        let new_id = result.id;

        let submit = {
            let mut table = self.conn.client_orders.lock().expect("client orders lock");
            match table.remove(&orig_id) {
                Some(mut submit) => {
                    submit.price1 = req.price1;
                    if req.quantity_is_set {
                        submit.quantity = req.quantity;
                    }
                    table.insert(new_id, submit.clone());
                    Some(submit)
                }
                None => {
                    tracing::error!(
                        "replaced order {} missing from client orders of {}",
                        orig_id,
                        self.conn.addr
                    );
                    None
                }
            }
        };
        {
            let mut table = self.conn.orders.lock().expect("orders lock");
            match table.remove(&orig_id) {
                Some(mut open) => {
                    open.id = new_id;
                    open.price = req.price1;
                    open.quantity_remaining = result.amount_unfilled;
                    if req.quantity_is_set {
                        open.quantity = req.quantity / QTY_SCALE;
                    }
                    table.insert(new_id, open);
                }
                None => {
                    tracing::error!(
                        "replaced order {} missing from open orders of {}",
                        orig_id,
                        self.conn.addr
                    );
                }
            }
        }

        let (symbol, client_order_id, order_quantity, buy_sell) = submit
            .map(|s| (s.symbol, s.client_order_id, s.quantity, s.buy_sell))
            .unwrap_or((String::new(), req.client_order_id.clone(), 0.0, 0));

        self.conn.writer.send(&OrderUpdate {
            total_num_messages: 1,
            message_number: 1,
            symbol,
            exchange: EXCHANGE.to_string(),
            previous_server_order_id: orig_id.to_string(),
            server_order_id: new_id.to_string(),
            client_order_id,
            order_status: OrderStatus::Open as i32,
            order_update_reason: OrderUpdateReason::OrderCancelReplaceComplete as i32,
            buy_sell,
            price1: req.price1,
            order_quantity,
            remaining_quantity: result.amount_unfilled * QTY_SCALE,
            ..Default::default()
        });
    }

    fn reject_cancel_replace(&self, req: &CancelReplaceOrder, text: &str) {
        tracing::warn!("rejecting cancel/replace from {}: {}", self.conn.addr, text);
        self.conn.writer.send(&OrderUpdate {
            total_num_messages: 1,
            message_number: 1,
            exchange: EXCHANGE.to_string(),
            server_order_id: req.server_order_id.clone(),
            client_order_id: req.client_order_id.clone(),
            order_status: OrderStatus::Rejected as i32,
            order_update_reason: OrderUpdateReason::OrderCancelReplaceRejected as i32,
            info_text: text.to_string(),
            ..Default::default()
        });
    }
}
