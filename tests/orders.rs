//! Order lifecycle: validation rejects, exchange-error rejects, TIF
//! normalization, cancel fallbacks and cancel/replace table rewiring.

mod common;

use chrono::Utc;
use rstest::rstest;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use btrex_bridge::bittrex::types::{OpenOrderInfo, TradeSide};
use btrex_bridge::bittrex::{BittrexClient, Credentials};
use btrex_bridge::dtc::messages::*;
use btrex_bridge::dtc::Request;
use btrex_bridge::market::MarketState;
use btrex_bridge::server::connection::ConnectionRegistry;

use common::{test_client_with, ticker, TestClient};

async fn trading_client(base_url: String) -> TestClient {
    let state = Arc::new(MarketState::new());
    state
        .store_ticker("BTC-ETH", Utc::now(), ticker(0.049, 0.051, 0.05, 0.045, 0.055, 10.0))
        .await;
    let tester = test_client_with(
        BittrexClient::with_base_url(base_url),
        state,
        Arc::new(ConnectionRegistry::new()),
    );
    tester
        .session
        .conn
        .set_credentials(Credentials::new("key", "secret"));
    tester
}

fn limit_order(tif: TimeInForce) -> SubmitNewSingleOrder {
    SubmitNewSingleOrder {
        symbol: "BTC-ETH".into(),
        exchange: "BTREX".into(),
        client_order_id: "cli-1".into(),
        order_type: OrderType::Limit as i32,
        buy_sell: BuySell::Buy as i32,
        price1: 0.05,
        quantity: 10_000.0,
        time_in_force: tif as i32,
        ..Default::default()
    }
}

fn accepted_submit_body() -> serde_json::Value {
    json!({
        "success": true,
        "message": "",
        "result": {"Id": 7, "Trades": [], "AmountUnfilled": 1.0}
    })
}

fn priceless_limit_order() -> SubmitNewSingleOrder {
    let mut order = limit_order(TimeInForce::GoodTillCanceled);
    order.price1 = 0.0;
    order
}

fn unknown_symbol_order() -> SubmitNewSingleOrder {
    let mut order = limit_order(TimeInForce::GoodTillCanceled);
    order.symbol = "NO-PE".into();
    order
}

#[rstest]
#[case::time_in_force_unset(limit_order(TimeInForce::Unset), "Time in force unset")]
#[case::limit_without_price(priceless_limit_order(), "Limit order without a price")]
#[case::unknown_symbol(unknown_symbol_order(), "Unknown symbol NO-PE")]
#[tokio::test]
async fn test_submit_validation_rejects(
    #[case] order: SubmitNewSingleOrder,
    #[case] expected: &str,
) {
    let mut tester = trading_client("http://127.0.0.1:1".into()).await;
    tester
        .session
        .handle(Request::SubmitNewSingleOrder(order))
        .await;
    let update: OrderUpdate = tester.expect().await;
    assert_eq!(update.order_status, OrderStatus::Rejected as i32);
    assert_eq!(update.order_update_reason, OrderUpdateReason::NewOrderRejected as i32);
    assert_eq!(update.info_text, expected);
}

/// TIF Day goes upstream as plain GTC and the resting order comes back
/// open, not rejected.
#[tokio::test]
async fn test_day_time_in_force_maps_to_gtc() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/market/submit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(accepted_submit_body()))
        .mount(&mock)
        .await;

    let mut tester = trading_client(mock.uri()).await;
    tester
        .session
        .handle(Request::SubmitNewSingleOrder(limit_order(TimeInForce::Day)))
        .await;

    let update: OrderUpdate = tester.expect().await;
    assert_eq!(update.order_status, OrderStatus::Open as i32);
    assert_eq!(update.order_update_reason, OrderUpdateReason::NewOrderAccepted as i32);
    assert_eq!(update.time_in_force, TimeInForce::GoodTillCanceled as i32);
    assert_eq!(update.filled_quantity, 0.0);
    assert_eq!(update.remaining_quantity, 10_000.0);
}

#[tokio::test]
async fn test_exchange_error_becomes_reject_text() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/market/submit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "INSUFFICIENT_FUNDS",
            "result": null
        })))
        .mount(&mock)
        .await;

    let mut tester = trading_client(mock.uri()).await;
    tester
        .session
        .handle(Request::SubmitNewSingleOrder(limit_order(
            TimeInForce::GoodTillCanceled,
        )))
        .await;
    let update: OrderUpdate = tester.expect().await;
    assert_eq!(update.order_status, OrderStatus::Rejected as i32);
    assert_eq!(update.info_text, "INSUFFICIENT_FUNDS");
}

#[tokio::test]
async fn test_partial_fill_reports_scaled_quantities() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/market/submit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "",
            "result": {
                "Id": 8,
                "Trades": [{"Uuid": "f1", "Price": 0.05, "Quantity": 0.4}],
                "AmountUnfilled": 0.6
            }
        })))
        .mount(&mock)
        .await;

    let mut tester = trading_client(mock.uri()).await;
    tester
        .session
        .handle(Request::SubmitNewSingleOrder(limit_order(
            TimeInForce::GoodTillCanceled,
        )))
        .await;
    let update: OrderUpdate = tester.expect().await;
    assert_eq!(update.order_status, OrderStatus::PartiallyFilled as i32);
    assert_eq!(
        update.order_update_reason,
        OrderUpdateReason::OrderFilledPartially as i32
    );
    assert_eq!(update.filled_quantity, 4_000.0);
    assert_eq!(update.remaining_quantity, 6_000.0);
}

#[tokio::test]
async fn test_cancel_without_server_order_id_rejects() {
    let mut tester = trading_client("http://127.0.0.1:1".into()).await;
    tester
        .session
        .handle(Request::CancelOrder(CancelOrder::default()))
        .await;
    let update: OrderUpdate = tester.expect().await;
    assert_eq!(update.order_status, OrderStatus::Rejected as i32);
    assert_eq!(
        update.order_update_reason,
        OrderUpdateReason::OrderCancelRejected as i32
    );
}

#[tokio::test]
async fn test_cancel_uses_client_order_and_keeps_audit_entry() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/market/cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true, "message": "", "result": {}
        })))
        .mount(&mock)
        .await;

    let mut tester = trading_client(mock.uri()).await;
    tester
        .session
        .conn
        .client_orders
        .lock()
        .unwrap()
        .insert(42, limit_order(TimeInForce::GoodTillCanceled));
    tester.session.conn.orders.lock().unwrap().insert(
        42,
        OpenOrderInfo {
            id: 42,
            market: "BTC-ETH".into(),
            side: TradeSide::Buy,
            price: 0.05,
            quantity: 1.0,
            quantity_remaining: 1.0,
            opened_at: 0.0,
        },
    );

    tester
        .session
        .handle(Request::CancelOrder(CancelOrder {
            server_order_id: "42".into(),
            client_order_id: "cli-1".into(),
        }))
        .await;
    let update: OrderUpdate = tester.expect().await;
    assert_eq!(update.order_status, OrderStatus::Canceled as i32);
    assert_eq!(update.order_update_reason, OrderUpdateReason::OrderCanceled as i32);
    assert_eq!(update.server_order_id, "42");
    assert_eq!(update.client_order_id, "cli-1");
    assert_eq!(update.symbol, "BTC-ETH");

    // Open order gone, client order retained for audit
    assert!(!tester.session.conn.orders.lock().unwrap().contains_key(&42));
    assert!(tester.session.conn.client_orders.lock().unwrap().contains_key(&42));
}

/// Cancel succeeding against tables that never saw the order still answers
/// the client with a synthesized cancel update.
#[tokio::test]
async fn test_cancel_unknown_order_synthesizes_update() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/market/cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true, "message": "", "result": {}
        })))
        .mount(&mock)
        .await;

    let mut tester = trading_client(mock.uri()).await;
    tester
        .session
        .handle(Request::CancelOrder(CancelOrder {
            server_order_id: "99".into(),
            client_order_id: String::new(),
        }))
        .await;
    let update: OrderUpdate = tester.expect().await;
    assert_eq!(update.order_status, OrderStatus::Canceled as i32);
    assert_eq!(update.server_order_id, "99");
    assert_eq!(update.symbol, "");
}

/// A cancel/replace that would pass validation: price move on order 42.
fn replace_request() -> CancelReplaceOrder {
    CancelReplaceOrder {
        server_order_id: "42".into(),
        price1: 0.05,
        price1_is_set: true,
        ..Default::default()
    }
}

fn replace_changing_order_type() -> CancelReplaceOrder {
    CancelReplaceOrder {
        order_type: OrderType::Limit as i32,
        ..replace_request()
    }
}

fn replace_changing_time_in_force() -> CancelReplaceOrder {
    CancelReplaceOrder {
        time_in_force: TimeInForce::FillOrKill as i32,
        ..replace_request()
    }
}

fn replace_without_server_order_id() -> CancelReplaceOrder {
    CancelReplaceOrder {
        server_order_id: String::new(),
        ..replace_request()
    }
}

fn replace_without_price() -> CancelReplaceOrder {
    CancelReplaceOrder {
        price1: 0.0,
        price1_is_set: false,
        ..replace_request()
    }
}

#[rstest]
#[case::order_type_change(replace_changing_order_type(), "Order type cannot be changed")]
#[case::time_in_force_change(replace_changing_time_in_force(), "Time in force cannot be changed")]
#[case::missing_server_order_id(replace_without_server_order_id(), "No server order id")]
#[case::missing_price(replace_without_price(), "No price1")]
#[tokio::test]
async fn test_cancel_replace_rejects_unsupported_changes(
    #[case] request: CancelReplaceOrder,
    #[case] expected: &str,
) {
    let mut tester = trading_client("http://127.0.0.1:1".into()).await;
    tester
        .session
        .handle(Request::CancelReplaceOrder(request))
        .await;
    let update: OrderUpdate = tester.expect().await;
    assert_eq!(update.order_status, OrderStatus::Rejected as i32);
    assert_eq!(
        update.order_update_reason,
        OrderUpdateReason::OrderCancelReplaceRejected as i32
    );
    assert_eq!(update.info_text, expected);
}

#[tokio::test]
async fn test_cancel_replace_rewires_order_tables() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/market/modify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "",
            "result": {"Id": 43, "Trades": [], "AmountUnfilled": 0.8}
        })))
        .mount(&mock)
        .await;

    let mut tester = trading_client(mock.uri()).await;
    tester
        .session
        .conn
        .client_orders
        .lock()
        .unwrap()
        .insert(42, limit_order(TimeInForce::GoodTillCanceled));
    tester.session.conn.orders.lock().unwrap().insert(
        42,
        OpenOrderInfo {
            id: 42,
            market: "BTC-ETH".into(),
            side: TradeSide::Buy,
            price: 0.05,
            quantity: 1.0,
            quantity_remaining: 1.0,
            opened_at: 0.0,
        },
    );

    tester
        .session
        .handle(Request::CancelReplaceOrder(CancelReplaceOrder {
            server_order_id: "42".into(),
            client_order_id: "cli-1".into(),
            price1: 0.048,
            price1_is_set: true,
            ..Default::default()
        }))
        .await;

    let update: OrderUpdate = tester.expect().await;
    assert_eq!(
        update.order_update_reason,
        OrderUpdateReason::OrderCancelReplaceComplete as i32
    );
    assert_eq!(update.previous_server_order_id, "42");
    assert_eq!(update.server_order_id, "43");
    assert_eq!(update.price1, 0.048);
    assert_eq!(update.remaining_quantity, 8_000.0);

    let client_orders = tester.session.conn.client_orders.lock().unwrap();
    assert!(!client_orders.contains_key(&42));
    assert_eq!(client_orders.get(&43).unwrap().price1, 0.048);
    let orders = tester.session.conn.orders.lock().unwrap();
    assert!(!orders.contains_key(&42));
    assert_eq!(orders.get(&43).unwrap().quantity_remaining, 0.8);
}
