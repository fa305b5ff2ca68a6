//! Handler behavior: account queries, rejects, the empty depth snapshot
//! sentinel, and the ticker-refresh diff fan-out rules.

mod common;

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

use btrex_bridge::bittrex::types::TradeFill;
use btrex_bridge::bittrex::BittrexClient;
use btrex_bridge::dtc::messages::*;
use btrex_bridge::dtc::Request;
use btrex_bridge::market::MarketState;
use btrex_bridge::refresher::update_tickers;
use btrex_bridge::server::connection::ConnectionRegistry;

use common::{test_client_with, ticker};

fn offline_client() -> BittrexClient {
    BittrexClient::with_base_url("http://127.0.0.1:1")
}

#[tokio::test]
async fn test_security_definition_unknown_symbol_rejects() {
    let mut tester = test_client_with(
        offline_client(),
        Arc::new(MarketState::new()),
        Arc::new(ConnectionRegistry::new()),
    );
    tester
        .session
        .handle(Request::SecurityDefinitionForSymbol(
            SecurityDefinitionForSymbolRequest {
                request_id: 3,
                symbol: "NO-PE".into(),
                exchange: "BTREX".into(),
            },
        ))
        .await;
    let reject: SecurityDefinitionReject = tester.expect().await;
    assert_eq!(reject.request_id, 3);
    assert_eq!(reject.reject_text, "Unknown symbol NO-PE");
}

#[tokio::test]
async fn test_security_definition_known_symbol() {
    let state = Arc::new(MarketState::new());
    state
        .store_ticker("BTC-ETH", Utc::now(), ticker(1.0, 2.0, 1.5, 0.5, 3.0, 10.0))
        .await;
    let mut tester =
        test_client_with(offline_client(), state, Arc::new(ConnectionRegistry::new()));
    tester
        .session
        .handle(Request::SecurityDefinitionForSymbol(
            SecurityDefinitionForSymbolRequest {
                request_id: 9,
                symbol: "BTC-ETH".into(),
                exchange: "BTREX".into(),
            },
        ))
        .await;
    let secdef: SecurityDefinitionResponse = tester.expect().await;
    assert_eq!(secdef.request_id, 9);
    assert_eq!(secdef.security_type, SecurityType::Forex as i32);
    assert_eq!(secdef.min_price_increment, 1e-8);
    assert_eq!(secdef.price_display_format, PriceDisplayFormat::Decimal8 as i32);
    assert!(secdef.has_market_depth_data);
}

#[tokio::test]
async fn test_exchange_mismatch_rejects_market_data() {
    let state = Arc::new(MarketState::new());
    state
        .store_ticker("BTC-ETH", Utc::now(), ticker(1.0, 2.0, 1.5, 0.5, 3.0, 10.0))
        .await;
    let mut tester =
        test_client_with(offline_client(), state, Arc::new(ConnectionRegistry::new()));
    tester
        .session
        .handle(Request::MarketData(MarketDataRequest {
            request_action: RequestAction::Subscribe as i32,
            symbol_id: 1,
            symbol: "BTC-ETH".into(),
            exchange: "NASDAQ".into(),
        }))
        .await;
    let reject: MarketDataReject = tester.expect().await;
    assert_eq!(reject.reject_text, "Unknown exchange NASDAQ");
}

#[tokio::test]
async fn test_depth_snapshot_is_empty_sentinel() {
    let state = Arc::new(MarketState::new());
    state
        .store_ticker("BTC-ETH", Utc::now(), ticker(1.0, 2.0, 1.5, 0.5, 3.0, 10.0))
        .await;
    // Even a populated book yields only the final-of-batch sentinel
    state
        .install_book("BTC-ETH", &[(1.0, 5.0)], &[(2.0, 5.0)], Utc::now())
        .await;
    let mut tester =
        test_client_with(offline_client(), state, Arc::new(ConnectionRegistry::new()));
    tester
        .session
        .handle(Request::MarketDepth(MarketDepthRequest {
            request_action: RequestAction::Subscribe as i32,
            symbol_id: 4,
            symbol: "BTC-ETH".into(),
            exchange: "BTREX".into(),
            num_levels: 10,
        }))
        .await;
    let level: MarketDepthSnapshotLevel = tester.expect().await;
    assert_eq!(level.symbol_id, 4);
    assert!(level.is_last_message_in_batch);
    assert_eq!(level.price, 0.0);
    assert_eq!(level.quantity, 0.0);
    assert!(tester.no_pending_output());
}

#[tokio::test]
async fn test_open_orders_empty_table() {
    let mut tester = test_client_with(
        offline_client(),
        Arc::new(MarketState::new()),
        Arc::new(ConnectionRegistry::new()),
    );
    tester
        .session
        .handle(Request::OpenOrders(OpenOrdersRequest {
            request_id: 11,
            request_all_orders: true,
            ..Default::default()
        }))
        .await;
    let update: OrderUpdate = tester.expect().await;
    assert!(update.no_orders);
    assert_eq!(update.request_id, 11);
    assert_eq!(update.total_num_messages, 1);
    assert_eq!(update.message_number, 1);
}

#[tokio::test]
async fn test_open_orders_lists_client_orders_scaled() {
    let mut tester = test_client_with(
        offline_client(),
        Arc::new(MarketState::new()),
        Arc::new(ConnectionRegistry::new()),
    );
    tester.session.conn.client_orders.lock().unwrap().insert(
        42,
        SubmitNewSingleOrder {
            symbol: "BTC-ETH".into(),
            client_order_id: "cli-1".into(),
            buy_sell: BuySell::Buy as i32,
            price1: 0.05,
            quantity: 50_000.0,
            ..Default::default()
        },
    );
    tester.session.conn.orders.lock().unwrap().insert(
        42,
        btrex_bridge::bittrex::types::OpenOrderInfo {
            id: 42,
            market: "BTC-ETH".into(),
            side: btrex_bridge::bittrex::types::TradeSide::Buy,
            price: 0.05,
            quantity: 5.0,
            quantity_remaining: 3.0,
            opened_at: 0.0,
        },
    );

    tester
        .session
        .handle(Request::OpenOrders(OpenOrdersRequest {
            request_id: 12,
            request_all_orders: true,
            ..Default::default()
        }))
        .await;
    let update: OrderUpdate = tester.expect().await;
    assert_eq!(update.server_order_id, "42");
    assert_eq!(update.order_quantity, 50_000.0);
    // 3.0 exchange units remaining, times the 1e4 wire scale
    assert_eq!(update.remaining_quantity, 30_000.0);
    assert_eq!(update.filled_quantity, 20_000.0);
    assert_eq!(update.order_status, OrderStatus::PartiallyFilled as i32);
    assert_eq!(
        update.order_update_reason,
        OrderUpdateReason::OpenOrdersRequestResponse as i32
    );
}

#[tokio::test]
async fn test_positions_empty_is_margin_scoped() {
    let mut tester = test_client_with(
        offline_client(),
        Arc::new(MarketState::new()),
        Arc::new(ConnectionRegistry::new()),
    );
    tester
        .session
        .handle(Request::CurrentPositions(CurrentPositionsRequest {
            request_id: 5,
            trade_account: "margin".into(),
        }))
        .await;
    let update: PositionUpdate = tester.expect().await;
    assert!(update.no_positions);
    assert_eq!(update.trade_account, "margin");
}

#[tokio::test]
async fn test_order_fills_scoped_by_server_order_id() {
    let mut tester = test_client_with(
        offline_client(),
        Arc::new(MarketState::new()),
        Arc::new(ConnectionRegistry::new()),
    );
    let fill = |uuid: &str, order_id: u64| TradeFill {
        uuid: uuid.into(),
        order_id,
        market: "BTC-ETH".into(),
        side: btrex_bridge::bittrex::types::TradeSide::Sell,
        price: 0.05,
        quantity: 2.0,
        executed_at: 1_520_000_000.0,
    };
    {
        let mut trades = tester.session.conn.trades.lock().unwrap();
        trades.insert("a".into(), fill("a", 42));
        trades.insert("b".into(), fill("b", 43));
    }

    tester
        .session
        .handle(Request::HistoricalOrderFills(HistoricalOrderFillsRequest {
            request_id: 6,
            server_order_id: "42".into(),
            ..Default::default()
        }))
        .await;
    let response: HistoricalOrderFillResponse = tester.expect().await;
    assert_eq!(response.total_number_messages, 1);
    assert_eq!(response.server_order_id, "42");
    assert_eq!(response.unique_execution_id, "a");
    assert_eq!(response.quantity, 20_000.0);
    assert_eq!(response.buy_sell, BuySell::Sell as i32);
    assert!(tester.no_pending_output());
}

#[tokio::test]
async fn test_trade_accounts_two_fixed_accounts() {
    let mut tester = test_client_with(
        offline_client(),
        Arc::new(MarketState::new()),
        Arc::new(ConnectionRegistry::new()),
    );
    tester
        .session
        .handle(Request::TradeAccounts(TradeAccountsRequest { request_id: 2 }))
        .await;
    let first: TradeAccountResponse = tester.expect().await;
    let second: TradeAccountResponse = tester.expect().await;
    assert_eq!(
        (first.trade_account.as_str(), first.message_number, first.total_number_messages),
        ("exchange", 1, 2)
    );
    assert_eq!(
        (second.trade_account.as_str(), second.message_number, second.total_number_messages),
        ("margin", 2, 2)
    );
}

#[tokio::test]
async fn test_account_balance_unknown_account_rejects() {
    let mut tester = test_client_with(
        offline_client(),
        Arc::new(MarketState::new()),
        Arc::new(ConnectionRegistry::new()),
    );
    tester
        .session
        .handle(Request::AccountBalance(AccountBalanceRequest {
            request_id: 8,
            trade_account: "swap".into(),
        }))
        .await;
    let reject: AccountBalanceReject = tester.expect().await;
    assert_eq!(reject.reject_text, "Unknown account swap");
}

#[tokio::test]
async fn test_account_balance_both_accounts_in_mbtc() {
    let mut tester = test_client_with(
        offline_client(),
        Arc::new(MarketState::new()),
        Arc::new(ConnectionRegistry::new()),
    );
    {
        let mut balances = tester.session.conn.balances.lock().unwrap();
        balances.insert(
            "BTC".into(),
            btrex_bridge::bittrex::types::BalanceInfo {
                currency: "BTC".into(),
                available: 1.5,
                on_orders: 0.5,
                btc_value: 2.0,
            },
        );
        balances.insert(
            "ETH".into(),
            btrex_bridge::bittrex::types::BalanceInfo {
                currency: "ETH".into(),
                available: 10.0,
                on_orders: 0.0,
                btc_value: 0.5,
            },
        );
        tester
            .session
            .conn
            .margin_balances
            .lock()
            .unwrap()
            .insert("BTC".into(), 0.25);
    }

    tester
        .session
        .handle(Request::AccountBalance(AccountBalanceRequest {
            request_id: 1,
            trade_account: String::new(),
        }))
        .await;
    let exchange: AccountBalanceUpdate = tester.expect().await;
    let margin: AccountBalanceUpdate = tester.expect().await;

    assert_eq!(exchange.trade_account, "exchange");
    assert_eq!(exchange.account_currency, "mBTC");
    assert_eq!(exchange.cash_balance, 2500.0);
    assert_eq!(exchange.balance_available_for_new_positions, 1500.0);
    assert_eq!((exchange.message_number, exchange.total_number_messages), (1, 2));

    assert_eq!(margin.trade_account, "margin");
    assert_eq!(margin.cash_balance, 250.0);
    assert_eq!((margin.message_number, margin.total_number_messages), (2, 2));
}

/// Ticker diff fan-out: exactly one update per changed field for the
/// market-data subscriber, and no bid/ask update when depth-subscribed.
#[tokio::test]
async fn test_update_tickers_diff_fanout() {
    let state = Arc::new(MarketState::new());
    let registry = Arc::new(ConnectionRegistry::new());
    let before = ticker(0.049, 0.051, 0.05, 0.045, 0.055, 1000.0);
    state.store_ticker("BTC-ETH", Utc::now(), before).await;

    // One plain market-data subscriber, one also depth-subscribed
    let mut data_only =
        test_client_with(offline_client(), state.clone(), registry.clone());
    data_only.register().await;
    data_only
        .session
        .conn
        .subs_data
        .lock()
        .unwrap()
        .subscribe("BTC-ETH", 1)
        .unwrap();

    let mut with_depth =
        test_client_with(offline_client(), state.clone(), registry.clone());
    with_depth.register().await;
    with_depth
        .session
        .conn
        .subs_data
        .lock()
        .unwrap()
        .subscribe("BTC-ETH", 2)
        .unwrap();
    with_depth
        .session
        .conn
        .subs_depth
        .lock()
        .unwrap()
        .subscribe("BTC-ETH", 2)
        .unwrap();

    // volume, high, and bid all move; low holds
    let after = ticker(0.050, 0.051, 0.05, 0.045, 0.060, 1100.0);
    let mut fetched = HashMap::new();
    fetched.insert("BTC-ETH".to_string(), after);
    update_tickers(&state, &registry, fetched).await;

    let volume: MarketDataUpdateSessionVolume = data_only.expect().await;
    assert_eq!(volume.volume, 1100.0);
    let high: MarketDataUpdateSessionHigh = data_only.expect().await;
    assert_eq!(high.price, 0.060);
    let bid_ask: MarketDataUpdateBidAsk = data_only.expect().await;
    assert_eq!(bid_ask.bid_price, 0.050);
    assert_eq!(bid_ask.ask_price, 0.051);
    assert!(data_only.no_pending_output(), "low did not change");

    let volume: MarketDataUpdateSessionVolume = with_depth.expect().await;
    assert_eq!(volume.symbol_id, 2);
    let _high: MarketDataUpdateSessionHigh = with_depth.expect().await;
    assert!(
        with_depth.no_pending_output(),
        "depth-subscribed connections get no bid/ask update"
    );

    // Stored ticker replaced
    let (_, stored) = state.ticker("BTC-ETH").await.unwrap();
    assert_eq!(stored, after);
}
