//! Periodic Ticker Refresher
//!
//! Every 60 seconds one `get_tickers` call goes through the REST queue. Each
//! returned ticker is diffed against the stored one and per-field market
//! data updates fan out to subscribed clients. First sightings install the
//! ticker silently, except for clients that asked for unsolicited security
//! definitions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use crate::bittrex::BittrexClient;
use crate::dtc::messages::{
    MarketDataUpdateBidAsk, MarketDataUpdateSessionHigh, MarketDataUpdateSessionLow,
    MarketDataUpdateSessionVolume,
};
use crate::market::{MarketState, Ticker};
use crate::rest_sync::RestSync;
use crate::server::connection::ConnectionRegistry;
use crate::server::handlers::security_definition;

/// Ticker poll period
pub const TICKER_REFRESH_PERIOD: Duration = Duration::from_secs(60);

/// Poll loop; never returns. Each cycle enqueues a single REST call.
pub async fn run(
    state: Arc<MarketState>,
    registry: Arc<ConnectionRegistry>,
    rest: RestSync,
    client: BittrexClient,
) {
    let mut tick = interval(TICKER_REFRESH_PERIOD);
    loop {
        tick.tick().await;
        let state = state.clone();
        let registry = registry.clone();
        let client = client.clone();
        rest.push(async move {
            match client.get_tickers().await {
                Ok(tickers) => update_tickers(&state, &registry, tickers).await,
                Err(e) => tracing::error!("ticker refresh failed: {}", e),
            }
        })
        .await;
    }
}

/// Applies one fetched ticker set: stores every ticker and emits the
/// field-level updates to each subscribed connection.
///
/// Bid/ask changes are suppressed for depth-subscribed connections, which
/// already see the book itself through the incremental update path.
pub async fn update_tickers(
    state: &MarketState,
    registry: &ConnectionRegistry,
    fetched: HashMap<String, Ticker>,
) {
    let now = chrono::Utc::now();
    let connections = registry.connections().await;

    for (symbol, ticker) in fetched {
        let previous = state.ticker(&symbol).await.map(|(_, t)| t);
        let first_sighting = previous.is_none();
        let previous = previous.unwrap_or(ticker);
        state.store_ticker(&symbol, now, ticker).await;

        for conn in &connections {
            if first_sighting && conn.send_secdefs() {
                conn.writer.send(&security_definition(&symbol, 0));
            }
            let Some(symbol_id) = conn.data_symbol_id(&symbol) else {
                continue;
            };
            if ticker.base_volume != previous.base_volume {
                conn.writer.send(&MarketDataUpdateSessionVolume {
                    symbol_id,
                    volume: ticker.base_volume,
                });
            }
            if ticker.low24h != previous.low24h {
                conn.writer.send(&MarketDataUpdateSessionLow {
                    symbol_id,
                    price: ticker.low24h,
                });
            }
            if ticker.high24h != previous.high24h {
                conn.writer.send(&MarketDataUpdateSessionHigh {
                    symbol_id,
                    price: ticker.high24h,
                });
            }
            let bid_ask_changed = ticker.bid != previous.bid || ticker.ask != previous.ask;
            if bid_ask_changed && conn.depth_symbol_id(&symbol).is_none() {
                conn.writer.send(&MarketDataUpdateBidAsk {
                    symbol_id,
                    bid_price: ticker.bid,
                    bid_quantity: 0.0,
                    ask_price: ticker.ask,
                    ask_quantity: 0.0,
                    date_time: crate::market::datetime_to_f64(now),
                });
            }
        }
    }
}
