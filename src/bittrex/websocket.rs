//! Upstream WebSocket Supervisor
//!
//! Maintains exactly one connection to the Bittrex market data stream.
//! On every (re)connect it re-subscribes each symbol in the ticker table,
//! because upstream stream ids change per connection. A watchdog restarts
//! the connection when no event arrives within the configured timeout.
//! Book and trade events mutate the market state and fan out to subscribed
//! clients. No failure here is ever fatal to the process.

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{interval, sleep};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use crate::bittrex::types::{StreamCommand, StreamMessage};
use crate::error::BridgeError;
use crate::market::{f64_to_datetime, DepthEntry, LatestTrade, MarketState};
use crate::server::connection::ConnectionRegistry;

/// Production market data stream endpoint
pub const DEFAULT_WS_URL: &str = "wss://ws.bittrex.com/feed";

/// Default watchdog staleness bound
pub const DEFAULT_WATCHDOG_TIMEOUT: Duration = Duration::from_secs(60);

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// True when the stream has gone stale: an event has been seen before and
/// the last one is older than the timeout. Pre-first-event (`None`) never
/// expires.
pub fn watchdog_expired(last_event: Option<Instant>, now: Instant, timeout: Duration) -> bool {
    match last_event {
        Some(t) => now.duration_since(t) > timeout,
        None => false,
    }
}

pub struct WsSupervisor {
    state: Arc<MarketState>,
    registry: Arc<ConnectionRegistry>,
    url: String,
    timeout: Duration,
    heartbeat: Option<Duration>,
}

impl WsSupervisor {
    pub fn new(
        state: Arc<MarketState>,
        registry: Arc<ConnectionRegistry>,
        url: impl Into<String>,
        timeout: Duration,
        heartbeat: Option<Duration>,
    ) -> WsSupervisor {
        WsSupervisor {
            state,
            registry,
            url: url.into(),
            timeout,
            heartbeat,
        }
    }

    /// Supervision loop: one session at a time, reconnect on any exit.
    pub async fn run(self) {
        loop {
            match self.session().await {
                Ok(()) => tracing::info!("upstream stream closed; reconnecting"),
                Err(e) => tracing::error!("upstream stream failed: {}; reconnecting", e),
            }
            sleep(RECONNECT_DELAY).await;
        }
    }

    /// One connected session, from subscribe to first failure or close.
    async fn session(&self) -> Result<(), BridgeError> {
        let (ws, _) = connect_async(self.url.as_str()).await?;
        tracing::info!("connected to upstream stream at {}", self.url);
        let (mut write, mut read) = ws.split();

        // Stream ids are assigned per connection; stale ones are garbage now
        self.state.clear_subids().await;
        let symbols = self.state.ticker_symbols().await;
        tracing::info!("subscribing {} symbols", symbols.len());
        for symbol in symbols {
            let cmd = StreamCommand::Subscribe { symbol };
            write
                .send(Message::text(serde_json::to_string(&cmd)?))
                .await?;
        }

        let mut last_event: Option<Instant> = None;
        let mut watchdog = interval(self.timeout);
        let ping_enabled = self.heartbeat.is_some();
        let mut ping = interval(self.heartbeat.unwrap_or(Duration::from_secs(3600)));

        loop {
            tokio::select! {
                _ = watchdog.tick() => {
                    if watchdog_expired(last_event, Instant::now(), self.timeout) {
                        return Err(BridgeError::WebSocket(format!(
                            "no events within {:?}", self.timeout
                        )));
                    }
                }
                _ = ping.tick(), if ping_enabled => {
                    write.send(Message::Ping(Vec::new().into())).await?;
                }
                msg = read.next() => {
                    let Some(msg) = msg else { return Ok(()) };
                    last_event = Some(Instant::now());
                    match msg? {
                        Message::Text(text) => {
                            let event: StreamMessage = serde_json::from_str(&text)?;
                            self.handle_event(event).await;
                        }
                        Message::Close(frame) => {
                            tracing::info!("upstream sent close: {:?}", frame);
                            return Ok(());
                        }
                        Message::Ping(_) | Message::Pong(_) => {}
                        other => {
                            tracing::debug!("ignoring non-text upstream frame: {:?}", other);
                        }
                    }
                }
            }
        }
    }

    async fn handle_event(&self, event: StreamMessage) {
        match event {
            StreamMessage::Snapshot {
                subid,
                symbol,
                bids,
                asks,
            } => {
                tracing::debug!("book snapshot for {} (subid {})", symbol, subid);
                self.state.record_subid(subid, &symbol).await;
                self.state
                    .install_book(&symbol, &bids, &asks, Utc::now())
                    .await;
            }
            StreamMessage::Update {
                subid,
                side,
                price,
                qty,
            } => {
                let Some(symbol) = self.state.symbol_for_subid(subid).await else {
                    tracing::error!("book update for unknown subid {}", subid);
                    return;
                };
                let now = Utc::now();
                let entry = DepthEntry {
                    side: Some(side.into()),
                    price,
                    quantity: qty,
                };
                if let Err(e) = self.state.apply_depth(&symbol, &[entry], now).await {
                    tracing::error!("book update for {} rejected: {}", symbol, e);
                    return;
                }
                self.registry
                    .broadcast_depth_update(&symbol, side.into(), price, qty, now)
                    .await;
            }
            StreamMessage::Trade {
                subid,
                ts,
                side,
                price,
                qty,
            } => {
                let Some(symbol) = self.state.symbol_for_subid(subid).await else {
                    tracing::error!("trade for unknown subid {}", subid);
                    return;
                };
                let trade = LatestTrade {
                    timestamp: f64_to_datetime(ts),
                    side: side.into(),
                    price,
                    quantity: qty,
                };
                self.state.store_trade(&symbol, trade).await;
                self.registry.broadcast_trade(&symbol, &trade).await;
            }
            StreamMessage::Error { text } => {
                tracing::warn!("upstream error message: {}", text);
            }
        }
    }
}
