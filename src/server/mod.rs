//! DTC Server
//!
//! TCP accept loop, per-connection framed read loop and request dispatch.
//! Each accepted socket gets a writer task draining the connection's message
//! queue; the read loop decodes frames and hands typed requests to the
//! session handlers. Unknown or undecodable frames are dropped with a log,
//! never closing the connection.

pub mod connection;
pub mod handlers;
pub mod orders;

use futures_util::StreamExt;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;

use crate::bittrex::BittrexClient;
use crate::config::BridgeConfig;
use crate::dtc::{DtcCodec, Request};
use crate::market::MarketState;
use crate::rest_sync::RestSync;
use connection::{ClientWriter, Connection, ConnectionRegistry, WRITER_QUEUE_DEPTH};

/// Exchange identifier carried in every emitted symbol
pub const EXCHANGE: &str = "BTREX";
/// Server name reported at logon
pub const SERVER_NAME: &str = "btrex-bridge";
/// Symbol/exchange delimiter advertised at logon
pub const SYMBOL_DELIMITER: &str = "-";

/// Shared context for the live bridge server; cheap to clone per client.
#[derive(Clone)]
pub struct DtcServer {
    pub state: Arc<MarketState>,
    pub registry: Arc<ConnectionRegistry>,
    pub rest: RestSync,
    pub client: BittrexClient,
    pub config: Arc<BridgeConfig>,
    /// Symbols the exchange allows leveraged trading on; routed to the
    /// margin submit endpoint
    pub margin_symbols: Arc<HashSet<String>>,
}

impl DtcServer {
    /// Accept loop; never returns while the listener lives.
    pub async fn run(self, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let server = self.clone();
                    tokio::spawn(async move {
                        server.handle_client(stream, peer.to_string()).await;
                    });
                }
                Err(e) => {
                    tracing::error!("accept failed: {}", e);
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                }
            }
        }
    }

    /// One client from accept to teardown.
    async fn handle_client(self, stream: TcpStream, addr: String) {
        tracing::info!("client connected from {}", addr);
        let (read_half, write_half) = stream.into_split();

        let (tx, rx) = mpsc::channel(WRITER_QUEUE_DEPTH);
        let writer = ClientWriter::new(tx);
        tokio::spawn(writer_task(write_half, rx, writer.close_signal(), addr.clone()));

        let conn = Arc::new(Connection::new(addr.clone(), writer));
        self.registry.register(conn.clone()).await;

        let session = Session {
            conn: conn.clone(),
            state: self.state.clone(),
            registry: self.registry.clone(),
            rest: self.rest.clone(),
            client: self.client.clone(),
            config: self.config.clone(),
            margin_symbols: self.margin_symbols.clone(),
        };

        let mut frames = FramedRead::new(read_half, DtcCodec);
        while let Some(result) = frames.next().await {
            let frame = match result {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!("read error from {}: {}", addr, e);
                    break;
                }
            };
            match Request::decode(&frame) {
                Ok(Some(request)) => session.handle(request).await,
                Ok(None) => {
                    tracing::warn!(
                        "dropping frame with unknown type {} from {}",
                        frame.type_id,
                        addr
                    );
                }
                Err(e) => {
                    tracing::warn!("dropping undecodable frame from {}: {}", addr, e);
                }
            }
            if conn.writer.is_closed() {
                // The writer died on an I/O error; finish teardown here
                break;
            }
        }

        conn.writer.close();
        self.registry.remove(&addr).await;
        tracing::info!("client {} disconnected", addr);
    }
}

/// Drains one connection's outbound queue into its socket until the close
/// signal flips or a write fails; either way the writer ends up closed and
/// the per-connection timers observe it and stop.
async fn writer_task(
    mut write_half: OwnedWriteHalf,
    mut rx: mpsc::Receiver<bytes::Bytes>,
    mut close: tokio::sync::watch::Receiver<bool>,
    addr: String,
) {
    loop {
        tokio::select! {
            changed = close.changed() => {
                if changed.is_err() || *close.borrow() {
                    break;
                }
            }
            bytes = rx.recv() => {
                let Some(bytes) = bytes else { break };
                if let Err(e) = write_half.write_all(&bytes).await {
                    tracing::error!("write to {} failed: {}", addr, e);
                    break;
                }
            }
        }
    }
    let _ = write_half.shutdown().await;
}

/// Per-connection handler context: one per client, borrowed by every
/// request handler. Tests build one around their own state instances.
#[derive(Clone)]
pub struct Session {
    pub conn: Arc<Connection>,
    pub state: Arc<MarketState>,
    pub registry: Arc<ConnectionRegistry>,
    pub rest: RestSync,
    pub client: BittrexClient,
    pub config: Arc<BridgeConfig>,
    pub margin_symbols: Arc<HashSet<String>>,
}

impl Session {
    /// Exhaustive dispatch over the closed request set.
    pub async fn handle(&self, request: Request) {
        match request {
            Request::Encoding(req) => self.handle_encoding(req),
            Request::Logon(req) => self.handle_logon(req).await,
            // Client heartbeats carry no state the bridge tracks
            Request::Heartbeat(_) => {}
            Request::SecurityDefinitionForSymbol(req) => {
                self.handle_security_definition(req).await
            }
            Request::MarketData(req) => self.handle_market_data(req).await,
            Request::MarketDepth(req) => self.handle_market_depth(req).await,
            Request::OpenOrders(req) => self.handle_open_orders(req),
            Request::CurrentPositions(req) => self.handle_positions(req),
            Request::HistoricalOrderFills(req) => self.handle_order_fills(req),
            Request::TradeAccounts(req) => self.handle_trade_accounts(req),
            Request::AccountBalance(req) => self.handle_account_balance(req),
            Request::SubmitNewSingleOrder(req) => self.handle_submit_order(req).await,
            Request::CancelOrder(req) => self.handle_cancel_order(req).await,
            Request::CancelReplaceOrder(req) => self.handle_cancel_replace(req).await,
            Request::HistoricalPriceData(req) => {
                self.conn
                    .writer
                    .send(&crate::dtc::messages::HistoricalPriceDataReject {
                        request_id: req.request_id,
                        reject_text: "Historical data is served by the history service".into(),
                    });
            }
        }
    }
}
