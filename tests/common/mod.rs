//! Shared test infrastructure: capture-writer sessions around fresh state
//! instances and frame decoding helpers for asserting wire output.

use bytes::Bytes;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

use btrex_bridge::bittrex::BittrexClient;
use btrex_bridge::config::BridgeConfig;
use btrex_bridge::dtc::messages::WireMessage;
use btrex_bridge::market::{MarketState, Ticker};
use btrex_bridge::server::connection::{ClientWriter, Connection, ConnectionRegistry};
use btrex_bridge::server::Session;
use btrex_bridge::RestSync;

/// A session wired to in-memory state, its writer output captured.
pub struct TestClient {
    pub session: Session,
    pub written: mpsc::Receiver<Bytes>,
}

/// Builds a session around the given state and a running REST queue, with
/// the REST client pointed wherever the test wants (usually a wiremock
/// server).
pub fn test_client_with(
    client: BittrexClient,
    state: Arc<MarketState>,
    registry: Arc<ConnectionRegistry>,
) -> TestClient {
    let (tx, written) = mpsc::channel(256);
    let conn = Arc::new(Connection::new("127.0.0.1:12345", ClientWriter::new(tx)));
    let (rest, consumer) = RestSync::new(64);
    tokio::spawn(consumer.run());
    let session = Session {
        conn,
        state,
        registry,
        rest,
        client,
        config: Arc::new(BridgeConfig::default()),
        margin_symbols: Arc::new(HashSet::new()),
    };
    TestClient { session, written }
}

impl TestClient {
    /// Registers this client's connection so fan-out paths reach it.
    pub async fn register(&self) {
        self.session.registry.register(self.session.conn.clone()).await;
    }

    /// Next written frame, split into type id and payload.
    pub async fn next_frame(&mut self) -> (u16, Bytes) {
        let bytes = tokio::time::timeout(std::time::Duration::from_secs(5), self.written.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("writer closed");
        split_frame(&bytes)
    }

    /// Next written message, asserting its type.
    pub async fn expect<M: WireMessage>(&mut self) -> M {
        let (type_id, payload) = self.next_frame().await;
        assert_eq!(
            type_id,
            M::MESSAGE_TYPE as u16,
            "expected {:?}",
            M::MESSAGE_TYPE
        );
        M::decode(&payload[..]).expect("payload decodes")
    }

    pub fn no_pending_output(&mut self) -> bool {
        self.written.try_recv().is_err()
    }
}

/// Splits one framed wire message, checking the header length invariant.
pub fn split_frame(bytes: &Bytes) -> (u16, Bytes) {
    let total = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
    assert_eq!(total, bytes.len(), "frame length field must match the frame");
    let type_id = u16::from_le_bytes([bytes[2], bytes[3]]);
    (type_id, bytes.slice(4..))
}

pub fn ticker(bid: f64, ask: f64, last: f64, low: f64, high: f64, volume: f64) -> Ticker {
    Ticker {
        bid,
        ask,
        last,
        low24h: low,
        high24h: high,
        base_volume: volume,
    }
}
