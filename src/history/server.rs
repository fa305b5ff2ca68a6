//! Historical Data Server
//!
//! A DTC endpoint serving price history from the tick stores: encoding
//! handshake, logon, then `HISTORICAL_PRICE_DATA_REQUEST`s answered with a
//! header and a stream of records. A positive record interval yields
//! granulated OHLCV bars, interval zero yields raw ticks. Records stream
//! through the granulator in one pass straight off the store iterator.

use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

use crate::dtc::codec::{
    message_frame, DtcCodec, EncodingResponse, Frame, CURRENT_VERSION, ENCODING_RESPONSE,
};
use crate::dtc::messages::*;
use crate::dtc::Request;
use crate::error::BridgeError;
use crate::history::granulator::{Bar, Granulator};
use crate::history::store::TickStore;
use crate::market::Side;
use crate::server::{EXCHANGE, SYMBOL_DELIMITER};

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Serves historical queries from one tick store per symbol.
#[derive(Clone)]
pub struct HistoryServer {
    stores: Arc<HashMap<String, Arc<TickStore>>>,
}

impl HistoryServer {
    pub fn new(stores: Arc<HashMap<String, Arc<TickStore>>>) -> HistoryServer {
        HistoryServer { stores }
    }

    /// Accept loop; never returns while the listener lives.
    pub async fn run(self, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let server = self.clone();
                    tokio::spawn(async move {
                        let addr = peer.to_string();
                        if let Err(e) = server.handle_client(stream, &addr).await {
                            tracing::error!("history client {} failed: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("accept failed: {}", e);
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                }
            }
        }
    }

    async fn handle_client(&self, stream: TcpStream, addr: &str) -> Result<(), BridgeError> {
        tracing::info!("history client connected from {}", addr);
        let mut framed = Framed::new(stream, DtcCodec);

        while let Some(result) = framed.next().await {
            let frame = result?;
            let request = match Request::decode(&frame) {
                Ok(Some(request)) => request,
                Ok(None) => {
                    tracing::warn!("dropping unknown type {} from {}", frame.type_id, addr);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("dropping undecodable frame from {}: {}", addr, e);
                    continue;
                }
            };
            match request {
                Request::Encoding(_) => {
                    framed
                        .send(Frame {
                            type_id: ENCODING_RESPONSE,
                            payload: EncodingResponse::protobuf().to_payload(),
                        })
                        .await?;
                }
                Request::Logon(_) => {
                    framed
                        .send(message_frame(&LogonResponse {
                            protocol_version: CURRENT_VERSION,
                            result: LogonStatus::Success as i32,
                            result_text: "Historical data service".to_string(),
                            server_name: "btrex-history".to_string(),
                            symbol_exchange_delimiter: SYMBOL_DELIMITER.to_string(),
                            historical_price_data_supported: true,
                            ..Default::default()
                        }))
                        .await?;
                }
                Request::Heartbeat(_) => {}
                Request::HistoricalPriceData(req) => {
                    self.serve_history(&mut framed, req).await?;
                }
                other => {
                    tracing::warn!("history service ignoring {:?} from {}", other, addr);
                }
            }
        }
        tracing::info!("history client {} disconnected", addr);
        Ok(())
    }

    async fn serve_history(
        &self,
        framed: &mut Framed<TcpStream, DtcCodec>,
        req: HistoricalPriceDataRequest,
    ) -> Result<(), BridgeError> {
        let known = (req.exchange.is_empty() || req.exchange == EXCHANGE)
            .then(|| self.stores.get(&req.symbol))
            .flatten();
        let Some(store) = known else {
            framed
                .send(message_frame(&HistoricalPriceDataReject {
                    request_id: req.request_id,
                    reject_text: format!("Unknown symbol {}", req.symbol),
                }))
                .await?;
            return Ok(());
        };

        // Whole-second query bounds; zero means genesis / open-ended
        let start_ns = req.start_date_time.max(0) as u64 * NANOS_PER_SECOND;
        let end_ns = if req.end_date_time == 0 {
            u64::MAX
        } else {
            req.end_date_time as u64 * NANOS_PER_SECOND + (NANOS_PER_SECOND - 1)
        };

        let mut ticks = store.scan(start_ns, end_ns).peekable();
        let no_records = ticks.peek().is_none();
        framed
            .send(message_frame(&HistoricalPriceDataResponseHeader {
                request_id: req.request_id,
                record_interval: req.record_interval,
                use_zlib_compression: false,
                no_records_to_return: no_records,
                int_to_float_price_divisor: 1.0,
            }))
            .await?;
        if no_records {
            return Ok(());
        }

        if req.record_interval == 0 {
            for tick in ticks {
                let tick = tick?;
                framed
                    .send(message_frame(&HistoricalPriceDataTickRecordResponse {
                        request_id: req.request_id,
                        date_time: tick.ts_ns as f64 / NANOS_PER_SECOND as f64,
                        at_bid_or_ask: match tick.side {
                            Side::Buy => AtBidOrAsk::AtAsk as i32,
                            Side::Sell => AtBidOrAsk::AtBid as i32,
                        },
                        price: tick.price,
                        volume: tick.quantity,
                        is_final_record: false,
                    }))
                    .await?;
            }
            framed
                .send(message_frame(&HistoricalPriceDataTickRecordResponse {
                    request_id: req.request_id,
                    is_final_record: true,
                    ..Default::default()
                }))
                .await?;
        } else {
            let span_ns = req.record_interval as u64 * NANOS_PER_SECOND;
            let mut granulator = Granulator::new(span_ns);
            for tick in ticks {
                if let Some(bar) = granulator.push(&tick?) {
                    framed.send(bar_frame(req.request_id, &bar)).await?;
                }
            }
            if let Some(bar) = granulator.finish() {
                framed.send(bar_frame(req.request_id, &bar)).await?;
            }
            framed
                .send(message_frame(&HistoricalPriceDataRecordResponse {
                    request_id: req.request_id,
                    is_final_record: true,
                    ..Default::default()
                }))
                .await?;
        }
        Ok(())
    }
}

fn bar_frame(request_id: i32, bar: &Bar) -> Frame {
    message_frame(&HistoricalPriceDataRecordResponse {
        request_id,
        start_date_time: (bar.start_ns / NANOS_PER_SECOND) as i64,
        open_price: bar.open,
        high_price: bar.high,
        low_price: bar.low,
        last_price: bar.last,
        volume: bar.volume,
        num_trades: bar.num_trades,
        bid_volume: bar.bid_volume.unwrap_or_default(),
        ask_volume: bar.ask_volume.unwrap_or_default(),
        is_final_record: false,
    })
}
