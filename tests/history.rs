//! Historical service end-to-end: handshake, logon, then granulated and
//! raw-tick queries against a real store over a TCP loopback.

#![cfg(feature = "history")]

use futures_util::{SinkExt, StreamExt};
use prost::Message;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

use btrex_bridge::dtc::codec::{message_frame, Frame, ENCODING_RESPONSE};
use btrex_bridge::dtc::messages::*;
use btrex_bridge::dtc::DtcCodec;
use btrex_bridge::history::{HistoryServer, Tick, TickStore};
use btrex_bridge::market::Side;

const SECOND_NS: u64 = 1_000_000_000;

fn tick(secs: u64, side: Side, price: f64, quantity: f64) -> Tick {
    Tick {
        ts_ns: secs * SECOND_NS,
        side,
        price,
        quantity,
    }
}

async fn start_server(ticks: &[Tick]) -> (tempfile::TempDir, std::net::SocketAddr) {
    let dir = tempfile::tempdir().unwrap();
    let store = TickStore::open(dir.path(), "BTC-ETH").unwrap();
    store.put_batch(ticks).unwrap();

    let mut stores = HashMap::new();
    stores.insert("BTC-ETH".to_string(), Arc::new(store));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(HistoryServer::new(Arc::new(stores)).run(listener));
    (dir, addr)
}

async fn connect_and_logon(addr: std::net::SocketAddr) -> Framed<TcpStream, DtcCodec> {
    let stream = TcpStream::connect(addr).await.unwrap();
    let mut framed = Framed::new(stream, DtcCodec);

    // Encoding negotiation
    let mut payload = bytes::BytesMut::new();
    use bytes::BufMut;
    payload.put_i32_le(7);
    payload.put_i32_le(EncodingEnum::ProtocolBuffers as i32);
    payload.put_slice(b"DTC\0");
    framed
        .send(Frame {
            type_id: 6,
            payload: payload.freeze(),
        })
        .await
        .unwrap();
    let response = framed.next().await.unwrap().unwrap();
    assert_eq!(response.type_id, ENCODING_RESPONSE);

    framed
        .send(message_frame(&LogonRequest {
            protocol_version: 7,
            ..Default::default()
        }))
        .await
        .unwrap();
    let frame = framed.next().await.unwrap().unwrap();
    assert_eq!(frame.type_id, MessageType::LogonResponse as u16);
    let logon = LogonResponse::decode(&frame.payload[..]).unwrap();
    assert!(logon.historical_price_data_supported);

    framed
}

#[tokio::test]
async fn test_granulated_query_streams_bars_and_sentinel() {
    // Two one-minute buckets: 3 ticks then 1 tick
    let (_dir, addr) = start_server(&[
        tick(1_000, Side::Buy, 10.0, 1.0),
        tick(1_010, Side::Sell, 12.0, 2.0),
        tick(1_020, Side::Buy, 9.0, 1.0),
        tick(1_120, Side::Buy, 11.0, 4.0),
    ])
    .await;
    let mut framed = connect_and_logon(addr).await;

    framed
        .send(message_frame(&HistoricalPriceDataRequest {
            request_id: 5,
            symbol: "BTC-ETH".into(),
            exchange: "BTREX".into(),
            record_interval: 60,
            start_date_time: 0,
            end_date_time: 0,
            ..Default::default()
        }))
        .await
        .unwrap();

    let frame = framed.next().await.unwrap().unwrap();
    assert_eq!(frame.type_id, MessageType::HistoricalPriceDataResponseHeader as u16);
    let header = HistoricalPriceDataResponseHeader::decode(&frame.payload[..]).unwrap();
    assert_eq!(header.request_id, 5);
    assert_eq!(header.record_interval, 60);
    assert!(!header.no_records_to_return);

    let mut bars = Vec::new();
    loop {
        let frame = framed.next().await.unwrap().unwrap();
        assert_eq!(
            frame.type_id,
            MessageType::HistoricalPriceDataRecordResponse as u16
        );
        let record = HistoricalPriceDataRecordResponse::decode(&frame.payload[..]).unwrap();
        if record.is_final_record {
            break;
        }
        bars.push(record);
    }

    assert_eq!(bars.len(), 2);
    assert_eq!(bars[0].start_date_time, 1_000);
    assert_eq!(bars[0].open_price, 10.0);
    assert_eq!(bars[0].high_price, 12.0);
    assert_eq!(bars[0].low_price, 9.0);
    assert_eq!(bars[0].last_price, 9.0);
    assert_eq!(bars[0].volume, 4.0);
    assert_eq!(bars[0].num_trades, 3);
    assert_eq!(bars[0].bid_volume, 2.0);
    assert_eq!(bars[0].ask_volume, 2.0);
    assert_eq!(bars[1].start_date_time, 1_120);
    assert_eq!(bars[1].num_trades, 1);
}

#[tokio::test]
async fn test_zero_interval_streams_raw_ticks() {
    let (_dir, addr) = start_server(&[
        tick(2_000, Side::Buy, 5.0, 1.5),
        tick(2_001, Side::Sell, 5.1, 0.5),
    ])
    .await;
    let mut framed = connect_and_logon(addr).await;

    framed
        .send(message_frame(&HistoricalPriceDataRequest {
            request_id: 6,
            symbol: "BTC-ETH".into(),
            exchange: "BTREX".into(),
            record_interval: 0,
            ..Default::default()
        }))
        .await
        .unwrap();

    let frame = framed.next().await.unwrap().unwrap();
    assert_eq!(frame.type_id, MessageType::HistoricalPriceDataResponseHeader as u16);

    let mut ticks = Vec::new();
    loop {
        let frame = framed.next().await.unwrap().unwrap();
        assert_eq!(
            frame.type_id,
            MessageType::HistoricalPriceDataTickRecordResponse as u16
        );
        let record = HistoricalPriceDataTickRecordResponse::decode(&frame.payload[..]).unwrap();
        if record.is_final_record {
            break;
        }
        ticks.push(record);
    }

    assert_eq!(ticks.len(), 2);
    assert_eq!(ticks[0].price, 5.0);
    assert_eq!(ticks[0].date_time, 2_000.0);
    assert_eq!(ticks[0].at_bid_or_ask, AtBidOrAsk::AtAsk as i32);
    assert_eq!(ticks[1].at_bid_or_ask, AtBidOrAsk::AtBid as i32);
}

#[tokio::test]
async fn test_empty_range_answers_no_records() {
    let (_dir, addr) = start_server(&[tick(3_000, Side::Buy, 1.0, 1.0)]).await;
    let mut framed = connect_and_logon(addr).await;

    framed
        .send(message_frame(&HistoricalPriceDataRequest {
            request_id: 7,
            symbol: "BTC-ETH".into(),
            exchange: "BTREX".into(),
            record_interval: 60,
            start_date_time: 10_000,
            end_date_time: 20_000,
            ..Default::default()
        }))
        .await
        .unwrap();

    let frame = framed.next().await.unwrap().unwrap();
    let header = HistoricalPriceDataResponseHeader::decode(&frame.payload[..]).unwrap();
    assert!(header.no_records_to_return);
}

#[tokio::test]
async fn test_unknown_symbol_rejected() {
    let (_dir, addr) = start_server(&[]).await;
    let mut framed = connect_and_logon(addr).await;

    framed
        .send(message_frame(&HistoricalPriceDataRequest {
            request_id: 8,
            symbol: "NO-PE".into(),
            exchange: "BTREX".into(),
            ..Default::default()
        }))
        .await
        .unwrap();

    let frame = framed.next().await.unwrap().unwrap();
    assert_eq!(frame.type_id, MessageType::HistoricalPriceDataReject as u16);
    let reject = HistoricalPriceDataReject::decode(&frame.payload[..]).unwrap();
    assert_eq!(reject.reject_text, "Unknown symbol NO-PE");
}
