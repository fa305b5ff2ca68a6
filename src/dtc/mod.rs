//! DTC Protocol Layer
//!
//! Wire framing, protobuf message definitions and the inbound request
//! variant the server dispatches on.

pub mod codec;
pub mod messages;

use crate::error::BridgeError;
use codec::{EncodingRequest, Frame};
use messages::MessageType;
use prost::Message;

pub use codec::{frame_message, DtcCodec, EncodingResponse, CURRENT_VERSION};

/// Every request kind a client can send, decoded and typed.
///
/// A closed tagged variant instead of trait objects: the dispatch match in
/// the server is exhaustive, so adding a request type is a compile error
/// until every consumer handles it.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Encoding(EncodingRequest),
    Logon(messages::LogonRequest),
    Heartbeat(messages::Heartbeat),
    SecurityDefinitionForSymbol(messages::SecurityDefinitionForSymbolRequest),
    MarketData(messages::MarketDataRequest),
    MarketDepth(messages::MarketDepthRequest),
    OpenOrders(messages::OpenOrdersRequest),
    CurrentPositions(messages::CurrentPositionsRequest),
    HistoricalOrderFills(messages::HistoricalOrderFillsRequest),
    TradeAccounts(messages::TradeAccountsRequest),
    AccountBalance(messages::AccountBalanceRequest),
    SubmitNewSingleOrder(messages::SubmitNewSingleOrder),
    CancelOrder(messages::CancelOrder),
    CancelReplaceOrder(messages::CancelReplaceOrder),
    HistoricalPriceData(messages::HistoricalPriceDataRequest),
}

impl Request {
    /// Decodes a frame into a typed request.
    ///
    /// `Ok(None)` for type ids outside the closed set (caller logs and
    /// drops); `Err` when the payload does not parse as the claimed type or
    /// a response-direction id arrives inbound.
    pub fn decode(frame: &Frame) -> Result<Option<Request>, BridgeError> {
        let Some(message_type) = frame.message_type() else {
            return Ok(None);
        };
        let payload = &frame.payload[..];
        let request = match message_type {
            MessageType::EncodingRequest => {
                Request::Encoding(EncodingRequest::from_payload(payload)?)
            }
            MessageType::LogonRequest => {
                Request::Logon(messages::LogonRequest::decode(payload)?)
            }
            MessageType::Heartbeat => Request::Heartbeat(messages::Heartbeat::decode(payload)?),
            MessageType::SecurityDefinitionForSymbolRequest => {
                Request::SecurityDefinitionForSymbol(
                    messages::SecurityDefinitionForSymbolRequest::decode(payload)?,
                )
            }
            MessageType::MarketDataRequest => {
                Request::MarketData(messages::MarketDataRequest::decode(payload)?)
            }
            MessageType::MarketDepthRequest => {
                Request::MarketDepth(messages::MarketDepthRequest::decode(payload)?)
            }
            MessageType::OpenOrdersRequest => {
                Request::OpenOrders(messages::OpenOrdersRequest::decode(payload)?)
            }
            MessageType::CurrentPositionsRequest => {
                Request::CurrentPositions(messages::CurrentPositionsRequest::decode(payload)?)
            }
            MessageType::HistoricalOrderFillsRequest => Request::HistoricalOrderFills(
                messages::HistoricalOrderFillsRequest::decode(payload)?,
            ),
            MessageType::TradeAccountsRequest => {
                Request::TradeAccounts(messages::TradeAccountsRequest::decode(payload)?)
            }
            MessageType::AccountBalanceRequest => {
                Request::AccountBalance(messages::AccountBalanceRequest::decode(payload)?)
            }
            MessageType::SubmitNewSingleOrder => {
                Request::SubmitNewSingleOrder(messages::SubmitNewSingleOrder::decode(payload)?)
            }
            MessageType::CancelOrder => {
                Request::CancelOrder(messages::CancelOrder::decode(payload)?)
            }
            MessageType::CancelReplaceOrder => {
                Request::CancelReplaceOrder(messages::CancelReplaceOrder::decode(payload)?)
            }
            MessageType::HistoricalPriceDataRequest => {
                Request::HistoricalPriceData(messages::HistoricalPriceDataRequest::decode(
                    payload,
                )?)
            }
            other => {
                return Err(BridgeError::Protocol(format!(
                    "response-direction message {:?} received from client",
                    other
                )))
            }
        };
        Ok(Some(request))
    }
}
