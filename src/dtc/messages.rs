//! DTC Message Definitions
//!
//! Hand-written prost structs for every DTC message the bridge sends or
//! receives, plus the closed set of wire type ids. Payloads are protobuf
//! encoded; the encoding negotiation handshake alone uses a raw fixed-size
//! record and lives in the codec module.
//!
//! Field numbering is per-message and stable; enum values follow the DTC
//! protocol's published constants so the default (0) variant is always the
//! "unset" state protobuf gives absent fields.

use crate::dtc::codec::{ENCODING_REQUEST, ENCODING_RESPONSE};

/// Closed set of DTC message type ids carried in the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageType {
    LogonRequest = 1,
    LogonResponse = 2,
    Heartbeat = 3,
    EncodingRequest = ENCODING_REQUEST,
    EncodingResponse = ENCODING_RESPONSE,

    MarketDataRequest = 101,
    MarketDepthRequest = 102,
    MarketDataReject = 103,
    MarketDataSnapshot = 104,
    MarketDepthUpdateLevel = 106,
    MarketDataUpdateTrade = 107,
    MarketDataUpdateBidAsk = 108,
    MarketDataUpdateSessionVolume = 113,
    MarketDataUpdateSessionHigh = 114,
    MarketDataUpdateSessionLow = 115,
    MarketDepthReject = 121,
    MarketDepthSnapshotLevel = 122,

    CancelOrder = 203,
    CancelReplaceOrder = 204,
    SubmitNewSingleOrder = 208,

    OpenOrdersRequest = 300,
    OrderUpdate = 301,
    HistoricalOrderFillsRequest = 303,
    HistoricalOrderFillResponse = 304,
    CurrentPositionsRequest = 305,
    PositionUpdate = 306,

    TradeAccountsRequest = 400,
    TradeAccountResponse = 401,

    SecurityDefinitionForSymbolRequest = 506,
    SecurityDefinitionResponse = 507,
    SecurityDefinitionReject = 509,

    AccountBalanceUpdate = 600,
    AccountBalanceRequest = 601,
    AccountBalanceReject = 602,

    HistoricalPriceDataRequest = 800,
    HistoricalPriceDataResponseHeader = 801,
    HistoricalPriceDataReject = 802,
    HistoricalPriceDataRecordResponse = 803,
    HistoricalPriceDataTickRecordResponse = 804,
}

impl MessageType {
    /// Maps a raw header id back into the closed enum. `None` for ids the
    /// bridge does not speak; callers log and drop those frames.
    pub fn from_wire(id: u16) -> Option<MessageType> {
        use MessageType::*;
        Some(match id {
            1 => LogonRequest,
            2 => LogonResponse,
            3 => Heartbeat,
            ENCODING_REQUEST => EncodingRequest,
            ENCODING_RESPONSE => EncodingResponse,
            101 => MarketDataRequest,
            102 => MarketDepthRequest,
            103 => MarketDataReject,
            104 => MarketDataSnapshot,
            106 => MarketDepthUpdateLevel,
            107 => MarketDataUpdateTrade,
            108 => MarketDataUpdateBidAsk,
            113 => MarketDataUpdateSessionVolume,
            114 => MarketDataUpdateSessionHigh,
            115 => MarketDataUpdateSessionLow,
            121 => MarketDepthReject,
            122 => MarketDepthSnapshotLevel,
            203 => CancelOrder,
            204 => CancelReplaceOrder,
            208 => SubmitNewSingleOrder,
            300 => OpenOrdersRequest,
            301 => OrderUpdate,
            303 => HistoricalOrderFillsRequest,
            304 => HistoricalOrderFillResponse,
            305 => CurrentPositionsRequest,
            306 => PositionUpdate,
            400 => TradeAccountsRequest,
            401 => TradeAccountResponse,
            506 => SecurityDefinitionForSymbolRequest,
            507 => SecurityDefinitionResponse,
            509 => SecurityDefinitionReject,
            600 => AccountBalanceUpdate,
            601 => AccountBalanceRequest,
            602 => AccountBalanceReject,
            800 => HistoricalPriceDataRequest,
            801 => HistoricalPriceDataResponseHeader,
            802 => HistoricalPriceDataReject,
            803 => HistoricalPriceDataRecordResponse,
            804 => HistoricalPriceDataTickRecordResponse,
            _ => return None,
        })
    }
}

/// Implemented by every outbound protobuf message so the codec can frame it
/// with the right header without dynamic dispatch.
pub trait WireMessage: prost::Message + Default {
    const MESSAGE_TYPE: MessageType;
}

macro_rules! wire_message {
    ($ty:ty, $id:ident) => {
        impl WireMessage for $ty {
            const MESSAGE_TYPE: MessageType = MessageType::$id;
        }
    };
}

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum EncodingEnum {
    BinaryEncoding = 0,
    BinaryWithVariableLengthStrings = 1,
    JsonEncoding = 2,
    JsonCompactEncoding = 3,
    ProtocolBuffers = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum LogonStatus {
    Unset = 0,
    Success = 1,
    Error = 2,
    ErrorNoReconnect = 3,
    ReconnectNewAddress = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum RequestAction {
    Unset = 0,
    Subscribe = 1,
    Unsubscribe = 2,
    Snapshot = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum SecurityType {
    Unset = 0,
    Future = 1,
    Stock = 2,
    Forex = 3,
    Index = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum PriceDisplayFormat {
    Decimal0 = 0,
    Decimal1 = 1,
    Decimal2 = 2,
    Decimal3 = 3,
    Decimal4 = 4,
    Decimal5 = 5,
    Decimal6 = 6,
    Decimal7 = 7,
    Decimal8 = 8,
    Decimal9 = 9,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum BuySell {
    Unset = 0,
    Buy = 1,
    Sell = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum AtBidOrAsk {
    Unset = 0,
    AtBid = 1,
    AtAsk = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum MarketDepthUpdateType {
    Unset = 0,
    InsertOrUpdate = 1,
    Delete = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum OrderStatus {
    Unset = 0,
    OrderSent = 1,
    PendingOpen = 2,
    PendingChild = 3,
    Open = 4,
    PendingCancelReplace = 5,
    PendingCancel = 6,
    Filled = 7,
    Canceled = 8,
    Rejected = 9,
    PartiallyFilled = 10,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum OrderUpdateReason {
    Unset = 0,
    OpenOrdersRequestResponse = 1,
    NewOrderAccepted = 2,
    GeneralOrderUpdate = 3,
    OrderFilled = 4,
    OrderFilledPartially = 5,
    OrderCanceled = 6,
    OrderCancelReplaceComplete = 7,
    NewOrderRejected = 8,
    OrderCancelRejected = 9,
    OrderCancelReplaceRejected = 10,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum OrderType {
    Unset = 0,
    Market = 1,
    Limit = 2,
    Stop = 3,
    StopLimit = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum TimeInForce {
    Unset = 0,
    Day = 1,
    GoodTillCanceled = 2,
    GoodTillDateTime = 3,
    ImmediateOrCancel = 4,
    AllOrNone = 5,
    FillOrKill = 6,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LogonRequest {
    #[prost(uint32, tag = "1")]
    pub protocol_version: u32,
    /// Bittrex API key ("username" in DTC terms); empty for read-only access
    #[prost(string, tag = "2")]
    pub username: String,
    /// Bittrex API secret
    #[prost(string, tag = "3")]
    pub password: String,
    #[prost(string, tag = "4")]
    pub general_text_data: String,
    /// Flag bits; bit 7 requests security definitions after logon
    #[prost(int32, tag = "5")]
    pub integer_1: i32,
    /// Must be 0 for a credentialed logon
    #[prost(int32, tag = "6")]
    pub integer_2: i32,
    #[prost(int32, tag = "7")]
    pub heartbeat_interval_in_seconds: i32,
    #[prost(string, tag = "8")]
    pub trade_account: String,
    #[prost(string, tag = "9")]
    pub hardware_identifier: String,
    #[prost(string, tag = "10")]
    pub client_name: String,
}
wire_message!(LogonRequest, LogonRequest);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LogonResponse {
    #[prost(uint32, tag = "1")]
    pub protocol_version: u32,
    #[prost(enumeration = "LogonStatus", tag = "2")]
    pub result: i32,
    #[prost(string, tag = "3")]
    pub result_text: String,
    #[prost(string, tag = "4")]
    pub reconnect_address: String,
    #[prost(string, tag = "5")]
    pub server_name: String,
    #[prost(bool, tag = "6")]
    pub market_depth_updates_best_bid_and_ask: bool,
    #[prost(bool, tag = "7")]
    pub trading_is_supported: bool,
    #[prost(bool, tag = "8")]
    pub oco_orders_supported: bool,
    #[prost(bool, tag = "9")]
    pub order_cancel_replace_supported: bool,
    #[prost(string, tag = "10")]
    pub symbol_exchange_delimiter: String,
    #[prost(bool, tag = "11")]
    pub security_definitions_supported: bool,
    #[prost(bool, tag = "12")]
    pub historical_price_data_supported: bool,
    #[prost(bool, tag = "13")]
    pub market_data_supported: bool,
    #[prost(bool, tag = "14")]
    pub market_depth_is_supported: bool,
    #[prost(bool, tag = "15")]
    pub bracket_orders_supported: bool,
}
wire_message!(LogonResponse, LogonResponse);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Heartbeat {
    #[prost(uint32, tag = "1")]
    pub num_dropped_messages: u32,
    #[prost(int64, tag = "2")]
    pub current_date_time: i64,
}
wire_message!(Heartbeat, Heartbeat);

// ---------------------------------------------------------------------------
// Security definitions
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SecurityDefinitionForSymbolRequest {
    #[prost(int32, tag = "1")]
    pub request_id: i32,
    #[prost(string, tag = "2")]
    pub symbol: String,
    #[prost(string, tag = "3")]
    pub exchange: String,
}
wire_message!(
    SecurityDefinitionForSymbolRequest,
    SecurityDefinitionForSymbolRequest
);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SecurityDefinitionResponse {
    #[prost(int32, tag = "1")]
    pub request_id: i32,
    #[prost(string, tag = "2")]
    pub symbol: String,
    #[prost(string, tag = "3")]
    pub exchange: String,
    #[prost(enumeration = "SecurityType", tag = "4")]
    pub security_type: i32,
    #[prost(string, tag = "5")]
    pub description: String,
    #[prost(float, tag = "6")]
    pub min_price_increment: f32,
    #[prost(enumeration = "PriceDisplayFormat", tag = "7")]
    pub price_display_format: i32,
    #[prost(float, tag = "8")]
    pub currency_value_per_increment: f32,
    #[prost(bool, tag = "9")]
    pub is_final_message: bool,
    #[prost(bool, tag = "10")]
    pub has_market_depth_data: bool,
}
wire_message!(SecurityDefinitionResponse, SecurityDefinitionResponse);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SecurityDefinitionReject {
    #[prost(int32, tag = "1")]
    pub request_id: i32,
    #[prost(string, tag = "2")]
    pub reject_text: String,
}
wire_message!(SecurityDefinitionReject, SecurityDefinitionReject);

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MarketDataRequest {
    #[prost(enumeration = "RequestAction", tag = "1")]
    pub request_action: i32,
    /// Client-chosen subscription id, unique per connection
    #[prost(uint32, tag = "2")]
    pub symbol_id: u32,
    #[prost(string, tag = "3")]
    pub symbol: String,
    #[prost(string, tag = "4")]
    pub exchange: String,
}
wire_message!(MarketDataRequest, MarketDataRequest);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MarketDataReject {
    #[prost(uint32, tag = "1")]
    pub symbol_id: u32,
    #[prost(string, tag = "2")]
    pub reject_text: String,
}
wire_message!(MarketDataReject, MarketDataReject);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MarketDataSnapshot {
    #[prost(uint32, tag = "1")]
    pub symbol_id: u32,
    #[prost(double, tag = "2")]
    pub session_high_price: f64,
    #[prost(double, tag = "3")]
    pub session_low_price: f64,
    #[prost(double, tag = "4")]
    pub session_volume: f64,
    #[prost(double, tag = "5")]
    pub bid_price: f64,
    #[prost(double, tag = "6")]
    pub bid_quantity: f64,
    #[prost(double, tag = "7")]
    pub ask_price: f64,
    #[prost(double, tag = "8")]
    pub ask_quantity: f64,
    #[prost(double, tag = "9")]
    pub last_trade_price: f64,
    #[prost(double, tag = "10")]
    pub last_trade_volume: f64,
    /// Seconds since epoch with fractional part
    #[prost(double, tag = "11")]
    pub last_trade_date_time: f64,
    #[prost(double, tag = "12")]
    pub bid_ask_date_time: f64,
}
wire_message!(MarketDataSnapshot, MarketDataSnapshot);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MarketDataUpdateTrade {
    #[prost(uint32, tag = "1")]
    pub symbol_id: u32,
    #[prost(enumeration = "AtBidOrAsk", tag = "2")]
    pub at_bid_or_ask: i32,
    #[prost(double, tag = "3")]
    pub price: f64,
    #[prost(double, tag = "4")]
    pub volume: f64,
    #[prost(double, tag = "5")]
    pub date_time: f64,
}
wire_message!(MarketDataUpdateTrade, MarketDataUpdateTrade);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MarketDataUpdateBidAsk {
    #[prost(uint32, tag = "1")]
    pub symbol_id: u32,
    #[prost(double, tag = "2")]
    pub bid_price: f64,
    #[prost(float, tag = "3")]
    pub bid_quantity: f32,
    #[prost(double, tag = "4")]
    pub ask_price: f64,
    #[prost(float, tag = "5")]
    pub ask_quantity: f32,
    #[prost(double, tag = "6")]
    pub date_time: f64,
}
wire_message!(MarketDataUpdateBidAsk, MarketDataUpdateBidAsk);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MarketDataUpdateSessionVolume {
    #[prost(uint32, tag = "1")]
    pub symbol_id: u32,
    #[prost(double, tag = "2")]
    pub volume: f64,
}
wire_message!(MarketDataUpdateSessionVolume, MarketDataUpdateSessionVolume);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MarketDataUpdateSessionHigh {
    #[prost(uint32, tag = "1")]
    pub symbol_id: u32,
    #[prost(double, tag = "2")]
    pub price: f64,
}
wire_message!(MarketDataUpdateSessionHigh, MarketDataUpdateSessionHigh);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MarketDataUpdateSessionLow {
    #[prost(uint32, tag = "1")]
    pub symbol_id: u32,
    #[prost(double, tag = "2")]
    pub price: f64,
}
wire_message!(MarketDataUpdateSessionLow, MarketDataUpdateSessionLow);

// ---------------------------------------------------------------------------
// Market depth
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MarketDepthRequest {
    #[prost(enumeration = "RequestAction", tag = "1")]
    pub request_action: i32,
    #[prost(uint32, tag = "2")]
    pub symbol_id: u32,
    #[prost(string, tag = "3")]
    pub symbol: String,
    #[prost(string, tag = "4")]
    pub exchange: String,
    #[prost(int32, tag = "5")]
    pub num_levels: i32,
}
wire_message!(MarketDepthRequest, MarketDepthRequest);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MarketDepthReject {
    #[prost(uint32, tag = "1")]
    pub symbol_id: u32,
    #[prost(string, tag = "2")]
    pub reject_text: String,
}
wire_message!(MarketDepthReject, MarketDepthReject);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MarketDepthSnapshotLevel {
    #[prost(uint32, tag = "1")]
    pub symbol_id: u32,
    #[prost(enumeration = "BuySell", tag = "2")]
    pub side: i32,
    #[prost(double, tag = "3")]
    pub price: f64,
    #[prost(double, tag = "4")]
    pub quantity: f64,
    #[prost(uint32, tag = "5")]
    pub level: u32,
    #[prost(bool, tag = "6")]
    pub is_first_message_in_batch: bool,
    #[prost(bool, tag = "7")]
    pub is_last_message_in_batch: bool,
    #[prost(double, tag = "8")]
    pub date_time: f64,
}
wire_message!(MarketDepthSnapshotLevel, MarketDepthSnapshotLevel);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MarketDepthUpdateLevel {
    #[prost(uint32, tag = "1")]
    pub symbol_id: u32,
    #[prost(enumeration = "BuySell", tag = "2")]
    pub side: i32,
    #[prost(double, tag = "3")]
    pub price: f64,
    #[prost(double, tag = "4")]
    pub quantity: f64,
    #[prost(enumeration = "MarketDepthUpdateType", tag = "5")]
    pub update_type: i32,
    #[prost(double, tag = "6")]
    pub date_time: f64,
}
wire_message!(MarketDepthUpdateLevel, MarketDepthUpdateLevel);

// ---------------------------------------------------------------------------
// Trading
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubmitNewSingleOrder {
    #[prost(string, tag = "1")]
    pub symbol: String,
    #[prost(string, tag = "2")]
    pub exchange: String,
    #[prost(string, tag = "3")]
    pub trade_account: String,
    #[prost(string, tag = "4")]
    pub client_order_id: String,
    #[prost(enumeration = "OrderType", tag = "5")]
    pub order_type: i32,
    #[prost(enumeration = "BuySell", tag = "6")]
    pub buy_sell: i32,
    #[prost(double, tag = "7")]
    pub price1: f64,
    #[prost(double, tag = "8")]
    pub price2: f64,
    /// Wire quantity: multiples of 1e-4 of the exchange base unit
    #[prost(double, tag = "9")]
    pub quantity: f64,
    #[prost(enumeration = "TimeInForce", tag = "10")]
    pub time_in_force: i32,
    #[prost(int64, tag = "11")]
    pub good_till_date_time: i64,
    #[prost(bool, tag = "12")]
    pub is_automated_order: bool,
}
wire_message!(SubmitNewSingleOrder, SubmitNewSingleOrder);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CancelOrder {
    #[prost(string, tag = "1")]
    pub server_order_id: String,
    #[prost(string, tag = "2")]
    pub client_order_id: String,
}
wire_message!(CancelOrder, CancelOrder);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CancelReplaceOrder {
    #[prost(string, tag = "1")]
    pub server_order_id: String,
    #[prost(string, tag = "2")]
    pub client_order_id: String,
    #[prost(double, tag = "3")]
    pub price1: f64,
    #[prost(double, tag = "4")]
    pub price2: f64,
    #[prost(double, tag = "5")]
    pub quantity: f64,
    #[prost(bool, tag = "6")]
    pub price1_is_set: bool,
    #[prost(bool, tag = "7")]
    pub price2_is_set: bool,
    #[prost(bool, tag = "8")]
    pub quantity_is_set: bool,
    /// Non-unset values are rejected: the upstream cannot change order type
    #[prost(enumeration = "OrderType", tag = "9")]
    pub order_type: i32,
    /// Non-unset values are rejected: the upstream cannot change TIF
    #[prost(enumeration = "TimeInForce", tag = "10")]
    pub time_in_force: i32,
}
wire_message!(CancelReplaceOrder, CancelReplaceOrder);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OpenOrdersRequest {
    #[prost(int32, tag = "1")]
    pub request_id: i32,
    #[prost(bool, tag = "2")]
    pub request_all_orders: bool,
    #[prost(string, tag = "3")]
    pub server_order_id: String,
}
wire_message!(OpenOrdersRequest, OpenOrdersRequest);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OrderUpdate {
    #[prost(int32, tag = "1")]
    pub request_id: i32,
    #[prost(int32, tag = "2")]
    pub total_num_messages: i32,
    #[prost(int32, tag = "3")]
    pub message_number: i32,
    #[prost(string, tag = "4")]
    pub symbol: String,
    #[prost(string, tag = "5")]
    pub exchange: String,
    #[prost(string, tag = "6")]
    pub previous_server_order_id: String,
    #[prost(string, tag = "7")]
    pub server_order_id: String,
    #[prost(string, tag = "8")]
    pub client_order_id: String,
    #[prost(string, tag = "9")]
    pub exchange_order_id: String,
    #[prost(enumeration = "OrderStatus", tag = "10")]
    pub order_status: i32,
    #[prost(enumeration = "OrderUpdateReason", tag = "11")]
    pub order_update_reason: i32,
    #[prost(enumeration = "OrderType", tag = "12")]
    pub order_type: i32,
    #[prost(enumeration = "BuySell", tag = "13")]
    pub buy_sell: i32,
    #[prost(double, tag = "14")]
    pub price1: f64,
    #[prost(double, tag = "15")]
    pub price2: f64,
    #[prost(enumeration = "TimeInForce", tag = "16")]
    pub time_in_force: i32,
    #[prost(double, tag = "17")]
    pub order_quantity: f64,
    #[prost(double, tag = "18")]
    pub filled_quantity: f64,
    #[prost(double, tag = "19")]
    pub remaining_quantity: f64,
    #[prost(double, tag = "20")]
    pub average_fill_price: f64,
    #[prost(double, tag = "21")]
    pub last_fill_price: f64,
    #[prost(double, tag = "22")]
    pub last_fill_date_time: f64,
    #[prost(double, tag = "23")]
    pub last_fill_quantity: f64,
    #[prost(string, tag = "24")]
    pub unique_fill_execution_id: String,
    #[prost(string, tag = "25")]
    pub trade_account: String,
    #[prost(string, tag = "26")]
    pub info_text: String,
    #[prost(bool, tag = "27")]
    pub no_orders: bool,
}
wire_message!(OrderUpdate, OrderUpdate);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HistoricalOrderFillsRequest {
    #[prost(int32, tag = "1")]
    pub request_id: i32,
    #[prost(string, tag = "2")]
    pub server_order_id: String,
    #[prost(int32, tag = "3")]
    pub number_of_days: i32,
    #[prost(string, tag = "4")]
    pub trade_account: String,
}
wire_message!(HistoricalOrderFillsRequest, HistoricalOrderFillsRequest);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HistoricalOrderFillResponse {
    #[prost(int32, tag = "1")]
    pub request_id: i32,
    #[prost(int32, tag = "2")]
    pub total_number_messages: i32,
    #[prost(int32, tag = "3")]
    pub message_number: i32,
    #[prost(string, tag = "4")]
    pub symbol: String,
    #[prost(string, tag = "5")]
    pub exchange: String,
    #[prost(string, tag = "6")]
    pub server_order_id: String,
    #[prost(enumeration = "BuySell", tag = "7")]
    pub buy_sell: i32,
    #[prost(double, tag = "8")]
    pub price: f64,
    #[prost(double, tag = "9")]
    pub quantity: f64,
    #[prost(double, tag = "10")]
    pub date_time: f64,
    #[prost(string, tag = "11")]
    pub unique_execution_id: String,
    #[prost(string, tag = "12")]
    pub trade_account: String,
    #[prost(bool, tag = "13")]
    pub no_order_fills: bool,
}
wire_message!(HistoricalOrderFillResponse, HistoricalOrderFillResponse);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CurrentPositionsRequest {
    #[prost(int32, tag = "1")]
    pub request_id: i32,
    #[prost(string, tag = "2")]
    pub trade_account: String,
}
wire_message!(CurrentPositionsRequest, CurrentPositionsRequest);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PositionUpdate {
    #[prost(int32, tag = "1")]
    pub request_id: i32,
    #[prost(int32, tag = "2")]
    pub total_number_messages: i32,
    #[prost(int32, tag = "3")]
    pub message_number: i32,
    #[prost(string, tag = "4")]
    pub symbol: String,
    #[prost(string, tag = "5")]
    pub exchange: String,
    #[prost(double, tag = "6")]
    pub quantity: f64,
    #[prost(double, tag = "7")]
    pub average_price: f64,
    #[prost(string, tag = "8")]
    pub position_identifier: String,
    #[prost(string, tag = "9")]
    pub trade_account: String,
    #[prost(bool, tag = "10")]
    pub no_positions: bool,
    #[prost(bool, tag = "11")]
    pub unsolicited: bool,
}
wire_message!(PositionUpdate, PositionUpdate);

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TradeAccountsRequest {
    #[prost(int32, tag = "1")]
    pub request_id: i32,
}
wire_message!(TradeAccountsRequest, TradeAccountsRequest);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TradeAccountResponse {
    #[prost(int32, tag = "1")]
    pub total_number_messages: i32,
    #[prost(int32, tag = "2")]
    pub message_number: i32,
    #[prost(string, tag = "3")]
    pub trade_account: String,
    #[prost(int32, tag = "4")]
    pub request_id: i32,
}
wire_message!(TradeAccountResponse, TradeAccountResponse);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AccountBalanceRequest {
    #[prost(int32, tag = "1")]
    pub request_id: i32,
    #[prost(string, tag = "2")]
    pub trade_account: String,
}
wire_message!(AccountBalanceRequest, AccountBalanceRequest);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AccountBalanceUpdate {
    #[prost(int32, tag = "1")]
    pub request_id: i32,
    #[prost(double, tag = "2")]
    pub cash_balance: f64,
    #[prost(double, tag = "3")]
    pub balance_available_for_new_positions: f64,
    #[prost(string, tag = "4")]
    pub account_currency: String,
    #[prost(string, tag = "5")]
    pub trade_account: String,
    #[prost(double, tag = "6")]
    pub securities_value: f64,
    #[prost(double, tag = "7")]
    pub margin_requirement: f64,
    #[prost(int32, tag = "8")]
    pub total_number_messages: i32,
    #[prost(int32, tag = "9")]
    pub message_number: i32,
    #[prost(bool, tag = "10")]
    pub no_account_balances: bool,
    #[prost(bool, tag = "11")]
    pub unsolicited: bool,
}
wire_message!(AccountBalanceUpdate, AccountBalanceUpdate);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AccountBalanceReject {
    #[prost(int32, tag = "1")]
    pub request_id: i32,
    #[prost(string, tag = "2")]
    pub reject_text: String,
}
wire_message!(AccountBalanceReject, AccountBalanceReject);

// ---------------------------------------------------------------------------
// Historical price data
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HistoricalPriceDataRequest {
    #[prost(int32, tag = "1")]
    pub request_id: i32,
    #[prost(string, tag = "2")]
    pub symbol: String,
    #[prost(string, tag = "3")]
    pub exchange: String,
    /// Bucket span in seconds; 0 requests raw tick records
    #[prost(uint32, tag = "4")]
    pub record_interval: u32,
    /// Whole seconds since epoch; 0 means genesis
    #[prost(int64, tag = "5")]
    pub start_date_time: i64,
    /// Whole seconds since epoch; 0 means open-ended
    #[prost(int64, tag = "6")]
    pub end_date_time: i64,
    #[prost(uint32, tag = "7")]
    pub max_days_to_return: u32,
    #[prost(bool, tag = "8")]
    pub use_zlib_compression: bool,
}
wire_message!(HistoricalPriceDataRequest, HistoricalPriceDataRequest);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HistoricalPriceDataResponseHeader {
    #[prost(int32, tag = "1")]
    pub request_id: i32,
    #[prost(uint32, tag = "2")]
    pub record_interval: u32,
    #[prost(bool, tag = "3")]
    pub use_zlib_compression: bool,
    #[prost(bool, tag = "4")]
    pub no_records_to_return: bool,
    #[prost(float, tag = "5")]
    pub int_to_float_price_divisor: f32,
}
wire_message!(
    HistoricalPriceDataResponseHeader,
    HistoricalPriceDataResponseHeader
);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HistoricalPriceDataReject {
    #[prost(int32, tag = "1")]
    pub request_id: i32,
    #[prost(string, tag = "2")]
    pub reject_text: String,
}
wire_message!(HistoricalPriceDataReject, HistoricalPriceDataReject);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HistoricalPriceDataRecordResponse {
    #[prost(int32, tag = "1")]
    pub request_id: i32,
    /// Bucket start, whole seconds since epoch
    #[prost(int64, tag = "2")]
    pub start_date_time: i64,
    #[prost(double, tag = "3")]
    pub open_price: f64,
    #[prost(double, tag = "4")]
    pub high_price: f64,
    #[prost(double, tag = "5")]
    pub low_price: f64,
    #[prost(double, tag = "6")]
    pub last_price: f64,
    #[prost(double, tag = "7")]
    pub volume: f64,
    #[prost(uint32, tag = "8")]
    pub num_trades: u32,
    #[prost(double, tag = "9")]
    pub bid_volume: f64,
    #[prost(double, tag = "10")]
    pub ask_volume: f64,
    #[prost(bool, tag = "11")]
    pub is_final_record: bool,
}
wire_message!(
    HistoricalPriceDataRecordResponse,
    HistoricalPriceDataRecordResponse
);

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HistoricalPriceDataTickRecordResponse {
    #[prost(int32, tag = "1")]
    pub request_id: i32,
    #[prost(double, tag = "2")]
    pub date_time: f64,
    #[prost(enumeration = "AtBidOrAsk", tag = "3")]
    pub at_bid_or_ask: i32,
    #[prost(double, tag = "4")]
    pub price: f64,
    #[prost(double, tag = "5")]
    pub volume: f64,
    #[prost(bool, tag = "6")]
    pub is_final_record: bool,
}
wire_message!(
    HistoricalPriceDataTickRecordResponse,
    HistoricalPriceDataTickRecordResponse
);
