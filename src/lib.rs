//! Bittrex DTC Bridge Library
//!
//! Core of the live DTC ⇄ Bittrex bridge and the historical data service:
//! wire codec, market state, the serialized REST queue, upstream WebSocket
//! supervision, request handlers, order lifecycle and the tick store with
//! its granulated query engine.

pub mod bittrex;
pub mod config;
pub mod dtc;
pub mod error;
#[cfg(feature = "history")]
pub mod history;
pub mod market;
pub mod refresher;
pub mod rest_sync;
pub mod server;

// Re-export commonly used types
pub use error::BridgeError;
pub use market::MarketState;
pub use rest_sync::RestSync;
pub use server::DtcServer;
