//! Bittrex Exchange Integration
//!
//! REST client, WebSocket supervisor and the payload types both consume.

pub mod client;
pub mod types;
pub mod websocket;

// Re-export commonly used types
pub use client::{BittrexClient, Credentials};
pub use websocket::WsSupervisor;
