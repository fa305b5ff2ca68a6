//! Historical Data Service
//!
//! Continuous per-symbol ingest of exchange trade history into on-disk tick
//! stores, and a DTC server answering historical price queries as raw ticks
//! or granulated OHLCV records.
//!
//! **Feature gate**: `history` (carries the RocksDB engine).

pub mod ctrl;
pub mod granulator;
pub mod pump;
pub mod server;
pub mod store;

pub use granulator::{Bar, Granulator, Tick};
pub use server::HistoryServer;
pub use store::TickStore;
