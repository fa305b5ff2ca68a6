//! On-Disk Tick Store
//!
//! One RocksDB per symbol under `<datadir>/<symbol>/`. Keys are 8-byte
//! big-endian nanosecond timestamps so the engine's native ordering is time
//! order; values are fixed 17-byte records `[side][price_sats][qty_sats]`
//! with both amounts as big-endian satoshi integers.

use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;

use crate::error::BridgeError;
use crate::history::granulator::Tick;
use crate::market::{price_to_sats, sats_to_price, Side};

const VALUE_SIZE: usize = 17;

pub struct TickStore {
    db: DB,
}

impl TickStore {
    /// Opens (or creates) the store for one symbol.
    pub fn open(datadir: &Path, symbol: &str) -> Result<TickStore, BridgeError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let path = datadir.join(symbol);
        let db = DB::open(&opts, &path)
            .map_err(|e| BridgeError::Storage(format!("open {}: {}", path.display(), e)))?;
        Ok(TickStore { db })
    }

    /// Writes a batch of ticks. Identical timestamps within the batch (or
    /// colliding with the running maximum) are bumped by 1 ns each so keys
    /// stay unique and monotonic.
    ///
    /// Returns the number of records written.
    pub fn put_batch(&self, ticks: &[Tick]) -> Result<usize, BridgeError> {
        let mut batch = WriteBatch::default();
        let mut last_key: Option<u64> = None;
        for tick in ticks {
            let mut key = tick.ts_ns;
            if let Some(last) = last_key {
                if key <= last {
                    key = last + 1;
                }
            }
            last_key = Some(key);
            batch.put(key.to_be_bytes(), encode_value(tick));
        }
        let count = ticks.len();
        self.db
            .write(batch)
            .map_err(|e| BridgeError::Storage(format!("write batch: {}", e)))?;
        Ok(count)
    }

    /// Ticks in `[start_ns, end_ns]`, in time order.
    pub fn scan(
        &self,
        start_ns: u64,
        end_ns: u64,
    ) -> impl Iterator<Item = Result<Tick, BridgeError>> + '_ {
        self.db
            .iterator(IteratorMode::From(
                &start_ns.to_be_bytes(),
                Direction::Forward,
            ))
            .map(|item| {
                let (key, value) =
                    item.map_err(|e| BridgeError::Storage(format!("scan: {}", e)))?;
                decode_record(&key, &value)
            })
            .take_while(move |tick| match tick {
                Ok(tick) => tick.ts_ns <= end_ns,
                Err(_) => true,
            })
    }

    /// Timestamp of the newest stored tick, if any.
    pub fn last_timestamp(&self) -> Option<u64> {
        self.db
            .iterator(IteratorMode::End)
            .next()
            .and_then(|item| item.ok())
            .map(|(key, _)| decode_key(&key))
    }
}

fn encode_value(tick: &Tick) -> [u8; VALUE_SIZE] {
    let mut value = [0u8; VALUE_SIZE];
    value[0] = match tick.side {
        Side::Buy => 0,
        Side::Sell => 1,
    };
    value[1..9].copy_from_slice(&(price_to_sats(tick.price) as i64).to_be_bytes());
    value[9..17].copy_from_slice(&(price_to_sats(tick.quantity) as i64).to_be_bytes());
    value
}

fn decode_key(key: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&key[..8]);
    u64::from_be_bytes(bytes)
}

fn decode_record(key: &[u8], value: &[u8]) -> Result<Tick, BridgeError> {
    if key.len() != 8 || value.len() != VALUE_SIZE {
        return Err(BridgeError::Storage(format!(
            "malformed record: key {} bytes, value {} bytes",
            key.len(),
            value.len()
        )));
    }
    let side = match value[0] {
        0 => Side::Buy,
        1 => Side::Sell,
        other => {
            return Err(BridgeError::Storage(format!("unknown side tag {}", other)));
        }
    };
    let mut price = [0u8; 8];
    price.copy_from_slice(&value[1..9]);
    let mut quantity = [0u8; 8];
    quantity.copy_from_slice(&value[9..17]);
    Ok(Tick {
        ts_ns: decode_key(key),
        side,
        price: sats_to_price(i64::from_be_bytes(price) as u64),
        quantity: sats_to_price(i64::from_be_bytes(quantity) as u64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(ts_ns: u64, side: Side, price: f64, quantity: f64) -> Tick {
        Tick {
            ts_ns,
            side,
            price,
            quantity,
        }
    }

    #[test]
    fn test_round_trip_in_time_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = TickStore::open(dir.path(), "BTC-ETH").unwrap();

        store
            .put_batch(&[
                tick(3_000, Side::Sell, 0.051, 2.0),
                tick(1_000, Side::Buy, 0.05, 1.0),
            ])
            .unwrap();

        let ticks: Vec<Tick> = store.scan(0, u64::MAX).map(Result::unwrap).collect();
        // Second batch entry collided downward and was bumped past the first
        assert_eq!(ticks.len(), 2);
        assert!(ticks.windows(2).all(|w| w[0].ts_ns < w[1].ts_ns));
    }

    #[test]
    fn test_collision_tie_break_adds_one_ns_each() {
        let dir = tempfile::tempdir().unwrap();
        let store = TickStore::open(dir.path(), "BTC-ETH").unwrap();

        store
            .put_batch(&[
                tick(5_000, Side::Buy, 1.0, 1.0),
                tick(5_000, Side::Sell, 2.0, 1.0),
                tick(5_000, Side::Buy, 3.0, 1.0),
            ])
            .unwrap();

        let ticks: Vec<Tick> = store.scan(0, u64::MAX).map(Result::unwrap).collect();
        let stamps: Vec<u64> = ticks.iter().map(|t| t.ts_ns).collect();
        assert_eq!(stamps, vec![5_000, 5_001, 5_002]);
        let prices: Vec<f64> = ticks.iter().map(|t| t.price).collect();
        assert_eq!(prices, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_scan_bounds_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let store = TickStore::open(dir.path(), "BTC-ETH").unwrap();

        store
            .put_batch(&[
                tick(1_000, Side::Buy, 1.0, 1.0),
                tick(2_000, Side::Buy, 2.0, 1.0),
                tick(3_000, Side::Buy, 3.0, 1.0),
            ])
            .unwrap();

        let ticks: Vec<Tick> = store.scan(1_000, 2_000).map(Result::unwrap).collect();
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[1].ts_ns, 2_000);
    }

    #[test]
    fn test_values_survive_satoshi_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let store = TickStore::open(dir.path(), "BTC-ETH").unwrap();

        store
            .put_batch(&[tick(42, Side::Sell, 0.00012345, 123.4567)])
            .unwrap();
        let stored: Vec<Tick> = store.scan(0, u64::MAX).map(Result::unwrap).collect();
        assert_eq!(stored[0].price, 0.00012345);
        assert_eq!(stored[0].quantity, 123.4567);
        assert_eq!(stored[0].side, Side::Sell);
        assert_eq!(store.last_timestamp(), Some(42));
    }
}
