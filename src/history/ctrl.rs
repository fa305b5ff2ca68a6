//! Fetch Control File
//!
//! A bitvector on disk, one bit per hourly window since the genesis hour
//! (2017-01-01 00:00 UTC), recording which windows of trade history have
//! already been pumped. The hours at and after the current one always read
//! as unfetched: the latest window keeps growing and is refetched every
//! cycle.

use chrono::{DateTime, TimeZone, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const SECONDS_PER_HOUR: i64 = 3_600;

/// First hour of recorded history.
pub fn genesis() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap()
}

/// Hour index of `at` relative to genesis; None before genesis.
pub fn hour_index(at: DateTime<Utc>) -> Option<u64> {
    let seconds = at.signed_duration_since(genesis()).num_seconds();
    (seconds >= 0).then_some((seconds / SECONDS_PER_HOUR) as u64)
}

/// Epoch-second bounds `[start, end)` of one hourly window.
pub fn hour_bounds(hour: u64) -> (i64, i64) {
    let start = genesis().timestamp() + hour as i64 * SECONDS_PER_HOUR;
    (start, start + SECONDS_PER_HOUR)
}

pub struct CtrlFile {
    path: PathBuf,
    bits: Vec<u8>,
}

impl CtrlFile {
    /// Loads the bitvector, or starts empty when the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<CtrlFile> {
        let path = path.into();
        let bits = match fs::read(&path) {
            Ok(bits) => bits,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e),
        };
        Ok(CtrlFile { path, bits })
    }

    /// True when the window was pumped before and is safely in the past.
    pub fn is_fetched(&self, hour: u64, now: DateTime<Utc>) -> bool {
        match hour_index(now) {
            // Current and future windows are always refetched
            Some(current) if hour >= current => false,
            Some(_) => self.bit(hour),
            None => false,
        }
    }

    pub fn mark_fetched(&mut self, hour: u64) {
        let byte = (hour / 8) as usize;
        if byte >= self.bits.len() {
            self.bits.resize(byte + 1, 0);
        }
        self.bits[byte] |= 1 << (hour % 8);
    }

    fn bit(&self, hour: u64) -> bool {
        let byte = (hour / 8) as usize;
        self.bits
            .get(byte)
            .map(|b| b & (1 << (hour % 8)) != 0)
            .unwrap_or(false)
    }

    pub fn save(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, &self.bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hour_index_at_genesis() {
        assert_eq!(hour_index(genesis()), Some(0));
        let before = genesis() - chrono::Duration::hours(1);
        assert_eq!(hour_index(before), None);
        let later = genesis() + chrono::Duration::hours(25);
        assert_eq!(hour_index(later), Some(25));
    }

    #[test]
    fn test_hour_bounds_cover_one_hour() {
        let (start, end) = hour_bounds(0);
        assert_eq!(start, genesis().timestamp());
        assert_eq!(end - start, SECONDS_PER_HOUR);
        let (next_start, _) = hour_bounds(1);
        assert_eq!(next_start, end);
    }

    #[test]
    fn test_marks_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BTC-ETH.ctrl");
        let now = genesis() + chrono::Duration::hours(100);

        let mut ctrl = CtrlFile::open(&path).unwrap();
        assert!(!ctrl.is_fetched(3, now));
        ctrl.mark_fetched(3);
        ctrl.mark_fetched(42);
        ctrl.save().unwrap();

        let reopened = CtrlFile::open(&path).unwrap();
        assert!(reopened.is_fetched(3, now));
        assert!(reopened.is_fetched(42, now));
        assert!(!reopened.is_fetched(4, now));
    }

    #[test]
    fn test_latest_hour_always_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctrl = CtrlFile::open(dir.path().join("x.ctrl")).unwrap();
        let now = genesis() + chrono::Duration::hours(10);

        ctrl.mark_fetched(10);
        assert!(
            !ctrl.is_fetched(10, now),
            "current hour reads unfetched regardless of the stored bit"
        );
        ctrl.mark_fetched(9);
        assert!(ctrl.is_fetched(9, now));
    }
}
