//! Streaming Tick→OHLCV Granulator
//!
//! Folds an ordered tick sequence into fixed-span OHLCV bars in one pass,
//! no intermediate buffering: each pushed tick either lands in the current
//! bucket or closes it and opens the next. Buckets are aligned to the first
//! tick that opens them, spanning `[start, start + span - 1ns]` inclusive.

use crate::market::Side;

/// One trade as persisted in the tick store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub ts_ns: u64,
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
}

/// One OHLCV bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub start_ns: u64,
    pub end_ns: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub last: f64,
    pub volume: f64,
    pub num_trades: u32,
    /// Volume of buy-side prints; None when the bucket saw none
    pub bid_volume: Option<f64>,
    /// Volume of sell-side prints; None when the bucket saw none
    pub ask_volume: Option<f64>,
}

impl Bar {
    fn open(tick: &Tick, span_ns: u64) -> Bar {
        Bar {
            start_ns: tick.ts_ns,
            end_ns: tick.ts_ns + span_ns - 1,
            open: tick.price,
            high: tick.price,
            low: tick.price,
            last: tick.price,
            volume: tick.quantity,
            num_trades: 1,
            bid_volume: (tick.side == Side::Buy).then_some(tick.quantity),
            ask_volume: (tick.side == Side::Sell).then_some(tick.quantity),
        }
    }

    fn update(&mut self, tick: &Tick) {
        self.high = self.high.max(tick.price);
        self.low = self.low.min(tick.price);
        self.last = tick.price;
        self.volume += tick.quantity;
        self.num_trades += 1;
        let side_volume = match tick.side {
            Side::Buy => &mut self.bid_volume,
            Side::Sell => &mut self.ask_volume,
        };
        *side_volume = Some(side_volume.unwrap_or(0.0) + tick.quantity);
    }
}

/// The streaming accumulator. Feed ticks in timestamp order; every push may
/// emit the bucket the tick closed, and [`finish`](Granulator::finish)
/// flushes the one still open.
#[derive(Debug)]
pub struct Granulator {
    span_ns: u64,
    current: Option<Bar>,
}

impl Granulator {
    /// `span_ns` must be positive; a zero span means raw ticks and never
    /// reaches the granulator.
    pub fn new(span_ns: u64) -> Granulator {
        debug_assert!(span_ns > 0);
        Granulator {
            span_ns,
            current: None,
        }
    }

    pub fn push(&mut self, tick: &Tick) -> Option<Bar> {
        match &mut self.current {
            None => {
                self.current = Some(Bar::open(tick, self.span_ns));
                None
            }
            Some(bar) if tick.ts_ns <= bar.end_ns => {
                bar.update(tick);
                None
            }
            Some(_) => {
                let finished = self.current.take();
                self.current = Some(Bar::open(tick, self.span_ns));
                finished
            }
        }
    }

    /// Emits the still-open bucket, if any.
    pub fn finish(self) -> Option<Bar> {
        self.current
    }
}
