// =============================================================================
// Market data primitives
// =============================================================================

use serde::{Deserialize, Serialize};

/// A single OHLCV candle. Sequences are always oldest-first and immutable
/// once fetched; a scan works on a snapshot and never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
}

impl Candle {
    pub fn new(
        open_time: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        close_time: i64,
    ) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
            close_time,
        }
    }
}

/// Highest high over the last `window` candles, excluding the final candle.
///
/// This is the "prior 20-bar high" used for breakout detection: the current
/// bar must not be allowed to confirm its own breakout. Returns `None` when
/// there are fewer than `window + 1` candles.
pub fn prior_high(candles: &[Candle], window: usize) -> Option<f64> {
    if window == 0 || candles.len() < window + 1 {
        return None;
    }
    let end = candles.len() - 1;
    candles[end - window..end]
        .iter()
        .map(|c| c.high)
        .fold(None, |acc: Option<f64>, h| {
            Some(acc.map_or(h, |a| a.max(h)))
        })
}

/// Lowest low over the last `window` candles, excluding the final candle.
pub fn prior_low(candles: &[Candle], window: usize) -> Option<f64> {
    if window == 0 || candles.len() < window + 1 {
        return None;
    }
    let end = candles.len() - 1;
    candles[end - window..end]
        .iter()
        .map(|c| c.low)
        .fold(None, |acc: Option<f64>, l| {
            Some(acc.map_or(l, |a| a.min(l)))
        })
}
