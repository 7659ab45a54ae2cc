// =============================================================================
// Average True Range (ATR) — rolling mean of the True Range
// =============================================================================
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR here is the plain rolling mean of the most recent `period` TR values.
// Default period: 14.
// =============================================================================

use crate::market_data::Candle;

/// Compute the most recent ATR value from a slice of OHLCV candles.
///
/// # Arguments
/// - `candles` — slice of OHLCV candles (oldest first).
/// - `period`  — look-back window for the rolling mean.
///
/// # Returns
/// `None` when:
/// - `period` is zero.
/// - There are fewer than `period + 1` candles (each TR value needs a
///   previous candle for the prev-close terms).
/// - Any intermediate value is non-finite.
pub fn calculate_atr(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }

    // TR for the last `period` bar transitions only — the rolling mean
    // never looks further back than that.
    let start = candles.len() - period;
    let mut sum = 0.0;
    for i in start..candles.len() {
        let high = candles[i].high;
        let low = candles[i].low;
        let prev_close = candles[i - 1].close;

        let tr = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());
        if !tr.is_finite() {
            return None;
        }
        sum += tr;
    }

    let atr = sum / period as f64;
    if atr.is_finite() {
        Some(atr)
    } else {
        None
    }
}

/// ATR as a fraction of the latest close (e.g. 0.005 = 0.5 %).
///
/// Useful for comparing volatility across assets with different price scales.
pub fn calculate_atr_ratio(candles: &[Candle], period: usize) -> Option<f64> {
    let atr = calculate_atr(candles, period)?;
    let last_close = candles.last()?.close;
    if last_close <= 0.0 {
        return None;
    }
    let ratio = atr / last_close;
    if ratio.is_finite() {
        Some(ratio)
    } else {
        None
    }
}
