// =============================================================================
// Signal construction — entry zone, stop loss, take-profit ladder
// =============================================================================
//
// Builds the tradeable levels from the decision-timeframe series once a
// breakout side is established. All levels are anchored to the previous
// (fully closed, pre-breakout) bar and padded by a mode-dependent ATR
// fraction. Returns None whenever the geometry cannot produce a positive
// risk distance.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::confirm::breakout_side;
use crate::indicators::atr::calculate_atr;
use crate::market_data::Candle;
use crate::types::{Mode, Side};

/// ATR lookback used for padding and stop distance.
pub const ATR_PERIOD: usize = 14;
/// Stop-loss distance beyond the anchor bar, in ATRs.
pub const SL_ATR_MULT: f64 = 0.5;

/// Entry-zone padding in ATRs for a mode.
fn entry_pad_mult(mode: Mode) -> f64 {
    match mode {
        Mode::Scalp => 0.25,
        Mode::Swing => 0.5,
    }
}

/// A fully specified signal: entry zone, stop, and three take-profit levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub side: Side,
    pub entry_min: f64,
    pub entry_max: f64,
    pub entry_mid: f64,
    pub sl: f64,
    pub tp1: f64,
    pub tp2: f64,
    pub tp3: f64,
}

/// Build levels from the decision-timeframe candles, or None when there is
/// no breakout, no ATR, or the stop sits on the wrong side of the entry.
pub fn build_signal(candles: &[Candle], mode: Mode) -> Option<Signal> {
    let side = breakout_side(candles)?;
    let atr = calculate_atr(candles, ATR_PERIOD)?;
    if atr <= 0.0 {
        return None;
    }

    // Anchor bar: the last fully formed candle before the breakout bar.
    let prev = &candles[candles.len().checked_sub(2)?];

    let pad = atr * entry_pad_mult(mode);
    let lo = prev.low - pad;
    let hi = prev.high + pad;
    let (entry_min, entry_max) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    let entry_mid = (entry_min + entry_max) / 2.0;

    let sl = match side {
        Side::Buy => prev.low - SL_ATR_MULT * atr,
        Side::Sell => prev.high + SL_ATR_MULT * atr,
    };

    let risk = match side {
        Side::Buy => entry_mid - sl,
        Side::Sell => sl - entry_mid,
    };
    if !risk.is_finite() || risk <= 0.0 {
        debug!(?side, risk, "degenerate risk distance — no signal");
        return None;
    }

    let dir = side.direction() as f64;
    let tp1 = entry_mid + dir * risk;
    let tp2 = entry_mid + dir * 2.0 * risk;
    let tp3 = entry_mid + dir * 3.0 * risk;

    Some(Signal {
        side,
        entry_min,
        entry_max,
        entry_mid,
        sl,
        tp1,
        tp2,
        tp3,
    })
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn candle(high: f64, low: f64, close: f64) -> Candle {
        Candle::new(0, close, high, low, close, 100.0, 0)
    }

    /// Flat series whose last bar breaks above the prior 20-bar high.
    fn buy_breakout() -> Vec<Candle> {
        let mut c: Vec<Candle> = (0..59).map(|_| candle(100.5, 99.5, 100.0)).collect();
        c.push(candle(101.8, 100.2, 101.5));
        c
    }

    fn sell_breakout() -> Vec<Candle> {
        let mut c: Vec<Candle> = (0..59).map(|_| candle(100.5, 99.5, 100.0)).collect();
        c.push(candle(99.8, 98.2, 98.5));
        c
    }

    #[test]
    fn buy_signal_geometry_holds() {
        let sig = build_signal(&buy_breakout(), Mode::Scalp).expect("expected a buy signal");
        assert_eq!(sig.side, Side::Buy);
        assert!(sig.entry_min < sig.entry_mid && sig.entry_mid < sig.entry_max);
        assert!(sig.sl < sig.entry_mid, "stop must sit below a buy entry");
        assert!(sig.entry_mid < sig.tp1 && sig.tp1 < sig.tp2 && sig.tp2 < sig.tp3);

        // The ladder spacing equals the risk distance.
        let risk = sig.entry_mid - sig.sl;
        assert!((sig.tp1 - sig.entry_mid - risk).abs() < 1e-9);
        assert!((sig.tp3 - sig.entry_mid - 3.0 * risk).abs() < 1e-9);
    }

    #[test]
    fn sell_signal_mirrors_buy() {
        let sig = build_signal(&sell_breakout(), Mode::Scalp).expect("expected a sell signal");
        assert_eq!(sig.side, Side::Sell);
        assert!(sig.entry_min < sig.entry_mid && sig.entry_mid < sig.entry_max);
        assert!(sig.sl > sig.entry_mid, "stop must sit above a sell entry");
        assert!(sig.tp3 < sig.tp2 && sig.tp2 < sig.tp1 && sig.tp1 < sig.entry_mid);
    }

    #[test]
    fn swing_zone_is_wider_than_scalp() {
        let scalp = build_signal(&buy_breakout(), Mode::Scalp).unwrap();
        let swing = build_signal(&buy_breakout(), Mode::Swing).unwrap();
        let scalp_width = scalp.entry_max - scalp.entry_min;
        let swing_width = swing.entry_max - swing.entry_min;
        assert!(swing_width > scalp_width);
        // Same anchor bar, so the midpoints coincide.
        assert!((scalp.entry_mid - swing.entry_mid).abs() < 1e-9);
    }

    #[test]
    fn no_breakout_means_no_signal() {
        let flat: Vec<Candle> = (0..60).map(|_| candle(100.5, 99.5, 100.0)).collect();
        assert!(build_signal(&flat, Mode::Scalp).is_none());
    }

    #[test]
    fn too_short_series_means_no_signal() {
        let short: Vec<Candle> = (0..5).map(|_| candle(100.5, 99.5, 100.0)).collect();
        assert!(build_signal(&short, Mode::Swing).is_none());
    }

    #[test]
    fn build_is_deterministic() {
        let candles = buy_breakout();
        let a = build_signal(&candles, Mode::Swing).unwrap();
        let b = build_signal(&candles, Mode::Swing).unwrap();
        assert_eq!(a.entry_min, b.entry_min);
        assert_eq!(a.sl, b.sl);
        assert_eq!(a.tp3, b.tp3);
    }
}
