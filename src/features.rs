// =============================================================================
// Feature extraction — normalized [0,1] features per timeframe
// =============================================================================
//
// Turns one candle series into four normalized features (structure, trend,
// momentum, volatility) plus a structured explain payload of the raw
// intermediates. Pure function: no side effects, deterministic, and it never
// fails — insufficient history substitutes calibrated defaults per
// intermediate instead of propagating invalid numbers.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::indicators::adx::calculate_adx;
use crate::indicators::atr::calculate_atr_ratio;
use crate::indicators::ema::latest_ema;
use crate::indicators::rsi::latest_rsi;
use crate::market_data::{prior_high, prior_low, Candle};

// -----------------------------------------------------------------------------
// Indicator periods
// -----------------------------------------------------------------------------

pub const ATR_PERIOD: usize = 14;
pub const ADX_PERIOD: usize = 14;
pub const RSI_PERIOD: usize = 14;
pub const EMA_FAST_PERIOD: usize = 20;
pub const EMA_SLOW_PERIOD: usize = 50;
/// Rolling window for the breakout range and the volume average.
pub const RANGE_WINDOW: usize = 20;

// -----------------------------------------------------------------------------
// Calibration
// -----------------------------------------------------------------------------

/// Normalization bounds for the clamped linear maps.
///
/// These values are empirically chosen and carry no documented derivation;
/// they are overridable here precisely so they can be recalibrated against
/// historical data without touching the extraction logic.
#[derive(Debug, Clone)]
pub struct Calibration {
    /// Breakout distance mapped over [0, this] as a fraction of the
    /// reference price. Default: 0.5 %.
    pub breakout_max_ratio: f64,
    /// Volume ratio (current / 20-bar average) mapped over [lo, hi].
    pub volume_ratio_lo: f64,
    pub volume_ratio_hi: f64,
    /// ADX mapped over [lo, hi].
    pub adx_lo: f64,
    pub adx_hi: f64,
    /// EMA separation (|fast - slow| / price) mapped over [0, this].
    pub ema_sep_max_ratio: f64,
    /// Momentum = |RSI - 50| / this, pre-clamped.
    pub rsi_momentum_divisor: f64,
    /// ATR / price mapped over [lo, hi].
    pub atr_ratio_lo: f64,
    pub atr_ratio_hi: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            breakout_max_ratio: 0.005, // 0 %..0.5 %
            volume_ratio_lo: 0.8,      // 0.8x..1.8x average
            volume_ratio_hi: 1.8,
            adx_lo: 10.0, // 10..35
            adx_hi: 35.0,
            ema_sep_max_ratio: 0.01, // 0 %..1 %
            rsi_momentum_divisor: 20.0,
            atr_ratio_lo: 0.0015, // 0.15 %..1.0 %
            atr_ratio_hi: 0.01,
        }
    }
}

/// Weight of the breakout score within structure_strength.
pub const STRUCTURE_BREAKOUT_WEIGHT: f64 = 0.65;
/// Weight of the volume score within structure_strength.
pub const STRUCTURE_VOLUME_WEIGHT: f64 = 0.35;
/// Weight of the ADX score within trend_strength.
pub const TREND_ADX_WEIGHT: f64 = 0.7;
/// Weight of the EMA separation score within trend_strength.
pub const TREND_SEP_WEIGHT: f64 = 0.3;

// -----------------------------------------------------------------------------
// Output types
// -----------------------------------------------------------------------------

/// Raw intermediates behind a bundle, kept for audit and explainability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureExplain {
    pub breakout_score: f64,
    pub volume_score: f64,
    pub volume_ratio: f64,
    pub adx: f64,
    pub adx_score: f64,
    pub ema_sep_ratio: f64,
    pub sep_score: f64,
    pub rsi: f64,
    pub atr_pct: f64,
}

/// Normalized feature bundle for one timeframe. Every field is in [0,1].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureBundle {
    pub structure_strength: f64,
    pub trend_strength: f64,
    pub momentum: f64,
    pub volatility: f64,
    pub explain: FeatureExplain,
}

// -----------------------------------------------------------------------------
// Extraction
// -----------------------------------------------------------------------------

/// Extract the normalized feature bundle from one candle series.
///
/// At least 50 candles are recommended (the slow EMA needs that much
/// history); shorter series degrade gracefully — each missing indicator is
/// replaced by its neutral default (ATR 0, EMA = last close, ADX 0, RSI 50,
/// volume average = last volume) and the clamps map any non-finite
/// intermediate to 0. An empty series yields a neutral all-zero bundle.
pub fn extract_features(candles: &[Candle], cal: &Calibration) -> FeatureBundle {
    let Some(last) = candles.last() else {
        return FeatureBundle {
            explain: FeatureExplain {
                rsi: 50.0,
                ..FeatureExplain::default()
            },
            ..FeatureBundle::default()
        };
    };

    let last_close = last.close;
    let last_volume = last.volume;
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    let ema_fast = latest_ema(&closes, EMA_FAST_PERIOD).unwrap_or(last_close);
    let ema_slow = latest_ema(&closes, EMA_SLOW_PERIOD).unwrap_or(last_close);
    let adx = calculate_adx(candles, ADX_PERIOD).unwrap_or(0.0);
    let rsi = latest_rsi(&closes, RSI_PERIOD).unwrap_or(50.0);

    // 20-bar volume average (includes the current bar); falls back to the
    // latest volume when there is not enough history.
    let volume_sma = if candles.len() >= RANGE_WINDOW {
        let start = candles.len() - RANGE_WINDOW;
        let mean = candles[start..].iter().map(|c| c.volume).sum::<f64>() / RANGE_WINDOW as f64;
        if mean.is_finite() {
            mean
        } else {
            last_volume
        }
    } else {
        last_volume
    };

    // Prior 20-bar extremes excluding the current bar; short series fall
    // back to the whole-series extremes.
    let hh_prev = prior_high(candles, RANGE_WINDOW)
        .unwrap_or_else(|| candles.iter().map(|c| c.high).fold(f64::MIN, f64::max));
    let ll_prev = prior_low(candles, RANGE_WINDOW)
        .unwrap_or_else(|| candles.iter().map(|c| c.low).fold(f64::MAX, f64::min));

    // --- Structure: breakout distance + volume confirmation ---
    let above_hh = if hh_prev > 0.0 {
        (last_close - hh_prev) / hh_prev
    } else {
        0.0
    };
    let below_ll = if ll_prev > 0.0 {
        (ll_prev - last_close) / ll_prev
    } else {
        0.0
    };
    let breakout_raw = above_hh.max(below_ll);
    let breakout_score = normalize_from_range(breakout_raw, 0.0, cal.breakout_max_ratio);

    let volume_ratio = if volume_sma > 0.0 {
        last_volume / volume_sma
    } else {
        1.0
    };
    let volume_score = normalize_from_range(volume_ratio, cal.volume_ratio_lo, cal.volume_ratio_hi);

    let structure_strength = clamp01(
        STRUCTURE_BREAKOUT_WEIGHT * breakout_score + STRUCTURE_VOLUME_WEIGHT * volume_score,
    );

    // --- Trend: ADX strength + EMA separation ---
    let adx_score = normalize_from_range(adx, cal.adx_lo, cal.adx_hi);
    let ema_sep_ratio = if last_close > 0.0 {
        (ema_fast - ema_slow).abs() / last_close
    } else {
        0.0
    };
    let sep_score = normalize_from_range(ema_sep_ratio, 0.0, cal.ema_sep_max_ratio);
    let trend_strength = clamp01(TREND_ADX_WEIGHT * adx_score + TREND_SEP_WEIGHT * sep_score);

    // --- Momentum: RSI distance from the 50 midline ---
    let momentum = clamp01((rsi - 50.0).abs() / cal.rsi_momentum_divisor);

    // --- Volatility: ATR relative to price ---
    let atr_pct = calculate_atr_ratio(candles, ATR_PERIOD).unwrap_or(0.0);
    let volatility = normalize_from_range(atr_pct, cal.atr_ratio_lo, cal.atr_ratio_hi);

    FeatureBundle {
        structure_strength,
        trend_strength,
        momentum,
        volatility,
        explain: FeatureExplain {
            breakout_score,
            volume_score,
            volume_ratio: finite_or_zero(volume_ratio),
            adx: finite_or_zero(adx),
            adx_score,
            ema_sep_ratio: finite_or_zero(ema_sep_ratio),
            sep_score,
            rsi: if rsi.is_finite() { rsi } else { 50.0 },
            atr_pct: finite_or_zero(atr_pct),
        },
    }
}

/// Map `x` from [lo, hi] to [0, 1] and clamp. Degenerate ranges and
/// non-finite inputs map to 0.
fn normalize_from_range(x: f64, lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        return 0.0;
    }
    clamp01((x - lo) / (hi - lo))
}

/// Clamp into [0,1]; NaN/Inf map to 0 so a broken intermediate can never
/// leak out of the bundle.
fn clamp01(x: f64) -> f64 {
    if !x.is_finite() {
        return 0.0;
    }
    x.clamp(0.0, 1.0)
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn candle(high: f64, low: f64, close: f64, volume: f64) -> Candle {
        Candle::new(0, close, high, low, close, volume, 0)
    }

    /// A gently trending series with enough history for every indicator.
    fn trending_series(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64 * 0.2;
                candle(base + 0.5, base - 0.5, base, 100.0)
            })
            .collect()
    }

    fn assert_bundle_in_range(bundle: &FeatureBundle) {
        for (name, v) in [
            ("structure_strength", bundle.structure_strength),
            ("trend_strength", bundle.trend_strength),
            ("momentum", bundle.momentum),
            ("volatility", bundle.volatility),
        ] {
            assert!((0.0..=1.0).contains(&v), "{name} = {v} out of [0,1]");
        }
    }

    #[test]
    fn all_features_in_unit_range() {
        let bundle = extract_features(&trending_series(120), &Calibration::default());
        assert_bundle_in_range(&bundle);
    }

    #[test]
    fn empty_series_yields_neutral_bundle() {
        let bundle = extract_features(&[], &Calibration::default());
        assert_bundle_in_range(&bundle);
        assert_eq!(bundle.structure_strength, 0.0);
        assert_eq!(bundle.explain.rsi, 50.0);
    }

    #[test]
    fn short_series_degrades_without_panic() {
        for n in 1..30 {
            let bundle = extract_features(&trending_series(n), &Calibration::default());
            assert_bundle_in_range(&bundle);
        }
    }

    #[test]
    fn nan_input_does_not_leak() {
        let mut candles = trending_series(80);
        candles[40].high = f64::NAN;
        candles[41].close = f64::INFINITY;
        let bundle = extract_features(&candles, &Calibration::default());
        assert_bundle_in_range(&bundle);
    }

    #[test]
    fn breakout_with_volume_spike_raises_structure() {
        let mut candles = trending_series(80);
        // Quiet baseline, then the last bar closes well beyond the prior
        // 20-bar high on triple volume.
        let prior = prior_high(&candles, RANGE_WINDOW).unwrap();
        let breakout_close = prior * 1.006; // beyond the 0.5 % calibration cap
        let last = candles.last_mut().unwrap();
        last.close = breakout_close;
        last.high = breakout_close + 0.5;
        last.volume = 300.0;

        let bundle = extract_features(&candles, &Calibration::default());
        assert!(
            bundle.structure_strength > 0.9,
            "expected saturated structure, got {}",
            bundle.structure_strength
        );
        assert!((bundle.explain.breakout_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn flat_market_has_weak_trend_and_momentum() {
        let candles: Vec<Candle> = (0..120).map(|_| candle(100.5, 99.5, 100.0, 100.0)).collect();
        let bundle = extract_features(&candles, &Calibration::default());
        assert!(bundle.trend_strength < 0.1, "flat trend: {}", bundle.trend_strength);
        assert!(bundle.momentum < 0.05, "flat momentum: {}", bundle.momentum);
    }

    #[test]
    fn extraction_is_idempotent() {
        let candles = trending_series(100);
        let cal = Calibration::default();
        let a = extract_features(&candles, &cal);
        let b = extract_features(&candles, &cal);
        assert_eq!(a.structure_strength, b.structure_strength);
        assert_eq!(a.trend_strength, b.trend_strength);
        assert_eq!(a.momentum, b.momentum);
        assert_eq!(a.volatility, b.volatility);
    }

    #[test]
    fn calibration_override_changes_normalization() {
        let candles = trending_series(100);
        let default_bundle = extract_features(&candles, &Calibration::default());

        // A much stricter ADX band should not increase the trend score.
        let strict = Calibration {
            adx_lo: 40.0,
            adx_hi: 60.0,
            ..Calibration::default()
        };
        let strict_bundle = extract_features(&candles, &strict);
        assert!(strict_bundle.trend_strength <= default_bundle.trend_strength);
    }
}
