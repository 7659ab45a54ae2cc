// =============================================================================
// Multi-timeframe confirmation — breakout + higher-timeframe alignment
// =============================================================================
//
// Fetches three timeframes (5m / 15m / 1h), extracts features on each, and
// decides whether a breakout on the fast series is backed by the directional
// bias of both higher timeframes. The full three-timeframe bundle is always
// returned, even on failure, so callers never refetch for diagnostics.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::features::{extract_features, Calibration, FeatureBundle};
use crate::market_data::{prior_high, prior_low, Candle};
use crate::provider::{FetchError, TimeSeriesProvider};
use crate::types::Side;

/// Fast (trigger) timeframe.
pub const FAST_INTERVAL: &str = "5m";
/// Medium confirmation timeframe.
pub const MEDIUM_INTERVAL: &str = "15m";
/// Slow confirmation timeframe.
pub const SLOW_INTERVAL: &str = "1h";
/// Candles requested per timeframe.
pub const FETCH_LIMIT: u32 = 300;

/// Minimum candles per timeframe; anything less is an automatic fail.
pub const MIN_CONFIRM_CANDLES: usize = 25;
/// Breakout window on the fast series.
pub const BREAKOUT_WINDOW: usize = 20;

/// Minimum fast-timeframe structure strength.
pub const MIN_FAST_STRUCTURE: f64 = 0.25;
/// Minimum medium-timeframe trend strength.
pub const MIN_MEDIUM_TREND: f64 = 0.25;
/// Minimum slow-timeframe trend strength.
pub const MIN_SLOW_TREND: f64 = 0.20;

/// Feature bundles for the three confirmation timeframes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeframeFeatures {
    pub fast: FeatureBundle,
    pub medium: FeatureBundle,
    pub slow: FeatureBundle,
}

/// Outcome of the multi-timeframe check. `features` is always populated.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub ok: bool,
    pub side: Option<Side>,
    pub features: TimeframeFeatures,
}

impl Confirmation {
    fn fail(side: Option<Side>, features: TimeframeFeatures) -> Self {
        Self {
            ok: false,
            side,
            features,
        }
    }
}

/// Breakout side on a series: buy above the prior 20-bar high, sell below
/// the prior 20-bar low, otherwise no trigger.
pub fn breakout_side(candles: &[Candle]) -> Option<Side> {
    let last_close = candles.last()?.close;
    let hh = prior_high(candles, BREAKOUT_WINDOW)?;
    let ll = prior_low(candles, BREAKOUT_WINDOW)?;

    if last_close > hh {
        Some(Side::Buy)
    } else if last_close < ll {
        Some(Side::Sell)
    } else {
        None
    }
}

/// Directional bias from the last close change: +1 bullish, -1 bearish,
/// 0 when there is not enough data.
fn trend_bias(candles: &[Candle]) -> i8 {
    if candles.len() < 2 {
        return 0;
    }
    let last = candles[candles.len() - 1].close;
    let prev = candles[candles.len() - 2].close;
    if last >= prev {
        1
    } else {
        -1
    }
}

/// Run the multi-timeframe confirmation for one pair.
///
/// A transport-level fetch failure on any timeframe is returned as a
/// `FetchError` and aborts only this pair's cycle; fetched-but-insufficient
/// data produces `ok == false` with the bundle still populated.
pub async fn confirm<P: TimeSeriesProvider>(
    provider: &P,
    symbol: &str,
    cal: &Calibration,
) -> Result<Confirmation, FetchError> {
    let fast = provider.fetch(symbol, FAST_INTERVAL, FETCH_LIMIT).await?;
    let medium = provider.fetch(symbol, MEDIUM_INTERVAL, FETCH_LIMIT).await?;
    let slow = provider.fetch(symbol, SLOW_INTERVAL, FETCH_LIMIT).await?;

    let features = TimeframeFeatures {
        fast: extract_features(&fast, cal),
        medium: extract_features(&medium, cal),
        slow: extract_features(&slow, cal),
    };

    if fast.len() < MIN_CONFIRM_CANDLES
        || medium.len() < MIN_CONFIRM_CANDLES
        || slow.len() < MIN_CONFIRM_CANDLES
    {
        debug!(
            symbol,
            fast = fast.len(),
            medium = medium.len(),
            slow = slow.len(),
            "confirmation failed: insufficient candles"
        );
        return Ok(Confirmation::fail(None, features));
    }

    let Some(side) = breakout_side(&fast) else {
        debug!(symbol, "confirmation failed: no breakout on fast timeframe");
        return Ok(Confirmation::fail(None, features));
    };

    let want = side.direction();
    let trend_ok = trend_bias(&medium) == want && trend_bias(&slow) == want;
    let structure_ok = features.fast.structure_strength >= MIN_FAST_STRUCTURE;
    let higher_tf_ok = features.medium.trend_strength >= MIN_MEDIUM_TREND
        && features.slow.trend_strength >= MIN_SLOW_TREND;

    let ok = trend_ok && structure_ok && higher_tf_ok;

    debug!(
        symbol,
        side = %side,
        ok,
        trend_ok,
        structure_ok,
        higher_tf_ok,
        fast_structure = features.fast.structure_strength,
        medium_trend = features.medium.trend_strength,
        slow_trend = features.slow.trend_strength,
        "multi-timeframe confirmation"
    );

    Ok(Confirmation {
        ok,
        side: Some(side),
        features,
    })
}
