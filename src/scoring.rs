// =============================================================================
// Confidence scoring — the xscore
// =============================================================================
//
// Collapses the three-timeframe feature bundle into a single integer in
// [0,100]. Weights: structure (fast) 35, trend (medium 0.6 / slow 0.4) 35,
// momentum (fast) 20, volatility (fast) 10. The four weighted sub-totals are
// exposed so every published score can be audited.
// =============================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::confirm::TimeframeFeatures;

/// Points available to the fast-timeframe structure component.
pub const STRUCTURE_POINTS: f64 = 35.0;
/// Points available to the blended higher-timeframe trend component.
pub const TREND_POINTS: f64 = 35.0;
/// Points available to the fast-timeframe momentum component.
pub const MOMENTUM_POINTS: f64 = 20.0;
/// Points available to the fast-timeframe volatility component.
pub const VOLATILITY_POINTS: f64 = 10.0;

/// Medium-timeframe share of the blended trend component.
pub const TREND_MEDIUM_WEIGHT: f64 = 0.6;
/// Slow-timeframe share of the blended trend component.
pub const TREND_SLOW_WEIGHT: f64 = 0.4;

/// Raised when a feature input is non-finite. Aborts only the affected
/// pair's pipeline.
#[derive(Debug, Error)]
#[error("non-finite feature input: {component}")]
pub struct CalculationError {
    pub component: &'static str,
}

/// The xscore with its weighted sub-totals, for audit and explainability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub structure_pts: f64,
    pub trend_pts: f64,
    pub momentum_pts: f64,
    pub volatility_pts: f64,
    /// Final integer score, clamped to [0,100], truncated toward zero.
    pub total: i64,
}

/// Compute the xscore from a three-timeframe feature bundle.
///
/// Deterministic and pure: identical bundles always produce identical
/// breakdowns.
pub fn calculate_xscore(features: &TimeframeFeatures) -> Result<ScoreBreakdown, CalculationError> {
    let structure = checked(features.fast.structure_strength, "structure")?;
    let trend_medium = checked(features.medium.trend_strength, "trend_medium")?;
    let trend_slow = checked(features.slow.trend_strength, "trend_slow")?;
    let momentum = checked(features.fast.momentum, "momentum")?;
    let volatility = checked(features.fast.volatility, "volatility")?;

    let structure_pts = structure * STRUCTURE_POINTS;
    let trend_pts =
        (trend_medium * TREND_MEDIUM_WEIGHT + trend_slow * TREND_SLOW_WEIGHT) * TREND_POINTS;
    let momentum_pts = momentum * MOMENTUM_POINTS;
    let volatility_pts = volatility * VOLATILITY_POINTS;

    let raw = structure_pts + trend_pts + momentum_pts + volatility_pts;
    let total = raw.clamp(0.0, 100.0) as i64;

    Ok(ScoreBreakdown {
        structure_pts,
        trend_pts,
        momentum_pts,
        volatility_pts,
        total,
    })
}

/// Human-readable confidence label for an xscore.
pub fn confidence_text(xscore: i64) -> &'static str {
    if xscore >= 75 {
        "VERY HIGH"
    } else if xscore >= 60 {
        "HIGH"
    } else if xscore >= 45 {
        "MEDIUM"
    } else {
        "LOW"
    }
}

fn checked(value: f64, component: &'static str) -> Result<f64, CalculationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CalculationError { component })
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureBundle;

    fn bundle(structure: f64, trend: f64, momentum: f64, volatility: f64) -> FeatureBundle {
        FeatureBundle {
            structure_strength: structure,
            trend_strength: trend,
            momentum,
            volatility,
            ..FeatureBundle::default()
        }
    }

    fn features(
        fast_structure: f64,
        medium_trend: f64,
        slow_trend: f64,
        momentum: f64,
        volatility: f64,
    ) -> TimeframeFeatures {
        TimeframeFeatures {
            fast: bundle(fast_structure, 0.0, momentum, volatility),
            medium: bundle(0.0, medium_trend, 0.0, 0.0),
            slow: bundle(0.0, slow_trend, 0.0, 0.0),
        }
    }

    #[test]
    fn all_zero_features_score_zero() {
        let breakdown = calculate_xscore(&features(0.0, 0.0, 0.0, 0.0, 0.0)).unwrap();
        assert_eq!(breakdown.total, 0);
    }

    #[test]
    fn all_max_features_score_hundred() {
        let breakdown = calculate_xscore(&features(1.0, 1.0, 1.0, 1.0, 1.0)).unwrap();
        assert_eq!(breakdown.total, 100);
        assert!((breakdown.structure_pts - 35.0).abs() < 1e-9);
        assert!((breakdown.trend_pts - 35.0).abs() < 1e-9);
        assert!((breakdown.momentum_pts - 20.0).abs() < 1e-9);
        assert!((breakdown.volatility_pts - 10.0).abs() < 1e-9);
    }

    #[test]
    fn trend_blend_weights_medium_over_slow() {
        let medium_only = calculate_xscore(&features(0.0, 1.0, 0.0, 0.0, 0.0)).unwrap();
        let slow_only = calculate_xscore(&features(0.0, 0.0, 1.0, 0.0, 0.0)).unwrap();
        assert!((medium_only.trend_pts - 21.0).abs() < 1e-9); // 0.6 * 35
        assert!((slow_only.trend_pts - 14.0).abs() < 1e-9); // 0.4 * 35
    }

    #[test]
    fn truncates_toward_zero() {
        // structure 0.5 => 17.5 pts, everything else zero => total 17.
        let breakdown = calculate_xscore(&features(0.5, 0.0, 0.0, 0.0, 0.0)).unwrap();
        assert_eq!(breakdown.total, 17);
    }

    #[test]
    fn monotone_in_each_component() {
        let base = features(0.3, 0.3, 0.3, 0.3, 0.3);
        let base_total = calculate_xscore(&base).unwrap().total;

        for bump in [
            features(0.6, 0.3, 0.3, 0.3, 0.3),
            features(0.3, 0.6, 0.3, 0.3, 0.3),
            features(0.3, 0.3, 0.6, 0.3, 0.3),
            features(0.3, 0.3, 0.3, 0.6, 0.3),
            features(0.3, 0.3, 0.3, 0.3, 0.6),
        ] {
            let bumped = calculate_xscore(&bump).unwrap().total;
            assert!(
                bumped >= base_total,
                "raising a component must never lower the score ({bumped} < {base_total})"
            );
        }
    }

    #[test]
    fn non_finite_input_is_a_calculation_error() {
        let broken = features(f64::NAN, 0.3, 0.3, 0.3, 0.3);
        let err = calculate_xscore(&broken).unwrap_err();
        assert_eq!(err.component, "structure");
    }

    #[test]
    fn scoring_is_idempotent() {
        let f = features(0.7, 0.4, 0.9, 0.2, 0.5);
        let a = calculate_xscore(&f).unwrap();
        let b = calculate_xscore(&f).unwrap();
        assert_eq!(a.total, b.total);
        assert_eq!(a.structure_pts, b.structure_pts);
    }

    #[test]
    fn confidence_labels() {
        assert_eq!(confidence_text(85), "VERY HIGH");
        assert_eq!(confidence_text(75), "VERY HIGH");
        assert_eq!(confidence_text(60), "HIGH");
        assert_eq!(confidence_text(45), "MEDIUM");
        assert_eq!(confidence_text(44), "LOW");
        assert_eq!(confidence_text(0), "LOW");
    }
}
