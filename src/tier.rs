// =============================================================================
// Tier routing — xscore to audience tier
// =============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine_config::EngineConfig;

/// Audience tier for a published signal, ordered lowest to highest. `Reject`
/// means the score cleared no threshold and nothing is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Reject,
    Free,
    Pro,
    Xpro,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Reject => "reject",
            Tier::Free => "free",
            Tier::Pro => "pro",
            Tier::Xpro => "xpro",
        };
        write!(f, "{s}")
    }
}

/// The three cut-offs, validated as a set before routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierThresholds {
    pub free: i64,
    pub pro: i64,
    pub xpro: i64,
}

impl TierThresholds {
    pub const DEFAULT: Self = Self {
        free: 55,
        pro: 70,
        xpro: 85,
    };

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            free: config.min_xscore_free,
            pro: config.min_xscore_pro,
            xpro: config.min_xscore_xpro,
        }
    }

    /// Thresholds must be non-decreasing, free ≤ pro ≤ xpro (ties are legal:
    /// equal thresholds just collapse the tiers onto one cut-off, and routing
    /// picks the highest). A set that is not falls back wholesale to the
    /// defaults; partially-sane configs are never mixed with defaults.
    pub fn validated(self) -> Self {
        if self.free <= self.pro && self.pro <= self.xpro {
            self
        } else {
            warn!(
                free = self.free,
                pro = self.pro,
                xpro = self.xpro,
                "decreasing tier thresholds — falling back to defaults"
            );
            Self::DEFAULT
        }
    }
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Route an xscore to its tier. Evaluated highest tier first so a score is
/// always placed in the best tier it clears.
pub fn route(xscore: i64, thresholds: TierThresholds) -> Tier {
    let t = thresholds.validated();
    if xscore >= t.xpro {
        Tier::Xpro
    } else if xscore >= t.pro {
        Tier::Pro
    } else if xscore >= t.free {
        Tier::Free
    } else {
        Tier::Reject
    }
}
