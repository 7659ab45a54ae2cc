// =============================================================================
// Shared types used across the Xsignal engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// Direction of a trading signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// +1 for buy, -1 for sell. Used when comparing against a directional
    /// bias expressed as a sign.
    pub fn direction(self) -> i8 {
        match self {
            Self::Buy => 1,
            Self::Sell => -1,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Scan mode. Scalp decides on the fast timeframe, swing on the slow one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Scalp,
    Swing,
}

impl Mode {
    /// The timeframe used for entry/exit construction in this mode.
    pub fn decision_interval(self) -> &'static str {
        match self {
            Self::Scalp => "5m",
            Self::Swing => "1h",
        }
    }

    /// How often the periodic driver fires a scan cycle for this mode.
    pub fn scan_interval(self) -> std::time::Duration {
        match self {
            Self::Scalp => std::time::Duration::from_secs(5 * 60),
            Self::Swing => std::time::Duration::from_secs(60 * 60),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalp => write!(f, "scalp"),
            Self::Swing => write!(f, "swing"),
        }
    }
}
