// =============================================================================
// Scan orchestrator — one pair, one mode, through every gate
// =============================================================================
//
// Gate order is fixed: config check, multi-timeframe confirmation, scoring,
// tier routing, level construction, side consistency, spam check, publish.
// The first gate that fails short-circuits the scan with a skip reason; a
// pair failing never affects the other pairs in the cycle.
// =============================================================================

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::confirm::{self, FETCH_LIMIT};
use crate::engine_config::EngineConfig;
use crate::features::Calibration;
use crate::provider::TimeSeriesProvider;
use crate::queue::{NewRecord, RecordStatus, SignalStore};
use crate::scoring::{calculate_xscore, confidence_text};
use crate::signal_builder::build_signal;
use crate::tier::{route, Tier, TierThresholds};
use crate::types::Mode;

/// Why a scan produced no published signal. One reason per skipped scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Disabled,
    PairNotAllowed,
    ConfirmFailed,
    ScoreError,
    TierRejected,
    NoBreakout,
    SideMismatch,
    SpamSuppressed,
    PublishFailed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::Disabled => "disabled",
            SkipReason::PairNotAllowed => "pair_not_allowed",
            SkipReason::ConfirmFailed => "confirm_failed",
            SkipReason::ScoreError => "score_error",
            SkipReason::TierRejected => "tier_rejected",
            SkipReason::NoBreakout => "no_breakout",
            SkipReason::SideMismatch => "side_mismatch",
            SkipReason::SpamSuppressed => "spam_suppressed",
            SkipReason::PublishFailed => "publish_failed",
        };
        write!(f, "{s}")
    }
}

/// Result of one pair scan.
#[derive(Debug)]
pub enum ScanOutcome {
    Published(crate::queue::QueueRecord),
    Skipped(SkipReason),
}

impl ScanOutcome {
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            ScanOutcome::Published(_) => None,
            ScanOutcome::Skipped(reason) => Some(*reason),
        }
    }
}

/// Runs pair scans against injected market-data and storage capabilities.
pub struct ScanOrchestrator<P, S> {
    provider: Arc<P>,
    store: Arc<S>,
    calibration: Calibration,
}

impl<P, S> ScanOrchestrator<P, S>
where
    P: TimeSeriesProvider,
    S: SignalStore,
{
    pub fn new(provider: Arc<P>, store: Arc<S>) -> Self {
        Self {
            provider,
            store,
            calibration: Calibration::default(),
        }
    }

    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = calibration;
        self
    }

    /// Scan one pair in one mode against a config snapshot.
    pub async fn scan_pair(&self, config: &EngineConfig, pair: &str, mode: Mode) -> ScanOutcome {
        let pair = pair.trim().to_uppercase();

        // Gate 1: config.
        if !config.enabled {
            debug!(%pair, ?mode, "engine disabled — skipping scan");
            return ScanOutcome::Skipped(SkipReason::Disabled);
        }
        if !config.pairs.is_empty() && !config.pairs.iter().any(|p| p.eq_ignore_ascii_case(&pair)) {
            debug!(%pair, ?mode, "pair not in allowlist");
            return ScanOutcome::Skipped(SkipReason::PairNotAllowed);
        }

        // Gate 2: multi-timeframe confirmation.
        let confirmation = match confirm::confirm(self.provider.as_ref(), &pair, &self.calibration)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                warn!(%pair, ?mode, error = %e, "confirmation fetch failed");
                return ScanOutcome::Skipped(SkipReason::ConfirmFailed);
            }
        };
        if !confirmation.ok {
            return ScanOutcome::Skipped(SkipReason::ConfirmFailed);
        }
        let Some(confirmed_side) = confirmation.side else {
            return ScanOutcome::Skipped(SkipReason::ConfirmFailed);
        };

        // Gate 3: score.
        let breakdown = match calculate_xscore(&confirmation.features) {
            Ok(b) => b,
            Err(e) => {
                warn!(%pair, ?mode, error = %e, "scoring failed");
                return ScanOutcome::Skipped(SkipReason::ScoreError);
            }
        };

        // Gate 4: tier.
        let thresholds = TierThresholds::from_config(config);
        let tier = route(breakdown.total, thresholds);
        if tier == Tier::Reject {
            debug!(%pair, ?mode, xscore = breakdown.total, "score below every tier");
            return ScanOutcome::Skipped(SkipReason::TierRejected);
        }

        // Gate 5: levels on the decision timeframe.
        let decision_candles = match self
            .provider
            .fetch(&pair, mode.decision_interval(), FETCH_LIMIT)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                // A fetch failure at this stage means levels cannot be
                // anchored, which reads downstream as "no breakout".
                warn!(%pair, ?mode, error = %e, "decision timeframe fetch failed");
                return ScanOutcome::Skipped(SkipReason::NoBreakout);
            }
        };
        let Some(signal) = build_signal(&decision_candles, mode) else {
            return ScanOutcome::Skipped(SkipReason::NoBreakout);
        };

        // Gate 6: side consistency between confirmation and levels.
        if signal.side != confirmed_side {
            warn!(
                %pair,
                ?mode,
                confirmed = %confirmed_side,
                built = %signal.side,
                "side mismatch between confirmation and level build"
            );
            return ScanOutcome::Skipped(SkipReason::SideMismatch);
        }

        // Gate 7: spam check. Fails open: a store read error never blocks a
        // publish.
        match self
            .store
            .latest_matching(&pair, mode, RecordStatus::Pending)
            .await
        {
            Ok(Some(prev)) if prev.signal.side == signal.side => {
                debug!(%pair, ?mode, side = %signal.side, "duplicate pending signal suppressed");
                return ScanOutcome::Skipped(SkipReason::SpamSuppressed);
            }
            Ok(_) => {}
            Err(e) => {
                warn!(%pair, ?mode, error = %e, "spam check unavailable — proceeding");
            }
        }

        // Gate 8: publish.
        let draft = NewRecord {
            pair: pair.clone(),
            mode,
            tier,
            xscore: breakdown.total,
            confidence: confidence_text(breakdown.total).to_string(),
            features: confirmation.features,
            signal,
        };
        match self.store.append(draft).await {
            Ok(record) => {
                info!(
                    pair = %record.pair,
                    ?mode,
                    tier = %record.tier,
                    xscore = record.xscore,
                    side = %record.signal.side,
                    entry_mid = record.signal.entry_mid,
                    sl = record.signal.sl,
                    "signal queued as pending"
                );
                ScanOutcome::Published(record)
            }
            Err(e) => {
                warn!(%pair, ?mode, error = %e, "queue append failed — signal lost");
                ScanOutcome::Skipped(SkipReason::PublishFailed)
            }
        }
    }
}
