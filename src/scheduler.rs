// =============================================================================
// Scan scheduler — periodic cycles per mode
// =============================================================================
//
// Two independent jobs: scalp every 5 minutes, swing every hour. Each cycle
// snapshots the config once, then scans the configured pairs sequentially so
// a cycle never hammers the data provider in parallel. A cycle that overruns
// its interval is coalesced, never stacked.
// =============================================================================

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::engine_config::ConfigProvider;
use crate::orchestrator::{ScanOrchestrator, ScanOutcome};
use crate::provider::TimeSeriesProvider;
use crate::queue::SignalStore;
use crate::types::Mode;

/// Totals for one completed scan cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleSummary {
    pub scanned: usize,
    pub published: usize,
    pub skipped: usize,
}

/// Drives scan cycles for both modes against one orchestrator.
pub struct Scheduler<P, S, C> {
    orchestrator: Arc<ScanOrchestrator<P, S>>,
    config: Arc<C>,
}

impl<P, S, C> Scheduler<P, S, C>
where
    P: TimeSeriesProvider + 'static,
    S: SignalStore + 'static,
    C: ConfigProvider + 'static,
{
    pub fn new(orchestrator: Arc<ScanOrchestrator<P, S>>, config: Arc<C>) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    /// Run one full cycle for a mode: snapshot the config, scan each
    /// configured pair in order. Per-pair failures are contained by the
    /// orchestrator and only counted here.
    pub async fn run_cycle(&self, mode: Mode) -> CycleSummary {
        let config = self.config.load();
        let mut summary = CycleSummary::default();

        if config.pairs.is_empty() {
            debug!(?mode, "no pairs configured — idle cycle");
            return summary;
        }

        for pair in &config.pairs {
            summary.scanned += 1;
            match self.orchestrator.scan_pair(&config, pair, mode).await {
                ScanOutcome::Published(record) => {
                    summary.published += 1;
                    info!(
                        ?mode,
                        pair = %record.pair,
                        tier = %record.tier,
                        xscore = record.xscore,
                        "cycle published signal"
                    );
                }
                ScanOutcome::Skipped(reason) => {
                    summary.skipped += 1;
                    debug!(?mode, %pair, %reason, "cycle skipped pair");
                }
            }
        }

        info!(
            ?mode,
            scanned = summary.scanned,
            published = summary.published,
            skipped = summary.skipped,
            "scan cycle complete"
        );
        summary
    }

    /// Spawn the periodic job for one mode. The loop awaits each cycle, so
    /// cycles for a mode never overlap; ticks missed while a cycle overruns
    /// its interval are skipped, never stacked.
    pub fn spawn(self: &Arc<Self>, mode: Mode) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(mode.scan_interval());
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                scheduler.run_cycle(mode).await;
            }
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    use crate::confirm::{FAST_INTERVAL, MEDIUM_INTERVAL, SLOW_INTERVAL};
    use crate::engine_config::EngineConfig;
    use crate::market_data::Candle;
    use crate::provider::FetchError;
    use crate::queue::MemoryStore;

    /// Config provider that always returns a fixed snapshot.
    struct StaticConfig(EngineConfig);

    impl ConfigProvider for StaticConfig {
        fn load(&self) -> EngineConfig {
            self.0.clone()
        }
    }

    /// Serves an aligned buy setup for every symbol except those listed as
    /// broken, which always fail to fetch.
    struct SelectiveProvider {
        series: HashMap<&'static str, Vec<Candle>>,
        broken: Vec<&'static str>,
    }

    impl SelectiveProvider {
        fn new(broken: Vec<&'static str>) -> Self {
            fn candle(high: f64, low: f64, close: f64, volume: f64) -> Candle {
                Candle::new(0, close, high, low, close, volume, 0)
            }

            let mut fast: Vec<Candle> = (0..59)
                .map(|_| candle(100.5, 99.5, 100.0, 100.0))
                .collect();
            fast.push(candle(101.5, 100.0, 101.2, 150.0));

            let uptrend: Vec<Candle> = (0..60)
                .map(|i| {
                    let base = 100.0 + i as f64 * 2.0;
                    candle(base + 1.5, base - 0.5, base + 1.0, 100.0)
                })
                .collect();

            let mut series = HashMap::new();
            series.insert(FAST_INTERVAL, fast);
            series.insert(MEDIUM_INTERVAL, uptrend.clone());
            series.insert(SLOW_INTERVAL, uptrend);
            Self { series, broken }
        }
    }

    #[async_trait]
    impl TimeSeriesProvider for SelectiveProvider {
        async fn fetch(
            &self,
            symbol: &str,
            interval: &str,
            _limit: u32,
        ) -> Result<Vec<Candle>, FetchError> {
            if self.broken.contains(&symbol) {
                return Err(FetchError::Exhausted {
                    symbol: symbol.to_string(),
                    interval: interval.to_string(),
                    last_error: "scripted outage".into(),
                });
            }
            self.series.get(interval).cloned().ok_or_else(|| {
                FetchError::Exhausted {
                    symbol: symbol.to_string(),
                    interval: interval.to_string(),
                    last_error: "scripted miss".into(),
                }
            })
        }
    }

    fn scheduler_with(
        config: EngineConfig,
        broken: Vec<&'static str>,
    ) -> (
        Scheduler<SelectiveProvider, MemoryStore, StaticConfig>,
        Arc<MemoryStore>,
    ) {
        let store = Arc::new(MemoryStore::new());
        let orch = Arc::new(ScanOrchestrator::new(
            Arc::new(SelectiveProvider::new(broken)),
            store.clone(),
        ));
        let scheduler = Scheduler::new(orch, Arc::new(StaticConfig(config)));
        (scheduler, store)
    }

    #[tokio::test]
    async fn cycle_scans_every_configured_pair() {
        let mut config = EngineConfig::default();
        config.pairs = vec!["BTCUSDT".into(), "ETHUSDT".into()];
        let (scheduler, store) = scheduler_with(config, Vec::new());

        let summary = scheduler.run_cycle(Mode::Scalp).await;
        assert_eq!(summary.scanned, 2);
        assert_eq!(summary.published, 2);
        assert_eq!(summary.skipped, 0);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn one_broken_pair_does_not_stop_the_cycle() {
        let mut config = EngineConfig::default();
        config.pairs = vec!["BADUSDT".into(), "BTCUSDT".into()];
        let (scheduler, store) = scheduler_with(config, vec!["BADUSDT"]);

        let summary = scheduler.run_cycle(Mode::Scalp).await;
        assert_eq!(summary.scanned, 2);
        assert_eq!(summary.published, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn disabled_engine_skips_every_pair() {
        let mut config = EngineConfig::default();
        config.enabled = false;
        let (scheduler, store) = scheduler_with(config, Vec::new());

        let summary = scheduler.run_cycle(Mode::Scalp).await;
        assert_eq!(summary.scanned, 3);
        assert_eq!(summary.published, 0);
        assert_eq!(summary.skipped, 3);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_job_runs_cycles_on_the_interval() {
        let mut config = EngineConfig::default();
        config.pairs = vec!["BTCUSDT".into()];
        let (scheduler, store) = scheduler_with(config, Vec::new());
        let scheduler = Arc::new(scheduler);

        let job = scheduler.spawn(Mode::Scalp);

        // The first interval tick fires immediately.
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert_eq!(store.len(), 1, "first cycle should publish");

        // Next tick: the same setup is still pending, so the second cycle
        // runs but suppresses the duplicate.
        tokio::time::advance(Mode::Scalp.scan_interval()).await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert_eq!(store.len(), 1, "duplicate must be suppressed, not re-queued");

        job.abort();
    }

    #[tokio::test]
    async fn empty_pair_list_is_an_idle_cycle() {
        let mut config = EngineConfig::default();
        config.pairs = Vec::new();
        let (scheduler, _) = scheduler_with(config, Vec::new());

        let summary = scheduler.run_cycle(Mode::Swing).await;
        assert_eq!(summary.scanned, 0);
        assert_eq!(summary.published, 0);
    }
}
