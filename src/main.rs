// =============================================================================
// XSignal Engine — Main Entry Point
// =============================================================================
//
// Signals are never auto-traded: every accepted setup is queued as `pending`
// and a reviewer (or downstream service) approves it.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod confirm;
mod engine_config;
mod features;
mod indicators;
mod market_data;
mod orchestrator;
mod provider;
mod queue;
mod scheduler;
mod scoring;
mod signal_builder;
mod tier;
mod types;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::engine_config::{save_config, ConfigProvider, EngineConfig, FileConfigProvider};
use crate::orchestrator::ScanOrchestrator;
use crate::provider::BinanceProvider;
use crate::queue::JsonlStore;
use crate::scheduler::Scheduler;
use crate::types::Mode;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & logging ─────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        XSignal Engine — Starting Up                      ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    // ── 2. Config ────────────────────────────────────────────────────────
    let config_path =
        std::env::var("XSIGNAL_CONFIG").unwrap_or_else(|_| "engine_config.json".into());

    if !std::path::Path::new(&config_path).exists() {
        info!(path = %config_path, "no config file found — seeding defaults");
        if let Err(e) = save_config(&EngineConfig::default(), &config_path) {
            warn!(error = %e, "failed to seed default config — continuing with in-memory defaults");
        }
    }

    let config_provider = Arc::new(FileConfigProvider::new(&config_path));
    let startup_config = config_provider.load();
    info!(
        enabled = startup_config.enabled,
        pairs = ?startup_config.pairs,
        free = startup_config.min_xscore_free,
        pro = startup_config.min_xscore_pro,
        xpro = startup_config.min_xscore_xpro,
        "engine config"
    );

    // ── 3. Capabilities ──────────────────────────────────────────────────
    let queue_path =
        std::env::var("XSIGNAL_QUEUE").unwrap_or_else(|_| "signal_queue.jsonl".into());
    let store = Arc::new(JsonlStore::new(&queue_path));
    let provider = Arc::new(BinanceProvider::new());
    info!(queue = %queue_path, "signal queue ready");

    // ── 4. Orchestrator & scheduler ──────────────────────────────────────
    let orchestrator = Arc::new(ScanOrchestrator::new(provider, store));
    let scheduler = Arc::new(Scheduler::new(orchestrator, config_provider));

    let scalp_job = scheduler.spawn(Mode::Scalp);
    let swing_job = scheduler.spawn(Mode::Swing);
    info!(
        scalp_interval_secs = Mode::Scalp.scan_interval().as_secs(),
        swing_interval_secs = Mode::Swing.scan_interval().as_secs(),
        "scan jobs launched"
    );

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");

    scalp_job.abort();
    swing_job.abort();

    info!("XSignal Engine shut down complete.");
    Ok(())
}
