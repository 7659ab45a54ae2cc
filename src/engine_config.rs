// =============================================================================
// Engine configuration — kill switch, tier thresholds, pair allowlist
// =============================================================================
//
// Every field carries a serde default so that older or partial JSON files
// still deserialise. `ConfigProvider::load` is infallible by design: when the
// backing file is missing or corrupted the documented defaults apply and a
// warning is logged. The engine re-reads the config at the start of every
// scan cycle; changes apply from the next cycle.
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

fn default_true() -> bool {
    true
}

fn default_min_xscore_free() -> i64 {
    55
}

fn default_min_xscore_pro() -> i64 {
    70
}

fn default_min_xscore_xpro() -> i64 {
    85
}

fn default_pairs() -> Vec<String> {
    vec![
        "BTCUSDT".to_string(),
        "ETHUSDT".to_string(),
        "SOLUSDT".to_string(),
    ]
}

/// Engine settings read once per scan cycle and treated as an immutable
/// snapshot for the cycle's duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Kill switch. When false, every scan exits at the first gate.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum xscore for the free tier.
    #[serde(default = "default_min_xscore_free")]
    pub min_xscore_free: i64,

    /// Minimum xscore for the pro tier.
    #[serde(default = "default_min_xscore_pro")]
    pub min_xscore_pro: i64,

    /// Minimum xscore for the xpro tier.
    #[serde(default = "default_min_xscore_xpro")]
    pub min_xscore_xpro: i64,

    /// Pair allowlist. An empty list means "no restriction".
    #[serde(default = "default_pairs")]
    pub pairs: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_xscore_free: default_min_xscore_free(),
            min_xscore_pro: default_min_xscore_pro(),
            min_xscore_xpro: default_min_xscore_xpro(),
            pairs: default_pairs(),
        }
    }
}

/// Loads the engine configuration. Implementations must never fail: a broken
/// backing store degrades to defaults.
pub trait ConfigProvider: Send + Sync {
    fn load(&self) -> EngineConfig;
}

/// JSON file backed config provider.
pub struct FileConfigProvider {
    path: PathBuf,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn try_load(&self) -> Result<EngineConfig> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read engine config from {}", self.path.display()))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", self.path.display()))?;
        Ok(config)
    }
}

impl ConfigProvider for FileConfigProvider {
    fn load(&self) -> EngineConfig {
        match self.try_load() {
            Ok(config) => {
                info!(
                    path = %self.path.display(),
                    enabled = config.enabled,
                    pairs = ?config.pairs,
                    "engine config loaded"
                );
                config
            }
            Err(e) => {
                warn!(error = %e, "engine config unavailable — using defaults");
                EngineConfig::default()
            }
        }
    }
}

/// Persist a config to `path` using an atomic tmp + rename write. Used by the
/// bootstrap to seed a default file on first run.
pub fn save_config(config: &EngineConfig, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let content =
        serde_json::to_string_pretty(config).context("failed to serialise engine config")?;

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &content)
        .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

    info!(path = %path.display(), "engine config saved (atomic)");
    Ok(())
}
