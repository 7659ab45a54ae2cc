// =============================================================================
// Time-series provider — ordered OHLCV history for a symbol/interval
// =============================================================================
//
// The pipeline only ever sees the `TimeSeriesProvider` trait; the concrete
// Binance REST implementation below fetches public klines (no signing, no
// API key). Requests carry a timeout and are retried across a bounded list
// of mirror endpoints before the pair is given up for the cycle.
// =============================================================================

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::market_data::Candle;

/// Typed fetch failure. Aborts only the affected pair's current cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed kline payload: {0}")]
    Malformed(String),

    #[error("all endpoints exhausted for {symbol}@{interval}: {last_error}")]
    Exhausted {
        symbol: String,
        interval: String,
        last_error: String,
    },
}

/// Supplies ordered candle sequences. Implementations must return candles
/// oldest-first.
#[async_trait]
pub trait TimeSeriesProvider: Send + Sync {
    async fn fetch(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, FetchError>;
}

/// Request timeout applied to every kline call.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Public Binance REST mirrors, tried in order.
const DEFAULT_ENDPOINTS: &[&str] = &[
    "https://api.binance.com",
    "https://api1.binance.com",
    "https://api2.binance.com",
];

/// Binance spot klines provider (public endpoint, array-of-arrays format).
#[derive(Clone)]
pub struct BinanceProvider {
    client: reqwest::Client,
    endpoints: Vec<String>,
}

impl BinanceProvider {
    pub fn new() -> Self {
        Self::with_endpoints(DEFAULT_ENDPOINTS.iter().map(|s| s.to_string()).collect())
    }

    /// Build a provider against a custom endpoint list (used by tests and
    /// regional deployments).
    pub fn with_endpoints(endpoints: Vec<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");
        Self { client, endpoints }
    }

    /// One GET /api/v3/klines attempt against a single base URL.
    async fn fetch_from(
        &self,
        base_url: &str,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, FetchError> {
        let url = format!(
            "{base_url}/api/v3/klines?symbol={symbol}&interval={interval}&limit={limit}"
        );

        let resp = self.client.get(&url).send().await?;
        let status = resp.status().as_u16();
        // Text first: error pages from mirrors are not always JSON, and a
        // failed status must surface as Status, not a decode error.
        let body = resp.text().await?;

        let candles = decode_klines(status, &body)?;
        debug!(symbol, interval, count = candles.len(), "klines fetched");
        Ok(candles)
    }
}

/// Decode one klines response body. Non-2xx responses become `Status` with
/// the raw body attached; success bodies must be the array-of-arrays format.
fn decode_klines(status: u16, body: &str) -> Result<Vec<Candle>, FetchError> {
    if !(200..300).contains(&status) {
        return Err(FetchError::Status {
            status,
            body: body.to_string(),
        });
    }

    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| FetchError::Malformed(format!("klines response is not JSON: {e}")))?;
    let raw = value
        .as_array()
        .ok_or_else(|| FetchError::Malformed("klines response is not an array".into()))?;

    let mut candles = Vec::with_capacity(raw.len());
    for entry in raw {
        let arr = entry
            .as_array()
            .ok_or_else(|| FetchError::Malformed("kline entry is not an array".into()))?;
        if arr.len() < 7 {
            warn!(elements = arr.len(), "skipping malformed kline entry");
            continue;
        }

        let open_time = arr[0].as_i64().unwrap_or(0);
        let open = parse_str_f64(&arr[1])?;
        let high = parse_str_f64(&arr[2])?;
        let low = parse_str_f64(&arr[3])?;
        let close = parse_str_f64(&arr[4])?;
        let volume = parse_str_f64(&arr[5])?;
        let close_time = arr[6].as_i64().unwrap_or(0);

        candles.push(Candle::new(
            open_time, open, high, low, close, volume, close_time,
        ));
    }

    Ok(candles)
}

impl Default for BinanceProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TimeSeriesProvider for BinanceProvider {
    async fn fetch(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, FetchError> {
        let mut last_error = String::from("no endpoints configured");

        for base_url in &self.endpoints {
            match self.fetch_from(base_url, symbol, interval, limit).await {
                Ok(candles) => return Ok(candles),
                Err(e) => {
                    warn!(
                        symbol,
                        interval,
                        endpoint = %base_url,
                        error = %e,
                        "kline fetch attempt failed — trying next endpoint"
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(FetchError::Exhausted {
            symbol: symbol.to_string(),
            interval: interval.to_string(),
            last_error,
        })
    }
}

/// Binance sends numeric values as JSON strings inside kline arrays.
fn parse_str_f64(val: &serde_json::Value) -> Result<f64, FetchError> {
    if let Some(s) = val.as_str() {
        s.parse::<f64>()
            .map_err(|_| FetchError::Malformed(format!("failed to parse '{s}' as f64")))
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        Err(FetchError::Malformed(format!(
            "expected string or number, got: {val}"
        )))
    }
}
