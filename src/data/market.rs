//! Market data provider seam
//!
//! The engine never fetches OHLCV itself; it consumes an ordered daily series
//! through this trait. Implementations may wrap a vendor API, a replay file,
//! or return nothing at all - the classifier degrades to a fallback snapshot
//! on empty or failed responses.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// One daily price/volume observation
#[derive(Debug, Clone)]
pub struct Candle {
    pub date: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

/// Provides historical price series for regime classification
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Get the daily series for `symbol` covering the trailing `lookback_days`,
    /// oldest first. May return an empty series.
    async fn price_history(&self, symbol: &str, lookback_days: u32) -> Result<Vec<Candle>>;
}

/// Provider used when no market feed is configured.
///
/// Always returns an empty series, which pins the classifier to its fallback
/// snapshot. Keeps the engine runnable without vendor credentials.
pub struct OfflineMarketData;

#[async_trait]
impl MarketDataProvider for OfflineMarketData {
    async fn price_history(&self, _symbol: &str, _lookback_days: u32) -> Result<Vec<Candle>> {
        Ok(Vec::new())
    }
}
