//! Threshold-Based Market Regime Classification
//!
//! Classifies the prevailing market regime from a trailing daily series:
//! - Volatile: annualized volatility above 25%
//! - Bull / Bear: total-period trend beyond +/-5%
//! - Neutral: trend inside a +/-2% band
//! - Trending: directional drift between the neutral band and the bull/bear
//!   thresholds
//!
//! Volatility takes precedence over the trend checks. An empty series or a
//! failed provider call degrades to a fixed neutral fallback snapshot rather
//! than an error.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::synthetic::SyntheticEstimator;
use crate::data::market::Candle;

/// Annualization factor for daily return volatility
const TRADING_DAYS: f64 = 252.0;

/// Volatility level that overrides any trend reading
const VOLATILE_THRESHOLD: f64 = 0.25;

/// Trend beyond which the market counts as bull/bear
const TREND_THRESHOLD: f64 = 0.05;

/// Trend band inside which the market counts as neutral
const NEUTRAL_BAND: f64 = 0.02;

/// Confidence ceiling for every non-fallback branch
const MAX_CONFIDENCE: f64 = 0.95;

/// Fixed confidence for the neutral branch
const NEUTRAL_CONFIDENCE: f64 = 0.8;

/// Recent observations used for the volume ratio numerator
const RECENT_VOLUME_WINDOW: usize = 5;

/// Market regime classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Bull,
    Bear,
    Neutral,
    Volatile,
    Trending,
}

impl Regime {
    /// Convert to database-storable string
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::Bull => "bull",
            Regime::Bear => "bear",
            Regime::Neutral => "neutral",
            Regime::Volatile => "volatile",
            Regime::Trending => "trending",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bull" => Some(Regime::Bull),
            "bear" => Some(Regime::Bear),
            "neutral" => Some(Regime::Neutral),
            "volatile" => Some(Regime::Volatile),
            "trending" => Some(Regime::Trending),
            _ => None,
        }
    }

    /// Get all regimes
    pub fn all() -> [Regime; 5] {
        [
            Regime::Bull,
            Regime::Bear,
            Regime::Neutral,
            Regime::Volatile,
            Regime::Trending,
        ]
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of the total-period trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Neutral,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Up => "up",
            TrendDirection::Down => "down",
            TrendDirection::Neutral => "neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(TrendDirection::Up),
            "down" => Some(TrendDirection::Down),
            "neutral" => Some(TrendDirection::Neutral),
            _ => None,
        }
    }
}

/// Auxiliary indicator placeholders carried alongside a snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketIndicators {
    pub rsi: f64,
    pub macd: f64,
    pub bollinger_position: f64,
}

impl MarketIndicators {
    /// Neutral placeholder values used on the fallback path
    pub fn neutral() -> Self {
        Self {
            rsi: 50.0,
            macd: 0.0,
            bollinger_position: 0.5,
        }
    }
}

/// One classification result; appended to the snapshot history each cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeSnapshot {
    pub regime: Regime,
    pub confidence: f64,
    pub volatility: f64,
    pub trend_strength: f64,
    pub volume_ratio: f64,
    pub trend_direction: TrendDirection,
    pub indicators: MarketIndicators,
    pub timestamp: DateTime<Utc>,
}

/// Classifies a daily price/volume series into a regime snapshot
pub struct RegimeClassifier {
    estimator: Arc<dyn SyntheticEstimator>,
}

impl RegimeClassifier {
    pub fn new(estimator: Arc<dyn SyntheticEstimator>) -> Self {
        Self { estimator }
    }

    /// Classify a series covering the lookback window, oldest candle first.
    ///
    /// Fewer than two observations cannot produce a return series and fall
    /// back to the neutral snapshot.
    pub fn classify(&self, candles: &[Candle]) -> RegimeSnapshot {
        if candles.len() < 2 {
            return Self::fallback_snapshot();
        }

        let closes: Vec<f64> = candles
            .iter()
            .map(|c| c.close.to_f64().unwrap_or(0.0))
            .collect();
        let first = closes[0];
        let last = closes[closes.len() - 1];
        if first <= 0.0 || last <= 0.0 {
            return Self::fallback_snapshot();
        }

        let returns: Vec<f64> = closes
            .windows(2)
            .filter(|w| w[0] > 0.0)
            .map(|w| (w[1] - w[0]) / w[0])
            .collect();
        if returns.is_empty() {
            return Self::fallback_snapshot();
        }

        let volatility = std_dev(&returns) * TRADING_DAYS.sqrt();
        let trend = last / first - 1.0;
        let volume_ratio = volume_ratio(candles);

        let (regime, confidence) = classify_signals(volatility, trend);
        let trend_direction = if trend > 0.0 {
            TrendDirection::Up
        } else {
            TrendDirection::Down
        };

        RegimeSnapshot {
            regime,
            confidence,
            volatility,
            trend_strength: trend.abs(),
            volume_ratio,
            trend_direction,
            indicators: MarketIndicators {
                rsi: self.estimator.sample(30.0, 70.0),
                macd: self.estimator.sample(-0.02, 0.02),
                bollinger_position: self.estimator.sample(0.2, 0.8),
            },
            timestamp: Utc::now(),
        }
    }

    /// Fixed degraded-but-valid snapshot used when market data is unavailable
    pub fn fallback_snapshot() -> RegimeSnapshot {
        RegimeSnapshot {
            regime: Regime::Neutral,
            confidence: 0.6,
            volatility: 0.15,
            trend_strength: 0.02,
            volume_ratio: 1.0,
            trend_direction: TrendDirection::Neutral,
            indicators: MarketIndicators::neutral(),
            timestamp: Utc::now(),
        }
    }
}

/// Map volatility and trend signals to a regime and its confidence.
///
/// Precedence: volatility first, then trend magnitude, then the neutral band.
pub fn classify_signals(volatility: f64, trend: f64) -> (Regime, f64) {
    if volatility > VOLATILE_THRESHOLD {
        (Regime::Volatile, (volatility * 2.0).min(MAX_CONFIDENCE))
    } else if trend > TREND_THRESHOLD {
        (Regime::Bull, (trend.abs() * 10.0).min(MAX_CONFIDENCE))
    } else if trend < -TREND_THRESHOLD {
        (Regime::Bear, (trend.abs() * 10.0).min(MAX_CONFIDENCE))
    } else if trend.abs() < NEUTRAL_BAND {
        (Regime::Neutral, NEUTRAL_CONFIDENCE)
    } else {
        (Regime::Trending, (trend.abs() * 8.0).min(MAX_CONFIDENCE))
    }
}

/// Population standard deviation
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Mean of the most recent volumes over the mean of the full window
fn volume_ratio(candles: &[Candle]) -> f64 {
    let volumes: Vec<f64> = candles.iter().map(|c| c.volume as f64).collect();
    let avg = volumes.iter().sum::<f64>() / volumes.len() as f64;
    if avg <= 0.0 {
        return 1.0;
    }
    let recent = &volumes[volumes.len().saturating_sub(RECENT_VOLUME_WINDOW)..];
    let recent_avg = recent.iter().sum::<f64>() / recent.len() as f64;
    recent_avg / avg
}
