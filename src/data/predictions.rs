//! Prediction history seam
//!
//! Agents emit directional predictions elsewhere in the platform; the scorer
//! only reads the recent outcomes back through this trait.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Predicted or realized market direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            _ => None,
        }
    }
}

/// One scored prediction: what the agent called, what actually happened
#[derive(Debug, Clone)]
pub struct PredictionOutcome {
    pub confidence: f64,
    pub predicted: Direction,
    pub actual: Direction,
    pub timestamp: DateTime<Utc>,
}

impl PredictionOutcome {
    /// Direction call matched the realized move
    pub fn is_correct(&self) -> bool {
        self.predicted == self.actual
    }
}

/// Read access to an agent's recent prediction outcomes
#[async_trait]
pub trait PredictionHistoryProvider: Send + Sync {
    /// Most recent outcomes for `agent` within the trailing `window`,
    /// newest first, capped at `limit`.
    async fn recent_predictions(
        &self,
        agent: &str,
        window: Duration,
        limit: usize,
    ) -> Result<Vec<PredictionOutcome>>;
}
