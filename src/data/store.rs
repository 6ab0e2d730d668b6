//! Evaluation store seam
//!
//! All cross-cycle coordination happens through this store: performance
//! records, snapshots, and decisions are append-only; rankings are replaced
//! wholesale per regime. The replace must be atomic so concurrent readers
//! never observe a half-written leaderboard.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::core::performance::AgentPerformanceRecord;
use crate::core::ranking::AgentRanking;
use crate::core::regime::{Regime, RegimeSnapshot};
use crate::core::rotation::RotationDecision;

/// Aggregate performance statistics over a trailing window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub total_agents: u32,
    pub avg_accuracy: f64,
    pub avg_sharpe_ratio: f64,
    pub avg_total_return: f64,
    pub avg_response_time: f64,
}

/// Persistence contract for all engine artifacts
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    /// Append one performance record (insert-only; records are immutable)
    async fn insert_performance(&self, record: &AgentPerformanceRecord) -> Result<()>;

    /// Records stored for `regime` within the trailing `window`, newest first
    async fn recent_performance(
        &self,
        regime: Regime,
        window: Duration,
    ) -> Result<Vec<AgentPerformanceRecord>>;

    /// Atomically replace the leaderboard for `regime` with `rows`
    async fn replace_rankings(&self, regime: Regime, rows: &[AgentRanking]) -> Result<()>;

    /// Current leaderboard for `regime`, best rank first, capped at `limit`
    async fn rankings_for(&self, regime: Regime, limit: usize) -> Result<Vec<AgentRanking>>;

    /// Append one rotation decision to the log
    async fn insert_decision(&self, decision: &RotationDecision) -> Result<()>;

    /// Most recent rotation decisions, newest first
    async fn recent_decisions(&self, limit: usize) -> Result<Vec<RotationDecision>>;

    /// Append one regime snapshot to the history
    async fn insert_snapshot(&self, snapshot: &RegimeSnapshot) -> Result<()>;

    /// Latest regime snapshot, if any has been written
    async fn latest_snapshot(&self) -> Result<Option<RegimeSnapshot>>;

    /// Aggregate stats over performance records in the trailing `window`
    async fn performance_stats(&self, window: Duration) -> Result<PerformanceStats>;
}
