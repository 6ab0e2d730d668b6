//! Meta-Evaluation Summary
//!
//! Read-side view over the store: latest regime, top-ranked agents for that
//! regime, recent rotation decisions, and trailing aggregate stats. Advisory
//! telemetry only - every read failure collapses to a defaulted section so
//! the summary itself never errors.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ranking::AgentRanking;
use super::regime::Regime;
use super::rotation::RotationDecision;
use crate::data::store::{EvaluationStore, PerformanceStats};

/// Rankings included in the summary
const TOP_AGENTS: usize = 10;

/// Rotation decisions included in the summary
const RECENT_ROTATIONS: usize = 5;

/// Trailing window for the aggregate stats
const STATS_WINDOW_HOURS: i64 = 24;

/// Leaderboard entry as exposed to summary consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAgent {
    pub agent: String,
    pub rank: u32,
    pub composite_score: f64,
    pub accuracy: f64,
}

impl From<&AgentRanking> for RankedAgent {
    fn from(row: &AgentRanking) -> Self {
        Self {
            agent: row.agent.clone(),
            rank: row.rank,
            composite_score: row.composite_score,
            accuracy: row.accuracy,
        }
    }
}

/// Rotation log entry as exposed to summary consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationEntry {
    pub decision_id: String,
    pub from_agent: String,
    pub to_agent: String,
    pub reason: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<&RotationDecision> for RotationEntry {
    fn from(d: &RotationDecision) -> Self {
        Self {
            decision_id: d.decision_id.clone(),
            from_agent: d.from_agent.clone(),
            to_agent: d.to_agent.clone(),
            reason: d.reason.clone(),
            confidence: d.confidence,
            timestamp: d.timestamp,
        }
    }
}

/// Consolidated state of the evaluation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub current_regime: Regime,
    pub regime_confidence: f64,
    pub top_agents: Vec<RankedAgent>,
    pub recent_rotations: Vec<RotationEntry>,
    pub performance: PerformanceStats,
    /// Timestamp of the snapshot the summary was derived from; epoch when no
    /// snapshot has been written yet
    pub last_updated: DateTime<Utc>,
}

impl Default for EvaluationSummary {
    fn default() -> Self {
        Self {
            current_regime: Regime::Neutral,
            regime_confidence: 0.6,
            top_agents: Vec::new(),
            recent_rotations: Vec::new(),
            performance: PerformanceStats::default(),
            last_updated: DateTime::UNIX_EPOCH,
        }
    }
}

/// Assemble the summary from whatever the store currently holds.
///
/// Sections degrade independently: a failed rankings read still leaves the
/// regime and rotation sections populated.
pub async fn assemble(store: &dyn EvaluationStore) -> EvaluationSummary {
    let mut summary = EvaluationSummary::default();

    match store.latest_snapshot().await {
        Ok(Some(snapshot)) => {
            summary.current_regime = snapshot.regime;
            summary.regime_confidence = snapshot.confidence;
            summary.last_updated = snapshot.timestamp;
        }
        Ok(None) => {}
        Err(e) => warn!("summary: snapshot read failed: {:#}", e),
    }

    match store.rankings_for(summary.current_regime, TOP_AGENTS).await {
        Ok(rows) => summary.top_agents = rows.iter().map(RankedAgent::from).collect(),
        Err(e) => warn!("summary: rankings read failed: {:#}", e),
    }

    match store.recent_decisions(RECENT_ROTATIONS).await {
        Ok(decisions) => {
            summary.recent_rotations = decisions.iter().map(RotationEntry::from).collect()
        }
        Err(e) => warn!("summary: decisions read failed: {:#}", e),
    }

    match store
        .performance_stats(Duration::hours(STATS_WINDOW_HOURS))
        .await
    {
        Ok(stats) => summary.performance = stats,
        Err(e) => warn!("summary: stats read failed: {:#}", e),
    }

    summary
}
