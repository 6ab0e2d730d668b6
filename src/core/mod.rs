//! Core evaluation logic
//!
//! The four decision-making concerns of the engine:
//!
//! - Regime classification from a trailing price/volume series
//! - Per-agent performance scoring with synthetic fallbacks
//! - Regime-scoped composite ranking
//! - The rotation decision function
//!
//! plus the summary assembler and the injectable synthetic-estimate strategy
//! the fallback paths share.

pub mod performance;
pub mod ranking;
pub mod regime;
pub mod rotation;
pub mod summary;
pub mod synthetic;

// Re-export commonly used types
pub use performance::{AgentPerformanceRecord, PerformanceScorer};
pub use ranking::{composite_score, rank_records, AgentRanking, RankingEngine};
pub use regime::{
    classify_signals, MarketIndicators, Regime, RegimeClassifier, RegimeSnapshot, TrendDirection,
};
pub use rotation::{RotationDecision, IMPROVEMENT_THRESHOLD};
pub use summary::{EvaluationSummary, RankedAgent, RotationEntry};
pub use synthetic::{FixedEstimator, SeededEstimator, SyntheticEstimator};
