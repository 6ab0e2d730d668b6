//! Rotation Decision Engine
//!
//! Compares the best-ranked agent for the current regime against the weakest
//! currently deployed agent and recommends a swap when the composite-score
//! improvement clears a threshold. Pure function of its inputs: the same
//! ranking and active set always yield the same decision or non-decision,
//! and the active set itself is never modified here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ranking::AgentRanking;
use super::regime::Regime;
use crate::roster::ActiveAgents;

/// Composite-score improvement a swap must strictly exceed
pub const IMPROVEMENT_THRESHOLD: f64 = 0.10;

/// Confidence ceiling for any decision
const MAX_CONFIDENCE: f64 = 0.95;

/// A recommendation to swap one deployed agent for a stronger bench agent.
///
/// Append-only log entry; never mutated after being written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationDecision {
    pub decision_id: String,
    pub from_agent: String,
    pub to_agent: String,
    pub reason: String,
    pub confidence: f64,
    pub expected_improvement: f64,
    pub regime: Regime,
    pub timestamp: DateTime<Utc>,
}

/// Evaluate whether the ranking justifies rotating an active agent out.
///
/// Returns `None` when the ranking has fewer than two entries, the best
/// agent is already deployed, no deployed agent appears in the ranking, or
/// the improvement does not strictly exceed [`IMPROVEMENT_THRESHOLD`].
pub fn evaluate(
    rankings: &[AgentRanking],
    active: &ActiveAgents,
    regime: Regime,
    now: DateTime<Utc>,
) -> Option<RotationDecision> {
    if rankings.len() < 2 {
        return None;
    }

    let mut ordered: Vec<&AgentRanking> = rankings.iter().collect();
    ordered.sort_by_key(|r| r.rank);

    let best = ordered[0];
    if active.contains(&best.agent) {
        return None;
    }

    // Worst-ranked agent that is actually deployed is the swap candidate
    let candidate = ordered.iter().rev().find(|r| active.contains(&r.agent))?;

    let improvement = best.composite_score - candidate.composite_score;
    if improvement <= IMPROVEMENT_THRESHOLD {
        return None;
    }

    Some(RotationDecision {
        decision_id: format!("rotation_{}", now.format("%Y%m%d_%H%M%S")),
        from_agent: candidate.agent.clone(),
        to_agent: best.agent.clone(),
        reason: format!("Performance improvement: {:.2}%", improvement * 100.0),
        confidence: (improvement * 2.0).min(MAX_CONFIDENCE),
        expected_improvement: improvement,
        regime,
        timestamp: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ranking(agent: &str, rank: u32, score: f64) -> AgentRanking {
        AgentRanking {
            agent: agent.to_string(),
            regime: Regime::Bull,
            rank,
            composite_score: score,
            accuracy: score,
            sharpe_ratio: 0.0,
            total_return: 0.0,
            max_drawdown: 0.05,
            win_rate: score,
            confidence: score,
            response_time: 1.0,
            timestamp: Utc::now(),
        }
    }

    fn active(names: &[&str]) -> ActiveAgents {
        ActiveAgents::from_names(names.iter().map(|s| s.to_string()).collect())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, 12, 30, 15).unwrap()
    }

    #[test]
    fn test_emits_swap_for_large_improvement() {
        let rankings = vec![
            ranking("EventImpactAgent", 1, 0.82),
            ranking("ForecastAgent", 2, 0.65),
            ranking("MomentumAgent", 3, 0.55),
        ];
        let decision = evaluate(
            &rankings,
            &active(&["ForecastAgent", "MomentumAgent"]),
            Regime::Bull,
            now(),
        )
        .expect("swap expected");

        assert_eq!(decision.to_agent, "EventImpactAgent");
        assert_eq!(decision.from_agent, "MomentumAgent");
        assert!((decision.expected_improvement - 0.27).abs() < 1e-12);
        assert!((decision.confidence - 0.54).abs() < 1e-12);
        assert_eq!(decision.reason, "Performance improvement: 27.00%");
        assert_eq!(decision.decision_id, "rotation_20260807_123015");
        assert_eq!(decision.regime, Regime::Bull);
    }

    #[test]
    fn test_no_decision_when_best_already_active() {
        let rankings = vec![
            ranking("ForecastAgent", 1, 0.90),
            ranking("RiskAgent", 2, 0.40),
        ];
        let decision = evaluate(&rankings, &active(&["ForecastAgent"]), Regime::Bull, now());
        assert!(decision.is_none());
    }

    #[test]
    fn test_no_decision_without_active_candidate() {
        let rankings = vec![
            ranking("EventImpactAgent", 1, 0.90),
            ranking("DayForecastAgent", 2, 0.40),
        ];
        let decision = evaluate(&rankings, &active(&["RiskAgent"]), Regime::Bull, now());
        assert!(decision.is_none());
    }

    #[test]
    fn test_no_decision_for_empty_active_set() {
        let rankings = vec![
            ranking("EventImpactAgent", 1, 0.90),
            ranking("ForecastAgent", 2, 0.40),
        ];
        let decision = evaluate(&rankings, &ActiveAgents::empty(), Regime::Bull, now());
        assert!(decision.is_none());
    }

    #[test]
    fn test_threshold_is_strict() {
        // Improvement of exactly 0.10 must NOT emit a decision
        let rankings = vec![
            ranking("EventImpactAgent", 1, 0.60),
            ranking("ForecastAgent", 2, 0.50),
        ];
        let at_threshold = evaluate(&rankings, &active(&["ForecastAgent"]), Regime::Bull, now());
        assert!(at_threshold.is_none());

        let rankings = vec![
            ranking("EventImpactAgent", 1, 0.601),
            ranking("ForecastAgent", 2, 0.50),
        ];
        let above = evaluate(&rankings, &active(&["ForecastAgent"]), Regime::Bull, now());
        assert!(above.is_some());
    }

    #[test]
    fn test_requires_at_least_two_entries() {
        let rankings = vec![ranking("EventImpactAgent", 1, 0.90)];
        assert!(evaluate(&rankings, &active(&["RiskAgent"]), Regime::Bull, now()).is_none());
        assert!(evaluate(&[], &active(&["RiskAgent"]), Regime::Bull, now()).is_none());
    }

    #[test]
    fn test_picks_worst_active_not_first_active() {
        let rankings = vec![
            ranking("EventImpactAgent", 1, 0.90),
            ranking("ForecastAgent", 2, 0.70),
            ranking("MomentumAgent", 3, 0.60),
            ranking("VolatilityAgent", 4, 0.30),
        ];
        let decision = evaluate(
            &rankings,
            &active(&["ForecastAgent", "MomentumAgent", "VolatilityAgent"]),
            Regime::Bull,
            now(),
        )
        .expect("swap expected");
        assert_eq!(decision.from_agent, "VolatilityAgent");
    }

    #[test]
    fn test_handles_unsorted_ranking_input() {
        let rankings = vec![
            ranking("ForecastAgent", 2, 0.50),
            ranking("EventImpactAgent", 1, 0.90),
        ];
        let decision = evaluate(&rankings, &active(&["ForecastAgent"]), Regime::Bull, now())
            .expect("swap expected");
        assert_eq!(decision.to_agent, "EventImpactAgent");
    }

    #[test]
    fn test_idempotent_for_same_inputs() {
        let rankings = vec![
            ranking("EventImpactAgent", 1, 0.82),
            ranking("ForecastAgent", 2, 0.55),
        ];
        let set = active(&["ForecastAgent"]);
        let a = evaluate(&rankings, &set, Regime::Bull, now()).unwrap();
        let b = evaluate(&rankings, &set, Regime::Bull, now()).unwrap();
        assert_eq!(a.decision_id, b.decision_id);
        assert_eq!(a.from_agent, b.from_agent);
        assert_eq!(a.to_agent, b.to_agent);
        assert_eq!(a.expected_improvement, b.expected_improvement);
    }

    #[test]
    fn test_invariants_on_emitted_decision() {
        let rankings = vec![
            ranking("EventImpactAgent", 1, 0.95),
            ranking("ForecastAgent", 2, 0.40),
        ];
        let set = active(&["ForecastAgent"]);
        let decision = evaluate(&rankings, &set, Regime::Bull, now()).unwrap();
        assert!(!set.contains(&decision.to_agent));
        assert!(set.contains(&decision.from_agent));
        assert!(decision.confidence <= 0.95);
    }
}
