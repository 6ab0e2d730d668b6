//! Meta-Evaluation Engine
//!
//! Owns the four periodic cycles: performance collection, ranking analysis,
//! rotation evaluation, and regime-snapshot refresh. Each cycle runs as its
//! own tokio task on its own interval; a failure in one cycle is logged and
//! retried after the interval, never stopping the others. All cross-cycle
//! state lives in the store - the tasks share no mutable memory.
//!
//! Every cycle body is also exposed as a `*_once` method so tests can
//! single-step one iteration deterministically instead of racing a timer.

use anyhow::Result;
use chrono::{Duration as TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::core::performance::PerformanceScorer;
use crate::core::ranking::RankingEngine;
use crate::core::regime::{Regime, RegimeClassifier, RegimeSnapshot};
use crate::core::rotation;
use crate::core::summary::{self, EvaluationSummary};
use crate::core::synthetic::SyntheticEstimator;
use crate::data::market::MarketDataProvider;
use crate::data::predictions::PredictionHistoryProvider;
use crate::data::store::EvaluationStore;
use crate::roster::{ActiveAgents, Roster};

/// Trailing window of performance records consulted when ranking
const RANKING_WINDOW_HOURS: i64 = 24;

/// Sleep between iterations of each cycle
#[derive(Debug, Clone)]
pub struct CycleIntervals {
    pub performance: Duration,
    pub ranking: Duration,
    pub rotation: Duration,
    pub regime: Duration,
}

impl Default for CycleIntervals {
    fn default() -> Self {
        Self {
            performance: Duration::from_secs(60),
            ranking: Duration::from_secs(300),
            rotation: Duration::from_secs(600),
            regime: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Cycle {
    Performance,
    Ranking,
    Rotation,
    Regime,
}

impl Cycle {
    fn name(&self) -> &'static str {
        match self {
            Cycle::Performance => "performance",
            Cycle::Ranking => "ranking",
            Cycle::Rotation => "rotation",
            Cycle::Regime => "regime",
        }
    }
}

/// Orchestrates regime detection, scoring, ranking, and rotation decisions.
///
/// All collaborators are injected at construction; the engine holds no
/// ambient global state.
pub struct MetaEvaluationEngine {
    roster: Roster,
    active: ActiveAgents,
    symbol: String,
    lookback_days: u32,
    classifier: RegimeClassifier,
    scorer: PerformanceScorer,
    ranking: RankingEngine,
    market: Arc<dyn MarketDataProvider>,
    store: Arc<dyn EvaluationStore>,
    intervals: CycleIntervals,
    // true = stopped; flipping the value wakes every cycle mid-sleep
    stop: watch::Sender<bool>,
}

impl MetaEvaluationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        roster: Roster,
        active: ActiveAgents,
        symbol: impl Into<String>,
        lookback_days: u32,
        market: Arc<dyn MarketDataProvider>,
        predictions: Arc<dyn PredictionHistoryProvider>,
        store: Arc<dyn EvaluationStore>,
        estimator: Arc<dyn SyntheticEstimator>,
        intervals: CycleIntervals,
    ) -> Self {
        let (stop, _) = watch::channel(true);
        Self {
            classifier: RegimeClassifier::new(Arc::clone(&estimator)),
            scorer: PerformanceScorer::new(predictions, Arc::clone(&estimator)),
            ranking: RankingEngine::new(roster.clone(), estimator),
            roster,
            active,
            symbol: symbol.into(),
            lookback_days,
            market,
            store,
            intervals,
            stop,
        }
    }

    pub fn is_running(&self) -> bool {
        !*self.stop.borrow()
    }

    /// Spawn the four cycle tasks. Calling start on a running engine logs a
    /// warning and leaves the existing tasks untouched.
    pub fn start(self: &Arc<Self>) {
        let was_stopped = self.stop.send_replace(false);
        if !was_stopped {
            warn!("meta-evaluation already running");
            return;
        }
        info!("starting meta-evaluation cycles");
        self.spawn_cycle(Cycle::Performance, self.intervals.performance);
        self.spawn_cycle(Cycle::Ranking, self.intervals.ranking);
        self.spawn_cycle(Cycle::Rotation, self.intervals.rotation);
        self.spawn_cycle(Cycle::Regime, self.intervals.regime);
    }

    /// Signal every cycle to stop. Cooperative: a cycle mid-iteration
    /// finishes its current persistence writes, then exits at the next
    /// sleep/check.
    pub fn stop(&self) {
        let was_stopped = self.stop.send_replace(true);
        if !was_stopped {
            info!("meta-evaluation stopping");
        }
    }

    fn spawn_cycle(self: &Arc<Self>, cycle: Cycle, interval: Duration) {
        let engine = Arc::clone(self);
        let mut rx = self.stop.subscribe();
        tokio::spawn(async move {
            info!("{} cycle started ({}s interval)", cycle.name(), interval.as_secs());
            while !*rx.borrow() {
                let result = match cycle {
                    Cycle::Performance => engine.collect_performance_once().await,
                    Cycle::Ranking => engine.analyze_rankings_once().await,
                    Cycle::Rotation => engine.evaluate_rotation_once().await,
                    Cycle::Regime => engine.refresh_regime_once().await,
                };
                if let Err(e) = result {
                    error!("{} cycle error: {:#}", cycle.name(), e);
                }
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            info!("{} cycle stopped", cycle.name());
        });
    }

    /// Classify the current regime from the market feed, degrading to the
    /// fallback snapshot when the feed is empty or unreachable.
    async fn detect_regime(&self) -> RegimeSnapshot {
        match self
            .market
            .price_history(&self.symbol, self.lookback_days)
            .await
        {
            Ok(candles) => self.classifier.classify(&candles),
            Err(e) => {
                warn!("market data unavailable for {}: {:#}", self.symbol, e);
                RegimeClassifier::fallback_snapshot()
            }
        }
    }

    /// One performance-collection pass: score every roster agent under the
    /// current regime and append the records. A failed write drops that
    /// agent's record for this cycle, nothing more.
    pub async fn collect_performance_once(&self) -> Result<()> {
        let regime = self.detect_regime().await.regime;
        for agent in self.roster.agents() {
            let record = self.scorer.score(agent, regime).await;
            if let Err(e) = self.store.insert_performance(&record).await {
                warn!("dropping performance record for {}: {:#}", agent, e);
            }
        }
        info!(
            "collected performance for {} agents ({} regime)",
            self.roster.len(),
            regime
        );
        Ok(())
    }

    /// One ranking pass: rebuild the leaderboard for every regime from the
    /// trailing record window, replacing each regime's previous set.
    pub async fn analyze_rankings_once(&self) -> Result<()> {
        for regime in Regime::all() {
            let records = match self
                .store
                .recent_performance(regime, TimeDelta::hours(RANKING_WINDOW_HOURS))
                .await
            {
                Ok(records) => records,
                Err(e) => {
                    warn!("performance read failed for {}: {:#}", regime, e);
                    Vec::new()
                }
            };
            let rows = self.ranking.rank_or_fallback(regime, &records);
            if let Err(e) = self.store.replace_rankings(regime, &rows).await {
                warn!("dropping rankings for {}: {:#}", regime, e);
            }
        }
        info!("updated agent rankings for all regimes");
        Ok(())
    }

    /// One rotation pass: rank the current regime and emit at most one
    /// swap recommendation to the decision log.
    pub async fn evaluate_rotation_once(&self) -> Result<()> {
        let regime = self.detect_regime().await.regime;
        let records = match self
            .store
            .recent_performance(regime, TimeDelta::hours(RANKING_WINDOW_HOURS))
            .await
        {
            Ok(records) => records,
            Err(e) => {
                warn!("performance read failed for {}: {:#}", regime, e);
                Vec::new()
            }
        };
        let rankings = self.ranking.rank_or_fallback(regime, &records);

        match rotation::evaluate(&rankings, &self.active, regime, Utc::now()) {
            Some(decision) => {
                info!(
                    "rotation decision: {} -> {} ({})",
                    decision.from_agent, decision.to_agent, decision.reason
                );
                self.store.insert_decision(&decision).await?;
            }
            None => debug!("no rotation needed ({} regime)", regime),
        }
        Ok(())
    }

    /// One regime pass: classify and append a snapshot to the history.
    pub async fn refresh_regime_once(&self) -> Result<()> {
        let snapshot = self.detect_regime().await;
        self.store.insert_snapshot(&snapshot).await?;
        info!(
            "regime analysis updated: {} (confidence {:.2})",
            snapshot.regime, snapshot.confidence
        );
        Ok(())
    }

    /// Consolidated read-only view for external consumers
    pub async fn summary(&self) -> EvaluationSummary {
        summary::assemble(self.store.as_ref()).await
    }

    pub fn active_agents(&self) -> &ActiveAgents {
        &self.active
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::synthetic::SeededEstimator;
    use crate::data::market::{Candle, OfflineMarketData};
    use crate::data::predictions::Direction;
    use crate::data::sqlite::SqliteStore;
    use rust_decimal::Decimal;

    /// Market stub replaying a fixed close series
    struct ReplayMarket {
        closes: Vec<f64>,
    }

    #[async_trait::async_trait]
    impl MarketDataProvider for ReplayMarket {
        async fn price_history(&self, _symbol: &str, _days: u32) -> Result<Vec<Candle>> {
            Ok(self
                .closes
                .iter()
                .enumerate()
                .map(|(i, &c)| {
                    let close = Decimal::try_from(c).unwrap();
                    Candle {
                        date: Utc::now() - TimeDelta::days((self.closes.len() - i) as i64),
                        open: close,
                        high: close,
                        low: close,
                        close,
                        volume: 1000,
                    }
                })
                .collect())
        }
    }

    fn engine_with(
        store: Arc<SqliteStore>,
        market: Arc<dyn MarketDataProvider>,
        active: ActiveAgents,
        intervals: CycleIntervals,
    ) -> Arc<MetaEvaluationEngine> {
        Arc::new(MetaEvaluationEngine::new(
            Roster::new(),
            active,
            "SPY",
            30,
            market,
            Arc::clone(&store) as Arc<dyn PredictionHistoryProvider>,
            store as Arc<dyn EvaluationStore>,
            Arc::new(SeededEstimator::new(11)),
            intervals,
        ))
    }

    #[tokio::test]
    async fn test_end_to_end_empty_history_empty_active() {
        // No predictions anywhere, nothing deployed: synthetic records, full
        // roster ranking, and no rotation decision.
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let engine = engine_with(
            Arc::clone(&store),
            Arc::new(OfflineMarketData),
            ActiveAgents::empty(),
            CycleIntervals::default(),
        );

        engine.collect_performance_once().await.unwrap();
        engine.analyze_rankings_once().await.unwrap();
        engine.evaluate_rotation_once().await.unwrap();
        engine.refresh_regime_once().await.unwrap();

        // Offline market pins the regime to the neutral fallback
        let summary = engine.summary().await;
        assert_eq!(summary.current_regime, Regime::Neutral);
        assert!((summary.regime_confidence - 0.6).abs() < 1e-9);

        let rankings = store.rankings_for(Regime::Neutral, 20).await.unwrap();
        assert_eq!(rankings.len(), Roster::new().len());
        for (i, row) in rankings.iter().enumerate() {
            assert_eq!(row.rank, i as u32 + 1);
        }

        assert!(store.recent_decisions(10).await.unwrap().is_empty());
        assert_eq!(summary.performance.total_agents as usize, Roster::new().len());
    }

    #[tokio::test]
    async fn test_rotation_cycle_writes_decision() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        // Bench agent with a strong prediction history; actives with weak ones
        for _ in 0..20 {
            store
                .insert_signal("EventImpactAgent", 0.9, Direction::Up, Direction::Up, Utc::now())
                .unwrap();
        }
        for agent in ["ForecastAgent", "MomentumAgent", "VolatilityAgent"] {
            for i in 0..20 {
                let actual = if i % 10 == 0 { Direction::Up } else { Direction::Down };
                store
                    .insert_signal(agent, 0.4, Direction::Up, actual, Utc::now())
                    .unwrap();
            }
        }

        let engine = engine_with(
            Arc::clone(&store),
            Arc::new(OfflineMarketData),
            ActiveAgents::new(),
            CycleIntervals::default(),
        );

        engine.collect_performance_once().await.unwrap();
        engine.evaluate_rotation_once().await.unwrap();

        let decisions = store.recent_decisions(5).await.unwrap();
        assert_eq!(decisions.len(), 1);
        let decision = &decisions[0];
        assert_eq!(decision.to_agent, "EventImpactAgent");
        assert!(ActiveAgents::new().contains(&decision.from_agent));
        assert!(decision.expected_improvement > 0.10);
        assert!(decision.reason.contains('%'));
    }

    #[tokio::test]
    async fn test_no_decision_when_best_is_active() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        // The only strong agent is already deployed
        for _ in 0..20 {
            store
                .insert_signal("ForecastAgent", 0.9, Direction::Up, Direction::Up, Utc::now())
                .unwrap();
        }

        let engine = engine_with(
            Arc::clone(&store),
            Arc::new(OfflineMarketData),
            ActiveAgents::new(),
            CycleIntervals::default(),
        );

        engine.collect_performance_once().await.unwrap();
        engine.evaluate_rotation_once().await.unwrap();

        assert!(store.recent_decisions(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_regime_cycle_follows_market_feed() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        // 30 days climbing ~0.4%/day: ~12% trend, bull
        let closes: Vec<f64> = (0..30).map(|i| 100.0 * 1.004f64.powi(i)).collect();
        let engine = engine_with(
            Arc::clone(&store),
            Arc::new(ReplayMarket { closes }),
            ActiveAgents::empty(),
            CycleIntervals::default(),
        );

        engine.refresh_regime_once().await.unwrap();

        let snapshot = store.latest_snapshot().await.unwrap().unwrap();
        assert_eq!(snapshot.regime, Regime::Bull);
        assert!(snapshot.confidence <= 0.95);
    }

    #[tokio::test]
    async fn test_summary_idempotent_between_cycles() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let engine = engine_with(
            Arc::clone(&store),
            Arc::new(OfflineMarketData),
            ActiveAgents::empty(),
            CycleIntervals::default(),
        );

        engine.refresh_regime_once().await.unwrap();
        engine.collect_performance_once().await.unwrap();
        engine.analyze_rankings_once().await.unwrap();

        let first = engine.summary().await;
        let second = engine.summary().await;
        assert_eq!(first, second);
        assert_eq!(first.top_agents.len(), Roster::new().len().min(10));
    }

    #[tokio::test]
    async fn test_start_and_stop_cycles() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let intervals = CycleIntervals {
            performance: Duration::from_millis(10),
            ranking: Duration::from_millis(10),
            rotation: Duration::from_millis(10),
            regime: Duration::from_millis(10),
        };
        let engine = engine_with(
            Arc::clone(&store),
            Arc::new(OfflineMarketData),
            ActiveAgents::empty(),
            intervals,
        );

        assert!(!engine.is_running());
        engine.start();
        assert!(engine.is_running());

        // Second start is a no-op warning, not a second set of tasks
        engine.start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        engine.stop();
        assert!(!engine.is_running());

        // Cycles ran at least once before the stop signal
        assert!(store.latest_snapshot().await.unwrap().is_some());
        let stats = store.performance_stats(TimeDelta::hours(1)).await.unwrap();
        assert_eq!(stats.total_agents as usize, Roster::new().len());

        // After stop, no further writes accumulate
        tokio::time::sleep(Duration::from_millis(50)).await;
        let decisions_before = store.recent_decisions(100).await.unwrap().len();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let decisions_after = store.recent_decisions(100).await.unwrap().len();
        assert_eq!(decisions_before, decisions_after);
    }
}
