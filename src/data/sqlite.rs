//! SQLite Evaluation Store
//!
//! Embedded storage for every engine artifact plus the agent prediction
//! log. Timestamps are stored as RFC3339 text in UTC with fixed precision
//! so window queries can compare lexicographically.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

use crate::core::performance::AgentPerformanceRecord;
use crate::core::ranking::AgentRanking;
use crate::core::regime::{MarketIndicators, Regime, RegimeSnapshot, TrendDirection};
use crate::core::rotation::RotationDecision;
use crate::data::predictions::{Direction, PredictionHistoryProvider, PredictionOutcome};
use crate::data::store::{EvaluationStore, PerformanceStats};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS agent_performance (
    id INTEGER PRIMARY KEY,
    agent TEXT NOT NULL,
    accuracy REAL NOT NULL,
    sharpe_ratio REAL NOT NULL,
    total_return REAL NOT NULL,
    max_drawdown REAL NOT NULL,
    win_rate REAL NOT NULL,
    confidence REAL NOT NULL,
    response_time REAL NOT NULL,
    regime TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_performance_regime_time
    ON agent_performance (regime, created_at);

CREATE TABLE IF NOT EXISTS agent_rankings (
    id INTEGER PRIMARY KEY,
    agent TEXT NOT NULL,
    regime TEXT NOT NULL,
    \"rank\" INTEGER NOT NULL,
    composite_score REAL NOT NULL,
    accuracy REAL NOT NULL,
    sharpe_ratio REAL NOT NULL,
    total_return REAL NOT NULL,
    max_drawdown REAL NOT NULL,
    win_rate REAL NOT NULL,
    confidence REAL NOT NULL,
    response_time REAL NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_rankings_regime ON agent_rankings (regime, \"rank\");

CREATE TABLE IF NOT EXISTS rotation_decisions (
    id INTEGER PRIMARY KEY,
    decision_id TEXT NOT NULL,
    from_agent TEXT NOT NULL,
    to_agent TEXT NOT NULL,
    reason TEXT NOT NULL,
    confidence REAL NOT NULL,
    expected_improvement REAL NOT NULL,
    regime TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS regime_snapshots (
    id INTEGER PRIMARY KEY,
    regime TEXT NOT NULL,
    confidence REAL NOT NULL,
    volatility REAL NOT NULL,
    trend_strength REAL NOT NULL,
    volume_ratio REAL NOT NULL,
    trend_direction TEXT NOT NULL,
    indicators TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS agent_signals (
    id INTEGER PRIMARY KEY,
    agent TEXT NOT NULL,
    confidence REAL NOT NULL,
    predicted_direction TEXT NOT NULL,
    actual_direction TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_signals_agent_time ON agent_signals (agent, created_at);
";

/// Evaluation store backed by a single SQLite connection
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create or open the store at `path`
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open store at {}", path))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("store connection lock poisoned"))
    }

    /// Append one agent prediction outcome to the signal log.
    ///
    /// The engine itself only reads signals; this is for the platform side
    /// (and tests) that feed predictions in.
    pub fn insert_signal(
        &self,
        agent: &str,
        confidence: f64,
        predicted: Direction,
        actual: Direction,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO agent_signals (agent, confidence, predicted_direction, actual_direction, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                agent,
                confidence,
                predicted.as_str(),
                actual.as_str(),
                ts(timestamp)
            ],
        )?;
        Ok(())
    }
}

fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("bad timestamp in store: {}", s))
}

fn parse_regime(s: &str) -> Result<Regime> {
    Regime::parse(s).ok_or_else(|| anyhow!("unknown regime in store: {}", s))
}

#[async_trait]
impl EvaluationStore for SqliteStore {
    async fn insert_performance(&self, record: &AgentPerformanceRecord) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO agent_performance (
                agent, accuracy, sharpe_ratio, total_return, max_drawdown,
                win_rate, confidence, response_time, regime, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.agent,
                record.accuracy,
                record.sharpe_ratio,
                record.total_return,
                record.max_drawdown,
                record.win_rate,
                record.confidence,
                record.response_time,
                record.regime.as_str(),
                ts(record.timestamp),
            ],
        )?;
        Ok(())
    }

    async fn recent_performance(
        &self,
        regime: Regime,
        window: Duration,
    ) -> Result<Vec<AgentPerformanceRecord>> {
        let cutoff = ts(Utc::now() - window);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT agent, accuracy, sharpe_ratio, total_return, max_drawdown,
                    win_rate, confidence, response_time, regime, created_at
             FROM agent_performance
             WHERE regime = ?1 AND created_at >= ?2
             ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![regime.as_str(), cutoff], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, f64>(6)?,
                row.get::<_, f64>(7)?,
                row.get::<_, String>(8)?,
                row.get::<_, String>(9)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (agent, accuracy, sharpe, ret, dd, win, conf, latency, regime_s, created) = row?;
            records.push(AgentPerformanceRecord {
                agent,
                accuracy,
                sharpe_ratio: sharpe,
                total_return: ret,
                max_drawdown: dd,
                win_rate: win,
                confidence: conf,
                response_time: latency,
                regime: parse_regime(&regime_s)?,
                timestamp: parse_ts(&created)?,
            });
        }
        Ok(records)
    }

    async fn replace_rankings(&self, regime: Regime, rows: &[AgentRanking]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM agent_rankings WHERE regime = ?1",
            params![regime.as_str()],
        )?;
        for row in rows {
            tx.execute(
                "INSERT INTO agent_rankings (
                    agent, regime, \"rank\", composite_score, accuracy, sharpe_ratio,
                    total_return, max_drawdown, win_rate, confidence, response_time,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    row.agent,
                    regime.as_str(),
                    row.rank,
                    row.composite_score,
                    row.accuracy,
                    row.sharpe_ratio,
                    row.total_return,
                    row.max_drawdown,
                    row.win_rate,
                    row.confidence,
                    row.response_time,
                    ts(row.timestamp),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn rankings_for(&self, regime: Regime, limit: usize) -> Result<Vec<AgentRanking>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT agent, regime, \"rank\", composite_score, accuracy, sharpe_ratio,
                    total_return, max_drawdown, win_rate, confidence, response_time,
                    created_at
             FROM agent_rankings
             WHERE regime = ?1
             ORDER BY \"rank\" ASC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![regime.as_str(), limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, f64>(6)?,
                row.get::<_, f64>(7)?,
                row.get::<_, f64>(8)?,
                row.get::<_, f64>(9)?,
                row.get::<_, f64>(10)?,
                row.get::<_, String>(11)?,
            ))
        })?;

        let mut rankings = Vec::new();
        for row in rows {
            let (agent, regime_s, rank, score, accuracy, sharpe, ret, dd, win, conf, latency, created) =
                row?;
            rankings.push(AgentRanking {
                agent,
                regime: parse_regime(&regime_s)?,
                rank,
                composite_score: score,
                accuracy,
                sharpe_ratio: sharpe,
                total_return: ret,
                max_drawdown: dd,
                win_rate: win,
                confidence: conf,
                response_time: latency,
                timestamp: parse_ts(&created)?,
            });
        }
        Ok(rankings)
    }

    async fn insert_decision(&self, decision: &RotationDecision) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO rotation_decisions (
                decision_id, from_agent, to_agent, reason, confidence,
                expected_improvement, regime, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                decision.decision_id,
                decision.from_agent,
                decision.to_agent,
                decision.reason,
                decision.confidence,
                decision.expected_improvement,
                decision.regime.as_str(),
                ts(decision.timestamp),
            ],
        )?;
        Ok(())
    }

    async fn recent_decisions(&self, limit: usize) -> Result<Vec<RotationDecision>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT decision_id, from_agent, to_agent, reason, confidence,
                    expected_improvement, regime, created_at
             FROM rotation_decisions
             ORDER BY created_at DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut decisions = Vec::new();
        for row in rows {
            let (decision_id, from_agent, to_agent, reason, confidence, improvement, regime_s, created) =
                row?;
            decisions.push(RotationDecision {
                decision_id,
                from_agent,
                to_agent,
                reason,
                confidence,
                expected_improvement: improvement,
                regime: parse_regime(&regime_s)?,
                timestamp: parse_ts(&created)?,
            });
        }
        Ok(decisions)
    }

    async fn insert_snapshot(&self, snapshot: &RegimeSnapshot) -> Result<()> {
        let indicators = serde_json::to_string(&snapshot.indicators)?;
        self.conn()?.execute(
            "INSERT INTO regime_snapshots (
                regime, confidence, volatility, trend_strength, volume_ratio,
                trend_direction, indicators, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                snapshot.regime.as_str(),
                snapshot.confidence,
                snapshot.volatility,
                snapshot.trend_strength,
                snapshot.volume_ratio,
                snapshot.trend_direction.as_str(),
                indicators,
                ts(snapshot.timestamp),
            ],
        )?;
        Ok(())
    }

    async fn latest_snapshot(&self) -> Result<Option<RegimeSnapshot>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT regime, confidence, volatility, trend_strength, volume_ratio,
                    trend_direction, indicators, created_at
             FROM regime_snapshots
             ORDER BY created_at DESC
             LIMIT 1",
        )?;
        let mut rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        match rows.next() {
            Some(row) => {
                let (regime_s, confidence, volatility, trend, volume, direction_s, indicators_s, created) =
                    row?;
                let indicators: MarketIndicators = serde_json::from_str(&indicators_s)
                    .unwrap_or_else(|_| MarketIndicators::neutral());
                Ok(Some(RegimeSnapshot {
                    regime: parse_regime(&regime_s)?,
                    confidence,
                    volatility,
                    trend_strength: trend,
                    volume_ratio: volume,
                    trend_direction: TrendDirection::parse(&direction_s)
                        .unwrap_or(TrendDirection::Neutral),
                    indicators,
                    timestamp: parse_ts(&created)?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn performance_stats(&self, window: Duration) -> Result<PerformanceStats> {
        let cutoff = ts(Utc::now() - window);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT COUNT(DISTINCT agent),
                    COALESCE(AVG(accuracy), 0),
                    COALESCE(AVG(sharpe_ratio), 0),
                    COALESCE(AVG(total_return), 0),
                    COALESCE(AVG(response_time), 0)
             FROM agent_performance
             WHERE created_at >= ?1",
        )?;
        let stats = stmt.query_row(params![cutoff], |row| {
            Ok(PerformanceStats {
                total_agents: row.get::<_, u32>(0)?,
                avg_accuracy: row.get::<_, f64>(1)?,
                avg_sharpe_ratio: row.get::<_, f64>(2)?,
                avg_total_return: row.get::<_, f64>(3)?,
                avg_response_time: row.get::<_, f64>(4)?,
            })
        })?;
        Ok(stats)
    }
}

#[async_trait]
impl PredictionHistoryProvider for SqliteStore {
    async fn recent_predictions(
        &self,
        agent: &str,
        window: Duration,
        limit: usize,
    ) -> Result<Vec<PredictionOutcome>> {
        let cutoff = ts(Utc::now() - window);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT confidence, predicted_direction, actual_direction, created_at
             FROM agent_signals
             WHERE agent = ?1 AND created_at >= ?2
             ORDER BY created_at DESC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![agent, cutoff, limit as i64], |row| {
            Ok((
                row.get::<_, f64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut outcomes = Vec::new();
        for row in rows {
            let (confidence, predicted_s, actual_s, created) = row?;
            let (Some(predicted), Some(actual)) =
                (Direction::parse(&predicted_s), Direction::parse(&actual_s))
            else {
                warn!("skipping malformed signal row for {}", agent);
                continue;
            };
            outcomes.push(PredictionOutcome {
                confidence,
                predicted,
                actual,
                timestamp: parse_ts(&created)?,
            });
        }
        Ok(outcomes)
    }
}
