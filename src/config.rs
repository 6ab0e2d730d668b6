//! Configuration loader
//!
//! Infrastructure settings only: the market series to classify, the roster
//! under evaluation, and the cycle intervals. Every field has a default, so
//! an empty file is a valid config.

use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::engine::CycleIntervals;
use crate::roster::{DEFAULT_ACTIVE, DEFAULT_AGENTS};

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub roster: RosterConfig,
}

#[derive(Debug, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_system_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_system_name() -> String {
    "Overseer".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: default_system_name(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MarketConfig {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

fn default_symbol() -> String {
    "SPY".to_string()
}

fn default_lookback_days() -> u32 {
    30
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            lookback_days: default_lookback_days(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_performance_interval")]
    pub performance_interval_secs: u64,
    #[serde(default = "default_ranking_interval")]
    pub ranking_interval_secs: u64,
    #[serde(default = "default_rotation_interval")]
    pub rotation_interval_secs: u64,
    #[serde(default = "default_regime_interval")]
    pub regime_interval_secs: u64,
    /// Seed for the synthetic-estimate RNG; omit for entropy seeding
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_performance_interval() -> u64 {
    60
}

fn default_ranking_interval() -> u64 {
    300
}

fn default_rotation_interval() -> u64 {
    600
}

fn default_regime_interval() -> u64 {
    120
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            performance_interval_secs: default_performance_interval(),
            ranking_interval_secs: default_ranking_interval(),
            rotation_interval_secs: default_rotation_interval(),
            regime_interval_secs: default_regime_interval(),
            seed: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RosterConfig {
    #[serde(default = "default_agents")]
    pub agents: Vec<String>,
    #[serde(default = "default_active")]
    pub active: Vec<String>,
}

fn default_agents() -> Vec<String> {
    DEFAULT_AGENTS.iter().map(|s| s.to_string()).collect()
}

fn default_active() -> Vec<String> {
    DEFAULT_ACTIVE.iter().map(|s| s.to_string()).collect()
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            agents: default_agents(),
            active: default_active(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from `path`, or fall back to defaults when the file is absent.
    /// A present-but-malformed file is still an error.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn intervals(&self) -> CycleIntervals {
        CycleIntervals {
            performance: Duration::from_secs(self.engine.performance_interval_secs),
            ranking: Duration::from_secs(self.engine.ranking_interval_secs),
            rotation: Duration::from_secs(self.engine.rotation_interval_secs),
            regime: Duration::from_secs(self.engine.regime_interval_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.system.name, "Overseer");
        assert_eq!(cfg.market.symbol, "SPY");
        assert_eq!(cfg.market.lookback_days, 30);
        assert_eq!(cfg.engine.performance_interval_secs, 60);
        assert_eq!(cfg.engine.ranking_interval_secs, 300);
        assert_eq!(cfg.engine.rotation_interval_secs, 600);
        assert_eq!(cfg.engine.regime_interval_secs, 120);
        assert_eq!(cfg.roster.agents.len(), 10);
        assert_eq!(cfg.roster.active.len(), 3);
        assert!(cfg.engine.seed.is_none());
    }

    #[test]
    fn test_partial_override() {
        let cfg: Config = toml::from_str(
            r#"
            [market]
            symbol = "QQQ"

            [engine]
            rotation_interval_secs = 120
            seed = 7
        "#,
        )
        .unwrap();
        assert_eq!(cfg.market.symbol, "QQQ");
        assert_eq!(cfg.market.lookback_days, 30);
        assert_eq!(cfg.engine.rotation_interval_secs, 120);
        assert_eq!(cfg.engine.seed, Some(7));

        let intervals = cfg.intervals();
        assert_eq!(intervals.rotation, Duration::from_secs(120));
        assert_eq!(intervals.performance, Duration::from_secs(60));
    }

    #[test]
    fn test_custom_roster() {
        let cfg: Config = toml::from_str(
            r#"
            [roster]
            agents = ["A", "B", "C"]
            active = ["A"]
        "#,
        )
        .unwrap();
        assert_eq!(cfg.roster.agents, vec!["A", "B", "C"]);
        assert_eq!(cfg.roster.active, vec!["A"]);
    }
}
