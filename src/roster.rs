//! Agent Roster Module
//!
//! Manages the fixed set of evaluated decision-making agents and the small
//! subset that is actively deployed. The roster is the evaluation universe;
//! the active set is what the rotation engine may recommend swapping.

use std::collections::HashSet;

/// Default roster of evaluated agents
pub const DEFAULT_AGENTS: &[&str] = &[
    "ForecastAgent",
    "MomentumAgent",
    "VolatilityAgent",
    "SentimentAgent",
    "RiskAgent",
    "CorrelationAgent",
    "StrategyAgent",
    "RLStrategyAgent",
    "EventImpactAgent",
    "DayForecastAgent",
];

/// Default actively deployed agents
pub const DEFAULT_ACTIVE: &[&str] = &["ForecastAgent", "MomentumAgent", "VolatilityAgent"];

/// Ordered list of all agents under evaluation
#[derive(Debug, Clone)]
pub struct Roster {
    agents: Vec<String>,
}

impl Roster {
    /// Create the default roster
    pub fn new() -> Self {
        Self::from_names(DEFAULT_AGENTS.iter().map(|s| s.to_string()).collect())
    }

    /// Create a roster from a list of agent names (order preserved, duplicates dropped)
    pub fn from_names(names: Vec<String>) -> Self {
        let mut seen = HashSet::new();
        let agents = names
            .into_iter()
            .filter(|n| !n.trim().is_empty())
            .filter(|n| seen.insert(n.clone()))
            .collect();
        Self { agents }
    }

    /// All agent names, in roster order
    pub fn agents(&self) -> &[String] {
        &self.agents
    }

    /// Check if an agent is part of the roster
    pub fn contains(&self, agent: &str) -> bool {
        self.agents.iter().any(|a| a == agent)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

/// The agents currently driving live decisions
///
/// Read-only from the engine's perspective: rotation decisions reference this
/// set but never mutate it.
#[derive(Debug, Clone)]
pub struct ActiveAgents {
    agents: HashSet<String>,
}

impl ActiveAgents {
    /// Create the default illustrative active set
    pub fn new() -> Self {
        Self::from_names(DEFAULT_ACTIVE.iter().map(|s| s.to_string()).collect())
    }

    /// Create an active set from a list of agent names
    pub fn from_names(names: Vec<String>) -> Self {
        Self {
            agents: names.into_iter().filter(|n| !n.trim().is_empty()).collect(),
        }
    }

    /// An empty active set (nothing deployed)
    pub fn empty() -> Self {
        Self {
            agents: HashSet::new(),
        }
    }

    /// Check if an agent is currently deployed
    pub fn contains(&self, agent: &str) -> bool {
        self.agents.contains(agent)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for ActiveAgents {
    fn default() -> Self {
        Self::new()
    }
}
