//! Overseer - Meta-Evaluation & Rotation Engine
//!
//! Long-running service: classifies the market regime, scores every roster
//! agent each minute, rebuilds per-regime rankings, and logs rotation
//! recommendations until stopped.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use overseer::config::Config;
use overseer::core::synthetic::{SeededEstimator, SyntheticEstimator};
use overseer::data::market::{MarketDataProvider, OfflineMarketData};
use overseer::data::predictions::PredictionHistoryProvider;
use overseer::data::sqlite::SqliteStore;
use overseer::data::store::EvaluationStore;
use overseer::engine::MetaEvaluationEngine;
use overseer::roster::{ActiveAgents, Roster};

const SEP: &str = "===========================================================";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (defaults apply when the file is absent)
    let cfg = Config::load_or_default("overseer.toml").unwrap_or_else(|e| {
        eprintln!("Failed to load overseer.toml: {}. Exiting.", e);
        std::process::exit(1);
    });

    // Setup logging
    let level = cfg.system.log_level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{}", SEP);
    info!("  {} - Meta-Evaluation & Rotation Engine", cfg.system.name);
    info!("{}", SEP);

    // Open the evaluation store
    let store = Arc::new(SqliteStore::new("overseer.db")?);
    if let Ok(stats) = store.performance_stats(chrono::Duration::hours(24)).await {
        if stats.total_agents > 0 {
            info!(
                "Trailing 24h: {} agents | avg accuracy {:.1}% | avg latency {:.2}s",
                stats.total_agents,
                stats.avg_accuracy * 100.0,
                stats.avg_response_time
            );
        }
    }

    let roster = Roster::from_names(cfg.roster.agents.clone());
    let active = ActiveAgents::from_names(cfg.roster.active.clone());
    info!(
        "Roster: {} agents evaluated, {} currently active",
        roster.len(),
        active.len()
    );

    let estimator: Arc<dyn SyntheticEstimator> = match cfg.engine.seed {
        Some(seed) => {
            info!("Synthetic estimates: seeded RNG ({})", seed);
            Arc::new(SeededEstimator::new(seed))
        }
        None => Arc::new(SeededEstimator::from_entropy()),
    };

    // No market feed is wired in this build; the classifier degrades to its
    // neutral fallback snapshot until a provider implementation is injected.
    let market: Arc<dyn MarketDataProvider> = Arc::new(OfflineMarketData);
    info!(
        "Market series: {} ({}d lookback, offline provider)",
        cfg.market.symbol, cfg.market.lookback_days
    );

    let engine = Arc::new(MetaEvaluationEngine::new(
        roster,
        active,
        cfg.market.symbol.clone(),
        cfg.market.lookback_days,
        market,
        Arc::clone(&store) as Arc<dyn PredictionHistoryProvider>,
        Arc::clone(&store) as Arc<dyn EvaluationStore>,
        estimator,
        cfg.intervals(),
    ));

    engine.start();
    info!(
        "Cycles: performance {}s | ranking {}s | rotation {}s | regime {}s",
        cfg.engine.performance_interval_secs,
        cfg.engine.ranking_interval_secs,
        cfg.engine.rotation_interval_secs,
        cfg.engine.regime_interval_secs
    );
    info!("Running. Ctrl-C to stop.");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    engine.stop();

    let summary = engine.summary().await;
    info!("{}", SEP);
    info!(
        "Final state: regime={} (confidence {:.2}) | {} ranked | {} rotation decisions on record",
        summary.current_regime,
        summary.regime_confidence,
        summary.top_agents.len(),
        summary.recent_rotations.len()
    );
    info!("{}", SEP);

    Ok(())
}
