// src/lib.rs
// Public library surface for integration tests (and potential reuse).

// Pure engine
pub mod benchmark;
pub mod calc;
pub mod recommendations;
pub mod score;

// Data around the engine
pub mod aggregates;
pub mod input;
pub mod onboarding;

// Service plumbing
pub mod api;
pub mod config;
pub mod devlog;
pub mod metrics;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::calc::{calculate_all, CalculationInputs, CalculationResults};
pub use crate::recommendations::generate_recommendations;
pub use crate::score::efficiency_score;

use crate::aggregates::{AggregateSource, InMemoryAggregates, QueryCapability, RpcAggregates};
use crate::config::AppConfig;

/// Pick the aggregate source for a config:
/// backend configured → RPC; else fixtures (if any) served from memory; else offline.
pub fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    if cfg.capability().is_enabled() {
        let rpc = RpcAggregates::new(&cfg.backend.url, &cfg.backend.anon_key, cfg.backend.timeout())
            .context("creating RPC aggregate source")?;
        info!(provider = rpc.name(), "benchmark backend enabled");
        return Ok(AppState::new(Arc::new(rpc), QueryCapability::Enabled));
    }

    if let Some(path) = &cfg.fixtures_path {
        match InMemoryAggregates::load_from_file(path) {
            Ok(mem) => {
                info!(submissions = mem.len(), path = %path.display(), "benchmark fixtures loaded");
                return Ok(AppState::new(Arc::new(mem), QueryCapability::Enabled));
            }
            Err(e) => warn!(error = ?e, "benchmark fixtures unavailable; running offline"),
        }
    }

    info!("no benchmark backend configured");
    Ok(AppState::offline())
}
