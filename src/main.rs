// =============================================================================
// Tickersync — Main Entry Point
// =============================================================================
//
// One process invocation performs one sync run: build the remote index,
// walk the watch list sequentially, upsert one document per ticker, report
// the tally.  Scheduling (cron, CI) lives outside the process.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod config;
mod coordinator;
mod error;
mod indicators;
mod provider;
mod reconcile;
mod snapshot;
mod store;
mod types;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Credentials, ProviderKind, SyncConfig};
use crate::coordinator::RunCoordinator;
use crate::provider::alpha_vantage::AlphaVantageProvider;
use crate::provider::yahoo::YahooProvider;
use crate::provider::PriceProvider;
use crate::reconcile::ReconciliationEngine;
use crate::store::notion::NotionStore;

const CONFIG_PATH: &str = "sync_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = SyncConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        SyncConfig::default()
    });
    config.apply_env_overrides();
    config.restrict_to_provider_coverage();

    let credentials = Credentials::from_env()?;

    info!(
        provider = %config.provider,
        tickers = config.tickers.len(),
        "Ticker snapshot sync starting"
    );

    // ── 2. Build collaborators ───────────────────────────────────────────
    let provider: Arc<dyn PriceProvider> = match config.provider {
        ProviderKind::AlphaVantage => Arc::new(AlphaVantageProvider::new(
            credentials.alpha_vantage_api_key.clone(),
        )),
        ProviderKind::Yahoo => Arc::new(YahooProvider::new()),
    };

    let store = Arc::new(NotionStore::new(
        &credentials.store_api_key,
        credentials.store_database_id.clone(),
        config.page_size,
    )?);

    // ── 3. Run ───────────────────────────────────────────────────────────
    let mut coordinator = RunCoordinator::new(
        provider,
        ReconciliationEngine::new(store),
        config.pacing(),
    );

    let summary = coordinator.run(&config.tickers).await?;

    for outcome in &summary.outcomes {
        match &outcome.result {
            Ok(action) => info!(ticker = %outcome.ticker, %action, "ok"),
            Err(reason) => warn!(ticker = %outcome.ticker, %reason, "failed"),
        }
    }
    info!(
        success = summary.success,
        failure = summary.failure,
        "Run finished"
    );

    Ok(())
}
