// =============================================================================
// Sync Configuration — watch list, provider selection, pacing knobs
// =============================================================================
//
// All tunables live in one serde struct so a run can be reconfigured from a
// JSON file without a rebuild.  Every field carries `#[serde(default)]` so
// adding new fields never breaks loading an older config file.
//
// Credentials are NOT part of this struct: they come from the environment
// into an explicit `Credentials` value that is passed down at construction.
// No module-level credential state exists anywhere in the crate.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::coordinator::PacingPolicy;
use crate::types::{Market, TickerEntry};

/// Environment variable holding a JSON array of `{ticker, market}` pairs.
pub const TICKERS_ENV: &str = "STOCK_TICKERS";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_tickers() -> Vec<TickerEntry> {
    vec![
        TickerEntry::new("AAPL", Market::Us),
        TickerEntry::new("MSFT", Market::Us),
        TickerEntry::new("GOOGL", Market::Us),
        TickerEntry::new("NVDA", Market::Us),
        TickerEntry::new("TSLA", Market::Us),
        TickerEntry::new("005930.KS", Market::Kr),
        TickerEntry::new("000660.KS", Market::Kr),
        TickerEntry::new("035720.KS", Market::Kr),
        TickerEntry::new("035420.KS", Market::Kr),
        TickerEntry::new("207940.KS", Market::Kr),
    ]
}

fn default_pace_secs() -> u64 {
    12
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_page_size() -> u32 {
    100
}

// =============================================================================
// ProviderKind
// =============================================================================

/// Which upstream price/fundamentals integration to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Daily-bar provider: US-only coverage, close-derived 52-week range.
    AlphaVantage,
    /// History-bar provider: both markets, true high/low 52-week range.
    Yahoo,
}

impl Default for ProviderKind {
    fn default() -> Self {
        Self::Yahoo
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlphaVantage => write!(f, "alpha-vantage"),
            Self::Yahoo => write!(f, "yahoo"),
        }
    }
}

// =============================================================================
// SyncConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Upstream integration serving the price series.
    #[serde(default)]
    pub provider: ProviderKind,

    /// Watch list: tickers to sync, with their markets.
    #[serde(default = "default_tickers")]
    pub tickers: Vec<TickerEntry>,

    /// Minimum delay between provider fetches, in seconds.
    #[serde(default = "default_pace_secs")]
    pub pace_secs: u64,

    /// Total fetch attempts per ticker (1 = no retry).
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay between fetch attempts, in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Page size for document-store pagination.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            tickers: default_tickers(),
            pace_secs: default_pace_secs(),
            retry_attempts: default_retry_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            page_size: default_page_size(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read sync config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse sync config from {}", path.display()))?;

        info!(
            path = %path.display(),
            provider = %config.provider,
            tickers = config.tickers.len(),
            "sync config loaded"
        );

        Ok(config)
    }

    /// Replace the watch list from the `STOCK_TICKERS` env var when present.
    /// A parse failure keeps the configured list and logs a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var(TICKERS_ENV) {
            match serde_json::from_str::<Vec<TickerEntry>>(&raw) {
                Ok(tickers) if !tickers.is_empty() => {
                    info!(count = tickers.len(), "watch list loaded from {TICKERS_ENV}");
                    self.tickers = tickers;
                }
                Ok(_) => warn!("{TICKERS_ENV} is an empty list — keeping configured tickers"),
                Err(e) => warn!(error = %e, "failed to parse {TICKERS_ENV} — keeping configured tickers"),
            }
        }
    }

    /// The daily-bar provider has no Korean coverage; drop KR entries up
    /// front instead of burning quota on refused requests.
    pub fn restrict_to_provider_coverage(&mut self) {
        if self.provider == ProviderKind::AlphaVantage {
            let before = self.tickers.len();
            self.tickers.retain(|t| t.market == Market::Us);
            let dropped = before - self.tickers.len();
            if dropped > 0 {
                warn!(dropped, "KR tickers removed — not served by {}", self.provider);
            }
        }
    }

    pub fn pacing(&self) -> PacingPolicy {
        PacingPolicy {
            inter_request_delay: Duration::from_secs(self.pace_secs),
            retry_attempts: self.retry_attempts,
            retry_delay: Duration::from_secs(self.retry_delay_secs),
        }
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// API credentials, read once from the environment and passed down
/// explicitly.  Never serialized.
#[derive(Clone)]
pub struct Credentials {
    pub store_api_key: String,
    pub store_database_id: String,
    pub alpha_vantage_api_key: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        let store_api_key =
            std::env::var("NOTION_API_KEY").context("NOTION_API_KEY is not set")?;
        let store_database_id =
            std::env::var("NOTION_DATABASE_ID").context("NOTION_DATABASE_ID is not set")?;
        // The daily-bar provider works (rate-limited) with the public demo key.
        let alpha_vantage_api_key =
            std::env::var("ALPHA_VANTAGE_API_KEY").unwrap_or_else(|_| "demo".to_string());

        Ok(Self {
            store_api_key,
            store_database_id,
            alpha_vantage_api_key,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("store_api_key", &"<redacted>")
            .field("store_database_id", &self.store_database_id)
            .field("alpha_vantage_api_key", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = SyncConfig::default();
        assert_eq!(cfg.provider, ProviderKind::Yahoo);
        assert_eq!(cfg.tickers.len(), 10);
        assert_eq!(cfg.tickers[0].ticker, "AAPL");
        assert_eq!(cfg.tickers[5].market, Market::Kr);
        assert_eq!(cfg.pace_secs, 12);
        assert_eq!(cfg.retry_attempts, 3);
        assert_eq!(cfg.page_size, 100);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: SyncConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.provider, ProviderKind::Yahoo);
        assert_eq!(cfg.tickers.len(), 10);
        assert_eq!(cfg.retry_delay_secs, 2);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{
            "provider": "alpha-vantage",
            "tickers": [{ "ticker": "AMZN", "market": "US" }]
        }"#;
        let cfg: SyncConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.provider, ProviderKind::AlphaVantage);
        assert_eq!(cfg.tickers, vec![TickerEntry::new("AMZN", Market::Us)]);
        assert_eq!(cfg.pace_secs, 12);
    }

    #[test]
    fn alpha_vantage_coverage_drops_kr() {
        let mut cfg = SyncConfig {
            provider: ProviderKind::AlphaVantage,
            ..Default::default()
        };
        cfg.restrict_to_provider_coverage();
        assert_eq!(cfg.tickers.len(), 5);
        assert!(cfg.tickers.iter().all(|t| t.market == Market::Us));
    }

    #[test]
    fn yahoo_coverage_keeps_both_markets() {
        let mut cfg = SyncConfig::default();
        cfg.restrict_to_provider_coverage();
        assert_eq!(cfg.tickers.len(), 10);
    }

    #[test]
    fn pacing_policy_from_config() {
        let cfg = SyncConfig::default();
        let pacing = cfg.pacing();
        assert_eq!(pacing.inter_request_delay, Duration::from_secs(12));
        assert_eq!(pacing.retry_attempts, 3);
        assert_eq!(pacing.retry_delay, Duration::from_secs(2));
    }
}
