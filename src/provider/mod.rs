// =============================================================================
// Price / Fundamentals Provider Abstraction
// =============================================================================
//
// A single capability interface covers both upstream integrations (the
// daily-bar provider and the history-bar provider) so the indicator,
// snapshot, and reconciliation logic exists exactly once.  Implementations
// handle vendor-specific request/parse logic and map their failure modes
// onto `ProviderError`.

pub mod alpha_vantage;
pub mod yahoo;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Fundamentals, Market, PriceBar};

/// Which price fields a provider's 52-week extrema are derived from.
///
/// The two source pipelines differ here; the difference is preserved as
/// provider-dependent behavior rather than papered over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtremaSource {
    /// Max/min of closing prices (daily-bar provider).
    CloseOnly,
    /// Max of bar highs / min of bar lows (history-bar provider).
    HighLow,
}

/// Everything a provider returns for one ticker: an ordered OHLCV series
/// plus whatever fundamentals the vendor exposes.
#[derive(Debug, Clone, Default)]
pub struct ProviderQuote {
    pub series: Vec<PriceBar>,
    pub fundamentals: Fundamentals,
}

/// Failure modes of a provider fetch.
///
/// `Transport` and `Status` are transient and worth retrying; everything
/// else is a definitive answer for this ticker within the current run.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}")]
    Status { status: u16 },

    #[error("{market} instruments are not supported by this provider")]
    Unsupported { market: Market },

    #[error("request quota reached")]
    RateLimited,

    #[error("no price data for ticker")]
    NotFound,

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Whether a bounded retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. })
    }
}

/// Trait implemented by each concrete price/fundamentals vendor.
///
/// Designed for dynamic dispatch (`Arc<dyn PriceProvider>`) so the run
/// coordinator can be wired to either integration at startup.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Fetch roughly one year of daily bars plus fundamentals for `ticker`.
    ///
    /// The returned series is ordered strictly ascending by date.
    async fn fetch(&self, ticker: &str, market: Market) -> Result<ProviderQuote, ProviderError>;

    /// Which fields this provider's 52-week extrema are computed from.
    fn extrema_source(&self) -> ExtremaSource;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(ProviderError::Status { status: 503 }.is_retryable());
        assert!(!ProviderError::RateLimited.is_retryable());
        assert!(!ProviderError::NotFound.is_retryable());
        assert!(!ProviderError::Unsupported { market: Market::Kr }.is_retryable());
        assert!(!ProviderError::Malformed("x".into()).is_retryable());
    }
}
