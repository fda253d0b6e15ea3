// =============================================================================
// Snapshot Builder — one ticker's fully derived record
// =============================================================================
//
// Assembles the output record from a raw price history plus optional
// fundamentals.  All numeric outputs are finite rounded decimals or absent;
// absent inputs propagate as absent, never as zero.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::indicators::{extrema, round2, round4, rsi, sma, trend};
use crate::provider::{ExtremaSource, ProviderQuote};
use crate::types::{Market, PriceBar, TrendSignal};

/// The derived record for one ticker at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub name: String,
    /// Immutable identity key for reconciliation.
    pub ticker: String,
    pub market: Market,
    pub price: f64,
    /// Percent change vs the prior close, as a fraction (0.0123 = +1.23 %).
    pub change_pct: f64,
    pub volume: u64,
    /// Latest volume vs the 5-day average volume, minus one.
    pub volume_ratio_5d: f64,
    pub sma20: Option<f64>,
    pub sma50: Option<f64>,
    pub sma200: Option<f64>,
    pub rsi30: Option<f64>,
    pub per: Option<f64>,
    pub pbr: Option<f64>,
    /// Market cap in the market's display unit (see [`Market::cap_divisor`]).
    pub market_cap: Option<f64>,
    pub high_52w: f64,
    pub low_52w: f64,
    pub trend_signal: TrendSignal,
    pub updated_at: DateTime<Utc>,
}

/// Recoverable, per-ticker build failures.  The run continues with the next
/// ticker; these never abort the run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("price series is empty")]
    EmptySeries,

    #[error("price series has {len} bar(s); change-% needs a prior close")]
    TooShort { len: usize },
}

/// Build the snapshot for `ticker` from a provider quote.
///
/// `extrema_source` selects the provider-dependent 52-week range variant.
/// `now` is injected so a run stamps every snapshot consistently and tests
/// stay deterministic.
pub fn build_snapshot(
    ticker: &str,
    market: Market,
    quote: &ProviderQuote,
    extrema_source: ExtremaSource,
    now: DateTime<Utc>,
) -> Result<Snapshot, SnapshotError> {
    let series = &quote.series;
    if series.is_empty() {
        return Err(SnapshotError::EmptySeries);
    }
    if series.len() < 2 {
        return Err(SnapshotError::TooShort { len: series.len() });
    }

    let closes: Vec<f64> = series.iter().map(|b| b.close).collect();
    let last = &series[series.len() - 1];
    let prev_close = closes[closes.len() - 2];

    // Division guards: a non-positive prior close or a zero 5-day average
    // volume yields 0, not an error.
    let change_pct = if prev_close > 0.0 {
        round4(last.close / prev_close - 1.0)
    } else {
        0.0
    };
    let volume_ratio_5d = volume_ratio(series);

    let sma20 = sma::sma(&closes, 20);
    let sma50 = sma::sma(&closes, 50);
    let sma200 = sma::sma(&closes, 200);
    let rsi30 = rsi::rsi(&closes, rsi::RSI_PERIOD);

    let (high_52w, low_52w) = match extrema_source {
        ExtremaSource::CloseOnly => extrema::range_from_closes(&closes),
        ExtremaSource::HighLow => extrema::range_from_bars(series),
    }
    .ok_or(SnapshotError::EmptySeries)?;

    let f = &quote.fundamentals;
    Ok(Snapshot {
        name: f.name.clone().unwrap_or_else(|| ticker.to_string()),
        ticker: ticker.to_string(),
        market,
        price: round2(last.close),
        change_pct,
        volume: last.volume,
        volume_ratio_5d,
        sma20,
        sma50,
        sma200,
        rsi30,
        per: f.per.map(round2),
        pbr: f.pbr.map(round2),
        market_cap: f.market_cap.map(|raw| round2(raw / market.cap_divisor())),
        high_52w,
        low_52w,
        trend_signal: trend::trend_signal(sma20, sma50, sma200),
        updated_at: now,
    })
}

/// Latest volume relative to the mean of the last (up to) 5 volumes,
/// including the latest.  Zero mean => 0.
fn volume_ratio(series: &[PriceBar]) -> f64 {
    let tail_start = series.len().saturating_sub(5);
    let tail = &series[tail_start..];
    let mean = tail.iter().map(|b| b.volume as f64).sum::<f64>() / tail.len() as f64;
    let latest = series[series.len() - 1].volume as f64;

    if mean > 0.0 {
        round4(latest / mean - 1.0)
    } else {
        0.0
    }
}
