// =============================================================================
// Shared types used across the ticker snapshot sync engine
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Market a ticker is listed on.  Drives unit conversion (market cap) and
/// provider support checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Market {
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "KR")]
    Kr,
}

impl Market {
    /// Divisor applied to a raw market capitalisation to produce the
    /// display unit: 100 million (KR, "eok") vs 1 million (everything else).
    pub fn cap_divisor(&self) -> f64 {
        match self {
            Self::Kr => 100_000_000.0,
            Self::Us => 1_000_000.0,
        }
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Us => write!(f, "US"),
            Self::Kr => write!(f, "KR"),
        }
    }
}

/// One entry of the configured watch list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerEntry {
    pub ticker: String,
    pub market: Market,
}

impl TickerEntry {
    pub fn new(ticker: impl Into<String>, market: Market) -> Self {
        Self {
            ticker: ticker.into(),
            market,
        }
    }
}

/// One trading day of OHLCV data.  Prices are positive, volume non-negative;
/// a series is ordered strictly ascending by date (missing days simply absent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Optional per-company fundamentals delivered alongside the price series.
/// Every field is independently optional — providers differ in coverage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fundamentals {
    pub name: Option<String>,
    /// Trailing price-to-earnings ratio.
    pub per: Option<f64>,
    /// Price-to-book ratio.
    pub pbr: Option<f64>,
    /// Raw market capitalisation in the listing currency (not yet converted
    /// to the display unit).
    pub market_cap: Option<f64>,
}

/// Moving-average alignment classification.
///
/// The branch priority is evaluated top to bottom in
/// [`crate::indicators::trend::trend_signal`]; the labels below are the exact
/// strings written to the document store's select field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendSignal {
    BullishAligned,
    BearishAligned,
    GoldenCross2050,
    GoldenCross50200,
    DeadCross2050,
    DeadCross50200,
    None,
}

impl Default for TrendSignal {
    fn default() -> Self {
        Self::None
    }
}

impl std::fmt::Display for TrendSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BullishAligned => write!(f, "bullish-aligned"),
            Self::BearishAligned => write!(f, "bearish-aligned"),
            Self::GoldenCross2050 => write!(f, "golden-cross (20>50)"),
            Self::GoldenCross50200 => write!(f, "golden-cross (50>200)"),
            Self::DeadCross2050 => write!(f, "dead-cross (20<50)"),
            Self::DeadCross50200 => write!(f, "dead-cross (50<200)"),
            Self::None => write!(f, "-"),
        }
    }
}

/// What happened to a single ticker during a run.  Collected into the
/// [`RunSummary`] so callers (and tests) can inspect per-ticker results
/// instead of scraping log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerOutcome {
    pub ticker: String,
    pub result: Result<UpsertAction, String>,
}

/// Whether the reconciliation created a new remote document or updated an
/// existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    Created,
    Updated,
}

impl std::fmt::Display for UpsertAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
        }
    }
}

/// Aggregate result of one full run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub success: u32,
    pub failure: u32,
    pub outcomes: Vec<TickerOutcome>,
}
