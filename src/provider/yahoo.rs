// =============================================================================
// Yahoo Finance Provider — v8 chart history + quoteSummary fundamentals
// =============================================================================
//
// One year of daily bars comes from the v8 chart endpoint; name, trailing
// PE, price-to-book, and market cap come from quoteSummary.  As with the
// other vendor the fundamentals call is best-effort.
//
// The unauthenticated endpoints reject requests with a default library
// User-Agent, so the client always sends a browser identity.

use chrono::DateTime;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::{debug, warn};

use super::{ExtremaSource, PriceProvider, ProviderError, ProviderQuote};
use crate::types::{Fundamentals, Market, PriceBar};

use async_trait::async_trait;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Yahoo Finance REST client.  Serves both US and KR listings.
#[derive(Debug, Clone)]
pub struct YahooProvider {
    client: reqwest::Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value, ProviderError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();

        // Unknown tickers come back as 404 with an error body — a definitive
        // answer, not a transient failure.
        if status.as_u16() == 404 {
            return Err(ProviderError::NotFound);
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
            });
        }

        Ok(resp.json().await?)
    }

    async fn fetch_fundamentals(&self, ticker: &str) -> Fundamentals {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules=price,summaryDetail,defaultKeyStatistics",
            self.base_url, ticker
        );
        match self.get_json(&url).await {
            Ok(body) => parse_quote_summary(&body),
            Err(e) => {
                warn!(ticker, error = %e, "quoteSummary fetch failed — fundamentals absent");
                Fundamentals::default()
            }
        }
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceProvider for YahooProvider {
    async fn fetch(&self, ticker: &str, _market: Market) -> Result<ProviderQuote, ProviderError> {
        let url = format!(
            "{}/v8/finance/chart/{}?range=1y&interval=1d",
            self.base_url, ticker
        );
        let body = self.get_json(&url).await?;
        let series = parse_chart(&body)?;
        let fundamentals = self.fetch_fundamentals(ticker).await;

        debug!(ticker, bars = series.len(), "history series fetched");
        Ok(ProviderQuote {
            series,
            fundamentals,
        })
    }

    fn extrema_source(&self) -> ExtremaSource {
        ExtremaSource::HighLow
    }
}

// =============================================================================
// Response parsing
// =============================================================================

/// Parse a v8 chart body into date-ascending bars.  Indices where any OHLCV
/// component is null (halted or partial days) are skipped.
pub(crate) fn parse_chart(body: &Value) -> Result<Vec<PriceBar>, ProviderError> {
    let chart = body
        .get("chart")
        .ok_or_else(|| ProviderError::Malformed("missing 'chart' object".into()))?;

    if chart.get("error").map(|e| !e.is_null()).unwrap_or(false) {
        return Err(ProviderError::NotFound);
    }

    let result = chart
        .get("result")
        .and_then(|r| r.as_array())
        .and_then(|arr| arr.first())
        .ok_or(ProviderError::NotFound)?;

    let timestamps = result
        .get("timestamp")
        .and_then(|t| t.as_array())
        .ok_or(ProviderError::NotFound)?;

    let quote = result
        .pointer("/indicators/quote/0")
        .ok_or_else(|| ProviderError::Malformed("missing indicators.quote[0]".into()))?;

    let series = |key: &str| quote.get(key).and_then(|v| v.as_array());
    let (opens, highs, lows, closes, volumes) = match (
        series("open"),
        series("high"),
        series("low"),
        series("close"),
        series("volume"),
    ) {
        (Some(o), Some(h), Some(l), Some(c), Some(v)) => (o, h, l, c, v),
        _ => return Err(ProviderError::Malformed("missing OHLCV arrays".into())),
    };

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let Some(secs) = ts.as_i64() else { continue };
        let Some(date) = DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive()) else {
            continue;
        };

        // Null entries are simply absent trading data for that slot.
        let slot = |arr: &Vec<Value>| arr.get(i).and_then(|v| v.as_f64());
        match (
            slot(opens),
            slot(highs),
            slot(lows),
            slot(closes),
            slot(volumes),
        ) {
            (Some(open), Some(high), Some(low), Some(close), Some(volume)) => bars.push(PriceBar {
                date,
                open,
                high,
                low,
                close,
                volume: volume as u64,
            }),
            _ => continue,
        }
    }

    if bars.is_empty() {
        return Err(ProviderError::NotFound);
    }
    Ok(bars)
}

/// Extract fundamentals from a quoteSummary body.  Numeric values live under
/// a `{ "raw": ..., "fmt": ... }` wrapper.
pub(crate) fn parse_quote_summary(body: &Value) -> Fundamentals {
    let Some(result) = body
        .pointer("/quoteSummary/result/0")
        .filter(|r| !r.is_null())
    else {
        return Fundamentals::default();
    };

    let name = result
        .pointer("/price/longName")
        .or_else(|| result.pointer("/price/shortName"))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    Fundamentals {
        name,
        per: result
            .pointer("/summaryDetail/trailingPE/raw")
            .and_then(|v| v.as_f64()),
        pbr: result
            .pointer("/defaultKeyStatistics/priceToBook/raw")
            .and_then(|v| v.as_f64()),
        market_cap: result
            .pointer("/price/marketCap/raw")
            .and_then(|v| v.as_f64()),
    }
}
