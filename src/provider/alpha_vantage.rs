// =============================================================================
// Alpha Vantage Provider — daily bars + company overview
// =============================================================================
//
// Two requests per ticker: TIME_SERIES_DAILY for the OHLCV series and
// OVERVIEW for name / PER / PBR / market cap.  The overview call is
// best-effort: its failure degrades the snapshot (absent fundamentals)
// instead of failing the ticker.
//
// Quirks of this vendor, mapped onto `ProviderError`:
//   - Korean listings are not served at all       => Unsupported
//   - A body containing "Error Message"           => NotFound
//   - A body containing "Note" (quota exhausted)  => RateLimited
// =============================================================================

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

use super::{ExtremaSource, PriceProvider, ProviderError, ProviderQuote};
use crate::types::{Fundamentals, Market, PriceBar};

use async_trait::async_trait;

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";

/// Alpha Vantage REST client.
#[derive(Clone)]
pub struct AlphaVantageProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AlphaVantageProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    async fn get_json(&self, function: &str, ticker: &str) -> Result<Value, ProviderError> {
        let url = format!(
            "{}/query?function={}&symbol={}&apikey={}",
            self.base_url, function, ticker, self.api_key
        );

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
            });
        }

        Ok(resp.json().await?)
    }

    /// Fetch the OVERVIEW document; any failure is logged and swallowed.
    async fn fetch_overview(&self, ticker: &str) -> Fundamentals {
        match self.get_json("OVERVIEW", ticker).await {
            Ok(body) => parse_overview(&body),
            Err(e) => {
                warn!(ticker, error = %e, "overview fetch failed — fundamentals absent");
                Fundamentals::default()
            }
        }
    }
}

#[async_trait]
impl PriceProvider for AlphaVantageProvider {
    async fn fetch(&self, ticker: &str, market: Market) -> Result<ProviderQuote, ProviderError> {
        // This vendor has no Korean market coverage; refuse before spending
        // a request against the quota.
        if market == Market::Kr {
            return Err(ProviderError::Unsupported { market });
        }

        let body = self.get_json("TIME_SERIES_DAILY", ticker).await?;

        if body.get("Error Message").is_some() {
            return Err(ProviderError::NotFound);
        }
        if body.get("Note").is_some() {
            return Err(ProviderError::RateLimited);
        }

        let series = parse_daily_series(&body)?;
        let fundamentals = self.fetch_overview(ticker).await;

        debug!(ticker, bars = series.len(), "daily series fetched");
        Ok(ProviderQuote {
            series,
            fundamentals,
        })
    }

    fn extrema_source(&self) -> ExtremaSource {
        ExtremaSource::CloseOnly
    }
}

impl std::fmt::Debug for AlphaVantageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlphaVantageProvider")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// =============================================================================
// Response parsing
// =============================================================================

/// Parse the "Time Series (Daily)" map into date-ascending bars.
pub(crate) fn parse_daily_series(body: &Value) -> Result<Vec<PriceBar>, ProviderError> {
    let series = body
        .get("Time Series (Daily)")
        .and_then(|v| v.as_object())
        .filter(|m| !m.is_empty())
        .ok_or(ProviderError::NotFound)?;

    let mut bars = Vec::with_capacity(series.len());
    for (date_str, fields) in series {
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|_| {
            ProviderError::Malformed(format!("unparseable series date '{date_str}'"))
        })?;

        bars.push(PriceBar {
            date,
            open: bar_field(fields, "1. open")?,
            high: bar_field(fields, "2. high")?,
            low: bar_field(fields, "3. low")?,
            close: bar_field(fields, "4. close")?,
            volume: bar_field(fields, "5. volume")? as u64,
        });
    }

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

/// Numeric fields arrive as strings ("189.9800").
fn bar_field(fields: &Value, key: &str) -> Result<f64, ProviderError> {
    fields
        .get(key)
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| ProviderError::Malformed(format!("missing or non-numeric field '{key}'")))
}

/// Extract fundamentals from an OVERVIEW body.  The vendor reports missing
/// values as the literal string "None"; those stay absent.
pub(crate) fn parse_overview(body: &Value) -> Fundamentals {
    Fundamentals {
        name: body
            .get("Name")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        per: overview_number(body, "PERatio"),
        pbr: overview_number(body, "PriceToBookRatio"),
        market_cap: overview_number(body, "MarketCapitalization"),
    }
}

fn overview_number(body: &Value, key: &str) -> Option<f64> {
    body.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| *s != "None")
        .and_then(|s| s.parse::<f64>().ok())
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_and_sorts_daily_series() {
        let body = json!({
            "Time Series (Daily)": {
                "2025-08-27": {
                    "1. open": "101.0", "2. high": "103.0", "3. low": "100.0",
                    "4. close": "102.0", "5. volume": "1200"
                },
                "2025-08-26": {
                    "1. open": "99.0", "2. high": "101.0", "3. low": "98.5",
                    "4. close": "100.0", "5. volume": "1000"
                }
            }
        });
        let bars = parse_daily_series(&body).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2025, 8, 26).unwrap());
        assert_eq!(bars[0].close, 100.0);
        assert_eq!(bars[1].volume, 1200);
    }

    #[test]
    fn empty_series_is_not_found() {
        let body = json!({ "Time Series (Daily)": {} });
        assert!(matches!(
            parse_daily_series(&body),
            Err(ProviderError::NotFound)
        ));
        assert!(matches!(
            parse_daily_series(&json!({})),
            Err(ProviderError::NotFound)
        ));
    }

    #[test]
    fn malformed_bar_field_is_reported() {
        let body = json!({
            "Time Series (Daily)": {
                "2025-08-26": { "1. open": "99.0" }
            }
        });
        assert!(matches!(
            parse_daily_series(&body),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn overview_parses_present_fields_and_skips_none() {
        let body = json!({
            "Name": "Apple Inc",
            "PERatio": "29.5",
            "PriceToBookRatio": "None",
            "MarketCapitalization": "2900000000000"
        });
        let f = parse_overview(&body);
        assert_eq!(f.name.as_deref(), Some("Apple Inc"));
        assert_eq!(f.per, Some(29.5));
        assert_eq!(f.pbr, None);
        assert_eq!(f.market_cap, Some(2_900_000_000_000.0));
    }

    #[tokio::test]
    async fn korean_tickers_are_unsupported() {
        let provider = AlphaVantageProvider::new("demo");
        let err = provider.fetch("005930.KS", Market::Kr).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported { market: Market::Kr }));
    }
}
