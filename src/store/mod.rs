// =============================================================================
// Document Store Abstraction — paginated query + create/update
// =============================================================================
//
// The remote store keeps one document per ticker.  It has no native
// uniqueness constraint, so the ticker text property acts as the natural key
// and reconciliation decides create-vs-update from a pagination-built index.

pub mod notion;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::snapshot::Snapshot;

// Property names of the remote schema.
pub const PROP_NAME: &str = "Name";
pub const PROP_TICKER: &str = "Ticker";
pub const PROP_MARKET: &str = "Market";
pub const PROP_PRICE: &str = "Price";
pub const PROP_CHANGE_PCT: &str = "Change %";
pub const PROP_VOLUME: &str = "Volume";
pub const PROP_VOLUME_RATIO: &str = "Volume Ratio 5D";
pub const PROP_SMA20: &str = "SMA20";
pub const PROP_SMA50: &str = "SMA50";
pub const PROP_SMA200: &str = "SMA200";
pub const PROP_RSI30: &str = "RSI30";
pub const PROP_PER: &str = "PER";
pub const PROP_PBR: &str = "PBR";
pub const PROP_MARKET_CAP: &str = "Market Cap";
pub const PROP_HIGH_52W: &str = "52W High";
pub const PROP_LOW_52W: &str = "52W Low";
pub const PROP_TREND: &str = "Trend Signal";
pub const PROP_UPDATED_AT: &str = "Updated At";

/// One remote document as seen during index building: its opaque id and the
/// ticker text stored in it (absent when the property is empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocument {
    pub id: String,
    pub ticker: Option<String>,
}

/// One page of a paginated query.  `next_cursor` is opaque and must be
/// echoed back unmodified on the next call.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub documents: Vec<RemoteDocument>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// Failure modes of the document store.  Store calls are single-attempt:
/// no retry wraps them (unlike the price fetch).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed store response: {0}")]
    Malformed(String),
}

/// Trait implemented by the concrete document store (and by test fakes).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one page of existing documents, starting at `cursor` (`None`
    /// for the first page).
    async fn query_page(&self, cursor: Option<&str>) -> Result<QueryPage, StoreError>;

    /// Create a new document with the given property payload; returns its id.
    async fn create(&self, properties: Value) -> Result<String, StoreError>;

    /// Update an existing document in place.
    async fn update(&self, id: &str, properties: Value) -> Result<(), StoreError>;
}

/// Map a snapshot onto the store's property payload.
///
/// Identity fields (name, ticker, market) and the always-computable numerics
/// are included unconditionally; optional numerics are included only when
/// present.  Absent fields are omitted, not nulled, so an update never
/// erases a previously known value the current run could not recompute.
pub fn build_properties(snapshot: &Snapshot) -> Value {
    let mut props = Map::new();

    props.insert(
        PROP_NAME.into(),
        json!({ "title": [{ "text": { "content": &snapshot.name } }] }),
    );
    props.insert(
        PROP_TICKER.into(),
        json!({ "rich_text": [{ "text": { "content": &snapshot.ticker } }] }),
    );
    props.insert(
        PROP_MARKET.into(),
        json!({ "select": { "name": snapshot.market.to_string() } }),
    );
    props.insert(PROP_PRICE.into(), json!({ "number": snapshot.price }));
    props.insert(
        PROP_CHANGE_PCT.into(),
        json!({ "number": snapshot.change_pct }),
    );
    props.insert(PROP_VOLUME.into(), json!({ "number": snapshot.volume }));
    props.insert(
        PROP_VOLUME_RATIO.into(),
        json!({ "number": snapshot.volume_ratio_5d }),
    );
    props.insert(PROP_HIGH_52W.into(), json!({ "number": snapshot.high_52w }));
    props.insert(PROP_LOW_52W.into(), json!({ "number": snapshot.low_52w }));
    props.insert(
        PROP_TREND.into(),
        json!({ "select": { "name": snapshot.trend_signal.to_string() } }),
    );
    props.insert(
        PROP_UPDATED_AT.into(),
        json!({ "date": { "start": snapshot.updated_at.to_rfc3339() } }),
    );

    let optional = [
        (PROP_SMA20, snapshot.sma20),
        (PROP_SMA50, snapshot.sma50),
        (PROP_SMA200, snapshot.sma200),
        (PROP_RSI30, snapshot.rsi30),
        (PROP_PER, snapshot.per),
        (PROP_PBR, snapshot.pbr),
        (PROP_MARKET_CAP, snapshot.market_cap),
    ];
    for (key, value) in optional {
        if let Some(v) = value {
            props.insert(key.into(), json!({ "number": v }));
        }
    }

    Value::Object(props)
}
