// =============================================================================
// Notion Document Store — database query pagination + page create/update
// =============================================================================
//
// SECURITY: the integration token is sent as a bearer header and never
// logged or serialized.  Every request pins the API version header so a
// server-side version bump cannot silently change response shapes.
// =============================================================================

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use tracing::debug;

use super::{DocumentStore, QueryPage, RemoteDocument, StoreError, PROP_TICKER};

use anyhow::{Context, Result};
use async_trait::async_trait;

const DEFAULT_BASE_URL: &str = "https://api.notion.com";
const NOTION_VERSION: &str = "2022-06-28";

/// Notion REST client bound to a single database.
#[derive(Clone)]
pub struct NotionStore {
    client: reqwest::Client,
    base_url: String,
    database_id: String,
    page_size: u32,
}

impl NotionStore {
    /// Build a client holding the bearer token in its default headers.
    pub fn new(api_key: &str, database_id: impl Into<String>, page_size: u32) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .context("API key contains characters invalid in a header")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("Notion-Version", HeaderValue::from_static(NOTION_VERSION));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            database_id: database_id.into(),
            page_size,
        })
    }

    /// Convert a non-2xx response into `StoreError::Api` with its body text.
    async fn check(resp: reqwest::Response) -> Result<Value, StoreError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl DocumentStore for NotionStore {
    async fn query_page(&self, cursor: Option<&str>) -> Result<QueryPage, StoreError> {
        let url = format!("{}/v1/databases/{}/query", self.base_url, self.database_id);

        let mut payload = json!({ "page_size": self.page_size });
        if let Some(cursor) = cursor {
            // The cursor is opaque; echo it back exactly as received.
            payload["start_cursor"] = json!(cursor);
        }

        let resp = self.client.post(&url).json(&payload).send().await?;
        let body = Self::check(resp).await?;

        let documents = body
            .get("results")
            .and_then(|r| r.as_array())
            .map(|pages| pages.iter().filter_map(parse_page).collect())
            .unwrap_or_default();

        let page = QueryPage {
            documents,
            has_more: body
                .get("has_more")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            next_cursor: body
                .get("next_cursor")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        };

        debug!(
            documents = page.documents.len(),
            has_more = page.has_more,
            "query page fetched"
        );
        Ok(page)
    }

    async fn create(&self, properties: Value) -> Result<String, StoreError> {
        let url = format!("{}/v1/pages", self.base_url);
        let payload = json!({
            "parent": { "type": "database_id", "database_id": self.database_id },
            "properties": properties,
        });

        let resp = self.client.post(&url).json(&payload).send().await?;
        let body = Self::check(resp).await?;

        body.get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| StoreError::Malformed("created page has no id".into()))
    }

    async fn update(&self, id: &str, properties: Value) -> Result<(), StoreError> {
        let url = format!("{}/v1/pages/{}", self.base_url, id);
        let payload = json!({ "properties": properties });

        let resp = self.client.patch(&url).json(&payload).send().await?;
        Self::check(resp).await?;
        Ok(())
    }
}

impl std::fmt::Debug for NotionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionStore")
            .field("base_url", &self.base_url)
            .field("database_id", &self.database_id)
            .field("page_size", &self.page_size)
            .finish()
    }
}

// =============================================================================
// Response parsing
// =============================================================================

/// Extract the document id and ticker text from one query result page.
///
/// The ticker lives in a rich-text property; its first fragment's plain text
/// is trimmed of surrounding whitespace.  Pages without an id are dropped;
/// pages without a readable ticker survive with `ticker: None` (the index
/// builder skips them).
fn parse_page(page: &Value) -> Option<RemoteDocument> {
    let id = page.get("id").and_then(|v| v.as_str())?.to_string();

    let ticker = page
        .pointer(&format!("/properties/{PROP_TICKER}"))
        .filter(|prop| prop.get("type").and_then(|t| t.as_str()) == Some("rich_text"))
        .and_then(|prop| prop.pointer("/rich_text/0/plain_text"))
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Some(RemoteDocument { id, ticker })
}
