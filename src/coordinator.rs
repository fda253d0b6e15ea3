// =============================================================================
// Run Coordinator — sequential ticker loop with pacing and bounded retry
// =============================================================================
//
// The upstream data provider enforces a request quota, so tickers are
// processed strictly one after another with a fixed minimum delay between
// fetches instead of concurrent requests with backoff.  A small bounded
// retry wraps the price fetch only — document-store calls are single
// attempt, and their failure surfaces per ticker.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::SyncError;
use crate::provider::{PriceProvider, ProviderError, ProviderQuote};
use crate::reconcile::ReconciliationEngine;
use crate::snapshot::build_snapshot;
use crate::types::{RunSummary, TickerEntry, TickerOutcome, UpsertAction};

/// Pacing and retry knobs.  Tests zero these out.
#[derive(Debug, Clone)]
pub struct PacingPolicy {
    /// Minimum delay between consecutive provider fetches (not applied
    /// before the first one).
    pub inter_request_delay: Duration,
    /// Total fetch attempts per ticker (1 = no retry).
    pub retry_attempts: u32,
    /// Delay between attempts.
    pub retry_delay: Duration,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            // Free-tier quota is ~5 requests/minute.
            inter_request_delay: Duration::from_secs(12),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

pub struct RunCoordinator {
    provider: Arc<dyn PriceProvider>,
    reconciler: ReconciliationEngine,
    pacing: PacingPolicy,
}

impl RunCoordinator {
    pub fn new(
        provider: Arc<dyn PriceProvider>,
        reconciler: ReconciliationEngine,
        pacing: PacingPolicy,
    ) -> Self {
        Self {
            provider,
            reconciler,
            pacing,
        }
    }

    /// Execute one full run over `tickers`.
    ///
    /// Index building happens first and is the only fatal step.  Each
    /// ticker's pipeline is independent; its errors become a failure count
    /// increment and an outcome entry, never an early return.
    pub async fn run(&mut self, tickers: &[TickerEntry]) -> Result<RunSummary, SyncError> {
        let indexed = self.reconciler.build_index().await?;
        info!(indexed, tickers = tickers.len(), "starting sync run");

        let mut summary = RunSummary::default();

        for (i, entry) in tickers.iter().enumerate() {
            if i > 0 && !self.pacing.inter_request_delay.is_zero() {
                tokio::time::sleep(self.pacing.inter_request_delay).await;
            }

            match self.process_ticker(entry).await {
                Ok(action) => {
                    summary.success += 1;
                    summary.outcomes.push(TickerOutcome {
                        ticker: entry.ticker.clone(),
                        result: Ok(action),
                    });
                }
                Err(e) => {
                    warn!(ticker = %entry.ticker, error = %e, "ticker skipped");
                    summary.failure += 1;
                    summary.outcomes.push(TickerOutcome {
                        ticker: entry.ticker.clone(),
                        result: Err(e.to_string()),
                    });
                }
            }
        }

        info!(
            success = summary.success,
            failure = summary.failure,
            "sync run complete"
        );
        Ok(summary)
    }

    async fn process_ticker(&self, entry: &TickerEntry) -> Result<UpsertAction, SyncError> {
        let quote = self.fetch_with_retry(entry).await?;

        let snapshot = build_snapshot(
            &entry.ticker,
            entry.market,
            &quote,
            self.provider.extrema_source(),
            Utc::now(),
        )?;

        info!(
            ticker = %snapshot.ticker,
            name = %snapshot.name,
            price = snapshot.price,
            change_pct = snapshot.change_pct,
            "snapshot built"
        );

        self.reconciler.upsert(&snapshot).await
    }

    /// Bounded retry around the provider fetch only.  Definitive refusals
    /// (unsupported, rate-limited, not-found) are returned immediately.
    async fn fetch_with_retry(&self, entry: &TickerEntry) -> Result<ProviderQuote, ProviderError> {
        let attempts = self.pacing.retry_attempts.max(1);

        let mut attempt = 1;
        loop {
            match self.provider.fetch(&entry.ticker, entry.market).await {
                Ok(quote) => return Ok(quote),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!(
                        ticker = %entry.ticker,
                        attempt,
                        attempts,
                        error = %e,
                        "fetch failed — retrying"
                    );
                    if !self.pacing.retry_delay.is_zero() {
                        tokio::time::sleep(self.pacing.retry_delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ExtremaSource;
    use crate::store::{DocumentStore, QueryPage, RemoteDocument, StoreError};
    use crate::types::{Fundamentals, Market, PriceBar};
    use async_trait::async_trait;
    use chrono::{Days, NaiveDate};
    use serde_json::Value;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn no_pacing() -> PacingPolicy {
        PacingPolicy {
            inter_request_delay: Duration::ZERO,
            retry_attempts: 3,
            retry_delay: Duration::ZERO,
        }
    }

    fn series(closes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: start.checked_add_days(Days::new(i as u64)).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect()
    }

    /// Deterministic provider: serves a fixed ascending series for US
    /// tickers, refuses KR, and can be made flaky for retry tests.
    struct FakeProvider {
        fail_first: u32,
        calls: AtomicU32,
    }

    impl FakeProvider {
        fn new() -> Self {
            Self {
                fail_first: 0,
                calls: AtomicU32::new(0),
            }
        }

        fn flaky(fail_first: u32) -> Self {
            Self {
                fail_first,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl PriceProvider for FakeProvider {
        async fn fetch(
            &self,
            _ticker: &str,
            market: Market,
        ) -> Result<ProviderQuote, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                return Err(ProviderError::Status { status: 503 });
            }
            if market == Market::Kr {
                return Err(ProviderError::Unsupported { market });
            }
            let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
            Ok(ProviderQuote {
                series: series(&closes),
                fundamentals: Fundamentals {
                    name: Some("Fake Corp".into()),
                    ..Default::default()
                },
            })
        }

        fn extrema_source(&self) -> ExtremaSource {
            ExtremaSource::HighLow
        }
    }

    /// Store fake whose query pages reflect its current contents, so a
    /// second run sees the documents the first run created.
    #[derive(Default)]
    struct StatefulStore {
        docs: Mutex<Vec<(String, String, Value)>>, // (id, ticker, properties)
        fail_create: bool,
    }

    impl StatefulStore {
        fn properties_of(&self, ticker: &str) -> Option<Value> {
            self.docs
                .lock()
                .unwrap()
                .iter()
                .find(|(_, t, _)| t == ticker)
                .map(|(_, _, p)| p.clone())
        }
    }

    fn ticker_of(properties: &Value) -> String {
        properties
            .pointer("/Ticker/rich_text/0/text/content")
            .and_then(|v| v.as_str())
            .expect("payload carries ticker")
            .to_string()
    }

    #[async_trait]
    impl DocumentStore for StatefulStore {
        async fn query_page(&self, _cursor: Option<&str>) -> Result<QueryPage, StoreError> {
            let docs = self.docs.lock().unwrap();
            Ok(QueryPage {
                documents: docs
                    .iter()
                    .map(|(id, ticker, _)| RemoteDocument {
                        id: id.clone(),
                        ticker: Some(ticker.clone()),
                    })
                    .collect(),
                has_more: false,
                next_cursor: None,
            })
        }

        async fn create(&self, properties: Value) -> Result<String, StoreError> {
            if self.fail_create {
                return Err(StoreError::Api {
                    status: 400,
                    body: "rejected".into(),
                });
            }
            let mut docs = self.docs.lock().unwrap();
            let id = format!("pg-{}", docs.len());
            let ticker = ticker_of(&properties);
            docs.push((id.clone(), ticker, properties));
            Ok(id)
        }

        async fn update(&self, id: &str, properties: Value) -> Result<(), StoreError> {
            let mut docs = self.docs.lock().unwrap();
            let entry = docs
                .iter_mut()
                .find(|(doc_id, _, _)| doc_id == id)
                .expect("update targets a known id");
            entry.2 = properties;
            Ok(())
        }
    }

    fn coordinator(provider: FakeProvider, store: Arc<StatefulStore>) -> RunCoordinator {
        RunCoordinator::new(
            Arc::new(provider),
            ReconciliationEngine::new(store),
            no_pacing(),
        )
    }

    #[tokio::test]
    async fn tally_counts_success_and_failure() {
        let store = Arc::new(StatefulStore::default());
        let mut coord = coordinator(FakeProvider::new(), store.clone());

        let tickers = vec![
            TickerEntry::new("AAPL", Market::Us),
            TickerEntry::new("005930.KS", Market::Kr), // unsupported
            TickerEntry::new("MSFT", Market::Us),
        ];
        let summary = coord.run(&tickers).await.unwrap();

        assert_eq!(summary.success, 2);
        assert_eq!(summary.failure, 1);
        assert_eq!(summary.outcomes.len(), 3);
        assert_eq!(summary.outcomes[0].result, Ok(UpsertAction::Created));
        assert!(summary.outcomes[1].result.is_err());
        assert_eq!(summary.outcomes[2].result, Ok(UpsertAction::Created));
        assert_eq!(store.docs.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn transient_fetch_errors_are_retried() {
        let store = Arc::new(StatefulStore::default());
        // Fails twice, succeeds on the third (and final) attempt.
        let mut coord = coordinator(FakeProvider::flaky(2), store);

        let summary = coord
            .run(&[TickerEntry::new("AAPL", Market::Us)])
            .await
            .unwrap();
        assert_eq!(summary.success, 1);
        assert_eq!(summary.failure, 0);
    }

    #[tokio::test]
    async fn retries_exhausted_counts_as_failure() {
        let store = Arc::new(StatefulStore::default());
        let mut coord = coordinator(FakeProvider::flaky(10), store.clone());

        let summary = coord
            .run(&[TickerEntry::new("AAPL", Market::Us)])
            .await
            .unwrap();
        assert_eq!(summary.success, 0);
        assert_eq!(summary.failure, 1);
        assert!(store.docs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsupported_is_not_retried() {
        let store = Arc::new(StatefulStore::default());
        let provider = Arc::new(FakeProvider::new());
        let mut coord = RunCoordinator::new(
            provider.clone(),
            ReconciliationEngine::new(store),
            no_pacing(),
        );

        let summary = coord
            .run(&[TickerEntry::new("005930.KS", Market::Kr)])
            .await
            .unwrap();
        assert_eq!(summary.failure, 1);
        // One call only: definitive refusals skip the retry loop.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn upsert_failure_does_not_abort_run() {
        let store = Arc::new(StatefulStore {
            fail_create: true,
            ..Default::default()
        });
        let mut coord = coordinator(FakeProvider::new(), store);

        let tickers = vec![
            TickerEntry::new("AAPL", Market::Us),
            TickerEntry::new("MSFT", Market::Us),
        ];
        let summary = coord.run(&tickers).await.unwrap();
        assert_eq!(summary.success, 0);
        assert_eq!(summary.failure, 2);
        assert_eq!(summary.outcomes.len(), 2);
    }

    #[tokio::test]
    async fn second_run_only_updates_with_identical_content() {
        let store = Arc::new(StatefulStore::default());
        let tickers = vec![
            TickerEntry::new("AAPL", Market::Us),
            TickerEntry::new("MSFT", Market::Us),
        ];

        let mut first = coordinator(FakeProvider::new(), store.clone());
        let summary = first.run(&tickers).await.unwrap();
        assert!(summary
            .outcomes
            .iter()
            .all(|o| o.result == Ok(UpsertAction::Created)));
        let first_props = store.properties_of("AAPL").unwrap();

        // Fresh coordinator (fresh index) against the now-populated store.
        let mut second = coordinator(FakeProvider::new(), store.clone());
        let summary = second.run(&tickers).await.unwrap();
        assert!(summary
            .outcomes
            .iter()
            .all(|o| o.result == Ok(UpsertAction::Updated)));
        assert_eq!(store.docs.lock().unwrap().len(), 2);

        // Identical provider data => identical payload, timestamp aside.
        let mut a = first_props;
        let mut b = store.properties_of("AAPL").unwrap();
        a.as_object_mut().unwrap().remove("Updated At");
        b.as_object_mut().unwrap().remove("Updated At");
        assert_eq!(a, b);
    }
}
