// =============================================================================
// Reconciliation Engine — remote index building + create-vs-update upserts
// =============================================================================
//
// State machine per run: Index-Building → Per-Ticker-Decide → Upsert → Done.
// The index is a transient cache: built fresh by full pagination at the
// start of each run, read-only afterwards, discarded at the end.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::snapshot::Snapshot;
use crate::store::{build_properties, DocumentStore};
use crate::types::UpsertAction;

pub struct ReconciliationEngine {
    store: Arc<dyn DocumentStore>,
    /// Normalized (trimmed) ticker text → opaque document id.
    index: HashMap<String, String>,
}

impl ReconciliationEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            index: HashMap::new(),
        }
    }

    /// Build the ticker→id index by paginating the store to exhaustion.
    ///
    /// Any page failure is fatal: without a complete index, create-vs-update
    /// decisions risk duplicating documents.  If the store holds two
    /// documents with the same ticker text, the one visited last wins (and a
    /// warning is logged — the duplicate itself is a data problem upstream).
    ///
    /// Returns the number of indexed tickers.
    pub async fn build_index(&mut self) -> Result<usize, SyncError> {
        self.index.clear();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .store
                .query_page(cursor.as_deref())
                .await
                .map_err(SyncError::IndexBuild)?;
            pages += 1;

            for doc in page.documents {
                let Some(ticker) = doc.ticker else { continue };
                if let Some(previous) = self.index.insert(ticker.clone(), doc.id.clone()) {
                    warn!(
                        ticker,
                        kept = doc.id,
                        replaced = previous,
                        "duplicate ticker in store — last visited document wins"
                    );
                }
            }

            if !page.has_more {
                break;
            }
            cursor = page.next_cursor;
        }

        info!(
            tickers = self.index.len(),
            pages, "remote index built"
        );
        Ok(self.index.len())
    }

    /// Number of tickers currently indexed.
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// Create the document for `snapshot` if its ticker is unknown, update
    /// it in place otherwise.
    pub async fn upsert(&self, snapshot: &Snapshot) -> Result<UpsertAction, SyncError> {
        let properties = build_properties(snapshot);

        match self.index.get(&snapshot.ticker) {
            Some(id) => {
                self.store
                    .update(id, properties)
                    .await
                    .map_err(SyncError::Upsert)?;
                debug!(ticker = %snapshot.ticker, id = %id, "document updated");
                Ok(UpsertAction::Updated)
            }
            None => {
                let id = self
                    .store
                    .create(properties)
                    .await
                    .map_err(SyncError::Upsert)?;
                debug!(ticker = %snapshot.ticker, id = %id, "document created");
                Ok(UpsertAction::Created)
            }
        }
    }
}
