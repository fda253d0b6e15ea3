// =============================================================================
// Run-level error taxonomy
// =============================================================================
//
// Only `IndexBuild` is fatal to a run: without the ticker→document index no
// create-vs-update decision is safe (a blind create risks duplicates).
// Every other variant is caught at the ticker-processing boundary and
// converted into a failure count plus a per-ticker outcome.

use thiserror::Error;

use crate::provider::ProviderError;
use crate::snapshot::SnapshotError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Document store unreachable (or erroring) during index pagination.
    #[error("failed to build remote index: {0}")]
    IndexBuild(#[source] StoreError),

    /// Price fetch exhausted its retries or was refused outright.
    #[error("provider fetch failed: {0}")]
    Provider(#[from] ProviderError),

    /// Series unusable for a snapshot (empty / single bar).
    #[error("snapshot build failed: {0}")]
    Snapshot(#[from] SnapshotError),

    /// A single document create/update was rejected.
    #[error("document upsert failed: {0}")]
    Upsert(#[source] StoreError),
}

impl SyncError {
    /// Fatal errors abort the run; the rest skip one ticker.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::IndexBuild(_))
    }
}
