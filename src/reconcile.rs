//! Full re-sync of all enabled content types, one batch request per type.
//!
//! Used to recover from missed events or to seed a fresh index. Unlike the
//! event-driven paths this is a blocking, administrator-invoked operation,
//! so configuration problems come back as errors instead of log lines.

use crate::algolia::SearchService;
use crate::config::Config;
use crate::index::resolve_index;
use crate::record;
use crate::store::{self, Pool};
use crate::sync::SyncError;
use tracing::{info, instrument, warn};

/// Combined result of a bulk reconciliation.
///
/// One content type failing does not abort the others, so both the number of
/// records submitted and the per-type failures are reported. (The original
/// integration dropped the success count whenever any type failed; keeping
/// both is strictly more informative.)
#[derive(Debug, Clone, Default)]
pub struct BulkOutcome {
    /// Records submitted across all types whose batch call succeeded.
    pub synced: usize,
    /// One entry per failed type, naming the type and the reason.
    pub failures: Vec<String>,
}

impl BulkOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Push every published document of every enabled type to its index.
///
/// Each type's documents go out as one unchunked batch request; types with
/// no published documents are skipped without a remote call.
#[instrument(skip_all)]
pub async fn sync_all(
    pool: &Pool,
    cfg: &Config,
    search: &dyn SearchService,
) -> Result<BulkOutcome, SyncError> {
    if cfg.sync.enabled_types.is_empty() {
        return Err(SyncError::Configuration("no content types selected for sync"));
    }
    if !cfg.is_configured() {
        return Err(SyncError::Configuration("Algolia credentials not configured"));
    }

    let mut outcome = BulkOutcome::default();
    for doc_type in &cfg.sync.enabled_types {
        let documents = match store::published_documents(pool, doc_type).await {
            Ok(docs) => docs,
            Err(err) => {
                warn!(doc_type, %err, "failed to load documents for bulk sync");
                outcome
                    .failures
                    .push(format!("failed to sync {doc_type}: {err}"));
                continue;
            }
        };
        if documents.is_empty() {
            continue;
        }

        let mut records = Vec::with_capacity(documents.len());
        for doc in &documents {
            records.push(record::project(pool, doc).await);
        }

        let index = resolve_index(doc_type);
        match search.batch_add(index, &records).await {
            Ok(()) => {
                info!(doc_type, index, count = records.len(), "bulk synced type");
                outcome.synced += records.len();
            }
            Err(err) => {
                warn!(doc_type, index, %err, "bulk sync failed for type");
                outcome
                    .failures
                    .push(format!("failed to sync {doc_type}: {err}"));
            }
        }
    }
    Ok(outcome)
}
