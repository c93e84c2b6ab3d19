//! Sync dispatcher: reacts to document lifecycle events and decides whether
//! to upsert, delete, or do nothing.
//!
//! Event paths (`handle_saved`, `handle_trashed`, `handle_deleted`) log and
//! swallow every failure: a content save or delete must never fail because
//! the search sync did. Administrator paths (`sync_document`,
//! `test_connection`) surface errors to the caller.

use crate::algolia::{AlgoliaError, SearchService};
use crate::config::Config;
use crate::index::resolve_index;
use crate::record;
use crate::store::{self, Document, Pool};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Configuration(&'static str),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("document {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Algolia(#[from] AlgoliaError),
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Host-provided context for a saved event. `is_update` is carried for
/// interface parity with the host hook but does not affect dispatch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveContext {
    pub is_update: bool,
    pub autosave: bool,
    pub revision: bool,
}

/// Handle a document-saved event.
///
/// The upsert itself runs on a detached task so the triggering save never
/// blocks on the remote call; the task's outcome is only logged. The handle
/// is returned so tests can await completion — production callers drop it.
#[instrument(skip_all, fields(document_id = doc.id))]
pub async fn handle_saved(
    pool: &Pool,
    cfg: &Config,
    search: Arc<dyn SearchService>,
    doc: &Document,
    ctx: SaveContext,
) -> Option<JoinHandle<()>> {
    if ctx.autosave || ctx.revision {
        return None;
    }
    if !cfg.type_enabled(&doc.doc_type) {
        return None;
    }
    if doc.status == "trash" {
        delete_remote(cfg, search.as_ref(), &doc.doc_type, doc.id).await;
        return None;
    }
    if doc.status != "publish" {
        debug!(status = %doc.status, "unpublished document, skipping sync");
        return None;
    }
    if !cfg.is_configured() {
        warn!("missing Algolia credentials, skipping sync");
        return None;
    }
    if doc.title.trim().is_empty() {
        warn!("document has empty title, skipping sync");
        return None;
    }

    let record = record::project(pool, doc).await;
    let index = resolve_index(&doc.doc_type).to_string();
    let document_id = doc.id;
    Some(tokio::spawn(async move {
        match search.save_object(&index, &record).await {
            Ok(()) => info!(document_id, index, "synced document"),
            Err(err) => warn!(document_id, index, %err, "failed to sync document"),
        }
    }))
}

/// Handle a document-moved-to-trash event: delete the remote record if the
/// type is enabled, regardless of the document's prior status.
#[instrument(skip(pool, cfg, search))]
pub async fn handle_trashed(
    pool: &Pool,
    cfg: &Config,
    search: &dyn SearchService,
    document_id: i64,
) {
    let doc = match store::get_document(pool, document_id).await {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            debug!("trashed document not found in store");
            return;
        }
        Err(err) => {
            warn!(%err, "failed to load trashed document");
            return;
        }
    };
    if !cfg.type_enabled(&doc.doc_type) {
        return;
    }
    delete_remote(cfg, search, &doc.doc_type, document_id).await;
}

/// Handle a permanent deletion: always attempt the remote delete, even for
/// types not enabled for sync. A stale record left behind from an earlier
/// configuration is worse than a delete of a record that was never there.
#[instrument(skip(pool, cfg, search))]
pub async fn handle_deleted(
    pool: &Pool,
    cfg: &Config,
    search: &dyn SearchService,
    document_id: i64,
) {
    let doc = match store::get_document(pool, document_id).await {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            // Row already gone; without the type the index cannot be resolved.
            debug!("deleted document no longer in store, skipping remote delete");
            return;
        }
        Err(err) => {
            warn!(%err, "failed to load deleted document");
            return;
        }
    };
    delete_remote(cfg, search, &doc.doc_type, document_id).await;
}

/// Shared delete path: logs the outcome, never raises.
async fn delete_remote(cfg: &Config, search: &dyn SearchService, doc_type: &str, document_id: i64) {
    if !cfg.is_configured() {
        warn!("missing Algolia credentials for delete operation");
        return;
    }
    let index = resolve_index(doc_type);
    match search.delete_object(index, document_id).await {
        Ok(()) => info!(document_id, index, "deleted document from index"),
        Err(err) => warn!(document_id, index, %err, "failed to delete document from index"),
    }
}

/// Administrator-triggered one-off resync of a single document. Blocking
/// variant of the save upsert: the remote outcome is returned, not just
/// logged.
#[instrument(skip(pool, cfg, search))]
pub async fn sync_document(
    pool: &Pool,
    cfg: &Config,
    search: &dyn SearchService,
    document_id: i64,
) -> Result<(), SyncError> {
    if !cfg.is_configured() {
        return Err(SyncError::Configuration("Algolia credentials not configured"));
    }
    let doc = store::get_document(pool, document_id)
        .await?
        .ok_or(SyncError::NotFound(document_id))?;
    if doc.title.trim().is_empty() {
        return Err(SyncError::Validation(format!(
            "document {document_id} has an empty title"
        )));
    }

    let record = record::project(pool, &doc).await;
    let index = resolve_index(&doc.doc_type);
    search.save_object(index, &record).await?;
    info!(index, "manually synced document");
    Ok(())
}

/// Connectivity probe for the admin surface.
pub async fn test_connection(cfg: &Config, search: &dyn SearchService) -> Result<(), SyncError> {
    if !cfg.is_configured() {
        return Err(SyncError::Configuration("Algolia credentials not configured"));
    }
    search.check_connection().await?;
    Ok(())
}
