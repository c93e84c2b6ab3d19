//! Keeps Algolia search indexes synchronized with a local content store.
//!
//! Lifecycle events (`sync::handle_saved` and friends) drive per-document
//! upserts and deletes; `reconcile::sync_all` re-pushes everything. One
//! Algolia index per content type, resolved by `index::resolve_index`.

pub mod algolia;
pub mod config;
pub mod index;
pub mod reconcile;
pub mod record;
pub mod store;
pub mod sync;
