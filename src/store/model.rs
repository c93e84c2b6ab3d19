//! Content store entity models.
//!
//! Keep these structs focused on the data returned by queries. Sync decisions
//! live in higher layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A content item as persisted in the store.
///
/// `status` is a free-form string matched literally by the dispatcher;
/// the values the original content system produces are `publish`, `draft`,
/// `pending` and `trash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub permalink: String,
    pub author: String,
    pub image: Option<String>,
    pub doc_type: String,
    pub status: String,
    pub published_at: DateTime<Utc>,
}

/// Insert payload for [`repo::insert_document`].
#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub permalink: String,
    pub author: String,
    pub image: Option<String>,
    pub doc_type: String,
    pub status: String,
}

/// A taxonomy term attached to documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Term {
    pub id: i64,
    pub taxonomy: String,
    pub name: String,
    pub slug: String,
}
