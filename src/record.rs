//! Builds the flat search record pushed to Algolia for one document.
//!
//! Records are projected fresh from the store on every sync call and never
//! cached; `objectID` is the document id, so re-sending the same record is an
//! idempotent upsert on the Algolia side.

use crate::store::{self, Document, Pool};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

pub const TAX_CATEGORY: &str = "blog-category";
pub const TAX_TOPIC: &str = "blog-by-topic";

/// Meta key holding the editor's primary-term selection, as a JSON blob
/// mapping taxonomy name to a list of term ids.
pub const PRIMARY_TERMS_META: &str = "selected_primary_terms";

/// Free-form meta keys copied verbatim into the record when present. The
/// record keeps them in an open map so this list can grow without a schema
/// change on the index side.
pub const META_FIELDS: &[&str] = &[
    "show_custom_date",
    "custom_date",
    "featured",
    "featured_page_list",
    "image_alt_text",
    "learn_more_label",
    "learn_more_type",
    "learn_more_link",
    "show_popup",
    "learn_more_link_file",
    "event_date",
    "event_start_date",
    "event_end_date",
    "place_holder_image_url",
    "hide_from_list_view",
    "disable_iframe",
    "post_reading_time",
];

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

/// A resolved primary taxonomy term.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PrimaryTerm {
    pub name: String,
    pub slug: String,
}

/// The flat record sent to Algolia, one per document.
#[derive(Debug, Clone, Serialize)]
pub struct SyncRecord {
    #[serde(rename = "objectID")]
    pub object_id: i64,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub permalink: String,
    pub date: String,
    pub author: String,
    pub image: Option<String>,
    pub post_type: String,
    pub status: String,
    pub blog_category: Vec<String>,
    pub blog_category_slugs: Vec<String>,
    pub blog_by_topic: Vec<String>,
    pub blog_by_topic_slugs: Vec<String>,
    // Absent (not null) when no primary term is selected or it no longer
    // resolves to a term.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_blog_category: Option<PrimaryTerm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_blog_by_topic: Option<PrimaryTerm>,
    #[serde(flatten)]
    pub meta: BTreeMap<String, Value>,
}

/// Remove markup tags from a text field.
pub fn strip_tags(input: &str) -> String {
    TAG_RE.replace_all(input, "").trim().to_string()
}

/// First term id named for `taxonomy` in the primary-terms blob. The content
/// system stores ids either as numbers or numeric strings.
fn first_term_id(blob: &Value, taxonomy: &str) -> Option<i64> {
    let entry = blob.get(taxonomy)?.get(0)?;
    match entry {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

async fn primary_term(pool: &Pool, blob: Option<&Value>, taxonomy: &str) -> Option<PrimaryTerm> {
    let term_id = first_term_id(blob?, taxonomy)?;
    let term = store::term_by_id(pool, term_id, taxonomy).await.ok()??;
    Some(PrimaryTerm {
        name: term.name,
        slug: term.slug,
    })
}

/// Project a document into its search record.
///
/// Failed taxonomy or meta lookups degrade to empty arrays / absent fields —
/// projection itself never fails.
pub async fn project(pool: &Pool, doc: &Document) -> SyncRecord {
    let categories = store::terms_for(pool, doc.id, TAX_CATEGORY)
        .await
        .unwrap_or_default();
    let topics = store::terms_for(pool, doc.id, TAX_TOPIC)
        .await
        .unwrap_or_default();

    let primary_blob = match store::meta_value(pool, doc.id, PRIMARY_TERMS_META).await {
        Ok(Some(raw)) => match serde_json::from_str::<Value>(&raw) {
            Ok(v) => Some(v),
            Err(err) => {
                debug!(document_id = doc.id, ?err, "unparseable primary-terms meta");
                None
            }
        },
        _ => None,
    };
    let primary_blog_category = primary_term(pool, primary_blob.as_ref(), TAX_CATEGORY).await;
    let primary_blog_by_topic = primary_term(pool, primary_blob.as_ref(), TAX_TOPIC).await;

    let mut meta = BTreeMap::new();
    for key in META_FIELDS {
        if let Ok(Some(value)) = store::meta_value(pool, doc.id, key).await {
            meta.insert((*key).to_string(), Value::String(value));
        }
    }

    SyncRecord {
        object_id: doc.id,
        title: doc.title.clone(),
        content: strip_tags(&doc.content),
        excerpt: strip_tags(&doc.excerpt),
        permalink: doc.permalink.clone(),
        date: doc.published_at.to_rfc3339(),
        author: doc.author.clone(),
        image: doc.image.clone(),
        post_type: doc.doc_type.clone(),
        status: doc.status.clone(),
        blog_category: categories.iter().map(|t| t.name.clone()).collect(),
        blog_category_slugs: categories.iter().map(|t| t.slug.clone()).collect(),
        blog_by_topic: topics.iter().map(|t| t.name.clone()).collect(),
        blog_by_topic_slugs: topics.iter().map(|t| t.slug.clone()).collect(),
        primary_blog_category,
        primary_blog_by_topic,
        meta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{self, NewDocument};
    use serde_json::json;

    #[test]
    fn strip_tags_removes_markup() {
        assert_eq!(strip_tags("<p>Hello <b>world</b></p>"), "Hello world");
        assert_eq!(strip_tags("plain text"), "plain text");
        assert_eq!(strip_tags("  <br/> spaced "), "spaced");
    }

    #[test]
    fn first_term_id_accepts_numbers_and_strings() {
        let blob = json!({ "blog-category": [7], "blog-by-topic": ["12"] });
        assert_eq!(first_term_id(&blob, "blog-category"), Some(7));
        assert_eq!(first_term_id(&blob, "blog-by-topic"), Some(12));
        assert_eq!(first_term_id(&blob, "missing"), None);
        let junk = json!({ "blog-category": ["abc"] });
        assert_eq!(first_term_id(&junk, "blog-category"), None);
    }

    async fn memory_pool() -> Pool {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        store::run_migrations(&pool).await.unwrap();
        pool
    }

    fn published(title: &str) -> NewDocument {
        NewDocument {
            title: title.into(),
            content: "<p>Body text</p>".into(),
            excerpt: "<em>Teaser</em>".into(),
            permalink: "https://example.com/a".into(),
            author: "Jane Doe".into(),
            image: Some("https://example.com/a.jpg".into()),
            doc_type: "post".into(),
            status: "publish".into(),
        }
    }

    #[tokio::test]
    async fn bare_document_yields_empty_arrays_and_absent_primaries() {
        let pool = memory_pool().await;
        let id = store::insert_document(&pool, &published("Bare"))
            .await
            .unwrap();
        let doc = store::get_document(&pool, id).await.unwrap().unwrap();

        let record = project(&pool, &doc).await;
        assert!(record.blog_category.is_empty());
        assert!(record.blog_category_slugs.is_empty());
        assert!(record.blog_by_topic.is_empty());
        assert!(record.blog_by_topic_slugs.is_empty());
        assert!(record.primary_blog_category.is_none());
        assert!(record.meta.is_empty());

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["objectID"], id);
        assert_eq!(value["content"], "Body text");
        assert_eq!(value["excerpt"], "Teaser");
        assert_eq!(value["blog_category"], json!([]));
        // Absent, not null.
        assert!(value.get("primary_blog_category").is_none());
        assert!(value.get("primary_blog_by_topic").is_none());
    }

    #[tokio::test]
    async fn terms_and_primaries_are_projected() {
        let pool = memory_pool().await;
        let id = store::insert_document(&pool, &published("Tagged"))
            .await
            .unwrap();
        let news = store::insert_term(&pool, TAX_CATEGORY, "News", "news")
            .await
            .unwrap();
        let tips = store::insert_term(&pool, TAX_CATEGORY, "Tips", "tips")
            .await
            .unwrap();
        let rust = store::insert_term(&pool, TAX_TOPIC, "Rust", "rust")
            .await
            .unwrap();
        for term in [news, tips, rust] {
            store::attach_term(&pool, id, term).await.unwrap();
        }
        store::set_meta(
            &pool,
            id,
            PRIMARY_TERMS_META,
            &json!({ TAX_CATEGORY: [tips], TAX_TOPIC: [rust] }).to_string(),
        )
        .await
        .unwrap();

        let doc = store::get_document(&pool, id).await.unwrap().unwrap();
        let record = project(&pool, &doc).await;
        assert_eq!(record.blog_category, vec!["News", "Tips"]);
        assert_eq!(record.blog_category_slugs, vec!["news", "tips"]);
        assert_eq!(record.blog_by_topic, vec!["Rust"]);
        assert_eq!(
            record.primary_blog_category,
            Some(PrimaryTerm {
                name: "Tips".into(),
                slug: "tips".into()
            })
        );
        assert_eq!(
            record.primary_blog_by_topic.as_ref().map(|t| t.slug.as_str()),
            Some("rust")
        );
    }

    #[tokio::test]
    async fn stale_primary_selection_is_absent() {
        let pool = memory_pool().await;
        let id = store::insert_document(&pool, &published("Stale"))
            .await
            .unwrap();
        store::set_meta(
            &pool,
            id,
            PRIMARY_TERMS_META,
            &json!({ TAX_CATEGORY: [9999] }).to_string(),
        )
        .await
        .unwrap();

        let doc = store::get_document(&pool, id).await.unwrap().unwrap();
        let record = project(&pool, &doc).await;
        assert!(record.primary_blog_category.is_none());
    }

    #[tokio::test]
    async fn meta_fields_copied_verbatim() {
        let pool = memory_pool().await;
        let id = store::insert_document(&pool, &published("Meta"))
            .await
            .unwrap();
        store::set_meta(&pool, id, "featured", "yes").await.unwrap();
        store::set_meta(&pool, id, "post_reading_time", "7 min")
            .await
            .unwrap();
        // Keys outside META_FIELDS are not projected.
        store::set_meta(&pool, id, "internal_note", "skip me")
            .await
            .unwrap();

        let doc = store::get_document(&pool, id).await.unwrap().unwrap();
        let record = project(&pool, &doc).await;
        assert_eq!(record.meta.get("featured"), Some(&json!("yes")));
        assert_eq!(record.meta.get("post_reading_time"), Some(&json!("7 min")));
        assert!(record.meta.get("internal_note").is_none());

        let value = serde_json::to_value(&record).unwrap();
        // Flattened into the top-level record.
        assert_eq!(value["featured"], "yes");
    }
}
