use super::model::{Document, NewDocument, Term};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys=ON;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the
/// parent directory exists. Leaves in-memory URLs untouched. Returns a
/// possibly-updated URL.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") {
        return url.to_string();
    }

    // In-memory URLs like sqlite::memory: or sqlite::memory:?cache=shared
    if url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);

    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };

    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = if let Some(rest) = path_part.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            format!("{}/{}", home.trim_end_matches('/'), rest)
        } else {
            path_part.to_string()
        }
    } else {
        path_part.to_string()
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = String::from("sqlite://");
    rebuilt.push_str(&expanded_path);
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn document_from_row(row: &SqliteRow) -> Document {
    Document {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        excerpt: row.get("excerpt"),
        permalink: row.get("permalink"),
        author: row.get("author"),
        image: row.get("image"),
        doc_type: row.get("doc_type"),
        status: row.get("status"),
        published_at: row.get::<DateTime<Utc>, _>("published_at"),
    }
}

fn term_from_row(row: &SqliteRow) -> Term {
    Term {
        id: row.get("id"),
        taxonomy: row.get("taxonomy"),
        name: row.get("name"),
        slug: row.get("slug"),
    }
}

#[instrument(skip_all)]
pub async fn get_document(pool: &Pool, id: i64) -> Result<Option<Document>> {
    let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(document_from_row))
}

/// All published documents of one content type, oldest first. Unbounded by
/// design: the bulk reconciler pushes every row in one batch.
#[instrument(skip_all)]
pub async fn published_documents(pool: &Pool, doc_type: &str) -> Result<Vec<Document>> {
    let rows = sqlx::query(
        "SELECT * FROM documents WHERE doc_type = ? AND status = 'publish' ORDER BY id",
    )
    .bind(doc_type)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(document_from_row).collect())
}

#[instrument(skip_all)]
pub async fn meta_value(pool: &Pool, document_id: i64, key: &str) -> Result<Option<String>> {
    let value = sqlx::query_scalar::<_, String>(
        "SELECT meta_value FROM document_meta WHERE document_id = ? AND meta_key = ?",
    )
    .bind(document_id)
    .bind(key)
    .fetch_optional(pool)
    .await?;
    Ok(value)
}

/// Terms of one taxonomy attached to a document, in term-id order.
#[instrument(skip_all)]
pub async fn terms_for(pool: &Pool, document_id: i64, taxonomy: &str) -> Result<Vec<Term>> {
    let rows = sqlx::query(
        "SELECT t.id, t.taxonomy, t.name, t.slug FROM terms t \
         JOIN document_terms dt ON dt.term_id = t.id \
         WHERE dt.document_id = ? AND t.taxonomy = ? ORDER BY t.id",
    )
    .bind(document_id)
    .bind(taxonomy)
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(term_from_row).collect())
}

#[instrument(skip_all)]
pub async fn term_by_id(pool: &Pool, term_id: i64, taxonomy: &str) -> Result<Option<Term>> {
    let row = sqlx::query("SELECT id, taxonomy, name, slug FROM terms WHERE id = ? AND taxonomy = ?")
        .bind(term_id)
        .bind(taxonomy)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(term_from_row))
}

#[instrument(skip_all)]
pub async fn insert_document(pool: &Pool, doc: &NewDocument) -> Result<i64> {
    let rec = sqlx::query(
        "INSERT INTO documents (title, content, excerpt, permalink, author, image, doc_type, status) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&doc.title)
    .bind(&doc.content)
    .bind(&doc.excerpt)
    .bind(&doc.permalink)
    .bind(&doc.author)
    .bind(&doc.image)
    .bind(&doc.doc_type)
    .bind(&doc.status)
    .fetch_one(pool)
    .await?;
    Ok(rec.get::<i64, _>("id"))
}

#[instrument(skip_all)]
pub async fn update_status(pool: &Pool, id: i64, status: &str) -> Result<()> {
    sqlx::query("UPDATE documents SET status = ? WHERE id = ?")
        .bind(status)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Remove a document row and (via cascade) its meta and term links.
#[instrument(skip_all)]
pub async fn remove_document(pool: &Pool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM documents WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn set_meta(pool: &Pool, document_id: i64, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO document_meta (document_id, meta_key, meta_value) VALUES (?, ?, ?) \
         ON CONFLICT (document_id, meta_key) DO UPDATE SET meta_value = excluded.meta_value",
    )
    .bind(document_id)
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn insert_term(pool: &Pool, taxonomy: &str, name: &str, slug: &str) -> Result<i64> {
    let rec = sqlx::query("INSERT INTO terms (taxonomy, name, slug) VALUES (?, ?, ?) RETURNING id")
        .bind(taxonomy)
        .bind(name)
        .bind(slug)
        .fetch_one(pool)
        .await?;
    Ok(rec.get::<i64, _>("id"))
}

#[instrument(skip_all)]
pub async fn attach_term(pool: &Pool, document_id: i64, term_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO document_terms (document_id, term_id) VALUES (?, ?)")
        .bind(document_id)
        .bind(term_id)
        .execute(pool)
        .await?;
    Ok(())
}
