use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::record::SyncRecord;

/// Timeouts taken from the original integration: quick probe/delete calls,
/// a longer allowance for single writes, longest for batches.
const PROBE_TIMEOUT: Duration = Duration::from_secs(15);
const SAVE_TIMEOUT: Duration = Duration::from_secs(30);
const BATCH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum AlgoliaError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("algolia error {status}: {body}")]
    Remote { status: StatusCode, body: String },
    #[error("invalid request URL: {0}")]
    Url(String),
}

/// The search-service operations the sync paths need. `AlgoliaClient` is the
/// real implementation; tests substitute a recording mock.
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Connectivity probe. Ok iff the service answers 200.
    async fn check_connection(&self) -> Result<(), AlgoliaError>;

    /// Upsert one record into `index`, keyed by its `objectID`.
    async fn save_object(&self, index: &str, record: &SyncRecord) -> Result<(), AlgoliaError>;

    /// Delete one record from `index` by id.
    async fn delete_object(&self, index: &str, object_id: i64) -> Result<(), AlgoliaError>;

    /// Add all `records` to `index` in a single batch request.
    async fn batch_add(&self, index: &str, records: &[SyncRecord]) -> Result<(), AlgoliaError>;
}

#[derive(Clone)]
pub struct AlgoliaClient {
    http: Client,
    base_url: Url,
    application_id: String,
    api_key: String,
}

impl fmt::Debug for AlgoliaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgoliaClient")
            .field("base_url", &self.base_url)
            .field("application_id", &self.application_id)
            .finish_non_exhaustive()
    }
}

impl AlgoliaClient {
    /// Build a client for the configured application. The write API lives at
    /// `https://{application_id}-dsn.{host}/`.
    pub fn from_config(cfg: &Config) -> Result<Self, AlgoliaError> {
        let raw = format!(
            "https://{}-dsn.{}/",
            cfg.algolia.application_id.trim(),
            cfg.algolia.host.trim()
        );
        let base_url = Url::parse(&raw).map_err(|e| AlgoliaError::Url(e.to_string()))?;
        Ok(Self::with_base_url(
            cfg.algolia.application_id.trim().to_string(),
            cfg.algolia.api_key.trim().to_string(),
            base_url,
        ))
    }

    /// Build a client against an explicit base URL (used by tests).
    pub fn with_base_url(application_id: String, api_key: String, base_url: Url) -> Self {
        let http = Client::builder()
            .user_agent("algolia-sync/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            application_id,
            api_key,
        }
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        timeout: Duration,
    ) -> Result<reqwest::RequestBuilder, AlgoliaError> {
        let endpoint = self
            .base_url
            .join(path)
            .map_err(|e| AlgoliaError::Url(e.to_string()))?;
        Ok(self
            .http
            .request(method, endpoint)
            .header("X-Algolia-API-Key", &self.api_key)
            .header("X-Algolia-Application-Id", &self.application_id)
            .timeout(timeout))
    }

    pub fn build_probe_request(&self) -> Result<reqwest::Request, AlgoliaError> {
        Ok(self
            .request(Method::GET, "1/indexes", PROBE_TIMEOUT)?
            .build()?)
    }

    pub fn build_save_request(
        &self,
        index: &str,
        record: &SyncRecord,
    ) -> Result<reqwest::Request, AlgoliaError> {
        Ok(self
            .request(Method::POST, &format!("1/indexes/{index}"), SAVE_TIMEOUT)?
            .json(record)
            .build()?)
    }

    pub fn build_delete_request(
        &self,
        index: &str,
        object_id: i64,
    ) -> Result<reqwest::Request, AlgoliaError> {
        Ok(self
            .request(
                Method::DELETE,
                &format!("1/indexes/{index}/{object_id}"),
                PROBE_TIMEOUT,
            )?
            .build()?)
    }

    pub fn build_batch_request(
        &self,
        index: &str,
        records: &[SyncRecord],
    ) -> Result<reqwest::Request, AlgoliaError> {
        Ok(self
            .request(
                Method::POST,
                &format!("1/indexes/{index}/batch"),
                BATCH_TIMEOUT,
            )?
            .json(&batch_body(records))
            .build()?)
    }

    async fn execute(
        &self,
        request: reqwest::Request,
        ok: &[StatusCode],
    ) -> Result<(), AlgoliaError> {
        let url = request.url().clone();
        let res = self.http.execute(request).await?;
        let status = res.status();
        if ok.contains(&status) {
            debug!(%url, %status, "algolia request ok");
            return Ok(());
        }
        let body = res.text().await.unwrap_or_default();
        warn!(%url, %status, body, "algolia request failed");
        Err(AlgoliaError::Remote { status, body })
    }
}

/// Batch payload: one `addObject` request per record.
pub fn batch_body(records: &[SyncRecord]) -> Value {
    let requests: Vec<Value> = records
        .iter()
        .map(|record| json!({ "action": "addObject", "body": record }))
        .collect();
    json!({ "requests": requests })
}

#[async_trait]
impl SearchService for AlgoliaClient {
    async fn check_connection(&self) -> Result<(), AlgoliaError> {
        let request = self.build_probe_request()?;
        self.execute(request, &[StatusCode::OK]).await
    }

    async fn save_object(&self, index: &str, record: &SyncRecord) -> Result<(), AlgoliaError> {
        let request = self.build_save_request(index, record)?;
        self.execute(request, &[StatusCode::OK, StatusCode::CREATED])
            .await
    }

    async fn delete_object(&self, index: &str, object_id: i64) -> Result<(), AlgoliaError> {
        let request = self.build_delete_request(index, object_id)?;
        self.execute(request, &[StatusCode::OK]).await
    }

    async fn batch_add(&self, index: &str, records: &[SyncRecord]) -> Result<(), AlgoliaError> {
        let request = self.build_batch_request(index, records)?;
        self.execute(request, &[StatusCode::OK]).await
    }
}
