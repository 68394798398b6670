//! Media record store backed by a PostgREST-style REST endpoint.
//!
//! Hosted backends expose the media table at `<base>/rest/v1/<table>` and
//! accept filters as query parameters (`url=eq.<value>`,
//! `order=created_at.desc`). Requests carry the project key both as the
//! `apikey` header and as a bearer token.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpRequest, RetryPolicy},
    MediaRecord, MediaRecordStore,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_TABLE: &str = "media";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct RestMediaStore {
    client: Arc<dyn HttpClient>,
    base_url: String,
    api_key: String,
    table: String,
    retry: RetryPolicy,
}

impl RestMediaStore {
    pub fn new(
        client: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            table: DEFAULT_TABLE.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn request(&self) -> HttpRequest {
        HttpRequest::get(self.table_url())
            .header("apikey", self.api_key.clone())
            .header("Accept", "application/json")
            .bearer_token(self.api_key.clone())
            .query("select", "*")
            .timeout(REQUEST_TIMEOUT)
    }

    async fn fetch_first(&self, request: HttpRequest) -> Result<Option<MediaRecord>> {
        let response = self
            .client
            .execute_with_retry(request, self.retry.clone())
            .await?;

        if !response.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BridgeError::StoreError(format!(
                "HTTP {} from {}: {}",
                response.status,
                self.table,
                body.trim()
            )));
        }

        let mut rows: Vec<MediaRecord> = response.json()?;
        debug!(rows = rows.len(), "Media table query returned");
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }
}

#[async_trait]
impl MediaRecordStore for RestMediaStore {
    #[instrument(skip(self, url), fields(table = %self.table))]
    async fn find_by_url(&self, url: &str) -> Result<Option<MediaRecord>> {
        let request = self
            .request()
            .query("url", format!("eq.{}", url))
            .query("limit", "1");
        self.fetch_first(request).await
    }

    #[instrument(skip(self), fields(table = %self.table))]
    async fn latest_video(&self) -> Result<Option<MediaRecord>> {
        let request = self
            .request()
            .query("type", "eq.video")
            .query("order", "created_at.desc")
            .query("limit", "1");
        self.fetch_first(request).await
    }
}
