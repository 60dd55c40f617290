//! Remote store gateway.
//!
//! [`RecordStore`] is the seam every flow talks through; [`NocoClient`]
//! implements it against the NocoDB v2 REST API. Every call returns the parsed
//! payload or a [`StoreError`]; nothing is retried.

use crate::cache::TtlCache;
use crate::config::{CacheConfig, StoreConfig};
use crate::error::{StoreError, StoreResult};
use crate::fields;
use crate::models::{Record, RecordId};
use crate::schema::{ColumnDef, TableDef, RECORD_ID};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// Auth header expected by the remote store
pub const TOKEN_HEADER: &str = "xc-token";

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Project title -> base id
    async fn resolve_base_id(&self, project_name: &str) -> StoreResult<String>;

    async fn create_table(&self, base_id: &str, table: &TableDef) -> StoreResult<()>;

    /// Table title -> table id
    async fn resolve_table_id(&self, base_id: &str, table_name: &str) -> StoreResult<String>;

    /// Bulk insert; returns the number of rows sent
    async fn insert_records(&self, table_id: &str, records: &[Record]) -> StoreResult<usize>;

    /// All rows of a table, storage keys
    async fn list_records(&self, table_id: &str) -> StoreResult<Vec<Record>>;

    async fn update_record(
        &self,
        table_id: &str,
        record_id: RecordId,
        fields: Record,
    ) -> StoreResult<()>;

    /// Drop every cached lookup
    fn invalidate_caches(&self);

    /// All rows of a table, display keys
    async fn fetch_display_records(&self, table_id: &str) -> StoreResult<Vec<Record>> {
        let registry = fields::registry();
        Ok(self
            .list_records(table_id)
            .await?
            .into_iter()
            .map(|record| registry.to_display_record(record))
            .collect())
    }
}

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    list: Vec<T>,
    #[serde(default, rename = "pageInfo")]
    page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(default, rename = "isLastPage")]
    is_last_page: Option<bool>,
}

/// Base or table entry of a meta listing
#[derive(Debug, Deserialize)]
struct MetaEntry {
    id: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Serialize)]
struct CreateTableRequest<'a> {
    table_name: &'a str,
    title: &'a str,
    columns: &'a [ColumnDef],
}

// ============================================================================
// NOCODB CLIENT
// ============================================================================

pub struct NocoClient {
    client: Client,
    base_url: String,
    page_size: usize,
    base_ids: Mutex<TtlCache<String, String>>,
    table_ids: Mutex<TtlCache<(String, String), String>>,
}

// Cache state stays usable even if a holder panicked
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl NocoClient {
    pub fn new(store: &StoreConfig, cache: &CacheConfig) -> StoreResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            TOKEN_HEADER,
            HeaderValue::from_str(&store.api_token).map_err(|e| {
                StoreError::Config(format!("invalid API token header value: {e}"))
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(store.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: store.base_url.trim_end_matches('/').to_string(),
            page_size: store.page_size.max(1),
            base_ids: Mutex::new(TtlCache::new(Duration::from_secs(cache.base_id_ttl_secs))),
            table_ids: Mutex::new(TtlCache::new(Duration::from_secs(cache.table_id_ttl_secs))),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send, require a 2xx, return the raw body
    async fn send(&self, request: RequestBuilder) -> StoreResult<String> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = %status, bytes = body.len(), "remote store response");

        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> StoreResult<T> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(Into::into)
    }

    async fn find_meta(&self, path: &str, title: &str) -> StoreResult<Option<String>> {
        let listing: ListResponse<MetaEntry> =
            self.send_json(self.client.get(self.url(path))).await?;
        Ok(listing
            .list
            .into_iter()
            .find(|entry| entry.title == title)
            .map(|entry| entry.id))
    }
}

#[async_trait]
impl RecordStore for NocoClient {
    async fn resolve_base_id(&self, project_name: &str) -> StoreResult<String> {
        let cached = lock(&self.base_ids).get(&project_name.to_string());
        if let Some(id) = cached {
            return Ok(id);
        }

        debug!(project = project_name, "resolving base id");
        let id = self
            .find_meta("api/v2/meta/bases", project_name)
            .await?
            .ok_or_else(|| StoreError::not_found("project", project_name))?;

        lock(&self.base_ids).insert(project_name.to_string(), id.clone());
        Ok(id)
    }

    async fn create_table(&self, base_id: &str, table: &TableDef) -> StoreResult<()> {
        let payload = CreateTableRequest {
            table_name: table.name,
            title: table.name,
            columns: table.columns,
        };
        debug!(table = table.name, "creating table");
        self.send(
            self.client
                .post(self.url(&format!("api/v2/meta/bases/{base_id}/tables")))
                .json(&payload),
        )
        .await?;
        Ok(())
    }

    async fn resolve_table_id(&self, base_id: &str, table_name: &str) -> StoreResult<String> {
        let key = (base_id.to_string(), table_name.to_string());
        let cached = lock(&self.table_ids).get(&key);
        if let Some(id) = cached {
            return Ok(id);
        }

        debug!(table = table_name, "resolving table id");
        let id = self
            .find_meta(&format!("api/v2/meta/bases/{base_id}/tables"), table_name)
            .await?
            .ok_or_else(|| StoreError::not_found("table", table_name))?;

        lock(&self.table_ids).insert(key, id.clone());
        Ok(id)
    }

    async fn insert_records(&self, table_id: &str, records: &[Record]) -> StoreResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        debug!(table_id, rows = records.len(), "inserting records");
        self.send(
            self.client
                .post(self.url(&format!("api/v2/tables/{table_id}/records")))
                .json(records),
        )
        .await?;
        Ok(records.len())
    }

    async fn list_records(&self, table_id: &str) -> StoreResult<Vec<Record>> {
        let url = self.url(&format!("api/v2/tables/{table_id}/records"));
        let mut records = Vec::new();
        let mut offset = 0usize;

        loop {
            let page: ListResponse<Record> = self
                .send_json(
                    self.client
                        .get(&url)
                        .query(&[("limit", self.page_size), ("offset", offset)]),
                )
                .await?;

            let fetched = page.list.len();
            records.extend(page.list);

            // No pageInfo means the remote returned everything at once
            let last = page
                .page_info
                .and_then(|info| info.is_last_page)
                .unwrap_or(true);
            if last || fetched == 0 {
                break;
            }
            offset += fetched;
        }

        debug!(table_id, rows = records.len(), "listed records");
        Ok(records)
    }

    async fn update_record(
        &self,
        table_id: &str,
        record_id: RecordId,
        fields: Record,
    ) -> StoreResult<()> {
        let mut row = fields;
        row.insert(RECORD_ID.to_string(), Value::from(record_id));
        debug!(table_id, record_id, "updating record");
        self.send(
            self.client
                .patch(self.url(&format!("api/v2/tables/{table_id}/records")))
                .json(&[row]),
        )
        .await?;
        Ok(())
    }

    fn invalidate_caches(&self) {
        lock(&self.base_ids).invalidate();
        lock(&self.table_ids).invalidate();
    }
}
