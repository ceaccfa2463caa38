use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::{FetchError, RemoteTable, Revision, WriteCondition, WriteError};
use crate::config::RemoteConfig;
use crate::core::app::{AppDraft, AppId, AppPatch, AppRecord};

const REST_PATH: &str = "/rest/v1";

/// The `apps` table behind a PostgREST endpoint (e.g. a Supabase project).
#[derive(Clone)]
pub struct PostgrestTable {
    endpoint: String,
    api_key: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct UpdatedAtRow {
    updated_at: Option<String>,
}

impl PostgrestTable {
    pub fn new(
        base_url: &str,
        table: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            endpoint: table_endpoint(base_url, table),
            api_key: api_key.to_string(),
            http,
        })
    }

    pub fn from_config(remote: &RemoteConfig, api_key: &str) -> Result<Self, FetchError> {
        Self::new(
            remote.url.trim(),
            &remote.table,
            api_key,
            remote.request_timeout(),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send_write(&self, builder: RequestBuilder, what: &str) -> Result<Response, WriteError> {
        let resp = self
            .authed(builder)
            .send()
            .await
            .map_err(|e| WriteError::Transport(format!("{} failed: {}", what, e)))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(WriteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    /// Number of rows a `return=representation` write touched.
    async fn affected_rows(resp: Response) -> Result<usize, WriteError> {
        let rows: Vec<serde_json::Value> = resp
            .json()
            .await
            .map_err(|e| WriteError::Transport(format!("Failed to read write response: {}", e)))?;
        Ok(rows.len())
    }
}

#[async_trait]
impl RemoteTable for PostgrestTable {
    async fn fetch_all(&self) -> Result<Vec<AppRecord>, FetchError> {
        let resp = self
            .authed(self.http.get(&self.endpoint))
            .query(&[("select", "*"), ("order", "sort_order.asc")])
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("GET {} failed: {}", self.endpoint, e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<Vec<AppRecord>>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }

    async fn insert(&self, draft: &AppDraft, sort_order: i64) -> Result<(), WriteError> {
        let body = serde_json::json!({
            "name": draft.name,
            "url": draft.url,
            "icon": draft.icon,
            "description": draft.description,
            "category": draft.category,
            "sort_order": sort_order,
            "updated_at": Utc::now(),
        });
        let builder = self
            .http
            .post(&self.endpoint)
            .header("Prefer", "return=minimal")
            .json(&body);
        self.send_write(builder, "INSERT").await?;
        Ok(())
    }

    async fn update(
        &self,
        id: AppId,
        patch: &AppPatch,
        condition: WriteCondition,
    ) -> Result<(), WriteError> {
        let mut body = serde_json::to_value(patch)
            .map_err(|e| WriteError::Transport(format!("Failed to encode patch: {}", e)))?;
        if let Some(map) = body.as_object_mut() {
            map.insert("updated_at".into(), serde_json::json!(Utc::now()));
        }
        let builder = self
            .http
            .patch(&self.endpoint)
            .query(&row_filters(id, condition))
            .header("Prefer", "return=representation")
            .json(&body);
        let resp = self.send_write(builder, "UPDATE").await?;

        if Self::affected_rows(resp).await? == 0 {
            // The filter matched nothing: the row is gone, or moved if conditional.
            return Err(match condition {
                WriteCondition::Unconditional => WriteError::NotFound(id),
                WriteCondition::SortOrderIs(_) => WriteError::Conflict(id),
            });
        }
        Ok(())
    }

    async fn delete(&self, id: AppId) -> Result<(), WriteError> {
        let builder = self
            .http
            .delete(&self.endpoint)
            .query(&row_filters(id, WriteCondition::Unconditional))
            .header("Prefer", "return=representation");
        let resp = self.send_write(builder, "DELETE").await?;
        if Self::affected_rows(resp).await? == 0 {
            return Err(WriteError::NotFound(id));
        }
        Ok(())
    }

    async fn revision(&self) -> Result<Revision, FetchError> {
        let resp = self
            .authed(self.http.get(&self.endpoint))
            .query(&[
                ("select", "updated_at"),
                ("order", "updated_at.desc.nullslast"),
                ("limit", "1"),
            ])
            .header("Prefer", "count=exact")
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("GET {} failed: {}", self.endpoint, e)))?;

        let status = resp.status();
        if status != StatusCode::OK && status != StatusCode::PARTIAL_CONTENT {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let rows = resp
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(content_range_total)
            .ok_or_else(|| FetchError::Decode("missing Content-Range total".into()))?;

        let latest: Vec<UpdatedAtRow> = resp
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(Revision {
            rows,
            marker: latest.into_iter().next().and_then(|r| r.updated_at),
        })
    }
}

/// `https://x.supabase.co/` + `apps` → `https://x.supabase.co/rest/v1/apps`.
/// A base that already ends in the REST path is used as is.
fn table_endpoint(base_url: &str, table: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with(REST_PATH) {
        format!("{}/{}", base, table)
    } else {
        format!("{}{}/{}", base, REST_PATH, table)
    }
}

/// PostgREST horizontal filters selecting one row, optionally guarded by its sort order.
fn row_filters(id: AppId, condition: WriteCondition) -> Vec<(&'static str, String)> {
    let mut filters = vec![("id", format!("eq.{}", id))];
    if let WriteCondition::SortOrderIs(expected) = condition {
        filters.push(("sort_order", format!("eq.{}", expected)));
    }
    filters
}

/// Total from a `Content-Range` header such as `0-0/42` or `*/0`.
fn content_range_total(header: &str) -> Option<u64> {
    let (_, total) = header.rsplit_once('/')?;
    total.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_rest_path_once() {
        assert_eq!(
            table_endpoint("https://x.supabase.co/", "apps"),
            "https://x.supabase.co/rest/v1/apps"
        );
        assert_eq!(
            table_endpoint("http://localhost:3000/rest/v1", "apps"),
            "http://localhost:3000/rest/v1/apps"
        );
    }

    #[test]
    fn conditional_filters_include_sort_order() {
        let id = AppId::new();
        assert_eq!(
            row_filters(id, WriteCondition::Unconditional),
            vec![("id", format!("eq.{}", id))]
        );
        assert_eq!(
            row_filters(id, WriteCondition::SortOrderIs(5)),
            vec![
                ("id", format!("eq.{}", id)),
                ("sort_order", "eq.5".to_string())
            ]
        );
    }

    #[test]
    fn parses_content_range_totals() {
        assert_eq!(content_range_total("0-0/42"), Some(42));
        assert_eq!(content_range_total("*/0"), Some(0));
        assert_eq!(content_range_total("0-24/*"), None);
        assert_eq!(content_range_total("garbage"), None);
    }

    #[test]
    fn builds_client() {
        let table =
            PostgrestTable::new("https://x.supabase.co", "apps", "key", Duration::from_secs(5))
                .unwrap();
        assert_eq!(table.endpoint(), "https://x.supabase.co/rest/v1/apps");
    }
}
