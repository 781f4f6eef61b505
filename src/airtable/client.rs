//! Airtable REST API client.

use super::{AirtableError, RecordPage, RecordStore};
use crate::config::Table;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

/// Longest slice of a non-JSON error body echoed back to callers
const MAX_DETAIL_CHARS: usize = 200;

/// Reply to `DELETE /{base}/{table}/{id}`
#[derive(Debug, Deserialize)]
struct DeleteResponse {
    id: String,
    #[serde(default)]
    deleted: bool,
}

/// HTTP client for a single Airtable API root.
///
/// No request timeout is configured; outbound calls wait as long as the
/// underlying connection does.
#[derive(Debug, Clone)]
pub struct AirtableClient {
    http: Client,
    api_url: Url,
}

impl AirtableClient {
    /// Create a client for the given API root, e.g. `https://api.airtable.com/v0`.
    pub fn new(api_url: &str) -> Result<Self, AirtableError> {
        let api_url =
            Url::parse(api_url).map_err(|e| AirtableError::InvalidUrl(format!("{api_url}: {e}")))?;
        if api_url.cannot_be_a_base() {
            return Err(AirtableError::InvalidUrl(api_url.to_string()));
        }

        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, api_url })
    }

    /// `{api}/{base}/{table}` with both segments percent-encoded
    pub fn table_url(&self, table: &Table) -> Result<Url, AirtableError> {
        self.url_with_segments(&[&table.base_id, &table.name])
    }

    /// `{api}/{base}/{table}/{id}`
    pub fn record_url(&self, table: &Table, record_id: &str) -> Result<Url, AirtableError> {
        self.url_with_segments(&[&table.base_id, &table.name, record_id])
    }

    fn url_with_segments(&self, segments: &[&str]) -> Result<Url, AirtableError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| AirtableError::InvalidUrl(self.api_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl RecordStore for AirtableClient {
    #[instrument(skip(self, table), fields(base = %table.base_id, table = %table.name))]
    async fn list_records(
        &self,
        table: &Table,
        max_records: Option<u32>,
    ) -> Result<RecordPage, AirtableError> {
        let mut url = self.table_url(table)?;
        if let Some(max) = max_records {
            url.query_pairs_mut()
                .append_pair("maxRecords", &max.to_string());
        }

        debug!(url = %url, "Listing records");

        let response = self
            .http
            .get(url)
            .bearer_auth(&table.token)
            .send()
            .await?;
        let response = check_status(response).await?;
        let page: RecordPage = response.json().await?;

        debug!(count = page.records.len(), more = page.offset.is_some(), "Listed records");
        Ok(page)
    }

    #[instrument(skip(self, table), fields(base = %table.base_id, table = %table.name))]
    async fn delete_record(&self, table: &Table, record_id: &str) -> Result<(), AirtableError> {
        let url = self.record_url(table, record_id)?;

        debug!(url = %url, "Deleting record");

        let response = self
            .http
            .delete(url)
            .bearer_auth(&table.token)
            .send()
            .await?;
        let response = check_status(response).await?;
        let status = response.status().as_u16();
        let body: DeleteResponse = response.json().await?;

        if !body.deleted {
            warn!(record_id = %body.id, "Airtable did not confirm the deletion");
            return Err(AirtableError::Upstream {
                status,
                message: format!("record {} was not deleted", body.id),
            });
        }

        Ok(())
    }
}

/// Turn a non-success response into the matching [`AirtableError`].
async fn check_status(response: Response) -> Result<Response, AirtableError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = upstream_message(status, &body);

    Err(AirtableError::from_status(status.as_u16(), message))
}

/// Best-effort message from an Airtable error body.
///
/// Airtable answers either `{"error": {"type": ..., "message": ...}}` or
/// `{"error": "NOT_FOUND"}`.
pub(crate) fn upstream_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        match value.get("error") {
            Some(serde_json::Value::Object(error)) => {
                let text = error
                    .get("message")
                    .and_then(serde_json::Value::as_str)
                    .or_else(|| error.get("type").and_then(serde_json::Value::as_str));
                if let Some(text) = text {
                    return text.to_string();
                }
            }
            Some(serde_json::Value::String(error)) => return error.clone(),
            _ => {}
        }
    }

    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown upstream error")
            .to_string()
    } else {
        body.chars().take(MAX_DETAIL_CHARS).collect()
    }
}
