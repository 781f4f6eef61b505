//! Airtable record store
//!
//! The [`RecordStore`] trait is the seam between the HTTP handlers and the
//! remote table. [`AirtableClient`] talks to the Airtable REST API,
//! [`mock::MockStore`] keeps records in memory for tests.

pub mod client;
pub mod mock;

pub use client::AirtableClient;

use crate::config::Table;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// A single Airtable record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Record identifier assigned by Airtable (`rec...`)
    pub id: String,
    /// Creation timestamp, kept exactly as Airtable formats it
    pub created_time: String,
    /// Cell values keyed by field name
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// One page of a list call
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordPage {
    #[serde(default)]
    pub records: Vec<Record>,
    /// Continuation token; present when the table has more records
    #[serde(default)]
    pub offset: Option<String>,
}

/// Errors raised while talking to the record store
#[derive(Error, Debug)]
pub enum AirtableError {
    /// The configured API root cannot be turned into a request URL.
    #[error("invalid Airtable API url: {0}")]
    InvalidUrl(String),

    /// The store rejected the token (HTTP 401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The token is valid but lacks access (HTTP 403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Base, table or record does not exist (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("upstream returned {status}: {message}")]
    Upstream {
        /// HTTP status code returned by Airtable.
        status: u16,
        /// Best-effort message extracted from the body.
        message: String,
    },

    /// Transport or decoding failure.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl AirtableError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => AirtableError::Unauthorized(message),
            403 => AirtableError::Forbidden(message),
            404 => AirtableError::NotFound(message),
            _ => AirtableError::Upstream { status, message },
        }
    }

    /// Upstream HTTP status, when the failure carried one
    pub fn status(&self) -> Option<u16> {
        match self {
            AirtableError::Unauthorized(_) => Some(401),
            AirtableError::Forbidden(_) => Some(403),
            AirtableError::NotFound(_) => Some(404),
            AirtableError::Upstream { status, .. } => Some(*status),
            AirtableError::Http(e) => e.status().map(|s| s.as_u16()),
            AirtableError::InvalidUrl(_) => None,
        }
    }

    /// Human readable detail suitable for an error response body
    pub fn detail(&self) -> String {
        match self {
            AirtableError::Unauthorized(m)
            | AirtableError::Forbidden(m)
            | AirtableError::NotFound(m)
            | AirtableError::InvalidUrl(m) => m.clone(),
            AirtableError::Upstream { message, .. } => message.clone(),
            AirtableError::Http(e) => e.to_string(),
        }
    }
}

/// Access to the records of one Airtable table
pub trait RecordStore: Send + Sync + 'static {
    /// Fetch the first page of records, optionally capped at `max_records`.
    fn list_records(
        &self,
        table: &Table,
        max_records: Option<u32>,
    ) -> impl Future<Output = Result<RecordPage, AirtableError>> + Send;

    /// Delete a single record by id.
    fn delete_record(
        &self,
        table: &Table,
        record_id: &str,
    ) -> impl Future<Output = Result<(), AirtableError>> + Send;
}
