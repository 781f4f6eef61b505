//! Request-level errors and their HTTP representation.

use crate::airtable::AirtableError;
use crate::config::Table;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

const TOKEN_GUIDANCE: &str = "Check that AIRTABLE_TOKEN is a valid personal access token \
     with the data.records:read and data.records:write scopes";

/// Errors surfaced to HTTP callers
#[derive(Error, Debug)]
pub enum ServiceError {
    /// A required environment variable was not set.
    #[error("{0} environment variable is required")]
    MissingConfig(&'static str),

    /// The table exists but returned no records.
    #[error("no records found in table {table}")]
    NoRecords { table: String },

    /// Airtable reported the base or table as missing.
    #[error("table {table} not found: {source}")]
    TableNotFound {
        table: String,
        #[source]
        source: AirtableError,
    },

    /// Airtable rejected the token.
    #[error("authentication failed: {0}")]
    Unauthorized(#[source] AirtableError),

    /// The token has no access to the base.
    #[error("access to base {base_id} denied: {source}")]
    Forbidden {
        base_id: String,
        #[source]
        source: AirtableError,
    },

    /// Listing records for `/records` failed.
    #[error("failed to fetch records from {table}: {source}")]
    ListFailed {
        table: String,
        #[source]
        source: AirtableError,
    },

    /// Any other upstream or network failure during delete-random.
    #[error("failed to delete random record: {0}")]
    Upstream(#[source] AirtableError),
}

impl ServiceError {
    /// Classify a failure of the list call that precedes a deletion.
    pub fn fetch_failed(table: &Table, source: AirtableError) -> Self {
        match source {
            AirtableError::NotFound(_) => ServiceError::TableNotFound {
                table: table.name.clone(),
                source,
            },
            other => Self::access_or_upstream(table, other),
        }
    }

    /// Classify a failure of the delete call itself.
    ///
    /// A 404 here means the record vanished between list and delete, which
    /// is reported as a generic failure.
    pub fn delete_failed(table: &Table, source: AirtableError) -> Self {
        Self::access_or_upstream(table, source)
    }

    /// Classify a failure of the `/records` listing.
    pub fn listing_failed(table: &Table, source: AirtableError) -> Self {
        ServiceError::ListFailed {
            table: table.name.clone(),
            source,
        }
    }

    fn access_or_upstream(table: &Table, source: AirtableError) -> Self {
        match source {
            AirtableError::Unauthorized(_) => ServiceError::Unauthorized(source),
            AirtableError::Forbidden(_) => ServiceError::Forbidden {
                base_id: table.base_id.clone(),
                source,
            },
            other => ServiceError::Upstream(other),
        }
    }

    /// HTTP status returned to the caller
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::MissingConfig(_)
            | ServiceError::ListFailed { .. }
            | ServiceError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::NoRecords { .. } | ServiceError::TableNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden { .. } => StatusCode::FORBIDDEN,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ServiceError::MissingConfig(_) => ErrorBody::new(self.to_string()),
            ServiceError::NoRecords { table } => {
                ErrorBody::new("No records found in the table").with_table(table)
            }
            ServiceError::TableNotFound { table, source } => ErrorBody::new("Table not found")
                .with_table(table)
                .with_details(source.detail()),
            ServiceError::Unauthorized(source) => ErrorBody::new("Authentication failed")
                .with_message(TOKEN_GUIDANCE)
                .with_details(source.detail()),
            ServiceError::Forbidden { base_id, source } => ErrorBody::new("Access denied")
                .with_message(format!(
                    "The token does not have access to base {base_id}. Grant it access to \
                     the base and the data.records:read and data.records:write scopes"
                ))
                .with_details(source.detail()),
            ServiceError::ListFailed { source, .. } => {
                ErrorBody::new("Failed to fetch records").with_details(source.detail())
            }
            ServiceError::Upstream(source) => {
                ErrorBody::new("Failed to delete random record").with_details(source.detail())
            }
        }
    }
}

/// JSON error payload
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
            table: None,
            details: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let upstream_status = match &self {
            ServiceError::TableNotFound { source, .. }
            | ServiceError::Unauthorized(source)
            | ServiceError::Forbidden { source, .. }
            | ServiceError::ListFailed { source, .. }
            | ServiceError::Upstream(source) => source.status(),
            _ => None,
        };

        if status.is_server_error() {
            tracing::error!(
                error = %self,
                status = %status.as_u16(),
                upstream_status = ?upstream_status,
                "Request failed"
            );
        } else {
            tracing::warn!(
                error = %self,
                status = %status.as_u16(),
                upstream_status = ?upstream_status,
                "Request rejected"
            );
        }

        (status, Json(self.body())).into_response()
    }
}
