//! Remote API layer.
//!
//! The engine talks to the server through the `RemoteStore` trait so
//! tests can script a fake; `HttpRemote` is the real implementation.

mod http;

pub use http::HttpRemote;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{Record, RecordId};
use crate::util::compact_text;

/// Query parameters for a list call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub email: String,
    pub page: usize,
    pub per_page: usize,
    pub search: String,
    pub sort_by: String,
    pub sort_desc: bool,
    /// Per-request timeout override (full syncs stretch the default).
    pub timeout: Option<Duration>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            email: String::new(),
            page: 1,
            per_page: 10,
            search: String::new(),
            sort_by: "id".to_string(),
            sort_desc: true,
            timeout: None,
        }
    }
}

/// One page of list results plus the advertised total, when any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub rows: Vec<Record>,
    pub total: Option<u64>,
}

/// Remote CRUD operations for one resource collection
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch one page of records.
    async fn list(&self, query: &ListQuery) -> Result<Page>;

    /// Create a record, returning the server's copy.
    async fn create(&self, payload: &Record) -> Result<Record>;

    /// Update a record, returning the server's copy when it sends one.
    async fn update(&self, id: &RecordId, payload: &Record) -> Result<Option<Record>>;

    /// Delete a record by id.
    async fn delete(&self, id: &RecordId) -> Result<()>;
}

/// List responses arrive either as a bare array or wrapped in an object
/// carrying the total row count.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListEnvelope {
    Wrapped {
        data: Vec<Record>,
        total: Option<u64>,
        meta: Option<Meta>,
    },
    Bare(Vec<Record>),
}

#[derive(Debug, Deserialize)]
struct Meta {
    total: Option<u64>,
}

impl From<ListEnvelope> for Page {
    fn from(envelope: ListEnvelope) -> Self {
        match envelope {
            ListEnvelope::Bare(rows) => Self { rows, total: None },
            ListEnvelope::Wrapped { data, total, meta } => Self {
                rows: data,
                total: total.or_else(|| meta.and_then(|meta| meta.total)),
            },
        }
    }
}

/// Create/update responses may wrap the record in a `data` key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ItemEnvelope {
    Wrapped { data: Record },
    Bare(Record),
}

impl ItemEnvelope {
    fn into_record(self) -> Record {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(record) => record,
        }
    }
}

/// Decode a list response body.
pub(crate) fn decode_page(body: &str) -> Result<Page> {
    let envelope: ListEnvelope = serde_json::from_str(body)?;
    Ok(envelope.into())
}

/// Decode a single-record response body. Empty and `null` bodies decode
/// to `None`.
pub(crate) fn decode_item(body: &str) -> Result<Option<Record>> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    let envelope: ItemEnvelope = serde_json::from_str(trimmed)?;
    Ok(Some(envelope.into_record()))
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Build the server error for a non-success response.
///
/// Prefers the `message`/`error` keys an API body may carry, falls back
/// to the (truncated) raw body, then to the canonical status reason.
pub(crate) fn parse_api_error(status: StatusCode, body: &str) -> Error {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return Error::server(status.as_u16(), message.trim());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        Error::server(
            status.as_u16(),
            status.canonical_reason().unwrap_or("HTTP error"),
        )
    } else {
        Error::server(status.as_u16(), trimmed)
    }
}
