//! Per-collection configuration.
//!
//! A `ResourceOptions` describes one synced collection: which endpoint it
//! lives under, which fields drive search and freshness, and how requests
//! are bounded. Defaults mirror the bookkeeping resources the engine was
//! built for, so most collections only set a name.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::normalize_text_option;

const DEFAULT_LAST_EMAIL_KEY: &str = "last_user_email";
const DEFAULT_TIMEOUT_MS: u64 = 7_000;
const DEFAULT_PER_PAGE: usize = 10;

fn default_search_fields() -> Vec<String> {
    ["no_faktur", "keterangan", "ref", "tanggal", "email", "id"]
        .map(String::from)
        .to_vec()
}

fn default_date_fields_order() -> Vec<String> {
    ["created_at", "tanggal"].map(String::from).to_vec()
}

fn default_last_email_key() -> String {
    DEFAULT_LAST_EMAIL_KEY.to_string()
}

const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

const fn default_per_page() -> usize {
    DEFAULT_PER_PAGE
}

/// Configuration for one synced collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceOptions {
    /// Resource name, doubling as the API path segment (e.g. `pembelian`)
    pub resource: String,
    /// Fields searched client-side, lowercase substring match
    #[serde(default = "default_search_fields")]
    pub search_fields: Vec<String>,
    /// Fields coerced to numbers when tagging server rows
    #[serde(default)]
    pub numeric_fields: Vec<String>,
    /// Timestamp fields tried in order when sorting newest-first
    #[serde(default = "default_date_fields_order")]
    pub date_fields_order: Vec<String>,
    /// Base fields compared when a newer pending row meets an older
    /// confirmed one during dedupe
    #[serde(default)]
    pub merge_base_fields: Vec<String>,
    /// Cache key override; defaults to `{resource}_data`
    #[serde(default)]
    pub cache_key: Option<String>,
    /// Cache key holding the last signed-in email
    #[serde(default = "default_last_email_key")]
    pub last_email_key: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Page size for client-side pagination
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

impl ResourceOptions {
    /// Create options for a resource with all defaults.
    #[must_use]
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            search_fields: default_search_fields(),
            numeric_fields: Vec::new(),
            date_fields_order: default_date_fields_order(),
            merge_base_fields: Vec::new(),
            cache_key: None,
            last_email_key: default_last_email_key(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            per_page: DEFAULT_PER_PAGE,
        }
    }

    /// Replace the client-side search fields.
    #[must_use]
    pub fn with_search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the numeric fields sanitized on fetch.
    #[must_use]
    pub fn with_numeric_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.numeric_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the freshness field priority.
    #[must_use]
    pub fn with_date_fields_order<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.date_fields_order = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the dedupe base fields.
    #[must_use]
    pub fn with_merge_base_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.merge_base_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Override the cache key for this collection.
    #[must_use]
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the client-side page size.
    #[must_use]
    pub const fn with_per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page;
        self
    }

    /// Cache key holding this collection.
    #[must_use]
    pub fn cache_key(&self) -> String {
        normalize_text_option(self.cache_key.clone())
            .unwrap_or_else(|| format!("{}_data", self.resource))
    }

    /// Request timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Check that the options name a resource.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.resource.trim().is_empty()
    }
}
