//! Reqwest-backed `RemoteStore` implementation.

use std::time::Duration;

use async_trait::async_trait;

use super::{decode_item, decode_page, parse_api_error, ItemEnvelope, ListQuery, Page, RemoteStore};
use crate::error::{Error, Result};
use crate::models::{Record, RecordId};
use crate::util::{is_http_url, normalize_text_option};

/// HTTP client for one resource collection on a REST-ish API.
///
/// Routes follow the `{base}/{resource}` and `{base}/{resource}/{id}`
/// convention.
#[derive(Clone)]
pub struct HttpRemote {
    base_url: String,
    resource: String,
    client: reqwest::Client,
}

impl HttpRemote {
    /// Build a client for `resource` rooted at `base_url`.
    ///
    /// The base URL must start with `http://` or `https://`; a trailing
    /// slash is trimmed. `timeout` applies to every request unless a
    /// call overrides it.
    pub fn new(
        base_url: impl Into<String>,
        resource: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let resource = normalize_text_option(Some(resource.into()))
            .ok_or_else(|| Error::InvalidInput("resource must not be empty".to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::InvalidInput(format!("failed to build HTTP client: {error}")))?;
        Ok(Self {
            base_url,
            resource,
            client,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, self.resource)
    }

    fn item_url(&self, id: &RecordId) -> String {
        format!("{}/{}/{id}", self.base_url, self.resource)
    }

    /// Send a request and return the body of a successful response.
    async fn send_checked(&self, request: reqwest::RequestBuilder) -> Result<String> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(parse_api_error(status, &body));
        }
        response.text().await.map_err(Error::from)
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn list(&self, query: &ListQuery) -> Result<Page> {
        let mut request = self.client.get(self.collection_url()).query(&[
            ("email", query.email.clone()),
            ("page", query.page.to_string()),
            ("perPage", query.per_page.to_string()),
            ("search", query.search.clone()),
            ("sortBy", query.sort_by.clone()),
            ("sortDesc", query.sort_desc.to_string()),
        ]);
        if let Some(timeout) = query.timeout {
            request = request.timeout(timeout);
        }
        let body = self.send_checked(request).await?;
        decode_page(&body)
    }

    async fn create(&self, payload: &Record) -> Result<Record> {
        let request = self.client.post(self.collection_url()).json(payload);
        let body = self.send_checked(request).await?;
        // A create response must carry the stored record; an empty body
        // is a decode failure, not an absent record.
        let envelope: ItemEnvelope = serde_json::from_str(body.trim())?;
        Ok(envelope.into_record())
    }

    async fn update(&self, id: &RecordId, payload: &Record) -> Result<Option<Record>> {
        let request = self.client.put(self.item_url(id)).json(payload);
        let body = self.send_checked(request).await?;
        decode_item(&body)
    }

    async fn delete(&self, id: &RecordId) -> Result<()> {
        let request = self.client.delete(self.item_url(id));
        self.send_checked(request).await?;
        Ok(())
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let base_url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput("base URL must not be empty".to_string()))?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "base URL must include http:// or https://".to_string(),
        ))
    }
}
