//! Connectivity detection.
//!
//! The engine never guesses at reachability on its own; callers hand it
//! a `Connectivity` implementation and the engine asks before every
//! network-touching operation.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Answers "can we reach the server right now?".
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Fixed connectivity answer, for tests and forced-offline runs.
#[derive(Debug, Clone, Copy)]
pub struct Fixed(pub bool);

#[async_trait]
impl Connectivity for Fixed {
    async fn is_online(&self) -> bool {
        self.0
    }
}

/// Probes the API base URL with a short HEAD request.
///
/// Any response counts as online, error statuses included; only a
/// transport failure means unreachable.
pub struct HttpProbe {
    url: String,
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = normalize_text_option(Some(url.into()))
            .filter(|url| is_http_url(url))
            .ok_or_else(|| {
                Error::InvalidInput("probe URL must include http:// or https://".to_string())
            })?;
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|error| Error::InvalidInput(format!("failed to build HTTP client: {error}")))?;
        Ok(Self { url, client })
    }
}

#[async_trait]
impl Connectivity for HttpProbe {
    async fn is_online(&self) -> bool {
        self.client.head(&self.url).send().await.is_ok()
    }
}
