//! Page fetching

use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::{FetchError, Page};

/// Source of pages for the crawler
///
/// The crawler wraps every call in its own request timeout, so an
/// implementation that hangs is still reported as
/// [`FetchError::Timeout`].
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch one URL with GET semantics
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError>;
}

/// HTTP fetcher backed by a reqwest client
///
/// Redirects are followed; the returned page carries the final URL. Any
/// non-2xx status is a [`FetchError::Status`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client with the given per-request timeout and user agent
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Use a preconfigured client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        debug!(%url, %final_url, bytes = body.len(), "fetched page");
        Ok(Page::new(final_url, body))
    }
}
