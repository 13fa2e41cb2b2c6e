//! Error types for fetching pages, following links and starting crawls
//!
//! Only [`CrawlError`] and [`ConfigError`] ever reach a caller. Page-level
//! failures ([`FetchError`]) and link-level failures ([`LinkError`]) are
//! absorbed by the crawler: the page or link is skipped, counted in
//! [`CrawlStats`](crate::CrawlStats) and reported to observers.

use std::time::Duration;

/// Errors that can occur while fetching a single page
///
/// None of these stop a running crawl. The page is recorded as skipped and
/// the crawler moves on to the rest of the queue.
///
/// # Examples
///
/// ```ignore
/// use quotely::{FetchError, Fetcher};
///
/// match fetcher.fetch(&url).await {
///     Ok(page) => println!("{} bytes", page.body().len()),
///     Err(FetchError::Status { status, .. }) if status == 404 => println!("gone"),
///     Err(e) => eprintln!("{}", e),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request did not complete within the configured timeout
    #[error("Timed out fetching '{url}'")]
    Timeout { url: String },

    /// The server answered with a non-2xx status
    #[error("Fetching '{url}' returned status {status}")]
    Status { url: String, status: u16 },

    /// Connection, TLS, redirect or body decoding failure
    #[error("Failed to fetch '{url}': {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Classify a reqwest error, keeping timeouts distinct
    pub fn from_reqwest(url: &url::Url, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                source: error,
            }
        }
    }

    /// The URL the failed request was made for
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url } | Self::Status { url, .. } | Self::Transport { url, .. } => url,
        }
    }
}

/// Reasons a pager anchor could not be turned into a followable link
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The anchor has no `href` attribute
    #[error("Anchor has no href attribute")]
    MissingHref,

    /// The href could not be resolved into a URL
    #[error("Cannot resolve href '{href}': {source}")]
    Unparseable {
        href: String,
        #[source]
        source: url::ParseError,
    },

    /// The resolved URL is not http or https
    #[error("Unsupported link scheme in '{url}'")]
    UnsupportedScheme { url: String },
}

/// Errors that abort a crawl before any record is produced
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// The spider returned no start URLs
    #[error("Spider has no start URLs")]
    NoSeeds,

    /// A start URL could not be parsed
    #[error("Invalid seed URL '{url}': {source}")]
    InvalidSeed {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A start URL parsed but is not http or https
    #[error("Seed URL '{url}' must use http or https")]
    UnsupportedSeedScheme { url: String },

    /// None of the start URLs could be fetched
    #[error("Seed URL '{url}' is unreachable: {source}")]
    SeedUnreachable {
        url: String,
        #[source]
        source: FetchError,
    },
}

/// Errors that can occur during crawler configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Crawling concurrency must be greater than 0
    #[error("Crawling concurrency must be greater than 0, got {0}")]
    InvalidCrawlingConcurrency(usize),

    /// Item queue capacity must be greater than 0
    #[error("Item queue capacity must be greater than 0, got {0}")]
    InvalidItemQueueCapacity(usize),

    /// Request timeout must be non-zero
    #[error("Request timeout must be greater than zero, got {0:?}")]
    InvalidRequestTimeout(Duration),

    /// Page cap must allow at least one page
    #[error("Max pages must be greater than 0, got {0}")]
    InvalidMaxPages(usize),

    /// The HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
