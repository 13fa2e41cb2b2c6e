//! Crawl frontier: the pending queue and the visited set

use std::collections::{HashSet, VecDeque};

use url::Url;

/// Utility for normalizing URLs for deduplication
pub struct UrlNormalizer;

impl UrlNormalizer {
    /// Normalize a URL string for deduplication
    ///
    /// Strings that don't parse as absolute URLs only lose their fragment.
    pub fn normalize(url: &str) -> String {
        match Url::parse(url) {
            Ok(parsed) => Self::normalize_url(&parsed),
            Err(_) => match url.find('#') {
                Some(pos) => url[..pos].to_string(),
                None => url.to_string(),
            },
        }
    }

    /// Normalize a parsed URL for deduplication
    ///
    /// Drops the fragment and empty query, removes trailing slashes from
    /// non-root paths, sorts query segments and folds `https` onto `http`.
    /// Host case and default ports are already canonical after parsing.
    pub fn normalize_url(url: &Url) -> String {
        let mut normalized = url.clone();
        normalized.set_fragment(None);

        let path = normalized.path();
        if path.len() > 1 && path.ends_with('/') {
            let trimmed = path.trim_end_matches('/').to_string();
            if trimmed.is_empty() {
                normalized.set_path("/");
            } else {
                normalized.set_path(&trimmed);
            }
        }

        if let Some(query) = normalized.query() {
            let mut segments: Vec<String> = query
                .split('&')
                .filter(|segment| !segment.is_empty())
                .map(str::to_owned)
                .collect();
            segments.sort();
            if segments.is_empty() {
                normalized.set_query(None);
            } else {
                normalized.set_query(Some(&segments.join("&")));
            }
        }

        if normalized.scheme() == "https" {
            // Only fails for non-special schemes
            let _ = normalized.set_scheme("http");
        }

        normalized.into()
    }
}

/// Pending links plus every link ever scheduled, for one crawl
///
/// A link is admitted at most once per normalized form: once it has been
/// enqueued or marked visited, later discoveries of any equivalent URL are
/// rejected. Links leave the queue in FIFO order.
#[derive(Debug, Default)]
pub struct CrawlState {
    queue: VecDeque<Url>,
    visited: HashSet<String>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a link if it hasn't been seen; returns whether it was enqueued
    pub fn enqueue(&mut self, link: Url) -> bool {
        if self.visited.insert(UrlNormalizer::normalize_url(&link)) {
            self.queue.push_back(link);
            true
        } else {
            false
        }
    }

    /// Claim the URL a request was actually served from
    ///
    /// Returns `false` when `served` is a different page that was already
    /// admitted, meaning its content has been or will be fetched directly.
    pub fn claim_served_url(&mut self, requested: &Url, served: &Url) -> bool {
        let key = UrlNormalizer::normalize_url(served);
        key == UrlNormalizer::normalize_url(requested) || self.visited.insert(key)
    }

    /// Take the next link to fetch
    pub fn next(&mut self) -> Option<Url> {
        self.queue.pop_front()
    }

    /// Number of links waiting to be fetched
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Number of distinct links ever admitted
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Drop every pending link
    pub fn clear_pending(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        dropped
    }
}
